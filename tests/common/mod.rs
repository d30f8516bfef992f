//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use edge_gateway::config::{GatewayConfig, RouteCacheConfig, RouteConfig};
use edge_gateway::{GatewayServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A scripted downstream service.
///
/// Counts calls and records the request line of each one so tests can tell
/// cache hits from forwarded requests.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    request_lines: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn request_lines(&self) -> Vec<String> {
        self.request_lines.lock().unwrap().clone()
    }
}

/// Start a mock backend that answers every request with 200 and `body`.
#[allow(dead_code)]
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| async move { (200, body.to_string()) }).await
}

/// Start a mock backend whose response is computed from the call number
/// (starting at 0).
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let request_lines = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let counter = calls.clone();
    let lines = request_lines.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let counter = counter.clone();
            let lines = lines.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let request_line = head.lines().next().unwrap_or_default().to_string();
                lines.lock().unwrap().push(request_line);

                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = f(n).await;
                let reason = match status {
                    200 => "OK",
                    201 => "Created",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend {
        addr,
        calls,
        request_lines,
    }
}

/// Read until the end of the request head. Test requests carry no body
/// beyond what arrives with the head.
async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// An HTTP route to `backend` with `ttl_secs` caching (0 for none).
#[allow(dead_code)]
pub fn http_route(name: &str, template: &str, backend: SocketAddr, ttl_secs: u64) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        upstream_path_template: template.into(),
        upstream_http_methods: vec!["GET".into()],
        transport: "http".into(),
        downstream_scheme: "http".into(),
        downstream_host: backend.ip().to_string(),
        downstream_port: backend.port(),
        downstream_path_template: None,
        rpc_service: None,
        timeout_ms: None,
        cache: (ttl_secs > 0).then(|| RouteCacheConfig {
            ttl_secs,
            ..RouteCacheConfig::default()
        }),
    }
}

/// A running gateway on an ephemeral port.
#[allow(dead_code)]
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    pub shutdown: Shutdown,
    pub pipeline: edge_gateway::GatewayPipeline,
}

#[allow(dead_code)]
impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway serving `routes`.
pub async fn start_gateway(routes: Vec<RouteConfig>) -> RunningGateway {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routes = routes;

    let server = GatewayServer::new(config).unwrap();
    let pipeline = server.pipeline().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (updates, update_rx) = mpsc::unbounded_channel();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningGateway {
        addr,
        updates,
        shutdown,
        pipeline,
    }
}

/// Client that never reuses connections or honours proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
