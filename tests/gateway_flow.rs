//! End-to-end request flow through a running gateway.

use std::time::Duration;

use edge_gateway::config::RouteConfig;

mod common;

#[tokio::test]
async fn cached_route_is_served_from_cache_on_repeat() {
    let backend = common::start_mock_backend(r#"[{"orderId":1}]"#).await;
    let gateway = common::start_gateway(vec![common::http_route(
        "orders-by-user",
        "/Order/{userName}",
        backend.addr,
        30,
    )])
    .await;
    let client = common::client();

    let first = client.get(gateway.url("/Order/swn")).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()["x-gateway-cache"], "MISS");
    assert_eq!(first.text().await.unwrap(), r#"[{"orderId":1}]"#);

    let second = client.get(gateway.url("/Order/swn")).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.headers()["x-gateway-cache"], "HIT");
    assert!(second.headers().contains_key("age"));
    assert_eq!(second.text().await.unwrap(), r#"[{"orderId":1}]"#);

    assert_eq!(backend.calls(), 1);

    // A different user is a different key.
    let other = client.get(gateway.url("/Order/alice")).send().await.unwrap();
    assert_eq!(other.headers()["x-gateway-cache"], "MISS");
    assert_eq!(backend.calls(), 2);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn downstream_path_template_is_filled_from_upstream_match() {
    let backend = common::start_mock_backend("[]").await;
    let mut route = common::http_route("orders", "/Order/{userName}", backend.addr, 0);
    route.downstream_path_template = Some("/api/v1/Order/{userName}".into());
    let gateway = common::start_gateway(vec![route]).await;

    let response = common::client()
        .get(gateway.url("/Order/swn?page=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-gateway-cache"], "BYPASS");
    assert_eq!(backend.request_lines(), vec!["GET /api/v1/Order/swn?page=2 HTTP/1.1".to_string()]);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn downstream_errors_are_passed_through_and_not_cached() {
    let backend = common::start_programmable_backend(|n| async move {
        if n == 0 {
            (503, r#"{"title":"busy"}"#.to_string())
        } else {
            (200, "[]".to_string())
        }
    })
    .await;
    let gateway = common::start_gateway(vec![common::http_route("orders", "/orders", backend.addr, 30)]).await;
    let client = common::client();

    let failed = client.get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(failed.status(), 503);

    let recovered = client.get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(recovered.status(), 200);
    assert_eq!(recovered.headers()["x-gateway-cache"], "MISS");
    assert_eq!(backend.calls(), 2);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn unreachable_downstream_is_a_generic_503() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let gateway = common::start_gateway(vec![common::http_route("orders", "/orders", addr, 0)]).await;

    let response = common::client().get(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    assert!(!body.to_string().contains(&addr.to_string()));

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn unmatched_request_is_404_and_never_forwarded() {
    let backend = common::start_mock_backend("[]").await;
    let gateway = common::start_gateway(vec![common::http_route("orders", "/orders", backend.addr, 0)]).await;
    let client = common::client();

    let wrong_path = client.get(gateway.url("/payments")).send().await.unwrap();
    assert_eq!(wrong_path.status(), 404);

    let wrong_method = client.delete(gateway.url("/orders")).send().await.unwrap();
    assert_eq!(wrong_method.status(), 404);

    assert_eq!(backend.calls(), 0);
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let backend = common::start_mock_backend("[]").await;
    let gateway = common::start_gateway(vec![common::http_route("orders", "/orders", backend.addr, 0)]).await;
    let client = common::client();

    let generated = client.get(gateway.url("/orders")).send().await.unwrap();
    let id = generated.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(!id.is_empty());

    let echoed = client
        .get(gateway.url("/orders"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(echoed.headers()["x-request-id"], "trace-42");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn first_declared_route_wins() {
    let specific = common::start_mock_backend(r#""specific""#).await;
    let general = common::start_mock_backend(r#""general""#).await;
    let routes: Vec<RouteConfig> = vec![
        common::http_route("me", "/Order/me", specific.addr, 0),
        common::http_route("by-user", "/Order/{userName}", general.addr, 0),
    ];
    let gateway = common::start_gateway(routes).await;
    let client = common::client();

    let me = client.get(gateway.url("/Order/me")).send().await.unwrap();
    assert_eq!(me.text().await.unwrap(), r#""specific""#);

    let other = client.get(gateway.url("/Order/swn")).send().await.unwrap();
    assert_eq!(other.text().await.unwrap(), r#""general""#);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(specific.calls(), 1);
    assert_eq!(general.calls(), 1);

    gateway.shutdown.trigger();
}
