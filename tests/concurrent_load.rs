//! Concurrent clients against a cached route.

use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn concurrent_requests_are_served_and_mostly_from_cache() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        (200, r#"{"productName":"IPhone X","amount":150}"#.to_string())
    })
    .await;
    let gateway = common::start_gateway(vec![common::http_route(
        "discount",
        "/Discount/{productName}",
        backend.addr,
        60,
    )])
    .await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = gateway.url("/Discount/IPhone%20X");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut hits = 0;
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let res = client.get(&url).send().await.unwrap();
                assert_eq!(res.status(), 200);
                if res.headers()["x-gateway-cache"] == "HIT" {
                    hits += 1;
                }
                latencies.push(req_start.elapsed());
            }
            (latencies, hits)
        }));
    }

    let mut all_latencies = Vec::new();
    let mut hits = 0;
    for task in tasks {
        let (latencies, task_hits) = task.await.unwrap();
        all_latencies.extend(latencies);
        hits += task_hits;
    }
    let duration = start.elapsed();

    assert_eq!(all_latencies.len(), total_requests);
    // Each task can miss at most once: its first request waits for the
    // write-through before returning.
    assert!(backend.calls() as usize <= concurrency);
    assert!(hits >= total_requests - concurrency);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];
    println!(
        "requests={} duration={:?} rps={:.0} p50={:?} p99={:?} downstream_calls={}",
        total_requests,
        duration,
        total_requests as f64 / duration.as_secs_f64(),
        p50,
        p99,
        backend.calls()
    );

    gateway.shutdown.trigger();
}
