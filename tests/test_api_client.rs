//! Integration tests for the REST client against a local HTTP listener.
//!
//! The listener answers one canned response per connection and records the
//! request line and body it received.

use {
    kidos_dashboard::{
        api::{ApiClient, ApiError},
        blocklist::{load_blocklist, submit_block, BlocklistController, BlocklistStore, SubmitOutcome},
    },
    std::time::Duration,
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::RwLock,
        task::JoinHandle,
    },
};

#[derive(Debug)]
struct Captured {
    request_line: String,
    body: String,
}

async fn http_server(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());

    let task = tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let (head, body_start) = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before request headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break (String::from_utf8_lossy(&buf[..pos]).to_string(), pos + 4);
                }
            };

            let content_length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < body_start + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            captured.push(Captured {
                request_line: head.lines().next().unwrap_or_default().to_string(),
                body: String::from_utf8_lossy(&buf[body_start..]).to_string(),
            });

            let response = format!(
                "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        captured
    });

    (base_url, task)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_and_load_blocklist() {
    let (base_url, server) = http_server(vec![
        (200, r#"{"domains":["Ads.Test","tracker.test"]}"#),
        (200, r#"{"domains":["Ads.Test"," tracker.test ","ads.test"]}"#),
    ])
    .await;
    let api = client(&base_url);

    let raw = api.fetch_blocklist().await.unwrap();
    assert_eq!(raw, vec!["Ads.Test".to_string(), "tracker.test".to_string()]);

    let controller = RwLock::new(BlocklistController::new());
    load_blocklist(&controller, &api).await;
    assert_eq!(
        controller.read().await.confirmed().as_slice(),
        &["ads.test".to_string(), "tracker.test".to_string()]
    );

    let captured = server.await.unwrap();
    assert_eq!(captured[0].request_line, "GET /api/rules HTTP/1.1");
}

#[tokio::test]
async fn test_non_array_lists_read_as_empty() {
    let (base_url, server) = http_server(vec![
        (200, r#"{"domains":"ads.test"}"#),
        (200, r#"{}"#),
        (200, r#"{"events":{"kind":"dns"}}"#),
    ])
    .await;
    let api = client(&base_url);

    assert!(api.fetch_blocklist().await.unwrap().is_empty());
    assert!(api.fetch_blocklist().await.unwrap().is_empty());
    assert!(api.fetch_events().await.unwrap().is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn test_fetch_seed_extracts_latest_summary_and_recent_dns() {
    let body = r#"{"events":[
        {"kind":"ip_pair_summary","pairCounts":[
            {"category":"internal","internal":"10.0.0.2","external":"10.0.0.3","incoming":1,"outgoing":1}]},
        {"kind":"dns","timestamp":"2024-01-01T00:00:01Z","domain":"a.test"},
        {"kind":"control","action":"rules-update"},
        {"kind":"dns","timestamp":5},
        {"kind":"ip_pair_summary","pairCounts":[
            {"category":"external","internal":"10.0.0.5","external":"8.8.8.8","incoming":12,"outgoing":2}]},
        {"kind":"dns","timestamp":"2024-01-01T00:00:02Z","domain":"b.test"},
        {"kind":"dns","timestamp":"2024-01-01T00:00:03Z","domain":"c.test"}
    ]}"#;
    let (base_url, server) = http_server(vec![(200, body)]).await;

    let seed = client(&base_url).fetch_seed(2).await.unwrap();
    assert_eq!(seed.pair_counts.len(), 1);
    assert_eq!(seed.pair_counts[0].incoming, 12);

    let domains: Vec<_> = seed.dns_events.iter().filter_map(|e| e.domain.as_deref()).collect();
    assert_eq!(domains, vec!["c.test", "b.test"]);

    let captured = server.await.unwrap();
    assert_eq!(captured[0].request_line, "GET /api/events HTTP/1.1");
}

#[tokio::test]
async fn test_submit_block_posts_full_list() {
    let (base_url, server) = http_server(vec![(200, "{}")]).await;
    let api = client(&base_url);

    let controller = RwLock::new(BlocklistController::new());
    controller.write().await.load(["ads.test"]);

    let outcome = submit_block(&controller, &api, " Tracker.TEST ").await;
    assert_eq!(outcome, SubmitOutcome::Confirmed);

    let controller = controller.read().await;
    assert!(controller.is_blocked("tracker.test"));
    assert_eq!(controller.pending(), None);

    let captured = server.await.unwrap();
    assert_eq!(captured[0].request_line, "POST /api/rules HTTP/1.1");
    assert_eq!(captured[0].body, r#"{"domains":["ads.test","tracker.test"]}"#);
}

#[tokio::test]
async fn test_failed_update_rolls_back() {
    let (base_url, server) = http_server(vec![(500, r#"{"error":"disk full"}"#)]).await;
    let api = client(&base_url);

    let controller = RwLock::new(BlocklistController::new());
    controller.write().await.load(["ads.test"]);

    let outcome = submit_block(&controller, &api, "tracker.test").await;
    assert_eq!(outcome, SubmitOutcome::Failed);

    let controller = controller.read().await;
    assert!(!controller.is_blocked("tracker.test"));
    assert_eq!(controller.confirmed().as_slice(), &["ads.test".to_string()]);
    assert_eq!(controller.pending(), None);
    server.await.unwrap();
}

#[tokio::test]
async fn test_status_and_transport_errors() {
    let (base_url, server) = http_server(vec![(503, "")]).await;
    let result = client(&base_url).fetch_events().await;
    assert!(matches!(result, Err(ApiError::Status(status)) if status.as_u16() == 503));
    server.await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(&format!("http://{}/api", addr)).fetch_blocklist().await;
    assert!(matches!(result, Err(ApiError::Transport(_))));
}
