//! Download throughput against mock file servers

use netdiag::{bandwidth, BandwidthOptions, ErrorKind, NetworkDiagnostics, OperationKind, SystemProber, TestSize};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOB_LEN: usize = 256 * 1024;

async fn file_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xA5u8; BLOB_LEN]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 16])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    server
}

fn urls(server: &MockServer, paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| format!("{}{}", server.uri(), p)).collect()
}

fn engine() -> NetworkDiagnostics {
    NetworkDiagnostics::with_prober(Arc::new(SystemProber::new().unwrap()))
}

#[tokio::test]
async fn test_download_counts_every_byte() {
    let server = file_server().await;
    let url = format!("{}/blob", server.uri());

    let download = bandwidth::download(&Client::new(), &url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(download.bytes, BLOB_LEN as u64);
    assert!(download.mbps() > 0.0);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = file_server().await;
    let url = format!("{}/slow", server.uri());

    let err = bandwidth::download(&Client::new(), &url, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_engine_falls_back_to_next_server() {
    let server = file_server().await;
    let list = urls(&server, &["/gone", "/blob"]);
    let options = BandwidthOptions::new(TestSize::OneMb)
        .with_urls(list.clone())
        .with_timeout(Duration::from_secs(5));

    let result = engine().bandwidth_test(&options).await;
    assert_eq!(result.operation, OperationKind::Bandwidth);
    assert!(result.succeeded, "{:?}", result.error);
    let report = result.payload.unwrap();
    assert_eq!(report.url, list[1]);
    assert_eq!(report.bytes_downloaded, BLOB_LEN as u64);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("404"));
}

#[tokio::test]
async fn test_engine_reports_last_error_when_all_fail() {
    let server = file_server().await;
    let options = BandwidthOptions::default()
        .with_urls(urls(&server, &["/gone", "/slow"]))
        .with_timeout(Duration::from_millis(200));

    let result = engine().bandwidth_test(&options).await;
    assert!(!result.succeeded);
    assert!(result.payload.is_none());
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Timeout);
    assert!(error.detail.starts_with("all test servers failed. Last error:"));
}
