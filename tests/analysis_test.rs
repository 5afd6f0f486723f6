use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chat_toxicity::analysis::{AnalysisProvider, HttpAnalysisClient};
use chat_toxicity::config::{AnalysisConfig, AppConfig};
use chat_toxicity::error::ChatToxicityError;
use chat_toxicity::models::{AnalysisRequest, SenderType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SCORED_BODY: &str =
    r#"{"choices":[{"message":{"role":"assistant","content":"Here: [{\"toxicity_score\":0.4}]"}}]}"#;

/// Answers successive requests with the scripted responses and counts them
async fn spawn_server(responses: Vec<(u16, String)>) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&requests);
    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            read_request(&mut stream).await;
            counter.fetch_add(1, Ordering::SeqCst);

            let response = format!(
                "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (addr, requests)
}

async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn client_config(addr: SocketAddr) -> AnalysisConfig {
    let mut config = AppConfig::default().analysis;
    config.api_url = format!("http://{addr}/v1/chat/completions");
    config.api_key = Some("test-key".to_string());
    config.max_retries = 1;
    config.timeout_secs = 5;
    config
}

fn batch() -> Vec<AnalysisRequest> {
    vec![AnalysisRequest {
        text: "why aren't you answering".to_string(),
        sender_type: SenderType::Me,
    }]
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (addr, requests) = spawn_server(vec![
        (401, r#"{"error":"bad key"}"#.to_string()),
        (200, SCORED_BODY.to_string()),
    ])
    .await;
    let client = HttpAnalysisClient::new(&client_config(addr)).unwrap();

    let err = client.analyze(&batch()).await.unwrap_err();

    assert!(matches!(err, ChatToxicityError::AnalysisStatus { status: 401, .. }));
    assert!(err.is_analysis_failure());
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (addr, requests) = spawn_server(vec![
        (503, r#"{"error":"busy"}"#.to_string()),
        (200, SCORED_BODY.to_string()),
    ])
    .await;
    let client = HttpAnalysisClient::new(&client_config(addr)).unwrap();

    let value = client.analyze(&batch()).await.unwrap();

    assert_eq!(value[0]["toxicity_score"], 0.4);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let (addr, requests) = spawn_server(vec![
        (503, "busy".to_string()),
        (503, "still busy".to_string()),
        (200, SCORED_BODY.to_string()),
    ])
    .await;
    let client = HttpAnalysisClient::new(&client_config(addr)).unwrap();

    let err = client.analyze(&batch()).await.unwrap_err();

    match err {
        ChatToxicityError::AnalysisStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "still busy");
        },
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_response_without_choices() {
    let (addr, requests) = spawn_server(vec![(200, "{}".to_string())]).await;
    let client = HttpAnalysisClient::new(&client_config(addr)).unwrap();

    let err = client.analyze(&batch()).await.unwrap_err();

    assert!(matches!(err, ChatToxicityError::MalformedAnalysisOutput(_)));
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_api_key_sends_nothing() {
    let (addr, requests) = spawn_server(vec![(200, SCORED_BODY.to_string())]).await;
    let mut config = client_config(addr);
    config.api_key = Some("   ".to_string());
    let client = HttpAnalysisClient::new(&config).unwrap();

    let err = client.analyze(&batch()).await.unwrap_err();

    assert!(matches!(err, ChatToxicityError::AnalysisUnavailable(_)));
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}
