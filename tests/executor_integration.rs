//! End-to-end tests for the request pipeline against loopback HTTP stubs.
//!
//! One stub plays the token endpoint, another the target API. Both count
//! the requests they receive, which is how the no-network-call guarantees
//! are asserted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use msrest_cli::api::{ApiClient, ApiError, Credential, PendingRequest, RetryConfig};
use msrest_cli::storage::{BlobStore, MemoryStore};

struct StubServer {
    addr: std::net::SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Serve the same canned response to every request, counting hits and
    /// capturing raw request text.
    async fn spawn(status_line: &'static str, content_type: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let hit_counter = hits.clone();
        let request_log = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                hit_counter.fetch_add(1, Ordering::SeqCst);

                let raw = read_request(&mut socket).await;
                request_log.lock().unwrap().push(raw);

                let response = format!(
                    "{}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.flush().await;
            }
        });

        Self {
            addr,
            hits,
            requests,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one HTTP request, honoring Content-Length so the client never sees
/// a closed socket mid-write.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 4096];
    let mut header_end = None;

    loop {
        match socket.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if header_end.is_none() {
                    header_end = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4);
                }
                if let Some(end) = header_end {
                    let head = String::from_utf8_lossy(&buf[..end]);
                    let content_length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + content_length {
                        break;
                    }
                }
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn test_credential() -> Credential {
    Credential {
        tenant_id: "11111111-2222-3333-4444-555555555555".into(),
        client_id: "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".into(),
        client_secret: "integration-test-secret".into(),
        subscription_id: None,
    }
}

/// Client with fast retries, memory stores and the stub token authority.
fn test_client(authority: String) -> ApiClient {
    let session: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
    let permanent: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
    let client = ApiClient::with_config(
        session,
        permanent,
        authority,
        RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(20),
        },
    );
    client.save_credentials(&test_credential(), false).unwrap();
    client
}

async fn token_stub() -> StubServer {
    StubServer::spawn(
        "HTTP/1.1 200 OK",
        "application/json",
        r#"{"access_token":"test-token","expires_in":3600,"token_type":"Bearer"}"#,
    )
    .await
}

fn graph_request(url: String) -> PendingRequest {
    PendingRequest {
        service_id: "graph".into(),
        auth_scope: "https://graph.microsoft.com/.default".into(),
        method: "GET".into(),
        url,
        headers: Vec::new(),
        body: None,
        retry_enabled: false,
    }
}

#[tokio::test]
async fn success_reuses_cached_token_across_requests() {
    let token = token_stub().await;
    let api = StubServer::spawn("HTTP/1.1 200 OK", "application/json", r#"{"value":[]}"#).await;

    let client = test_client(token.url(""));
    let request = graph_request(api.url("/users"));
    let vars = BTreeMap::new();

    let first = client.execute(&request, &vars).await.unwrap();
    assert!(first.outcome.is_success());
    assert_eq!(first.outcome.status(), Some(200));
    assert_eq!(first.attempts, 1);

    let second = client.execute(&request, &vars).await.unwrap();
    assert!(second.outcome.is_success());

    // Two API calls, but only one token grant: the cache served the second.
    assert_eq!(api.hits(), 2);
    assert_eq!(token.hits(), 1);

    // The bearer token made it onto the wire.
    assert!(api.requests()[0].contains("authorization: Bearer test-token")
        || api.requests()[0].contains("Authorization: Bearer test-token"));

    // Both attempts were recorded against the rate limit.
    assert_eq!(client.limits().usage("graph", 600), 2);
}

#[tokio::test]
async fn server_errors_retry_with_linear_backoff() {
    let token = token_stub().await;
    let api = StubServer::spawn(
        "HTTP/1.1 500 Internal Server Error",
        "application/json",
        r#"{"error":{"code":"internalServerError"}}"#,
    )
    .await;

    let client = test_client(token.url(""));
    let request = graph_request(api.url("/users")).with_retry(true);

    let started = Instant::now();
    let result = client.execute(&request, &BTreeMap::new()).await.unwrap();
    let elapsed = started.elapsed();

    // 1 initial + 3 retries, failure returned as a value.
    assert_eq!(result.attempts, 4);
    assert_eq!(api.hits(), 4);
    assert!(!result.outcome.is_success());
    assert_eq!(result.outcome.status(), Some(500));

    // Base 20ms, so the waits were ~20/40/60ms.
    assert!(elapsed >= Duration::from_millis(120), "elapsed {:?}", elapsed);

    // Every attempt that reached the network counted against the limit.
    assert_eq!(client.limits().usage("graph", 600), 4);
}

#[tokio::test]
async fn retry_disabled_stops_after_first_failure() {
    let token = token_stub().await;
    let api = StubServer::spawn("HTTP/1.1 503 Service Unavailable", "text/plain", "try later").await;

    let client = test_client(token.url(""));
    let request = graph_request(api.url("/users"));

    let result = client.execute(&request, &BTreeMap::new()).await.unwrap();
    assert_eq!(result.attempts, 1);
    assert_eq!(api.hits(), 1);
    assert_eq!(result.outcome.status(), Some(503));
}

#[tokio::test]
async fn admission_denial_makes_no_network_call() {
    let token = token_stub().await;
    let api = StubServer::spawn("HTTP/1.1 200 OK", "application/json", "{}").await;

    let client = test_client(token.url(""));
    // Saturate purview's 100-per-minute window.
    for _ in 0..100 {
        client.limits().record("purview");
    }

    let request = PendingRequest {
        service_id: "purview".into(),
        auth_scope: "https://purview.azure.net/.default".into(),
        method: "GET".into(),
        url: api.url("/catalog/api/atlas/v2/glossary"),
        headers: Vec::new(),
        body: None,
        retry_enabled: true,
    };

    let err = client.execute(&request, &BTreeMap::new()).await.unwrap_err();
    match err {
        ApiError::RateLimited { service, status } => {
            assert_eq!(service, "purview");
            assert!(status.exhausted());
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }

    // Denied before auth and before the request: neither stub was touched,
    // despite the retry flag.
    assert_eq!(token.hits(), 0);
    assert_eq!(api.hits(), 0);
}

#[tokio::test]
async fn auth_rejection_propagates_without_retry() {
    let token = StubServer::spawn(
        "HTTP/1.1 400 Bad Request",
        "application/json",
        r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#,
    )
    .await;
    let api = StubServer::spawn("HTTP/1.1 200 OK", "application/json", "{}").await;

    let client = test_client(token.url(""));
    let request = graph_request(api.url("/users")).with_retry(true);

    let err = client.execute(&request, &BTreeMap::new()).await.unwrap_err();
    match err {
        ApiError::AuthRejected { reason } => assert!(reason.contains("AADSTS7000215")),
        other => panic!("expected AuthRejected, got {:?}", other),
    }

    // The grant was attempted once; the API was never reached.
    assert_eq!(token.hits(), 1);
    assert_eq!(api.hits(), 0);
}

#[tokio::test]
async fn malformed_body_fails_before_any_network_io() {
    let token = token_stub().await;
    let api = StubServer::spawn("HTTP/1.1 200 OK", "application/json", "{}").await;

    let client = test_client(token.url(""));
    let mut request = graph_request(api.url("/users"));
    request.method = "POST".into();
    request.body = Some(r#"{"displayName": {{name}}"#.into());

    // {{name}} unresolved leaves the body as invalid JSON.
    let err = client.execute(&request, &BTreeMap::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::MalformedBody(_)));
    assert_eq!(token.hits(), 0);
    assert_eq!(api.hits(), 0);
}

#[tokio::test]
async fn transport_errors_return_failure_result_and_skip_recording() {
    let token = token_stub().await;

    // Grab a port with no listener behind it.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let client = test_client(token.url(""));
    let request = graph_request(format!("http://{}/users", dead_addr)).with_retry(true);

    let result = client.execute(&request, &BTreeMap::new()).await.unwrap();
    assert_eq!(result.attempts, 4);
    assert!(!result.outcome.is_success());
    assert_eq!(result.outcome.status(), None);

    // Connection refusals never reached the API, so nothing was recorded.
    assert_eq!(client.limits().usage("graph", 600), 0);
}

#[tokio::test]
async fn variables_resolve_into_url_and_body() {
    let token = token_stub().await;
    let api = StubServer::spawn("HTTP/1.1 201 Created", "application/json", "{}").await;

    let client = test_client(token.url(""));
    let mut request = graph_request(api.url("/users/{{userId}}/messages"));
    request.method = "POST".into();
    request.body = Some(r#"{"subject": "{{subject}}"}"#.into());

    let mut vars = BTreeMap::new();
    vars.insert("userId".to_string(), "42".to_string());
    vars.insert("subject".to_string(), "hello".to_string());

    let result = client.execute(&request, &vars).await.unwrap();
    assert!(result.outcome.is_success());

    let raw = api.requests()[0].clone();
    assert!(raw.starts_with("POST /users/42/messages"), "request was: {}", raw);
    assert!(raw.contains(r#""subject":"hello""#), "request was: {}", raw);
}
