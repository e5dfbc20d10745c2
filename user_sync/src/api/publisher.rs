//! API publisher
//!
//! Serializes a [`UserBatch`] as `{"users": [...]}` and POSTs it once to the
//! configured endpoint under a fixed deadline.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::ext::ReasonPhrase;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::UserBatch;

/// Upper bound on the whole request/response exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Request body sent to the third-party API
#[derive(Debug, Serialize)]
pub struct SyncPayload<'a> {
    pub users: &'a UserBatch,
}

/// Delivers user batches to the third-party API
#[derive(Debug, Clone)]
pub struct ApiPublisher {
    client: Client,
    config: ApiConfig,
    timeout: Duration,
}

impl ApiPublisher {
    /// Create a publisher with the default 5 second deadline
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            config,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Headers for the POST; `Authorization` only when an API key is set
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = self
            .config
            .api_key
            .as_ref()
            .filter(|key| !key.expose().is_empty())
        {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key.expose()))
                .map_err(|_| {
                    Error::ConfigError(
                        "API_KEY contains characters that are not valid in an HTTP header"
                            .to_string(),
                    )
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// POST the batch, failing on timeout, transport error or non-2xx status
    pub async fn send(&self, batch: &UserBatch) -> Result<()> {
        let body = serde_json::to_vec(&SyncPayload { users: batch })?;
        let request = self
            .client
            .post(self.config.url.clone())
            .headers(self.headers()?)
            .body(body);

        tracing::info!(
            url = %self.config.url,
            user_count = batch.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Sending users to API"
        );

        let response = within_deadline(self.timeout, request.send()).await??;

        check_status(&response)
    }
}

/// Run `fut` until it completes or `timeout` elapses
///
/// On expiry `fut` is dropped, which aborts the in-flight request. The timer
/// is owned by the returned future, so it is dropped together with it when
/// the call settles and nothing stays scheduled afterwards.
async fn within_deadline<F: Future>(timeout: Duration, fut: F) -> Result<F::Output> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::TimeoutError {
            timeout_ms: timeout.as_millis(),
        })
}

fn check_status(response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        tracing::debug!(status = status.as_u16(), "API accepted batch");
        return Ok(());
    }

    Err(Error::ApiError {
        status: status.as_u16(),
        status_text: status_text(status, response.extensions().get::<ReasonPhrase>()),
    })
}

/// The reason phrase the server sent, or the standard one for `status`
///
/// hyper only records the phrase when it differs from the canonical one.
fn status_text(status: StatusCode, reason: Option<&ReasonPhrase>) -> String {
    match reason {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => status.canonical_reason().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::models::CanonicalUser;
    use pretty_assertions::assert_eq;
    use reqwest::Url;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher_for(server: &MockServer, api_key: Option<&str>) -> ApiPublisher {
        let config = ApiConfig {
            url: Url::parse(&format!("{}/users", server.uri())).unwrap(),
            api_key: api_key.map(Secret::new),
        };
        ApiPublisher::new(config).unwrap()
    }

    fn sample_batch() -> UserBatch {
        UserBatch::new(vec![
            CanonicalUser {
                id: json!(2),
                name: json!("B"),
                email: json!("b@x.com"),
                created_at: json!("2024-01-02T00:00:00Z"),
            },
            CanonicalUser {
                id: json!(1),
                name: json!("A"),
                email: json!("a@x.com"),
                created_at: json!("2024-01-01T00:00:00Z"),
            },
        ])
    }

    #[test]
    fn default_deadline_is_five_seconds() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_millis(5000));
    }

    #[test]
    fn payload_wraps_batch_under_users_key() {
        let batch = sample_batch();
        let value = serde_json::to_value(SyncPayload { users: &batch }).unwrap();

        assert_eq!(
            value,
            json!({
                "users": [
                    { "id": 2, "name": "B", "email": "b@x.com", "createdAt": "2024-01-02T00:00:00Z" },
                    { "id": 1, "name": "A", "email": "a@x.com", "createdAt": "2024-01-01T00:00:00Z" }
                ]
            })
        );
    }

    #[tokio::test]
    async fn posts_json_body_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("content-type", "application/json"))
            .and(header("authorization", "Bearer k-123"))
            .and(body_json(json!({
                "users": [
                    { "id": 2, "name": "B", "email": "b@x.com", "createdAt": "2024-01-02T00:00:00Z" },
                    { "id": 1, "name": "A", "email": "a@x.com", "createdAt": "2024-01-01T00:00:00Z" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        publisher_for(&server, Some("k-123"))
            .send(&sample_batch())
            .await
            .unwrap();
    }

    #[rstest]
    #[case::no_key(None)]
    #[case::empty_key(Some(""))]
    #[tokio::test]
    async fn omits_authorization_without_api_key(#[case] api_key: Option<&str>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        publisher_for(&server, api_key)
            .send(&UserBatch::default())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&requests[0].body).unwrap(),
            json!({ "users": [] })
        );
    }

    #[rstest]
    #[case(200)]
    #[case(201)]
    #[case(204)]
    #[tokio::test]
    async fn success_statuses_return_ok(#[case] status: u16) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let result = publisher_for(&server, None).send(&sample_batch()).await;

        assert!(result.is_ok(), "status {} gave {:?}", status, result);
    }

    #[rstest]
    #[case(401, "Unauthorized")]
    #[case(404, "Not Found")]
    #[case(500, "Internal Server Error")]
    #[case(503, "Service Unavailable")]
    #[tokio::test]
    async fn error_statuses_become_api_errors(#[case] code: u16, #[case] text: &str) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(code).set_body_string("ignored"))
            .expect(1)
            .mount(&server)
            .await;

        let err = publisher_for(&server, None)
            .send(&sample_batch())
            .await
            .unwrap_err();

        match &err {
            Error::ApiError {
                status,
                status_text,
            } => {
                assert_eq!(*status, code);
                assert_eq!(status_text, text);
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
        assert_eq!(err.to_string(), format!("API Error: {} {}", code, text));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let publisher = publisher_for(&server, None).with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        let err = publisher.send(&sample_batch()).await.unwrap_err();

        assert!(matches!(err, Error::TimeoutError { timeout_ms: 100 }), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_does_not_fire_after_early_completion() {
        let started = tokio::time::Instant::now();

        let value = within_deadline(DEFAULT_TIMEOUT, async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            7
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < DEFAULT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_drops_the_pending_work() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(dropped.clone());
        let started = tokio::time::Instant::now();

        let err = within_deadline(DEFAULT_TIMEOUT, async move {
            let _flag = flag;
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::TimeoutError { timeout_ms: 5000 }), "got {:?}", err);
        assert!(dropped.load(Ordering::SeqCst));
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_TIMEOUT && elapsed < Duration::from_secs(60));
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Serve one request with a hand-written status line
    async fn raw_server(status_line: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "{}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status_line
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        Url::parse(&format!("http://{}/users", addr)).unwrap()
    }

    #[rstest]
    #[case::custom("HTTP/1.1 503 Down For Maintenance", "API Error: 503 Down For Maintenance")]
    #[case::canonical("HTTP/1.1 503 Service Unavailable", "API Error: 503 Service Unavailable")]
    #[case::unregistered("HTTP/1.1 418 Short And Stout", "API Error: 418 Short And Stout")]
    #[tokio::test]
    async fn api_error_carries_the_servers_status_text(
        #[case] status_line: &'static str,
        #[case] expected: &str,
    ) {
        let config = ApiConfig {
            url: raw_server(status_line).await,
            api_key: None,
        };

        let err = ApiPublisher::new(config)
            .unwrap()
            .send(&sample_batch())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn status_text_falls_back_to_canonical_reason() {
        let status = StatusCode::SERVICE_UNAVAILABLE;
        assert_eq!(status_text(status, None), "Service Unavailable");
        assert_eq!(
            status_text(status, Some(&ReasonPhrase::from_static(b"Down For Maintenance"))),
            "Down For Maintenance"
        );
        assert_eq!(status_text(StatusCode::from_u16(599).unwrap(), None), "");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ApiConfig {
            url: Url::parse(&format!("http://127.0.0.1:{}/users", port)).unwrap(),
            api_key: None,
        };

        let err = ApiPublisher::new(config)
            .unwrap()
            .send(&sample_batch())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransportError(_)), "got {:?}", err);
    }

    #[test]
    fn rejects_api_key_unusable_as_header() {
        let config = ApiConfig {
            url: Url::parse("https://partner.example.com/users").unwrap(),
            api_key: Some(Secret::new("bad\nkey")),
        };

        let err = ApiPublisher::new(config).unwrap().headers().unwrap_err();

        assert!(matches!(err, Error::ConfigError(_)));
    }
}
