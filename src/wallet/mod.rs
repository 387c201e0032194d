//! Wallet Client
//!
//! Typed RPC to the remote wallet service with a bounded exponential-backoff
//! retry policy. Transient I/O failures and 5xx responses are retried; 4xx
//! and 409 are returned immediately. Retrying non-idempotent POSTs is what
//! produces the 409s the coordinator reconciles, and that is intentional.

pub mod error;
pub mod types;

pub use error::WalletError;
pub use types::{
    WalletBalanceResponse, WalletErrorBody, WalletRequestTransaction, WalletTransactionRequest,
    WalletTransactionResponse,
};

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Wallet service operations the coordinator depends on
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn get_balance(&self, user_id: i64) -> Result<WalletBalanceResponse, WalletError>;
    async fn deposit(
        &self,
        req: WalletTransactionRequest,
    ) -> Result<WalletTransactionResponse, WalletError>;
    async fn withdraw(
        &self,
        req: WalletTransactionRequest,
    ) -> Result<WalletTransactionResponse, WalletError>;
}

/// Retry policy for transient failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay for the given zero-based attempt, with
    /// jitter of up to one base delay.
    fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay * 2u32.saturating_pow(attempt);
        let jitter_ms = rand::thread_rng().gen_range(0..=self.base_delay.as_millis() as u64);
        backoff + Duration::from_millis(jitter_ms)
    }
}

/// HTTP client for the wallet service
pub struct WalletClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl WalletClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_retry(base_url, api_key, RetryPolicy::default())
    }

    pub fn with_retry(base_url: &str, api_key: &str, retry: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
            retry,
        }
    }

    /// Send a request, retrying transient failures, and decode the response.
    ///
    /// Success is 200; 201 from legacy deployments is also accepted.
    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, WalletError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err: Option<WalletError> = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay(attempt - 1);
                debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "Retrying wallet call");
                tokio::time::sleep(delay).await;
            }

            let mut req = self
                .http
                .request(method.clone(), url.as_str())
                .header("x-api-key", &self.api_key)
                .header("Content-Type", "application/json");
            if let Some(b) = body {
                req = req.json(b);
            }

            let resp = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Wallet transport failure");
                    last_err = Some(WalletError::transport(e.to_string()));
                    continue;
                }
            };

            let status = resp.status();
            if status == StatusCode::OK || status == StatusCode::CREATED {
                return resp
                    .json::<T>()
                    .await
                    .map_err(|e| WalletError::transport(format!("failed to decode response: {e}")));
            }

            let body_text = resp.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<WalletErrorBody>(&body_text) {
                Ok(parsed) => WalletError::new(status.as_u16(), parsed.code, parsed.msg),
                Err(_) => WalletError::new(
                    status.as_u16(),
                    "UNEXPECTED_STATUS",
                    format!("unexpected status {} - {}", status.as_u16(), body_text),
                ),
            };

            if err.is_server_error() {
                warn!(url = %url, attempt, status = status.as_u16(), "Wallet server error");
                last_err = Some(err);
                continue;
            }

            // 4xx / 409: not retryable
            return Err(err);
        }

        Err(last_err.unwrap_or_else(|| WalletError::transport("retry budget exhausted")))
    }
}

#[async_trait]
impl WalletApi for WalletClient {
    async fn get_balance(&self, user_id: i64) -> Result<WalletBalanceResponse, WalletError> {
        self.send::<(), _>(Method::GET, &format!("/api/v1/balance/{}", user_id), None)
            .await
    }

    async fn deposit(
        &self,
        req: WalletTransactionRequest,
    ) -> Result<WalletTransactionResponse, WalletError> {
        self.send(Method::POST, "/api/v1/deposit", Some(&req)).await
    }

    async fn withdraw(
        &self,
        req: WalletTransactionRequest,
    ) -> Result<WalletTransactionResponse, WalletError> {
        self.send(Method::POST, "/api/v1/withdraw", Some(&req)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    #[test]
    fn test_retry_delay_grows_exponentially() {
        let policy = RetryPolicy::default();

        // Jitter adds at most one base delay on top of the backoff
        let d0 = policy.delay(0);
        assert!(d0 >= Duration::from_millis(100) && d0 <= Duration::from_millis(200));

        let d1 = policy.delay(1);
        assert!(d1 >= Duration::from_millis(200) && d1 <= Duration::from_millis(300));

        let d2 = policy.delay(2);
        assert!(d2 >= Duration::from_millis(400) && d2 <= Duration::from_millis(500));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = WalletClient::new("http://wallet:9090/", "key");
        assert_eq!(client.base_url, "http://wallet:9090");
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_server_error() {
        // Nothing listens on this port; all attempts fail at the transport
        // layer and the classification must be ServerError.
        let client = WalletClient::with_retry(
            "http://127.0.0.1:1",
            "key",
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            },
        );

        let err = client.get_balance(1).await.unwrap_err();
        assert!(err.is_server_error());
    }

    // ------------------------------------------------------------------
    // Stub wallet server
    // ------------------------------------------------------------------

    /// Per-call behaviour of the stub: a queue of (status, body) pairs.
    /// When the queue is drained the stub answers 200 with a balance.
    struct StubState {
        responses: std::sync::Mutex<Vec<(u16, serde_json::Value)>>,
        calls: AtomicUsize,
        last_api_key: std::sync::Mutex<Option<String>>,
    }

    async fn stub_handler(
        State(state): State<Arc<StubState>>,
        headers: HeaderMap,
    ) -> (AxStatus, Json<serde_json::Value>) {
        state.calls.fetch_add(1, Ordering::SeqCst);
        *state.last_api_key.lock().unwrap() = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let next = state.responses.lock().unwrap().pop();
        match next {
            Some((status, body)) => (AxStatus::from_u16(status).unwrap(), Json(body)),
            None => (
                AxStatus::OK,
                Json(serde_json::json!({"balance": "90.00", "currency": "USD"})),
            ),
        }
    }

    /// Spawn a stub wallet on an ephemeral port; responses pop LIFO
    async fn spawn_stub(responses: Vec<(u16, serde_json::Value)>) -> (String, Arc<StubState>) {
        let state = Arc::new(StubState {
            responses: std::sync::Mutex::new(responses),
            calls: AtomicUsize::new(0),
            last_api_key: std::sync::Mutex::new(None),
        });

        let app = Router::new()
            .route("/api/v1/balance/{user_id}", get(stub_handler))
            .route("/api/v1/deposit", post(stub_handler))
            .route("/api/v1/withdraw", post(stub_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), state)
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn single_req() -> WalletTransactionRequest {
        WalletTransactionRequest::single(
            34633089486,
            "USD",
            rust_decimal::Decimal::new(1000, 2),
            1,
            "tx1",
        )
    }

    #[tokio::test]
    async fn test_get_balance_success() {
        let (url, state) = spawn_stub(vec![]).await;
        let client = WalletClient::with_retry(&url, "secret-key", fast_retry());

        let resp = client.get_balance(34633089486).await.unwrap();
        assert_eq!(resp.balance, "90.00");
        assert_eq!(resp.currency, "USD");

        // The api key header travels on every call
        assert_eq!(
            state.last_api_key.lock().unwrap().as_deref(),
            Some("secret-key")
        );
    }

    #[tokio::test]
    async fn test_withdraw_parses_error_body() {
        let (url, state) = spawn_stub(vec![(
            400,
            serde_json::json!({"code": "INSUFFICIENT_FUNDS", "msg": "not enough balance"}),
        )])
        .await;
        let client = WalletClient::with_retry(&url, "key", fast_retry());

        let err = client.withdraw(single_req()).await.unwrap_err();
        assert_eq!(err.http_status, 400);
        assert_eq!(err.code, "INSUFFICIENT_FUNDS");
        assert!(err.is_client_error());

        // 4xx is not retried
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conflict_is_not_retried() {
        let (url, state) = spawn_stub(vec![(
            409,
            serde_json::json!({"code": "CONFLICT", "msg": "duplicate reference"}),
        )])
        .await;
        let client = WalletClient::with_retry(&url, "key", fast_retry());

        let err = client.deposit(single_req()).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_retried_until_success() {
        // LIFO queue: two 500s first, then the drained-queue 200 default
        let (url, state) = spawn_stub(vec![
            (500, serde_json::json!({"code": "INTERNAL", "msg": "boom"})),
            (500, serde_json::json!({"code": "INTERNAL", "msg": "boom"})),
        ])
        .await;
        let client = WalletClient::with_retry(&url, "key", fast_retry());

        let resp = client.withdraw(single_req()).await.unwrap();
        assert_eq!(resp.balance, "90.00");
        assert_eq!(state.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retry_budget() {
        let (url, state) = spawn_stub(vec![
            (503, serde_json::json!({"code": "UNAVAILABLE", "msg": "down"})),
            (503, serde_json::json!({"code": "UNAVAILABLE", "msg": "down"})),
            (503, serde_json::json!({"code": "UNAVAILABLE", "msg": "down"})),
        ])
        .await;
        let client = WalletClient::with_retry(&url, "key", fast_retry());

        let err = client.deposit(single_req()).await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(err.http_status, 503);
        assert_eq!(state.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_legacy_201_accepted() {
        let (url, _state) = spawn_stub(vec![(
            201,
            serde_json::json!({"balance": "110.00", "transactions": [{"id": 9, "reference": "tx1"}]}),
        )])
        .await;
        let client = WalletClient::with_retry(&url, "key", fast_retry());

        let resp = client.deposit(single_req()).await.unwrap();
        assert_eq!(resp.balance, "110.00");
        assert_eq!(resp.transactions.len(), 1);
        assert_eq!(resp.transactions[0].reference, "tx1");
    }

    #[tokio::test]
    async fn test_unparseable_error_body_keeps_status() {
        let (url, _state) = spawn_stub(vec![(418, serde_json::json!("teapot"))]).await;
        let client = WalletClient::with_retry(&url, "key", fast_retry());

        let err = client.withdraw(single_req()).await.unwrap_err();
        assert_eq!(err.http_status, 418);
        assert_eq!(err.code, "UNEXPECTED_STATUS");
    }
}
