//! How JSON-RPC requests reach a node
//!
//! [`Transport`] is the seam: the client only knows method names and JSON
//! params. [`HttpTransport`] talks to a real node and [`MockTransport`]
//! answers from a script.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::SdkError;

/// Transport trait for RPC communication (object-safe)
///
/// Implementations must tolerate concurrent outstanding requests and hand each
/// caller the response to its own request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one RPC request and return its `result` value
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        (**self).request(method, params).await
    }
}

/// Helper to deserialize response
pub(crate) fn deserialize_response<T: serde::de::DeserializeOwned>(
    value: Value,
) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Malformed(e.to_string()))
}

/// Computes a reply from the request params
pub type MockHandler = Arc<dyn Fn(&[Value]) -> Result<Value, SdkError> + Send + Sync>;

#[derive(Clone)]
enum MockReply {
    Value(Value),
    Error(SdkError),
}

impl MockReply {
    fn into_result(self) -> Result<Value, SdkError> {
        match self {
            MockReply::Value(v) => Ok(v),
            MockReply::Error(e) => Err(e),
        }
    }
}

#[derive(Default)]
struct MockState {
    queued: HashMap<String, VecDeque<MockReply>>,
    sticky: HashMap<String, MockReply>,
    handlers: HashMap<String, MockHandler>,
    delays: HashMap<String, Duration>,
    calls: Vec<(String, Vec<Value>)>,
}

/// Scripted transport for tests
///
/// A request is answered, in order of preference, by the method's FIFO queue,
/// its handler, its sticky response, or a `-32601` method-not-found error.
/// Clones share state, so a test can keep a handle after giving one to a client.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock with a few chain-info defaults
    pub fn new() -> Self {
        let mock = Self::empty();
        mock.set_response("eth_chainId", Value::String("0x2b".to_string()));
        mock.set_response("eth_gasPrice", Value::String("0x3b9aca00".to_string())); // 1 gwei
        mock.set_response("eth_blockNumber", Value::String("0x100".to_string()));
        mock
    }

    /// Create a mock that knows no methods
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Sticky response returned whenever the queue for `method` is empty
    pub fn set_response(&self, method: &str, response: Value) {
        self.state
            .lock()
            .sticky
            .insert(method.to_string(), MockReply::Value(response));
    }

    /// Sticky error returned whenever the queue for `method` is empty
    pub fn set_error(&self, method: &str, error: SdkError) {
        self.state
            .lock()
            .sticky
            .insert(method.to_string(), MockReply::Error(error));
    }

    /// Queue a one-shot response
    pub fn push_response(&self, method: &str, response: Value) {
        self.push(method, MockReply::Value(response));
    }

    /// Queue a one-shot JSON-RPC error object
    pub fn push_rpc_error(&self, method: &str, code: i64, message: &str) {
        self.push(
            method,
            MockReply::Error(SdkError::Rpc {
                code,
                message: message.to_string(),
            }),
        );
    }

    /// Queue a one-shot connection failure
    pub fn push_transport_error(&self, method: &str, message: &str) {
        self.push(method, MockReply::Error(SdkError::Transport(message.to_string())));
    }

    fn push(&self, method: &str, reply: MockReply) {
        self.state
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Answer `method` by running `handler` on the params
    pub fn set_handler<F>(&self, method: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, SdkError> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .handlers
            .insert(method.to_string(), Arc::new(handler));
    }

    /// Delay every answer to `method`
    pub fn set_delay(&self, method: &str, delay: Duration) {
        self.state.lock().delays.insert(method.to_string(), delay);
    }

    /// Every request seen so far, in arrival order
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().calls.clone()
    }

    /// Number of requests seen for `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Forget queued and sticky responses, handlers and the call log
    pub fn reset(&self) {
        *self.state.lock() = MockState::default();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        // Resolve under the lock, run the handler and sleep outside it.
        let (delay, queued, handler, sticky) = {
            let mut state = self.state.lock();
            state.calls.push((method.to_string(), params.clone()));
            let delay = state.delays.get(method).copied();
            let queued = state.queued.get_mut(method).and_then(|q| q.pop_front());
            let handler = state.handlers.get(method).cloned();
            let sticky = state.sticky.get(method).cloned();
            (delay, queued, handler, sticky)
        };

        tracing::trace!(method, "mock request");

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = queued {
            return reply.into_result();
        }
        if let Some(handler) = handler {
            return handler(&params);
        }
        if let Some(reply) = sticky {
            return reply.into_result();
        }

        Err(SdkError::Rpc {
            code: -32601,
            message: format!("Method not found: {}", method),
        })
    }
}

/// JSON-RPC 2.0 over HTTP POST, one request per call
///
/// Ids increase per transport and every response must echo the id it
/// answers.
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    ids: AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Transport with reqwest's default client (no request timeout)
    pub fn new(url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Transport whose requests give up after `timeout`
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, SdkError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map(|client| Self::with_client(client, url))
            .map_err(|e| SdkError::Transport(e.to_string()))
    }

    fn with_client(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_owned(),
            ids: AtomicU64::new(1),
        }
    }

    /// Node endpoint
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http")]
#[derive(serde::Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let id = self.ids.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(method, id, url = %self.url, "rpc request");

        let envelope: JsonRpcResponse = self
            .client
            .post(&self.url)
            .json(&JsonRpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| SdkError::Transport(format!("unreadable response body: {}", e)))?;

        envelope.into_result(id)
    }
}

#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Value,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    /// Match the envelope against the request id, then unwrap `result`/`error`
    fn into_result(self, expected_id: u64) -> Result<Value, SdkError> {
        // an error whose request id the server could not determine carries `"id": null`
        let unattributed_error = self.id.is_null() && self.error.is_some();
        if self.id.as_u64() != Some(expected_id) && !unattributed_error {
            return Err(SdkError::Transport(format!(
                "response id mismatch: sent {}, got {}",
                expected_id, self.id
            )));
        }

        if let Some(error) = self.error {
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // `"result": null` and an absent result both mean "no such thing"
        Ok(self.result.unwrap_or(Value::Null))
    }
}
