//! JSON-RPC transport over HTTP.
//!
//! One shared reqwest client, one envelope shape, and a failure type that
//! keeps the transport/remote split explicit so the error classifier can map
//! each case without re-parsing anything.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .expect("reqwest client")
    })
}

/// A structured error object returned by the node itself.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
    /// `format` strings of the server-side stack entries, first entry first.
    pub stack_formats: Vec<String>,
}

/// Why an RPC round trip failed.
#[derive(Clone, Debug, PartialEq)]
pub enum RpcFailure {
    /// Could not reach the node at all.
    ConnectTimeout,
    /// The node accepted the connection but never answered in time.
    ResponseTimeout,
    /// Any other transport-level failure, with whatever text the stack attached.
    Transport(String),
    /// The node answered with a structured error object.
    Remote(RemoteError),
}

impl RpcFailure {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() {
            RpcFailure::ConnectTimeout
        } else if e.is_timeout() {
            RpcFailure::ResponseTimeout
        } else {
            RpcFailure::Transport(e.to_string())
        }
    }
}

/// Parse the node's `error` object into a [`RemoteError`].
///
/// Graphene nodes nest the interesting code under `error.data.code`; the
/// top-level `code` is the JSON-RPC envelope code and only used as fallback.
pub fn parse_remote_error(err: &Value) -> RemoteError {
    let data = &err["data"];
    let code = data["code"]
        .as_i64()
        .or_else(|| err["code"].as_i64())
        .unwrap_or_default();
    let message = data["message"]
        .as_str()
        .or_else(|| err["message"].as_str())
        .unwrap_or("rpc error")
        .to_string();
    let stack_formats = data["stack"]
        .as_array()
        .map(|stack| {
            stack
                .iter()
                .filter_map(|entry| entry["format"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    RemoteError {
        code,
        message,
        stack_formats,
    }
}

/// One JSON-RPC call. The seam every network interaction goes through; tests
/// inject counting stubs here.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcFailure>;
}

/// Production transport: plain HTTP POST with a per-call timeout.
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcFailure> {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        log::debug!("rpc -> {url} {method}");

        let res = http_client()
            .post(url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(RpcFailure::from_reqwest)?;

        if !res.status().is_success() {
            return Err(RpcFailure::Transport(format!("http {}", res.status())));
        }

        let v: Value = res.json().await.map_err(RpcFailure::from_reqwest)?;
        if let Some(err) = v.get("error") {
            let remote = parse_remote_error(err);
            log::debug!("rpc <- error {} {}", remote.code, remote.message);
            return Err(RpcFailure::Remote(remote));
        }
        match v.get("result") {
            Some(r) => Ok(r.clone()),
            None => Err(RpcFailure::Transport("invalid rpc payload (no result)".into())),
        }
    }
}
