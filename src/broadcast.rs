//! Node connection management and transaction submission.
//!
//! One broadcaster per chain client. `try_reconnect` walks the enabled node
//! list in priority order under an exclusive lock, so concurrent callers wait
//! on the same attempt instead of racing their own. The connected flag flips
//! on only after a node actually answered.

use crate::chains::ChainSpec;
use crate::config::NodeConfig;
use crate::error::{classify, OperationResult, RequestKind};
use crate::operations::ChainOp;
use crate::rpc::{RpcFailure, RpcTransport};
use crate::signing::{build_signed_transaction, SignedTransaction};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// How methods are addressed on the wire: Steem appbase speaks
/// `condenser_api.*`, Golos still uses the legacy `call` envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiStyle {
    Condenser,
    LegacyCall,
}

/// Logical API group a method belongs to; only meaningful for the legacy
/// envelope, condenser flattens everything.
#[derive(Clone, Copy, Debug)]
pub enum Api {
    Database,
    NetworkBroadcast,
}

impl Api {
    fn legacy_name(self) -> &'static str {
        match self {
            Api::Database => "database_api",
            Api::NetworkBroadcast => "network_broadcast_api",
        }
    }
}

pub struct TransactionBroadcaster {
    spec: ChainSpec,
    style: ApiStyle,
    transport: Arc<dyn RpcTransport>,
    nodes: Vec<NodeConfig>,
    active_url: Mutex<Option<String>>,
    connected: AtomicBool,
}

impl TransactionBroadcaster {
    pub fn new(
        spec: ChainSpec,
        style: ApiStyle,
        nodes: Vec<NodeConfig>,
        transport: Arc<dyn RpcTransport>,
    ) -> Self {
        Self {
            spec,
            style,
            transport,
            nodes,
            active_url: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn method_and_params(&self, api: Api, method: &str, args: Value) -> (String, Value) {
        match self.style {
            ApiStyle::Condenser => (format!("condenser_api.{method}"), args),
            ApiStyle::LegacyCall => ("call".to_string(), json!([api.legacy_name(), method, args])),
        }
    }

    /// Establish a connection if there is none. Idempotent: returns
    /// immediately when already connected; otherwise probes the enabled
    /// nodes in ascending priority order and keeps the first that answers.
    pub async fn try_reconnect(&self) -> bool {
        if self.is_connected() {
            return true;
        }

        let mut active = self.active_url.lock().await;
        // somebody else may have connected while we waited on the lock
        if self.is_connected() {
            return true;
        }

        let mut candidates: Vec<&NodeConfig> =
            self.nodes.iter().filter(|n| n.is_enabled).collect();
        candidates.sort_by_key(|n| n.order);

        let (method, params) =
            self.method_and_params(Api::Database, "get_dynamic_global_properties", json!([]));
        for node in candidates {
            match self.transport.call(&node.url, &method, params.clone()).await {
                Ok(_) => {
                    log::info!("connected to {} node {}", self.spec.chain, node.url);
                    *active = Some(node.url.clone());
                    self.connected.store(true, Ordering::Release);
                    return true;
                }
                Err(e) => {
                    log::warn!("node {} unreachable: {e:?}", node.url);
                }
            }
        }
        false
    }

    /// One raw RPC round trip against the active node.
    pub async fn raw_call(&self, api: Api, method: &str, args: Value) -> Result<Value, RpcFailure> {
        let url = self
            .active_url
            .lock()
            .await
            .clone()
            .ok_or(RpcFailure::ConnectTimeout)?;
        let (method, params) = self.method_and_params(api, method, args);
        let result = self.transport.call(&url, &method, params).await;
        if matches!(result, Err(RpcFailure::ConnectTimeout)) {
            // the node went away; force a re-probe on the next attempt
            self.connected.store(false, Ordering::Release);
        }
        result
    }

    /// Raw call with the failure already classified for the caller.
    pub async fn call(
        &self,
        api: Api,
        method: &str,
        args: Value,
        kind: RequestKind,
    ) -> OperationResult<Value> {
        self.raw_call(api, method, args)
            .await
            .map_err(|f| classify(&f, kind))
    }

    /// Build and sign one transaction from the batch without submitting it.
    pub async fn signed_transaction(
        &self,
        keys: &[[u8; 32]],
        ops: Vec<ChainOp>,
    ) -> OperationResult<SignedTransaction> {
        let props = self
            .call(
                Api::Database,
                "get_dynamic_global_properties",
                json!([]),
                RequestKind::Broadcast,
            )
            .await?;
        build_signed_transaction(&self.spec, &props, ops, keys)
    }

    /// Sign and submit the batch as a single atomic transaction; blocks for
    /// the network round trip. The task-level cancellation signal applies at
    /// every await point.
    pub async fn broadcast(&self, keys: &[[u8; 32]], ops: Vec<ChainOp>) -> OperationResult<Value> {
        let trx = self.signed_transaction(keys, ops).await?;
        self.call(
            Api::NetworkBroadcast,
            "broadcast_transaction_synchronous",
            json!([trx.to_json()]),
            RequestKind::Broadcast,
        )
        .await
    }

    /// Sign and check authority without mutating chain state; the login path.
    pub async fn verify_authority(
        &self,
        keys: &[[u8; 32]],
        ops: Vec<ChainOp>,
    ) -> OperationResult<Value> {
        let props = self
            .call(
                Api::Database,
                "get_dynamic_global_properties",
                json!([]),
                RequestKind::Login,
            )
            .await?;
        let trx = build_signed_transaction(&self.spec, &props, ops, keys)?;
        self.call(
            Api::Database,
            "verify_authority",
            json!([trx.to_json()]),
            RequestKind::Login,
        )
        .await
    }
}
