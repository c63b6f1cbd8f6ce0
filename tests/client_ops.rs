//! End-to-end client pipelines against a scripted node transport.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use steepshot_core::chains::KnownChains;
use steepshot_core::client::make_client;
use steepshot_core::config::Config;
use steepshot_core::error::{ErrorKind, OperationError};
use steepshot_core::models::{
    AuthorizedModel, Beneficiary, CommentModel, CurrencyType, FollowModel, FollowType,
    TransferModel, VoteModel, VoteType,
};
use steepshot_core::rpc::{RemoteError, RpcFailure, RpcTransport};

const VALID_WIF: &str = "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ";

/// Scripted node: answers lookups from a canned account table, records every
/// broadcast, and counts operation-bearing calls.
#[derive(Default)]
struct StubNode {
    accounts: Mutex<Value>,
    verify_error: Mutex<Option<RemoteError>>,
    broadcast_error: Mutex<Option<RemoteError>>,
    /// Full `(method, params)` log, including connection probes.
    log: Mutex<Vec<(String, Value)>>,
    /// Transactions submitted through broadcast.
    broadcasts: Mutex<Vec<Value>>,
    /// get_accounts + verify_authority + broadcast calls.
    op_calls: AtomicUsize,
}

impl StubNode {
    fn with_accounts(accounts: Value) -> Arc<Self> {
        let node = Self::default();
        *node.accounts.lock().unwrap() = accounts;
        Arc::new(node)
    }

    fn props() -> Value {
        json!({
            "head_block_number": 0x0012_5678u32,
            "head_block_id": "00125678aabbccdd00000000000000000000000000000000",
            "time": "2018-03-01T12:00:00",
        })
    }

    fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    fn last_trx(&self) -> Value {
        self.broadcasts.lock().unwrap().last().cloned().expect("a broadcast")
    }
}

#[async_trait]
impl RpcTransport for StubNode {
    async fn call(&self, _url: &str, method: &str, params: Value) -> Result<Value, RpcFailure> {
        self.log
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        // unwrap the legacy ["api", "method", args] envelope
        let (name, args) = if method == "call" {
            (
                params[1].as_str().unwrap_or_default().to_string(),
                params[2].clone(),
            )
        } else {
            (
                method.trim_start_matches("condenser_api.").to_string(),
                params,
            )
        };

        match name.as_str() {
            "get_dynamic_global_properties" => Ok(Self::props()),
            "get_accounts" => {
                self.op_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.accounts.lock().unwrap().clone())
            }
            "verify_authority" => {
                self.op_calls.fetch_add(1, Ordering::SeqCst);
                match self.verify_error.lock().unwrap().clone() {
                    Some(remote) => Err(RpcFailure::Remote(remote)),
                    None => Ok(json!(true)),
                }
            }
            "broadcast_transaction_synchronous" => {
                self.op_calls.fetch_add(1, Ordering::SeqCst);
                match self.broadcast_error.lock().unwrap().clone() {
                    Some(remote) => Err(RpcFailure::Remote(remote)),
                    None => {
                        self.broadcasts.lock().unwrap().push(args[0].clone());
                        Ok(json!({"id": "deadbeef"}))
                    }
                }
            }
            other => panic!("unexpected rpc method {other}"),
        }
    }
}

fn auth() -> AuthorizedModel {
    AuthorizedModel::new("alice", VALID_WIF).unwrap()
}

fn steem_accounts() -> Value {
    json!([{
        "name": "alice",
        "memo_key": "STM4tVTJCKDChjXcDN2namq7rXSFfXZGCBGaXHVbFiCrem8wsiu8r",
        "json_metadata": "{\"profile\":{\"name\":\"Alice\"}}",
        "balance": "0.500 STEEM",
        "sbd_balance": "10.000 SBD",
    }, {
        "name": "bob",
        "memo_key": "STM4tVTJCKDChjXcDN2namq7rXSFfXZGCBGaXHVbFiCrem8wsiu8r",
        "json_metadata": "",
        "balance": "1.000 STEEM",
        "sbd_balance": "0.000 SBD",
    }])
}

#[tokio::test]
async fn invalid_key_short_circuits_before_any_network_call() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let bad = AuthorizedModel::new("alice", "not-a-real-key").unwrap();
    let model = VoteModel::new(&bad, "bob", "post", VoteType::Up).unwrap();
    let err = client.vote(&model).await.unwrap_err();

    assert_eq!(err, OperationError::WrongPostingKey);
    assert_eq!(err.kind(), ErrorKind::Key);
    assert_eq!(node.op_calls.load(Ordering::SeqCst), 0);
    assert_eq!(node.broadcast_count(), 0);
}

#[tokio::test]
async fn vote_broadcasts_mapped_weight() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model = VoteModel::new(&auth(), "bob", "post", VoteType::Up).unwrap();
    client.vote(&model).await.unwrap();

    let trx = node.last_trx();
    assert_eq!(trx["operations"][0][0], "vote");
    assert_eq!(trx["operations"][0][1]["weight"], 10_000);
    assert_eq!(trx["signatures"].as_array().unwrap().len(), 1);

    let model = VoteModel::new(&auth(), "bob", "post", VoteType::Flag).unwrap();
    client.vote(&model).await.unwrap();
    assert_eq!(node.last_trx()["operations"][0][1]["weight"], -10_000);
}

#[tokio::test]
async fn unfollow_rides_custom_json_with_empty_what() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model = FollowModel::new(&auth(), "bob", FollowType::UnFollow).unwrap();
    client.follow(&model).await.unwrap();

    let op = node.last_trx()["operations"][0].clone();
    assert_eq!(op[0], "custom_json");
    let inner: Value = serde_json::from_str(op[1]["json"].as_str().unwrap()).unwrap();
    assert_eq!(inner[0], "follow");
    assert_eq!(inner[1]["what"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn beneficiaries_ship_in_one_transaction_in_order() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model = CommentModel::post(
        &auth(),
        "My photo",
        "body",
        &["photo".into()],
        vec![Beneficiary {
            account: "steepshot".into(),
            weight: 1000,
        }],
    )
    .unwrap();
    client.create_or_edit(&model).await.unwrap();

    assert_eq!(node.broadcast_count(), 1, "exactly one transaction");
    let ops = node.last_trx()["operations"].as_array().unwrap().clone();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0][0], "comment");
    assert_eq!(ops[1][0], "comment_options");
    assert_eq!(ops[1][1]["max_accepted_payout"], "1000000.000 SBD");
    assert_eq!(ops[1][1]["extensions"][0][1]["beneficiaries"][0]["account"], "steepshot");
}

#[tokio::test]
async fn insufficient_balance_names_the_available_balance() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model =
        TransferModel::new("alice", VALID_WIF, "bob", "1.000", CurrencyType::Steem, "hi").unwrap();
    let err = client.transfer(&model).await.unwrap_err();

    assert_eq!(err, OperationError::InsufficientBalance("0.500 STEEM".into()));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(node.broadcast_count(), 0, "no transfer op was broadcast");
}

#[tokio::test]
async fn transfer_with_funds_broadcasts_scaled_asset() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model =
        TransferModel::new("alice", VALID_WIF, "bob", "2.5", CurrencyType::Sbd, "hi").unwrap();
    client.transfer(&model).await.unwrap();

    let op = node.last_trx()["operations"][0].clone();
    assert_eq!(op[0], "transfer");
    assert_eq!(op[1]["amount"], "2.500 SBD");
    assert_eq!(op[1]["to"], "bob");
}

#[tokio::test]
async fn missing_recipient_account_fails_before_transfer() {
    let node = StubNode::with_accounts(json!([{
        "name": "alice",
        "balance": "9.000 STEEM",
        "sbd_balance": "0.000 SBD",
        "json_metadata": "",
        "memo_key": "STM4tVTJCKDChjXcDN2namq7rXSFfXZGCBGaXHVbFiCrem8wsiu8r",
    }, null]));
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model =
        TransferModel::new("alice", VALID_WIF, "ghost", "1.0", CurrencyType::Steem, "").unwrap();
    let err = client.transfer(&model).await.unwrap_err();
    assert_eq!(err, OperationError::UnexpectedAccountData);
    assert_eq!(node.broadcast_count(), 0);
}

#[tokio::test]
async fn login_maps_missing_authority_to_wrong_key() {
    let node = StubNode::with_accounts(steem_accounts());
    *node.verify_error.lock().unwrap() = Some(RemoteError {
        code: 3_030_000,
        message: "missing required posting authority".into(),
        stack_formats: Vec::new(),
    });
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let err = client.login_with_posting_key(&auth()).await.unwrap_err();
    assert_eq!(err, OperationError::WrongKey);
}

#[tokio::test]
async fn broadcast_keeps_missing_authority_verbatim() {
    let node = StubNode::with_accounts(steem_accounts());
    *node.broadcast_error.lock().unwrap() = Some(RemoteError {
        code: 3_030_000,
        message: "missing required posting authority".into(),
        stack_formats: Vec::new(),
    });
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let model = VoteModel::new(&auth(), "bob", "post", VoteType::Up).unwrap();
    let err = client.vote(&model).await.unwrap_err();
    assert_eq!(
        err,
        OperationError::Rejected {
            code: 3_030_000,
            message: "missing required posting authority".into()
        }
    );
}

#[tokio::test]
async fn profile_update_merges_before_writing() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Steem,
        &Config::new(KnownChains::Steem, false),
        node.clone(),
    );

    let mut model = steepshot_core::models::UpdateProfileModel::new("alice", VALID_WIF).unwrap();
    model.about = Some("photographer".into());
    client.update_user_profile(&model).await.unwrap();

    let op = node.last_trx()["operations"][0].clone();
    assert_eq!(op[0], "account_update");
    let meta: Value = serde_json::from_str(op[1]["json_metadata"].as_str().unwrap()).unwrap();
    // merged, not overwritten
    assert_eq!(meta["profile"]["name"], "Alice");
    assert_eq!(meta["profile"]["about"], "photographer");
}

#[tokio::test]
async fn golos_client_speaks_the_legacy_call_envelope() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Golos,
        &Config::new(KnownChains::Golos, false),
        node.clone(),
    );

    let model = VoteModel::new(&auth(), "bob", "post", VoteType::Up).unwrap();
    client.vote(&model).await.unwrap();

    let log = node.log.lock().unwrap().clone();
    assert!(log.iter().all(|(method, _)| method == "call"));
    let broadcast = log
        .iter()
        .find(|(_, p)| p[1] == "broadcast_transaction_synchronous")
        .expect("a broadcast call");
    assert_eq!(broadcast.1[0], "network_broadcast_api");
}

#[tokio::test]
async fn golos_rejects_steem_currencies() {
    let node = StubNode::with_accounts(steem_accounts());
    let client = make_client(
        KnownChains::Golos,
        &Config::new(KnownChains::Golos, false),
        node.clone(),
    );

    let model =
        TransferModel::new("alice", VALID_WIF, "bob", "1.0", CurrencyType::Sbd, "").unwrap();
    let err = client.transfer(&model).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(node.broadcast_count(), 0);
}
