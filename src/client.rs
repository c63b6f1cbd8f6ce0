//! The public chain client contract and the shared operation pipeline.
//!
//! Every operation walks the same states: reconnect guard → key decode →
//! encode → broadcast → classify. A failed step short-circuits; nothing is
//! ever partially broadcast after a validation failure. The two chain
//! backends delegate the chain-agnostic part to [`ClientCore`] and keep the
//! genuinely chain-specific operations (transfer currencies, profile
//! metadata) to themselves.

use crate::broadcast::{Api, ApiStyle, TransactionBroadcaster};
use crate::chains::{backend_url, ChainSpec, KnownChains};
use crate::config::Config;
use crate::error::{OperationError, OperationResult, RequestKind};
use crate::keys;
use crate::models::{
    AuthorizedModel, CommentModel, DeleteModel, FollowModel, TransferModel, UpdateProfileModel,
    UploadMediaModel, VoteModel,
};
use crate::operations::{self, ChainOp};
use crate::rpc::RpcTransport;
use crate::upload::{SteepshotBackend, UploadResponse};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Uniform surface of one chain backend.
#[async_trait]
pub trait ChainApiClient: Send + Sync {
    fn chain(&self) -> KnownChains;
    fn is_connected(&self) -> bool;
    /// Idempotent connection attempt against the configured node list.
    async fn try_reconnect_chain(&self) -> bool;

    async fn vote(&self, model: &VoteModel) -> OperationResult<()>;
    async fn follow(&self, model: &FollowModel) -> OperationResult<()>;
    async fn login_with_posting_key(&self, model: &AuthorizedModel) -> OperationResult<()>;
    async fn create_or_edit(&self, model: &CommentModel) -> OperationResult<()>;
    async fn delete(&self, model: &DeleteModel) -> OperationResult<()>;
    async fn update_user_profile(&self, model: &UpdateProfileModel) -> OperationResult<()>;
    async fn transfer(&self, model: &TransferModel) -> OperationResult<()>;
    async fn upload(&self, model: &UploadMediaModel) -> OperationResult<UploadResponse>;
    /// Signed verify-only transaction, used as an authority proof.
    async fn get_verify_transaction(&self, model: &AuthorizedModel) -> OperationResult<Value>;
}

/// Build the client for a chain. The dispatch point the presenter goes
/// through on every chain switch.
pub fn make_client(
    chain: KnownChains,
    config: &Config,
    transport: Arc<dyn RpcTransport>,
) -> Arc<dyn ChainApiClient> {
    match chain {
        KnownChains::Steem => Arc::new(crate::steem_client::SteemClient::new(config, transport)),
        KnownChains::Golos => Arc::new(crate::golos_client::GolosClient::new(config, transport)),
    }
}

/// Chain-agnostic pipeline shared by both backends.
pub(crate) struct ClientCore {
    pub broadcaster: TransactionBroadcaster,
    pub backend: SteepshotBackend,
}

impl ClientCore {
    pub fn new(
        chain: KnownChains,
        style: ApiStyle,
        config: &Config,
        transport: Arc<dyn RpcTransport>,
    ) -> Self {
        let spec = ChainSpec::for_chain(chain);
        Self {
            broadcaster: TransactionBroadcaster::new(
                spec,
                style,
                config.node_configs(chain),
                transport,
            ),
            backend: SteepshotBackend::new(backend_url(chain, config.is_dev)),
        }
    }

    /// Reconnect guard every operation enters through.
    pub(crate) async fn guard(&self) -> OperationResult<()> {
        if self.broadcaster.try_reconnect().await {
            Ok(())
        } else {
            Err(OperationError::BlockchainUnavailable)
        }
    }

    fn posting_keys(wif: &str) -> OperationResult<Vec<[u8; 32]>> {
        keys::to_key_arr(&[wif]).ok_or(OperationError::WrongPostingKey)
    }

    pub fn active_keys(wif: &str) -> OperationResult<Vec<[u8; 32]>> {
        keys::to_key_arr(&[wif]).ok_or(OperationError::WrongActiveKey)
    }

    pub async fn vote(&self, model: &VoteModel) -> OperationResult<()> {
        self.guard().await?;
        let keys = Self::posting_keys(&model.posting_key)?;
        let op = operations::encode_vote(model);
        self.broadcaster.broadcast(&keys, vec![op]).await?;
        Ok(())
    }

    pub async fn follow(&self, model: &FollowModel) -> OperationResult<()> {
        self.guard().await?;
        let keys = Self::posting_keys(&model.posting_key)?;
        let op = operations::encode_follow(model);
        self.broadcaster.broadcast(&keys, vec![op]).await?;
        Ok(())
    }

    pub async fn login_with_posting_key(&self, model: &AuthorizedModel) -> OperationResult<()> {
        self.guard().await?;
        // login surfaces a plain "wrong private key", not the posting-specific one
        let keys = keys::to_key_arr(&[model.posting_key.as_str()])
            .ok_or(OperationError::WrongKey)?;
        let op = operations::login_ping_op(&model.login);
        self.broadcaster.verify_authority(&keys, vec![op]).await?;
        Ok(())
    }

    pub async fn create_or_edit(&self, model: &CommentModel) -> OperationResult<()> {
        self.guard().await?;
        let keys = Self::posting_keys(&model.posting_key)?;
        let ops = operations::encode_comment(model, self.broadcaster.spec());
        self.broadcaster.broadcast(&keys, ops).await?;
        Ok(())
    }

    pub async fn delete(&self, model: &DeleteModel) -> OperationResult<()> {
        self.guard().await?;
        let keys = Self::posting_keys(&model.posting_key)?;
        let op = ChainOp::DeleteComment {
            author: model.author.clone(),
            permlink: model.permlink.clone(),
        };
        self.broadcaster.broadcast(&keys, vec![op]).await?;
        Ok(())
    }

    pub async fn get_verify_transaction(&self, model: &AuthorizedModel) -> OperationResult<Value> {
        self.guard().await?;
        let keys = Self::posting_keys(&model.posting_key)?;
        let op = operations::login_ping_op(&model.login);
        let trx = self.broadcaster.signed_transaction(&keys, vec![op]).await?;
        Ok(trx.to_json())
    }

    pub async fn upload(&self, model: &UploadMediaModel) -> OperationResult<UploadResponse> {
        self.guard().await?;
        let keys = Self::posting_keys(&model.posting_key)?;

        // authority proof for the backend, never broadcast
        let ping = operations::login_ping_op(&model.login);
        let proof = self.broadcaster.signed_transaction(&keys, vec![ping]).await?;

        let prepared = self.backend.upload_media(model, proof.to_json()).await?;

        let metadata = if prepared.meta.is_null() {
            json!({"app": operations::APP_ID, "tags": model.tags}).to_string()
        } else {
            prepared.meta.to_string()
        };
        let post = ChainOp::Comment {
            parent_author: String::new(),
            parent_permlink: operations::PING_ACCOUNT.to_string(),
            author: model.login.clone(),
            permlink: crate::models::generate_permlink(&model.title),
            title: model.title.clone(),
            body: prepared.body.clone(),
            json_metadata: metadata,
        };
        self.broadcaster.broadcast(&keys, vec![post]).await?;
        Ok(prepared)
    }

    /// Account lookup used by the financial operations.
    pub async fn lookup_accounts(&self, names: &[&str]) -> OperationResult<Vec<Value>> {
        let result = self
            .broadcaster
            .call(
                Api::Database,
                "get_accounts",
                json!([names]),
                RequestKind::Broadcast,
            )
            .await?;
        let accounts: Vec<Value> = result
            .as_array()
            .cloned()
            .ok_or(OperationError::UnexpectedAccountData)?;
        if accounts.len() != names.len() || accounts.iter().any(Value::is_null) {
            return Err(OperationError::UnexpectedAccountData);
        }
        Ok(accounts)
    }
}
