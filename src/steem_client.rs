//! Steem backend: appbase node speaking `condenser_api`.

use crate::broadcast::ApiStyle;
use crate::chains::KnownChains;
use crate::client::{ChainApiClient, ClientCore};
use crate::config::Config;
use crate::error::{OperationError, OperationResult};
use crate::models::{
    AuthorizedModel, CommentModel, CurrencyType, DeleteModel, FollowModel, TransferModel,
    UpdateProfileModel, UploadMediaModel, VoteModel,
};
use crate::operations::{self, Asset, ChainOp};
use crate::rpc::RpcTransport;
use crate::upload::UploadResponse;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct SteemClient {
    core: ClientCore,
}

impl SteemClient {
    pub fn new(config: &Config, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            core: ClientCore::new(KnownChains::Steem, ApiStyle::Condenser, config, transport),
        }
    }

    /// Liquid STEEM lives in `balance`, debt SBD in `sbd_balance`.
    fn balance_field(currency: CurrencyType) -> OperationResult<&'static str> {
        match currency {
            CurrencyType::Steem => Ok("balance"),
            CurrencyType::Sbd => Ok("sbd_balance"),
            other => Err(OperationError::Validation(format!(
                "Unsupported currency {other:?} on Steem"
            ))),
        }
    }
}

#[async_trait]
impl ChainApiClient for SteemClient {
    fn chain(&self) -> KnownChains {
        KnownChains::Steem
    }

    fn is_connected(&self) -> bool {
        self.core.broadcaster.is_connected()
    }

    async fn try_reconnect_chain(&self) -> bool {
        self.core.broadcaster.try_reconnect().await
    }

    async fn vote(&self, model: &VoteModel) -> OperationResult<()> {
        self.core.vote(model).await
    }

    async fn follow(&self, model: &FollowModel) -> OperationResult<()> {
        self.core.follow(model).await
    }

    async fn login_with_posting_key(&self, model: &AuthorizedModel) -> OperationResult<()> {
        self.core.login_with_posting_key(model).await
    }

    async fn create_or_edit(&self, model: &CommentModel) -> OperationResult<()> {
        self.core.create_or_edit(model).await
    }

    async fn delete(&self, model: &DeleteModel) -> OperationResult<()> {
        self.core.delete(model).await
    }

    async fn update_user_profile(&self, model: &UpdateProfileModel) -> OperationResult<()> {
        self.core.guard().await?;
        let keys = ClientCore::active_keys(&model.active_key)?;

        let accounts = self.core.lookup_accounts(&[&model.login]).await?;
        let account = &accounts[0];
        let memo_key = account["memo_key"]
            .as_str()
            .ok_or(OperationError::UnexpectedAccountData)?;
        let existing = account["json_metadata"].as_str().unwrap_or_default();

        let op = ChainOp::AccountUpdate {
            account: model.login.clone(),
            memo_key: memo_key.to_string(),
            json_metadata: operations::merge_profile_metadata(existing, model),
        };
        self.core.broadcaster.broadcast(&keys, vec![op]).await?;
        Ok(())
    }

    async fn transfer(&self, model: &TransferModel) -> OperationResult<()> {
        self.core.guard().await?;
        let keys = ClientCore::active_keys(&model.active_key)?;

        // both parties must exist before any transfer op is built
        let accounts = self
            .core
            .lookup_accounts(&[&model.login, &model.recipient])
            .await?;
        let sender = accounts
            .iter()
            .find(|a| a["name"] == json!(model.login))
            .ok_or(OperationError::UnexpectedAccountData)?;

        let field = Self::balance_field(model.currency)?;
        let balance = Asset::parse(
            sender[field]
                .as_str()
                .ok_or(OperationError::UnexpectedAccountData)?,
        )?;
        let amount = Asset::from_decimal(&model.amount, balance.precision, &balance.symbol)?;
        if balance.amount < amount.amount {
            return Err(OperationError::InsufficientBalance(balance.to_string()));
        }

        let op = ChainOp::Transfer {
            from: model.login.clone(),
            to: model.recipient.clone(),
            amount,
            memo: model.memo.clone(),
        };
        self.core.broadcaster.broadcast(&keys, vec![op]).await?;
        Ok(())
    }

    async fn upload(&self, model: &UploadMediaModel) -> OperationResult<UploadResponse> {
        self.core.upload(model).await
    }

    async fn get_verify_transaction(&self, model: &AuthorizedModel) -> OperationResult<Value> {
        self.core.get_verify_transaction(model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steem_currencies_only() {
        assert_eq!(SteemClient::balance_field(CurrencyType::Steem).unwrap(), "balance");
        assert_eq!(SteemClient::balance_field(CurrencyType::Sbd).unwrap(), "sbd_balance");
        assert!(SteemClient::balance_field(CurrencyType::Golos).is_err());
        assert!(SteemClient::balance_field(CurrencyType::Gbg).is_err());
    }
}
