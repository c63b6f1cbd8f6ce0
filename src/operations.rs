//! Chain operation encoding.
//!
//! Request models become [`ChainOp`] values here; the JSON wire form follows
//! the condenser convention of `[name, params]` tagged arrays. Follow and
//! unfollow are distinct encoder outputs even though both ride the follow
//! plugin's `custom_json` channel: an unfollow is never represented as a
//! follow with an empty target list.

use crate::chains::ChainSpec;
use crate::error::{OperationError, OperationResult};
use crate::models::{Beneficiary, CommentModel, FollowModel, FollowType, VoteModel, VoteType};
use serde_json::{json, Value};

/// App identifier embedded in post/comment metadata.
pub const APP_ID: &str = concat!("steepshot/", env!("CARGO_PKG_VERSION"));

/// Follow target the login ping uses to verify authority without touching
/// chain state.
pub const PING_ACCOUNT: &str = "steepshot";

const MAX_ACCEPTED_PAYOUT: i64 = 1_000_000_000; // 1000000.000 at precision 3
const FULL_WEIGHT: i16 = 10_000;

/// A money amount at a fixed precision, e.g. `1.250 STEEM`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    /// Scaled integer amount (`1.250` at precision 3 is `1250`).
    pub amount: i64,
    pub precision: u8,
    pub symbol: String,
}

impl Asset {
    pub fn new(amount: i64, precision: u8, symbol: &str) -> Self {
        Self {
            amount,
            precision,
            symbol: symbol.to_string(),
        }
    }

    /// Parse the chain's string form, `"1.250 STEEM"`.
    pub fn parse(s: &str) -> OperationResult<Self> {
        let mut parts = s.split_whitespace();
        let (Some(num), Some(symbol), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(OperationError::Validation(format!("Malformed asset '{s}'")));
        };
        let precision = num.split('.').nth(1).map(|f| f.len() as u8).unwrap_or(0);
        let amount = num
            .replace('.', "")
            .parse::<i64>()
            .map_err(|_| OperationError::Validation(format!("Malformed asset '{s}'")))?;
        Ok(Self::new(amount, precision, symbol))
    }

    /// Scale a user-entered decimal string to this chain's precision.
    pub fn from_decimal(decimal: &str, precision: u8, symbol: &str) -> OperationResult<Self> {
        let mut parts = decimal.splitn(2, '.');
        let whole = parts.next().unwrap_or("0");
        let frac = parts.next().unwrap_or("");
        if frac.len() > precision as usize {
            return Err(OperationError::Validation(format!(
                "At most {precision} decimal places are supported"
            )));
        }
        let mut frac = frac.to_string();
        while frac.len() < precision as usize {
            frac.push('0');
        }
        let amount = format!("{whole}{frac}")
            .parse::<i64>()
            .map_err(|_| OperationError::Validation(format!("Malformed amount '{decimal}'")))?;
        Ok(Self::new(amount, precision, symbol))
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scale = 10i64.pow(self.precision as u32);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / scale as u64,
            abs % scale as u64,
            self.symbol,
            width = self.precision as usize
        )
    }
}

/// One encoded chain operation, ready for JSON or binary serialization.
#[derive(Clone, Debug, PartialEq)]
pub enum ChainOp {
    Vote {
        voter: String,
        author: String,
        permlink: String,
        weight: i16,
    },
    Comment {
        parent_author: String,
        parent_permlink: String,
        author: String,
        permlink: String,
        title: String,
        body: String,
        json_metadata: String,
    },
    /// Payout terms for a comment; carries the beneficiary splits.
    CommentOptions {
        author: String,
        permlink: String,
        max_accepted_payout: Asset,
        percent_steem_dollars: u16,
        allow_votes: bool,
        allow_curation_rewards: bool,
        beneficiaries: Vec<Beneficiary>,
    },
    Follow {
        follower: String,
        following: String,
        /// Target lists, `["blog"]` for a plain follow.
        what: Vec<String>,
    },
    Unfollow {
        follower: String,
        following: String,
    },
    DeleteComment {
        author: String,
        permlink: String,
    },
    Transfer {
        from: String,
        to: String,
        amount: Asset,
        memo: String,
    },
    AccountUpdate {
        account: String,
        memo_key: String,
        json_metadata: String,
    },
}

impl ChainOp {
    /// Graphene operation id, shared by Steem and Golos.
    pub fn op_id(&self) -> u8 {
        match self {
            ChainOp::Vote { .. } => 0,
            ChainOp::Comment { .. } => 1,
            ChainOp::Transfer { .. } => 2,
            ChainOp::AccountUpdate { .. } => 10,
            ChainOp::DeleteComment { .. } => 17,
            ChainOp::Follow { .. } | ChainOp::Unfollow { .. } => 18, // custom_json
            ChainOp::CommentOptions { .. } => 19,
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            ChainOp::Vote { .. } => "vote",
            ChainOp::Comment { .. } => "comment",
            ChainOp::Transfer { .. } => "transfer",
            ChainOp::AccountUpdate { .. } => "account_update",
            ChainOp::DeleteComment { .. } => "delete_comment",
            ChainOp::Follow { .. } | ChainOp::Unfollow { .. } => "custom_json",
            ChainOp::CommentOptions { .. } => "comment_options",
        }
    }

    /// Follow-plugin payload carried inside the `custom_json` envelope.
    fn follow_plugin_json(&self) -> Option<(String, String)> {
        match self {
            ChainOp::Follow {
                follower,
                following,
                what,
            } => Some((
                follower.clone(),
                json!(["follow", {"follower": follower, "following": following, "what": what}])
                    .to_string(),
            )),
            ChainOp::Unfollow {
                follower,
                following,
            } => Some((
                follower.clone(),
                json!(["follow", {"follower": follower, "following": following, "what": []}])
                    .to_string(),
            )),
            _ => None,
        }
    }

    /// The `[name, params]` tagged-array wire form.
    pub fn to_json(&self) -> Value {
        let params = match self {
            ChainOp::Vote {
                voter,
                author,
                permlink,
                weight,
            } => json!({
                "voter": voter,
                "author": author,
                "permlink": permlink,
                "weight": weight,
            }),
            ChainOp::Comment {
                parent_author,
                parent_permlink,
                author,
                permlink,
                title,
                body,
                json_metadata,
            } => json!({
                "parent_author": parent_author,
                "parent_permlink": parent_permlink,
                "author": author,
                "permlink": permlink,
                "title": title,
                "body": body,
                "json_metadata": json_metadata,
            }),
            ChainOp::CommentOptions {
                author,
                permlink,
                max_accepted_payout,
                percent_steem_dollars,
                allow_votes,
                allow_curation_rewards,
                beneficiaries,
            } => json!({
                "author": author,
                "permlink": permlink,
                "max_accepted_payout": max_accepted_payout.to_string(),
                "percent_steem_dollars": percent_steem_dollars,
                "allow_votes": allow_votes,
                "allow_curation_rewards": allow_curation_rewards,
                "extensions": [[0, {"beneficiaries": beneficiaries}]],
            }),
            ChainOp::Follow { .. } | ChainOp::Unfollow { .. } => {
                let (poster, payload) = self.follow_plugin_json().expect("follow variant");
                json!({
                    "required_auths": [],
                    "required_posting_auths": [poster],
                    "id": "follow",
                    "json": payload,
                })
            }
            ChainOp::DeleteComment { author, permlink } => json!({
                "author": author,
                "permlink": permlink,
            }),
            ChainOp::Transfer {
                from,
                to,
                amount,
                memo,
            } => json!({
                "from": from,
                "to": to,
                "amount": amount.to_string(),
                "memo": memo,
            }),
            ChainOp::AccountUpdate {
                account,
                memo_key,
                json_metadata,
            } => json!({
                "account": account,
                "memo_key": memo_key,
                "json_metadata": json_metadata,
            }),
        };
        json!([self.wire_name(), params])
    }
}

/// Tri-state vote intent to signed weight.
pub fn vote_weight(vote_type: VoteType) -> i16 {
    match vote_type {
        VoteType::Up => FULL_WEIGHT,
        VoteType::Flag => -FULL_WEIGHT,
        VoteType::Down => 0,
    }
}

pub fn encode_vote(model: &VoteModel) -> ChainOp {
    ChainOp::Vote {
        voter: model.login.clone(),
        author: model.author.clone(),
        permlink: model.permlink.clone(),
        weight: vote_weight(model.vote_type),
    }
}

pub fn encode_follow(model: &FollowModel) -> ChainOp {
    match model.follow_type {
        FollowType::Follow => ChainOp::Follow {
            follower: model.login.clone(),
            following: model.username.clone(),
            what: vec!["blog".to_string()],
        },
        FollowType::UnFollow => ChainOp::Unfollow {
            follower: model.login.clone(),
            following: model.username.clone(),
        },
    }
}

/// The authority-check op used by login: a follow of the app account, signed
/// and verified but never broadcast.
pub fn login_ping_op(login: &str) -> ChainOp {
    ChainOp::Follow {
        follower: login.to_string(),
        following: PING_ACCOUNT.to_string(),
        what: vec!["blog".to_string()],
    }
}

/// Comment plus, when beneficiaries are present, the chain-specific payout
/// terms, in that order, for one atomic transaction.
pub fn encode_comment(model: &CommentModel, spec: &ChainSpec) -> Vec<ChainOp> {
    let metadata = json!({"app": APP_ID, "tags": model.tags}).to_string();
    let comment = ChainOp::Comment {
        parent_author: model.parent_author.clone(),
        parent_permlink: model.parent_permlink.clone(),
        author: model.author.clone(),
        permlink: model.permlink.clone(),
        title: model.title.clone(),
        body: model.body.clone(),
        json_metadata: metadata,
    };
    if model.beneficiaries.is_empty() {
        return vec![comment];
    }
    let options = ChainOp::CommentOptions {
        author: model.author.clone(),
        permlink: model.permlink.clone(),
        max_accepted_payout: Asset::new(MAX_ACCEPTED_PAYOUT, 3, spec.debt_symbol),
        percent_steem_dollars: 10_000,
        allow_votes: true,
        allow_curation_rewards: true,
        beneficiaries: model.beneficiaries.clone(),
    };
    vec![comment, options]
}

/// Merge new profile fields into an existing on-chain metadata blob.
///
/// Merge-then-write: unknown top-level keys and untouched profile fields
/// survive, only the fields the model sets are replaced.
pub fn merge_profile_metadata(
    existing: &str,
    model: &crate::models::UpdateProfileModel,
) -> String {
    let mut root = match serde_json::from_str::<Value>(existing) {
        Ok(Value::Object(m)) => m,
        _ => serde_json::Map::new(),
    };
    let mut profile = match root.remove("profile") {
        Some(Value::Object(m)) => m,
        _ => serde_json::Map::new(),
    };
    let fields = [
        ("name", &model.name),
        ("about", &model.about),
        ("location", &model.location),
        ("website", &model.website),
        ("profile_image", &model.profile_image),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            profile.insert(key.to_string(), json!(v));
        }
    }
    root.insert("profile".to_string(), Value::Object(profile));
    Value::Object(root).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{ChainSpec, KnownChains};
    use crate::models::AuthorizedModel;

    fn auth() -> AuthorizedModel {
        AuthorizedModel::new("alice", "5Key").unwrap()
    }

    #[test]
    fn vote_weight_mapping() {
        assert_eq!(vote_weight(VoteType::Up), 10_000);
        assert_eq!(vote_weight(VoteType::Flag), -10_000);
        assert_eq!(vote_weight(VoteType::Down), 0);
    }

    #[test]
    fn unfollow_is_never_a_follow_with_empty_list() {
        let model = FollowModel::new(&auth(), "bob", FollowType::UnFollow).unwrap();
        let op = encode_follow(&model);
        assert!(matches!(op, ChainOp::Unfollow { .. }));

        let model = FollowModel::new(&auth(), "bob", FollowType::Follow).unwrap();
        match encode_follow(&model) {
            ChainOp::Follow { what, .. } => assert_eq!(what, vec!["blog".to_string()]),
            other => panic!("expected follow, got {other:?}"),
        }
    }

    #[test]
    fn follow_wire_form_is_custom_json() {
        let model = FollowModel::new(&auth(), "bob", FollowType::Follow).unwrap();
        let wire = encode_follow(&model).to_json();
        assert_eq!(wire[0], "custom_json");
        assert_eq!(wire[1]["id"], "follow");
        assert_eq!(wire[1]["required_posting_auths"][0], "alice");
        let inner: serde_json::Value =
            serde_json::from_str(wire[1]["json"].as_str().unwrap()).unwrap();
        assert_eq!(inner[1]["what"][0], "blog");
    }

    #[test]
    fn beneficiaries_append_chain_specific_options() {
        let model = CommentModel::post(
            &auth(),
            "Title",
            "body",
            &["life".into()],
            vec![Beneficiary {
                account: "steepshot".into(),
                weight: 1000,
            }],
        )
        .unwrap();

        let steem = encode_comment(&model, &ChainSpec::for_chain(KnownChains::Steem));
        assert_eq!(steem.len(), 2);
        assert!(matches!(steem[0], ChainOp::Comment { .. }));
        match &steem[1] {
            ChainOp::CommentOptions {
                max_accepted_payout,
                beneficiaries,
                ..
            } => {
                assert_eq!(max_accepted_payout.symbol, "SBD");
                assert_eq!(beneficiaries.len(), 1);
            }
            other => panic!("expected comment_options, got {other:?}"),
        }

        let golos = encode_comment(&model, &ChainSpec::for_chain(KnownChains::Golos));
        match &golos[1] {
            ChainOp::CommentOptions {
                max_accepted_payout, ..
            } => assert_eq!(max_accepted_payout.symbol, "GBG"),
            other => panic!("expected comment_options, got {other:?}"),
        }
    }

    #[test]
    fn comment_metadata_carries_app_id() {
        let model = CommentModel::post(&auth(), "T", "b", &["life".into()], Vec::new()).unwrap();
        let ops = encode_comment(&model, &ChainSpec::for_chain(KnownChains::Steem));
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            ChainOp::Comment { json_metadata, .. } => {
                let meta: serde_json::Value = serde_json::from_str(json_metadata).unwrap();
                assert_eq!(meta["app"], APP_ID);
                assert_eq!(meta["tags"][0], "life");
            }
            other => panic!("expected comment, got {other:?}"),
        }
    }

    #[test]
    fn profile_merge_keeps_unrelated_fields() {
        let mut model = crate::models::UpdateProfileModel::new("alice", "5Key").unwrap();
        model.about = Some("new about".into());

        let existing = r#"{"profile":{"name":"Alice","about":"old"},"extra":{"k":1}}"#;
        let merged: serde_json::Value =
            serde_json::from_str(&merge_profile_metadata(existing, &model)).unwrap();
        assert_eq!(merged["profile"]["about"], "new about");
        assert_eq!(merged["profile"]["name"], "Alice");
        assert_eq!(merged["extra"]["k"], 1);
    }

    #[test]
    fn profile_merge_survives_malformed_metadata() {
        let mut model = crate::models::UpdateProfileModel::new("alice", "5Key").unwrap();
        model.name = Some("Alice".into());
        let merged: serde_json::Value =
            serde_json::from_str(&merge_profile_metadata("not json", &model)).unwrap();
        assert_eq!(merged["profile"]["name"], "Alice");
    }

    #[test]
    fn asset_round_trips() {
        let a = Asset::parse("1.250 STEEM").unwrap();
        assert_eq!(a.amount, 1250);
        assert_eq!(a.precision, 3);
        assert_eq!(a.to_string(), "1.250 STEEM");

        let b = Asset::from_decimal("0.5", 3, "GBG").unwrap();
        assert_eq!(b.amount, 500);
        assert_eq!(b.to_string(), "0.500 GBG");

        assert!(Asset::parse("garbage").is_err());
        assert!(Asset::from_decimal("1.2345", 3, "SBD").is_err());
    }
}
