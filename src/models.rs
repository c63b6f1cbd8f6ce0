//! Request models for every public operation.
//!
//! Models are immutable value objects, validated at construction: a bad
//! shape comes back as `Err(Validation)` immediately, before any key
//! decoding or network work happens on its behalf.

use crate::error::{OperationError, OperationResult};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteType {
    Up,
    Down,
    Flag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowType {
    Follow,
    UnFollow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurrencyType {
    Steem,
    Sbd,
    Golos,
    Gbg,
}

fn require(field: &str, value: &str) -> OperationResult<()> {
    if value.trim().is_empty() {
        return Err(OperationError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Login + posting key, the minimal authorized request.
#[derive(Clone, Debug)]
pub struct AuthorizedModel {
    pub login: String,
    pub posting_key: String,
}

impl AuthorizedModel {
    pub fn new(login: &str, posting_key: &str) -> OperationResult<Self> {
        require("Login", login)?;
        require("Posting key", posting_key)?;
        Ok(Self {
            login: login.trim().to_string(),
            posting_key: posting_key.trim().to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct VoteModel {
    pub login: String,
    pub posting_key: String,
    pub author: String,
    pub permlink: String,
    pub vote_type: VoteType,
}

impl VoteModel {
    pub fn new(
        auth: &AuthorizedModel,
        author: &str,
        permlink: &str,
        vote_type: VoteType,
    ) -> OperationResult<Self> {
        require("Author", author)?;
        require("Permlink", permlink)?;
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            author: author.to_string(),
            permlink: permlink.to_string(),
            vote_type,
        })
    }
}

#[derive(Clone, Debug)]
pub struct FollowModel {
    pub login: String,
    pub posting_key: String,
    pub username: String,
    pub follow_type: FollowType,
}

impl FollowModel {
    pub fn new(
        auth: &AuthorizedModel,
        username: &str,
        follow_type: FollowType,
    ) -> OperationResult<Self> {
        require("Username", username)?;
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            username: username.to_string(),
            follow_type,
        })
    }
}

/// One beneficiary split, weight in basis points of the payout.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Beneficiary {
    pub account: String,
    pub weight: u16,
}

#[derive(Clone, Debug)]
pub struct CommentModel {
    pub login: String,
    pub posting_key: String,
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub beneficiaries: Vec<Beneficiary>,
}

impl CommentModel {
    /// A reply to an existing post. Parent fields point at the post being
    /// answered; the permlink is generated.
    pub fn reply(
        auth: &AuthorizedModel,
        parent_author: &str,
        parent_permlink: &str,
        body: &str,
    ) -> OperationResult<Self> {
        require("Parent author", parent_author)?;
        require("Parent permlink", parent_permlink)?;
        require("Body", body)?;
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            parent_author: parent_author.to_string(),
            parent_permlink: parent_permlink.to_string(),
            author: auth.login.clone(),
            permlink: generate_permlink(&format!("re-{parent_permlink}")),
            title: String::new(),
            body: body.to_string(),
            tags: Vec::new(),
            beneficiaries: Vec::new(),
        })
    }

    /// A new top-level post. Parent author is empty, parent permlink is the
    /// first tag (category).
    pub fn post(
        auth: &AuthorizedModel,
        title: &str,
        body: &str,
        tags: &[String],
        beneficiaries: Vec<Beneficiary>,
    ) -> OperationResult<Self> {
        require("Title", title)?;
        require("Body", body)?;
        let tags = prepare_tags(tags);
        if tags.is_empty() {
            return Err(OperationError::Validation("At least one tag is required".into()));
        }
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            parent_author: String::new(),
            parent_permlink: tags[0].clone(),
            author: auth.login.clone(),
            permlink: generate_permlink(title),
            title: title.to_string(),
            body: body.to_string(),
            tags,
            beneficiaries,
        })
    }

    /// Edit of an existing post/comment: same permlink, new content.
    pub fn edit(
        auth: &AuthorizedModel,
        parent_author: &str,
        parent_permlink: &str,
        permlink: &str,
        title: &str,
        body: &str,
        tags: &[String],
    ) -> OperationResult<Self> {
        require("Permlink", permlink)?;
        require("Body", body)?;
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            parent_author: parent_author.to_string(),
            parent_permlink: parent_permlink.to_string(),
            author: auth.login.clone(),
            permlink: permlink.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            tags: prepare_tags(tags),
            beneficiaries: Vec::new(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct DeleteModel {
    pub login: String,
    pub posting_key: String,
    pub author: String,
    pub permlink: String,
}

impl DeleteModel {
    pub fn new(auth: &AuthorizedModel, author: &str, permlink: &str) -> OperationResult<Self> {
        require("Author", author)?;
        require("Permlink", permlink)?;
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            author: author.to_string(),
            permlink: permlink.to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct TransferModel {
    pub login: String,
    pub active_key: String,
    pub recipient: String,
    /// Decimal amount as entered, e.g. "1.250". Scaled against the chain's
    /// asset precision at encode time.
    pub amount: String,
    pub currency: CurrencyType,
    pub memo: String,
}

impl TransferModel {
    pub fn new(
        login: &str,
        active_key: &str,
        recipient: &str,
        amount: &str,
        currency: CurrencyType,
        memo: &str,
    ) -> OperationResult<Self> {
        require("Login", login)?;
        require("Active key", active_key)?;
        require("Recipient", recipient)?;
        let amount = amount.trim();
        if amount.is_empty() || amount.parse::<f64>().map(|v| v <= 0.0).unwrap_or(true) {
            return Err(OperationError::Validation("Amount must be a positive number".into()));
        }
        Ok(Self {
            login: login.trim().to_string(),
            active_key: active_key.trim().to_string(),
            recipient: recipient.trim().to_string(),
            amount: amount.to_string(),
            currency,
            memo: memo.to_string(),
        })
    }
}

/// Profile fields to merge into the on-chain metadata blob. `None` keeps the
/// current value.
#[derive(Clone, Debug, Default)]
pub struct UpdateProfileModel {
    pub login: String,
    pub active_key: String,
    pub name: Option<String>,
    pub about: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub profile_image: Option<String>,
}

impl UpdateProfileModel {
    pub fn new(login: &str, active_key: &str) -> OperationResult<Self> {
        require("Login", login)?;
        require("Active key", active_key)?;
        Ok(Self {
            login: login.trim().to_string(),
            active_key: active_key.trim().to_string(),
            ..Default::default()
        })
    }
}

#[derive(Clone, Debug)]
pub struct UploadMediaModel {
    pub login: String,
    pub posting_key: String,
    pub title: String,
    pub tags: Vec<String>,
    pub media: Vec<u8>,
}

impl UploadMediaModel {
    pub fn new(
        auth: &AuthorizedModel,
        title: &str,
        tags: &[String],
        media: Vec<u8>,
    ) -> OperationResult<Self> {
        require("Title", title)?;
        if media.is_empty() {
            return Err(OperationError::Validation("Media is empty".into()));
        }
        Ok(Self {
            login: auth.login.clone(),
            posting_key: auth.posting_key.clone(),
            title: title.to_string(),
            tags: prepare_tags(tags),
            media,
        })
    }
}

/// Normalize user-entered tags: lowercase, trimmed, deduplicated, empty
/// entries dropped.
pub fn prepare_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let t = tag.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// Build a chain-unique permlink from a title: slug + UTC stamp + random tail.
pub fn generate_permlink(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let slug = slug.trim_matches('-');
    let stamp = Utc::now().format("%Y%m%dt%H%M%S");
    let tail: String = rand::thread_rng()
        .sample_iter(rand::distributions::Uniform::new_inclusive(b'a', b'z'))
        .take(4)
        .map(char::from)
        .collect();
    if slug.is_empty() {
        format!("{stamp}-{tail}")
    } else {
        format!("{slug}-{stamp}-{tail}")
    }
}
