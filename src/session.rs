//! Persisted user session.
//!
//! Key material is held only for the lifetime of the session object; the
//! store trait is the seam the platform layer implements. The JSON file
//! store ships for the CLI, one file per user under a dotdir.

use crate::chains::KnownChains;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub login: String,
    pub chain: KnownChains,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_key: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl UserInfo {
    pub fn new(login: &str, chain: KnownChains) -> Self {
        Self {
            login: login.to_string(),
            chain,
            posting_key: None,
            active_key: None,
            is_authenticated: false,
        }
    }
}

/// Load/save seam for the persisted session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Option<UserInfo>;
    async fn save(&self, user: &UserInfo) -> bool;
    async fn clear(&self) -> bool;
}

/// JSON file store used by the CLI.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Option<UserInfo> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                log::warn!("ignoring malformed session file {}: {e}", self.path.display());
                None
            }
        }
    }

    async fn save(&self, user: &UserInfo) -> bool {
        if let Some(parent) = self.path.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                return false;
            }
        }
        let raw = match serde_json::to_string_pretty(user) {
            Ok(raw) => raw,
            Err(_) => return false,
        };
        tokio::fs::write(&self.path, raw).await.is_ok()
    }

    async fn clear(&self) -> bool {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserInfo {
        UserInfo {
            login: "alice".into(),
            chain: KnownChains::Golos,
            posting_key: Some("5Key".into()),
            active_key: None,
            is_authenticated: true,
        }
    }

    #[tokio::test]
    async fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().await.is_none());
        assert!(store.save(&user()).await);
        assert_eq!(store.load().await, Some(user()));
        assert!(store.clear().await);
        assert!(store.load().await.is_none());
        // clearing an absent session is fine
        assert!(store.clear().await);
    }

    #[tokio::test]
    async fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{broken").await.unwrap();
        let store = FileSessionStore::new(path);
        assert!(store.load().await.is_none());
    }

    #[test]
    fn keys_are_omitted_when_absent() {
        let mut u = user();
        u.posting_key = None;
        let raw = serde_json::to_string(&u).unwrap();
        assert!(!raw.contains("posting_key"));
        assert!(!raw.contains("active_key"));
    }
}
