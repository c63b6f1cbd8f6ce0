//! Media upload against the Steepshot backend.
//!
//! The backend wants proof that the uploader controls the posting key, so a
//! signed (but never broadcast) transaction rides along with the image. The
//! response carries the rendered post body and metadata that the caller then
//! broadcasts as a comment operation.

use crate::error::{OperationError, OperationResult};
use crate::models::UploadMediaModel;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const UPLOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct UploadRequest<'a> {
    username: &'a str,
    title: &'a str,
    tags: &'a [String],
    /// Signed verify-only transaction, authority proof.
    trx: Value,
    /// Image bytes, base64.
    file: String,
}

/// What the backend hands back for a prepared post.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadResponse {
    pub body: String,
    #[serde(default)]
    pub meta: Value,
}

#[derive(Deserialize)]
struct UploadError {
    error: String,
}

pub struct SteepshotBackend {
    base_url: String,
    http: reqwest::Client,
}

impl SteepshotBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
                .build()
                .expect("reqwest client"),
        }
    }

    /// Push the media and its authority proof; returns the prepared post.
    pub async fn upload_media(
        &self,
        model: &UploadMediaModel,
        proof_trx: Value,
    ) -> OperationResult<UploadResponse> {
        let request = UploadRequest {
            username: &model.login,
            title: &model.title,
            tags: &model.tags,
            trx: proof_trx,
            file: general_purpose::STANDARD.encode(&model.media),
        };

        let url = format!("{}/media/upload", self.base_url);
        log::debug!("upload -> {url} ({} bytes)", model.media.len());

        let res = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        if res.status().is_success() {
            return res.json().await.map_err(map_reqwest_err);
        }

        // the backend explains rejections in a JSON error body
        match res.json::<UploadError>().await {
            Ok(e) => Err(OperationError::Validation(e.error)),
            Err(_) => Err(OperationError::ServerError),
        }
    }
}

fn map_reqwest_err(e: reqwest::Error) -> OperationError {
    if e.is_connect() {
        OperationError::ConnectionTimeout
    } else if e.is_timeout() {
        OperationError::ResponseTimeout
    } else {
        OperationError::ServerError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let backend = SteepshotBackend::new("https://steepshot.org/api/v1/");
        assert_eq!(backend.base_url, "https://steepshot.org/api/v1");
    }

    #[test]
    fn upload_response_tolerates_missing_meta() {
        let r: UploadResponse = serde_json::from_str(r#"{"body": "![img](url)"}"#).unwrap();
        assert_eq!(r.body, "![img](url)");
        assert!(r.meta.is_null());
    }
}
