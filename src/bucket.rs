//! Object storage for product images.
//!
//! Uploads go to a Supabase Storage bucket over its REST API. Objects are
//! never overwritten (`x-upsert: false`) and are addressed by the public URL
//! returned from [`ImageBucket::upload`].

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use reqwest::{Client, header::CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{Instrument, debug, info_span};

use crate::APP_USER_AGENT;

pub const DEFAULT_BUCKET: &str = "images";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TOKEN_LEN: usize = 8;
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    #[error("object storage is not configured")]
    NotConfigured,
    #[error("object storage request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("object storage rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for uploaded images.
#[async_trait]
pub trait ImageBucket: Send + Sync {
    /// Stores `body` under `object_name` and returns its public URL.
    async fn upload(
        &self,
        object_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, BucketError>;
}

#[derive(Debug, Clone)]
pub struct BucketConfig {
    base_url: Option<String>,
    service_role: Option<SecretString>,
    bucket: String,
}

impl BucketConfig {
    /// Empty values count as missing.
    #[must_use]
    pub fn new(base_url: Option<String>, service_role: Option<SecretString>, bucket: String) -> Self {
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let service_role = service_role.filter(|key| !key.expose_secret().trim().is_empty());
        let bucket = if bucket.trim().is_empty() {
            DEFAULT_BUCKET.to_string()
        } else {
            bucket.trim().to_string()
        };
        Self {
            base_url,
            service_role,
            bucket,
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.service_role.is_some()
    }

    fn endpoint(&self, base_url: &str, object_name: &str) -> String {
        format!("{base_url}/storage/v1/object/{}/{object_name}", self.bucket)
    }

    fn public_url(&self, base_url: &str, object_name: &str) -> String {
        format!(
            "{base_url}/storage/v1/object/public/{}/{object_name}",
            self.bucket
        )
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseBucket {
    config: BucketConfig,
    client: Client,
}

impl SupabaseBucket {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: BucketConfig) -> Result<Self, BucketError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ImageBucket for SupabaseBucket {
    async fn upload(
        &self,
        object_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, BucketError> {
        let (Some(base_url), Some(service_role)) =
            (&self.config.base_url, &self.config.service_role)
        else {
            return Err(BucketError::NotConfigured);
        };

        let size = body.len();
        let span = info_span!(
            "bucket.upload",
            bucket = %self.config.bucket,
            object = %object_name,
            size
        );
        let response = self
            .client
            .post(self.config.endpoint(base_url, object_name))
            .bearer_auth(service_role.expose_secret())
            .header("apikey", service_role.expose_secret())
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(body)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BucketError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(object = %object_name, size, "uploaded image");
        Ok(self.config.public_url(base_url, object_name))
    }
}

/// Reduces a client-supplied file name to `[A-Za-z0-9._-]`.
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let sanitized: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('.');
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Collision-resistant object name: `{unix_millis}-{random}-{file name}`.
#[must_use]
pub fn object_name(file_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    let mut rng = rand::thread_rng();
    let token: String = (0..TOKEN_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    format!("{millis}-{token}-{}", sanitize_file_name(file_name))
}
