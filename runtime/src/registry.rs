//! Deletion through the OCI distribution HTTP API.
//!
//! Each digest is removed with `DELETE {base}/v2/{repository}/manifests/{digest}`.
//! The registry must have deletion enabled.

use async_trait::async_trait;
use regsweep_core::error::{Result, SweepError};

use crate::source::{BatchDeleteResult, DeletionSink, ImageFailure};

/// Credentials for a container registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
}

impl RegistryAuth {
    /// No credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Reads `REGISTRY_USERNAME` and `REGISTRY_PASSWORD`, falling back to
    /// anonymous if either is unset.
    pub fn from_env() -> Self {
        let username = std::env::var("REGISTRY_USERNAME").ok();
        let password = std::env::var("REGISTRY_PASSWORD").ok();

        if username.is_some() && password.is_some() {
            Self { username, password }
        } else {
            Self::anonymous()
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => request.basic_auth(u, Some(p)),
            _ => request,
        }
    }
}

/// Deletes manifests from an OCI distribution registry.
#[derive(Debug)]
pub struct RegistryDeletionSink {
    base_url: String,
    auth: RegistryAuth,
    client: reqwest::Client,
}

impl RegistryDeletionSink {
    /// `base_url` is the registry root, e.g. `https://registry.example.com`.
    pub fn new(base_url: &str, auth: RegistryAuth) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        reqwest::Url::parse(&base_url)
            .map_err(|e| SweepError::Config(format!("invalid registry URL '{}': {}", base_url, e)))?;

        Ok(Self {
            base_url,
            auth,
            client: reqwest::Client::new(),
        })
    }

    fn manifest_url(&self, repository: &str, digest: &str) -> String {
        format!("{}/v2/{}/manifests/{}", self.base_url, repository, digest)
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> std::result::Result<(), String> {
        let url = self.manifest_url(repository, digest);
        let response = self
            .auth
            .apply(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(format!("{} {}", status.as_u16(), body.trim()))
    }
}

#[async_trait]
impl DeletionSink for RegistryDeletionSink {
    async fn delete_images(&self, repository: &str, digests: &[String]) -> Result<BatchDeleteResult> {
        let mut result = BatchDeleteResult::default();

        for digest in digests {
            match self.delete_manifest(repository, digest).await {
                Ok(()) => {
                    tracing::debug!(repository = %repository, digest = %digest, "Deleted manifest");
                    result.deleted.push(digest.clone());
                }
                Err(reason) => result.failures.push(ImageFailure {
                    digest: digest.clone(),
                    reason,
                }),
            }
        }

        Ok(result)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url
        .trim()
        .trim_end_matches('/')
        .trim_end_matches("/v2")
        .trim_end_matches('/')
        .to_string()
}
