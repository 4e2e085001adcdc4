//! HTTP client for the metadata-fetch service.

use std::{future::Future, time::Duration};

use anyhow::Context as _;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use setlist_core::metadata::{MetadataRecord, MetadataSource};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("metadata service returned {status}: {message}")]
  Status { status: StatusCode, message: String },
}

/// Shape of the service's error body.
#[derive(Deserialize, Default)]
struct ErrorBody {
  error:  Option<String>,
  detail: Option<String>,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct MetadataClient {
  client:   Client,
  base_url: String,
}

impl MetadataClient {
  pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// `POST /api/soundcloud/track`
  async fn track(&self, permalink: &str) -> Result<MetadataRecord, FetchError> {
    let resp = self
      .client
      .post(self.url("/soundcloud/track"))
      .json(&serde_json::json!({ "url": permalink }))
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body: ErrorBody = resp.json().await.unwrap_or_default();
      let message = body
        .error
        .or(body.detail)
        .unwrap_or_else(|| status.to_string());
      return Err(FetchError::Status { status, message });
    }
    Ok(resp.json().await?)
  }
}

impl MetadataSource for MetadataClient {
  type Error = FetchError;

  fn fetch<'a>(
    &'a self,
    permalink: &'a str,
  ) -> impl Future<Output = Result<MetadataRecord, Self::Error>> + Send + 'a {
    self.track(permalink)
  }
}
