//! Layered configuration: TOML file, then `SETLIST_*` environment variables,
//! then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use setlist_view::pipeline::DEFAULT_PAGE_SIZE;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path:   PathBuf,
  /// Base URL of the metadata-fetch service.
  pub metadata_url: String,
  pub user_id:      Option<String>,
  pub group_id:     Option<Uuid>,
  pub page_size:    usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:   PathBuf::from("setlist.db"),
      metadata_url: "http://localhost:5002".to_owned(),
      user_id:      None,
      group_id:     None,
      page_size:    DEFAULT_PAGE_SIZE,
    }
  }
}

impl Settings {
  /// Read the file (if present) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let mut settings: Self = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("SETLIST"))
      .build()
      .with_context(|| format!("failed to read config {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
