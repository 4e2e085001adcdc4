//! The single shared notice used for both hard errors and soft hints.

use serde::Serialize;

use crate::Error;

/// Controls how a notice is coloured, never its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Hint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
  pub severity: Severity,
  pub title:    String,
  pub message:  String,
}

impl Notice {
  pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
    Self { severity: Severity::Error, title: title.into(), message: message.into() }
  }

  pub fn hint(title: impl Into<String>, message: impl Into<String>) -> Self {
    Self { severity: Severity::Hint, title: title.into(), message: message.into() }
  }
}

impl From<&Error> for Notice {
  fn from(e: &Error) -> Self {
    match e {
      Error::Forbidden(m) => Self::error("Not allowed", m.clone()),
      Error::Store(_) | Error::Metadata(_) => Self::error("Error", e.to_string()),
      Error::TrackNotFound(_) | Error::GroupNotFound(_) => Self::error("Not found", e.to_string()),
      Error::NotSignedIn => Self::hint("Sign in required", e.to_string()),
      Error::Validation(_) | Error::NoActiveGroup | Error::Core(_) => {
        Self::hint("Check your input", e.to_string())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn forbidden_is_an_error() {
    let n = Notice::from(&Error::Forbidden("no".into()));
    assert_eq!(n.severity, Severity::Error);
    assert_eq!(n.message, "no");
  }

  #[test]
  fn missing_permalink_is_a_hint() {
    let n = Notice::from(&Error::Core(setlist_core::Error::MissingPermalink));
    assert_eq!(n.severity, Severity::Hint);
  }
}
