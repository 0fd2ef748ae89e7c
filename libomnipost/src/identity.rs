//! Structured platform account identity.
//!
//! Connections historically carried a single `"username|accountId|parentId"`
//! text field. The store keeps the three parts as separate columns; this
//! module owns the packed representation so nothing else in the system
//! touches delimiter-joined strings. `from_packed`/`to_packed` exist only
//! for the ingest boundary (importing identities delivered in the legacy
//! shape).

use serde::{Deserialize, Serialize};

use crate::error::{OmnipostError, Result};

/// Who a connection belongs to on its platform.
///
/// `account_id` is the platform's primary id for the account (LinkedIn
/// person id, Instagram business account id, Threads account id).
/// `parent_account_id` is the enclosing account where one exists (the
/// Facebook page backing an Instagram business account). Adapters that
/// require a field fail with a configuration error when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    pub username: String,
    pub account_id: Option<String>,
    pub parent_account_id: Option<String>,
}

impl ConnectionIdentity {
    pub fn new(
        username: impl Into<String>,
        account_id: Option<String>,
        parent_account_id: Option<String>,
    ) -> Self {
        Self {
            username: username.into(),
            account_id,
            parent_account_id,
        }
    }

    /// Parse the legacy `"username|accountId|parentId"` encoding. Trailing
    /// segments may be omitted; empty segments become `None`.
    pub fn from_packed(packed: &str) -> Result<Self> {
        let trimmed = packed.trim();
        if trimmed.is_empty() {
            return Err(OmnipostError::InvalidInput(
                "Identity string is empty".to_string(),
            ));
        }

        let segments: Vec<&str> = trimmed.split('|').map(str::trim).collect();
        if segments.len() > 3 {
            return Err(OmnipostError::InvalidInput(format!(
                "Identity string has {} segments, expected at most 3",
                segments.len()
            )));
        }

        let segment = |i: usize| -> Option<String> {
            segments
                .get(i)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        Ok(Self {
            username: segment(0).unwrap_or_default(),
            account_id: segment(1),
            parent_account_id: segment(2),
        })
    }

    /// Render the legacy packed encoding, dropping trailing empty segments.
    pub fn to_packed(&self) -> String {
        let mut segments = vec![
            self.username.clone(),
            self.account_id.clone().unwrap_or_default(),
            self.parent_account_id.clone().unwrap_or_default(),
        ];
        while segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        segments.join("|")
    }
}
