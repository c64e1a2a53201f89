//! Persisted credential record.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};

/// One stored protocol/host/path/username/password tuple.
///
/// Empty strings mean "unset". `password` holds ciphertext exactly when
/// `password_encrypted` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecordInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub password_encrypted: bool,
    #[serde(default = "epoch")]
    pub last_updated: DateTime<FixedOffset>,
}

fn epoch() -> DateTime<FixedOffset> {
    DateTime::<Utc>::default().into()
}

impl Default for CredentialRecordInfo {
    fn default() -> Self {
        Self {
            protocol: String::new(),
            host: String::new(),
            path: String::new(),
            username: String::new(),
            password: String::new(),
            password_encrypted: false,
            last_updated: epoch(),
        }
    }
}

impl CredentialRecordInfo {
    /// Refresh `last_updated` to the current local time.
    pub fn touch(&mut self) {
        self.last_updated = Local::now().into();
    }

    /// True when protocol, host, username, and path are all unset.
    pub fn is_empty(&self) -> bool {
        self.protocol.is_empty()
            && self.host.is_empty()
            && self.username.is_empty()
            && self.path.is_empty()
    }

    /// Directional match: every non-empty field on `self` must equal the
    /// same field on `other`. Protocol and host compare case-insensitively.
    pub fn is_match(&self, other: &CredentialRecordInfo) -> bool {
        if !self.protocol.is_empty() && !eq_ignore_case(&self.protocol, &other.protocol) {
            return false;
        }
        if !self.host.is_empty() && !eq_ignore_case(&self.host, &other.host) {
            return false;
        }
        if !self.username.is_empty() && self.username != other.username {
            return false;
        }
        if !self.path.is_empty() && self.path != other.path {
            return false;
        }
        true
    }

    /// Bidirectional match with agreeing password state.
    pub fn same_credential(&self, other: &CredentialRecordInfo) -> bool {
        if self.password_encrypted != other.password_encrypted {
            return false;
        }
        if !self.password.is_empty() && self.password != other.password {
            return false;
        }
        self.is_match(other) && other.is_match(self)
    }
}

/// Unicode case-insensitive equality, with an ASCII fast path.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}
