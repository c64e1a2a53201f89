//! Store file model.

use crate::models::record_info::CredentialRecordInfo;
use serde::{Deserialize, Serialize};

/// Root document of the store: records sorted most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordsFile {
    #[serde(default)]
    pub credentials: Vec<CredentialRecordInfo>,
}
