//! Load, match, mutate, and save credential records under the store lock.

use crate::core::encryption::LocalEncryption;
use crate::core::file_lock::RecordsLock;
use crate::core::record_store;
use crate::models::record::{CredentialRecord, RecordOptions};
use crate::models::record_info::CredentialRecordInfo;
use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Orchestrates the store lock, the store file, and password encryption.
///
/// Every operation that touches the file runs inside the lock. When the
/// lock cannot be acquired within the timeout the operation yields no data
/// and changes nothing.
pub struct CredentialRecordsManager<L, E> {
    store_file: PathBuf,
    lock: L,
    encryption: E,
    lock_timeout: Duration,
}

impl<L, E> CredentialRecordsManager<L, E>
where
    L: RecordsLock,
    E: LocalEncryption,
{
    pub fn new(store_file: PathBuf, lock: L, encryption: E, lock_timeout: Duration) -> Self {
        Self {
            store_file,
            lock,
            encryption,
            lock_timeout,
        }
    }

    pub fn store_file(&self) -> &Path {
        &self.store_file
    }

    /// Build the initial record for an invocation from CLI options.
    pub fn record_from_options(&self, options: &RecordOptions) -> CredentialRecord {
        CredentialRecord::from_options(options)
    }

    /// One display line per stored record matched by `matcher`, most recent first.
    pub fn list_records(&self, matcher: &CredentialRecord) -> Result<Vec<String>> {
        let records = self.locked("list", || self.matching_records(matcher))?;
        Ok(records.iter().map(ToString::to_string).collect())
    }

    /// Output lines of the most recently updated match, or an empty string.
    ///
    /// Only that one record is decrypted.
    pub fn get_record(&self, matcher: &CredentialRecord) -> Result<String> {
        let newest = self.locked("get", || {
            record_store::load(&self.store_file)?
                .iter()
                .find(|r| matcher.info().is_match(r))
                .map(|r| self.decrypted(r))
                .transpose()
        })?;
        Ok(newest
            .as_ref()
            .map(CredentialRecord::output_string)
            .unwrap_or_default())
    }

    pub fn store_record(&self, record: CredentialRecord) -> Result<()> {
        if record.is_empty() {
            debug!("empty record, nothing to store");
            return Ok(());
        }
        let mut info = record.into_info();
        self.locked("store", move || {
            if !info.password_encrypted {
                info.password = self
                    .encryption
                    .encrypt(&info.password)
                    .context("encrypt password")?;
                info.password_encrypted = true;
            }
            let mut records = record_store::load(&self.store_file)?;
            records.insert(0, info);
            sort_by_recency(&mut records);
            record_store::save(&self.store_file, &records)?;
            info!(count = records.len(), "stored credential record");
            Ok(())
        })
    }

    /// Remove every record matched by `matcher`. An empty matcher is a no-op
    /// so that it can never wipe the whole store.
    pub fn erase_records(&self, matcher: &CredentialRecord) -> Result<()> {
        if matcher.is_empty() {
            debug!("empty matcher, refusing to erase");
            return Ok(());
        }
        self.locked("erase", || {
            let mut records = record_store::load(&self.store_file)?;
            let before = records.len();
            records.retain(|r| !matcher.info().is_match(r));
            let removed = before - records.len();
            if removed == 0 {
                debug!("no matching records to erase");
                return Ok(());
            }
            sort_by_recency(&mut records);
            record_store::save(&self.store_file, &records)?;
            info!(removed, "erased credential records");
            Ok(())
        })
    }

    fn matching_records(&self, matcher: &CredentialRecord) -> Result<Vec<CredentialRecord>> {
        record_store::load(&self.store_file)?
            .iter()
            .filter(|r| matcher.info().is_match(r))
            .map(|r| self.decrypted(r))
            .collect()
    }

    /// A caller-facing copy with a plaintext password.
    fn decrypted(&self, stored: &CredentialRecordInfo) -> Result<CredentialRecord> {
        let mut copy = stored.clone();
        if copy.password_encrypted {
            copy.password = self
                .encryption
                .decrypt(&copy.password)
                .context("decrypt stored password")?;
            copy.password_encrypted = false;
        }
        Ok(CredentialRecord::from_info(copy))
    }

    fn locked<T, F>(&self, operation: &str, critical: F) -> Result<T>
    where
        T: Default,
        F: FnOnce() -> Result<T>,
    {
        let Some(guard) = self.lock.try_acquire(self.lock_timeout)? else {
            // Known limitation: a timed out lock reads as an empty store.
            warn!(
                operation,
                timeout_secs = self.lock_timeout.as_secs_f64(),
                store = %self.store_file.display(),
                "timed out waiting for the store lock, returning no data"
            );
            return Ok(T::default());
        };
        let result = critical();
        drop(guard);
        result
    }
}

/// Most recently updated first; ties ordered by output text.
pub fn sort_by_recency(records: &mut [CredentialRecordInfo]) {
    records.sort_by_cached_key(|r| {
        (
            Reverse(r.last_updated),
            CredentialRecord::from_info(r.clone()).output_string(),
        )
    });
}
