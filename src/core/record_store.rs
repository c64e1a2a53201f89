//! Serialization of the record collection to and from the store file.

use crate::constants;
use crate::models::record_info::CredentialRecordInfo;
use crate::models::records_file::RecordsFile;
use crate::util::fs as store_fs;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Read every record from `reader`. An empty stream holds no records.
pub fn read_records<R: Read>(mut reader: R) -> Result<Vec<CredentialRecordInfo>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .context("read credential records")?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: RecordsFile = toml::from_str(&content).context("parse credential records")?;
    Ok(file.credentials)
}

/// Serialize `records` as the whole content written to `writer`.
pub fn write_records<W: Write>(records: &[CredentialRecordInfo], mut writer: W) -> Result<()> {
    let file = RecordsFile {
        credentials: records.to_vec(),
    };
    let content = toml::to_string_pretty(&file).context("serialize credential records")?;
    writer
        .write_all(content.as_bytes())
        .context("write credential records")?;
    writer.flush().context("flush credential records")?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<CredentialRecordInfo>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).with_context(|| format!("open store {}", path.display()))?;
    read_records(file).with_context(|| format!("load store {}", path.display()))
}

/// Replace the store atomically: write a temp file beside it, then rename.
pub fn save(path: &Path, records: &[CredentialRecordInfo]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    store_fs::ensure_dir(parent, constants::STORE_DIR_MODE)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).context("create temp store")?;
    write_records(records, tmp.as_file_mut())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perm = fs::Permissions::from_mode(constants::STORE_FILE_MODE);
        tmp.as_file()
            .set_permissions(perm)
            .context("set permissions on temp store")?;
    }

    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("persist store {}: {}", path.display(), err))?;
    Ok(())
}
