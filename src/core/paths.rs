//! Credential store location resolution.

use crate::constants;
use crate::util::user;
use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolve the store file from an explicit location, the environment
/// variable, or the default hidden directory under the user's home.
pub fn resolve_store_file(location_arg: Option<&str>) -> Result<PathBuf> {
    let home = user::home_dir()?;
    let location = match location_arg.filter(|l| !l.trim().is_empty()) {
        Some(location) => location.to_string(),
        None => match env::var(constants::STORE_LOCATION_ENV) {
            Ok(value) if !value.trim().is_empty() => {
                info!(
                    variable = constants::STORE_LOCATION_ENV,
                    "store location taken from the environment"
                );
                expand_env_vars(&value, |name| env::var(name).ok())
            }
            _ => constants::DEFAULT_STORE_DIR_NAME.to_string(),
        },
    };
    Ok(resolve_location(&location, &home))
}

/// Apply the location rules relative to `home`.
///
/// A leading `~` expands to `home` and relative paths are joined onto it.
/// An existing file is used as-is. An existing directory, or anything that
/// looks like one, gets the default file name appended.
pub fn resolve_location(location: &str, home: &Path) -> PathBuf {
    let expanded = expand_home(location.trim(), home);
    let path = if expanded.is_absolute() {
        expanded
    } else {
        let joined = home.join(&expanded);
        info!(
            location = %expanded.display(),
            adjusted = %joined.display(),
            "location not rooted, joined onto home"
        );
        joined
    };

    if path.is_file() {
        info!(store = %path.display(), "using existing store file");
        return path;
    }
    if path.is_dir() || looks_like_directory(&path) {
        let file = path.join(constants::DEFAULT_STORE_FILE_NAME);
        info!(store = %file.display(), "location is (or could be) a directory");
        return file;
    }
    info!(store = %path.display(), "using store file (not created yet)");
    path
}

/// Replace each `%NAME%` with the variable's value from `lookup`.
/// Unknown names and unpaired `%` are kept as written.
fn expand_env_vars(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        let Some(len) = after.find('%') else {
            break;
        };
        let name = &after[..len];
        match Some(name).filter(|n| !n.is_empty()).and_then(&lookup) {
            Some(expanded) => {
                out.push_str(&rest[..start]);
                out.push_str(&expanded);
                rest = &after[len + 1..];
            }
            None => {
                // the closing % may open the next name
                out.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn expand_home(location: &str, home: &Path) -> PathBuf {
    if location == "~" {
        return home.to_path_buf();
    }
    match location
        .strip_prefix("~/")
        .or_else(|| location.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest),
        None => PathBuf::from(location),
    }
}

fn looks_like_directory(path: &Path) -> bool {
    let no_extension = path.extension().map_or(true, |ext| ext.is_empty());
    let no_stem = path.file_stem().map_or(true, |stem| stem.is_empty());
    no_extension || no_stem
}
