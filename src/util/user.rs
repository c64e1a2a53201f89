//! Identity of the invoking OS user.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Login name of the effective user.
pub fn current_user_name() -> Result<String> {
    #[cfg(unix)]
    {
        let uid = nix::unistd::geteuid();
        if let Some(user) = nix::unistd::User::from_uid(uid)
            .with_context(|| format!("look up user {}", uid))?
        {
            return Ok(user.name);
        }
    }
    for var in ["USER", "USERNAME"] {
        if let Ok(name) = env::var(var) {
            if !name.is_empty() {
                return Ok(name);
            }
        }
    }
    bail!("no user name for the current process")
}

/// Home directory of the effective user.
pub fn home_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    {
        let uid = nix::unistd::geteuid();
        if let Ok(Some(user)) = nix::unistd::User::from_uid(uid) {
            if !user.dir.as_os_str().is_empty() {
                return Ok(user.dir);
            }
        }
    }
    for var in ["HOME", "USERPROFILE"] {
        if let Some(dir) = env::var_os(var).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
    }
    bail!("cannot determine the home directory")
}
