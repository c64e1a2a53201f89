//! Centralized constants for names, paths, permissions, and limits.

/// Application namespace shared by every helper process.
pub const APP_NAMESPACE: &str = "git-credential-vault";

/// Environment variable naming the credential store location.
pub const STORE_LOCATION_ENV: &str = "GIT_CREDENTIAL_VAULT_LOCATION";

/// Hidden directory under the user's home holding the store.
pub const DEFAULT_STORE_DIR_NAME: &str = ".git-credential-vault";

/// File name appended when the store location is a directory.
pub const DEFAULT_STORE_FILE_NAME: &str = "credentials.toml";

/// Extension of the cross-process lock file.
pub const LOCK_EXTENSION: &str = ".lock";

/// Fixed entropy mixed into the per-user data key.
pub const ENCRYPTION_ENTROPY: &[u8] = b"git-credential-vault/protected-text";

/// Keyring service holding the per-user master secret.
pub const KEYRING_SERVICE: &str = "git-credential-vault";

/// Default lock acquisition timeout in seconds.
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 45;

/// Interval between non-blocking lock attempts, in milliseconds.
pub const LOCK_POLL_INTERVAL_MS: u64 = 25;

/// Permission mode for the store directory.
pub const STORE_DIR_MODE: u32 = 0o700;

/// Permission mode for the store file.
pub const STORE_FILE_MODE: u32 = 0o600;
