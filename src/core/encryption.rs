//! Per-user protection of stored passwords.
//!
//! The OS credential store (Keychain, Credential Manager, Secret Service)
//! holds a random master secret for the invoking user. The data key is
//! derived from that secret and a fixed application entropy, and passwords
//! are sealed with AES-256-GCM. Nothing key-related is written to disk by
//! this module.

use crate::constants;
use crate::util::user;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::cell::OnceCell;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of the AES-256 data key and of the master secret.
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce (96 bits).
const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag.
const TAG_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("OS keyring unavailable: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("no master secret for '{0}' in the OS keyring; stored passwords cannot be recovered")]
    MissingMasterSecret(String),

    #[error("master secret in the OS keyring is corrupted")]
    CorruptedMasterSecret,

    #[error("cannot determine the current user: {0}")]
    UnknownUser(String),

    #[error("ciphertext is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("ciphertext too short: minimum {minimum} bytes required, got {actual}")]
    CiphertextTooShort { minimum: usize, actual: usize },

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed: authentication tag verification failed")]
    DecryptionFailed,

    #[error("decrypted text is not valid UTF-8")]
    InvalidUtf8,
}

/// Reversible protection of a password field.
///
/// Empty input passes through unchanged in both directions.
pub trait LocalEncryption {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptionError>;
}

/// AES-256-GCM data key. Zeroed on drop, never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    key: [u8; KEY_SIZE],
}

impl DataKey {
    /// SHA-256 over the master secret followed by the entropy.
    pub fn derive(master: &[u8], entropy: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(master);
        hasher.update(entropy);
        let digest = hasher.finalize();
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Seal to `base64(nonce || ciphertext || tag)`.
    pub fn seal(&self, plaintext: &str) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| EncryptionError::EncryptionFailed)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend(sealed);
        Ok(STANDARD.encode(out))
    }

    pub fn open(&self, ciphertext: &str) -> Result<String, EncryptionError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }
        let raw = STANDARD.decode(ciphertext)?;
        let minimum = NONCE_SIZE + TAG_SIZE;
        if raw.len() < minimum {
            return Err(EncryptionError::CiphertextTooShort {
                minimum,
                actual: raw.len(),
            });
        }

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| EncryptionError::DecryptionFailed)?;
        let nonce = Nonce::from_slice(&raw[..NONCE_SIZE]);
        let plain = Zeroizing::new(
            cipher
                .decrypt(nonce, &raw[NONCE_SIZE..])
                .map_err(|_| EncryptionError::DecryptionFailed)?,
        );
        String::from_utf8(plain.to_vec()).map_err(|_| EncryptionError::InvalidUtf8)
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey([REDACTED, {} bytes])", KEY_SIZE)
    }
}

/// Encryption keyed by a per-user master secret in the OS keyring.
///
/// The data key is derived on first use and kept for the life of the value.
#[derive(Debug, Clone)]
pub struct KeyringEncryption {
    account: String,
    key: OnceCell<DataKey>,
}

impl KeyringEncryption {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            key: OnceCell::new(),
        }
    }

    /// Key the encryption to the invoking OS user.
    pub fn for_current_user() -> Result<Self, EncryptionError> {
        let account =
            user::current_user_name().map_err(|e| EncryptionError::UnknownUser(e.to_string()))?;
        Ok(Self::new(account))
    }

    fn entry(&self) -> Result<keyring::Entry, EncryptionError> {
        Ok(keyring::Entry::new(constants::KEYRING_SERVICE, &self.account)?)
    }

    fn data_key(&self, create: bool) -> Result<&DataKey, EncryptionError> {
        if let Some(key) = self.key.get() {
            return Ok(key);
        }
        let key = self.load_data_key(create)?;
        Ok(self.key.get_or_init(|| key))
    }

    /// Load the master secret, creating it first when `create` is set.
    fn load_data_key(&self, create: bool) -> Result<DataKey, EncryptionError> {
        let entry = self.entry()?;
        let encoded = match entry.get_password() {
            Ok(encoded) => Zeroizing::new(encoded),
            Err(keyring::Error::NoEntry) if create => {
                let mut master = Zeroizing::new([0u8; KEY_SIZE]);
                OsRng.fill_bytes(&mut master[..]);
                let encoded = Zeroizing::new(STANDARD.encode(&master[..]));
                entry.set_password(&encoded)?;
                info!(account = %self.account, "created master secret in the OS keyring");
                encoded
            }
            Err(keyring::Error::NoEntry) => {
                return Err(EncryptionError::MissingMasterSecret(self.account.clone()))
            }
            Err(err) => return Err(err.into()),
        };
        let master = Zeroizing::new(
            STANDARD
                .decode(encoded.as_bytes())
                .map_err(|_| EncryptionError::CorruptedMasterSecret)?,
        );
        if master.len() != KEY_SIZE {
            return Err(EncryptionError::CorruptedMasterSecret);
        }
        debug!(account = %self.account, "loaded master secret");
        Ok(DataKey::derive(&master, constants::ENCRYPTION_ENTROPY))
    }
}

impl LocalEncryption for KeyringEncryption {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        self.data_key(true)?.seal(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, EncryptionError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }
        self.data_key(false)?.open(ciphertext)
    }
}
