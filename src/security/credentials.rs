//! Bearer credential handling.
//!
//! The session token is kept in memory as a [`Credential`] that is zeroed
//! when dropped and never printed. Between runs it lives in a
//! [`TokenStore`]:
//! - [`FileTokenStore`]: a file in the data directory (default)
//! - [`KeyringTokenStore`]: the OS keychain (`secrets` feature)
//! - [`MemoryTokenStore`]: process-local, for tests and one-shot sessions

use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The service name used for keyring entries.
const SERVICE_NAME: &str = "repomate";

/// Keyring account / file name holding the token.
const TOKEN_KEY: &str = "session";

/// Result type for credential storage operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Errors that can occur while persisting the credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Failed to access the system keychain.
    #[error("Failed to access system keychain: {0}")]
    KeychainAccess(String),

    /// IO error on the session file.
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    /// No location to store the token.
    #[error("Could not determine data directory")]
    NoDataDir,

    /// Feature not available.
    #[error("Keychain storage not available - compile with 'secrets' feature")]
    FeatureNotAvailable,
}

/// An opaque bearer token, zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token. Returns `None` for blank input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self { token })
        }
    }

    /// Get the raw token.
    ///
    /// Only for building the `Authorization` header; never log it.
    pub fn expose(&self) -> &str {
        &self.token
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Persistent slot for the session credential.
pub trait TokenStore: Send + Sync {
    /// Read the stored credential, if any.
    fn load(&self) -> CredentialResult<Option<Credential>>;

    /// Replace the stored credential.
    fn save(&self, credential: &Credential) -> CredentialResult<()>;

    /// Remove the stored credential. Clearing an empty store succeeds.
    fn clear(&self) -> CredentialResult<()>;
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self { slot: Mutex::new(Some(credential)) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> CredentialResult<Option<Credential>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, credential: &Credential) -> CredentialResult<()> {
        *self.slot.lock() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        self.slot.lock().take();
        Ok(())
    }
}

/// Token store backed by a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the token in the default data directory.
    pub fn in_data_dir() -> CredentialResult<Self> {
        let dir = crate::core::Config::data_dir().ok_or(CredentialError::NoDataDir)?;
        Ok(Self::new(dir.join(TOKEN_KEY)))
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> CredentialResult<Option<Credential>> {
        match std::fs::read_to_string(&self.path) {
            Ok(mut content) => {
                let credential = Credential::new(content.trim());
                content.zeroize();
                Ok(credential)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, credential: &Credential) -> CredentialResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, credential.expose())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token store backed by the OS keychain.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    /// Service name for keyring entries.
    #[cfg_attr(not(feature = "secrets"), allow(dead_code))]
    service: String,
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringTokenStore {
    /// Create a keychain store under the default service name.
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Create a keychain store with a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    #[cfg(feature = "secrets")]
    fn entry(&self) -> CredentialResult<keyring::Entry> {
        keyring::Entry::new(&self.service, TOKEN_KEY)
            .map_err(|e| CredentialError::KeychainAccess(e.to_string()))
    }
}

#[cfg(feature = "secrets")]
impl TokenStore for KeyringTokenStore {
    fn load(&self) -> CredentialResult<Option<Credential>> {
        match self.entry()?.get_password() {
            Ok(mut token) => {
                let credential = Credential::new(token.as_str());
                token.zeroize();
                Ok(credential)
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::KeychainAccess(e.to_string())),
        }
    }

    fn save(&self, credential: &Credential) -> CredentialResult<()> {
        self.entry()?
            .set_password(credential.expose())
            .map_err(|e| CredentialError::KeychainAccess(e.to_string()))
    }

    fn clear(&self) -> CredentialResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::KeychainAccess(e.to_string())),
        }
    }
}

#[cfg(not(feature = "secrets"))]
impl TokenStore for KeyringTokenStore {
    fn load(&self) -> CredentialResult<Option<Credential>> {
        Err(CredentialError::FeatureNotAvailable)
    }

    fn save(&self, _credential: &Credential) -> CredentialResult<()> {
        Err(CredentialError::FeatureNotAvailable)
    }

    fn clear(&self) -> CredentialResult<()> {
        Err(CredentialError::FeatureNotAvailable)
    }
}
