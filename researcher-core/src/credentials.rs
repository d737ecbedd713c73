//! API credentials: the opaque `Credential` value threaded through a research
//! session, and storage backends for remembering it between runs.
//!
//! - `KeyringCredentialStore`: OS-native credential store via `keyring`.
//! - `InMemoryCredentialStore`: process-local store for tests.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Mutex;

/// An opaque API credential.
///
/// The secret is never printed: `Debug` and `Display` redact it. The only way
/// to read it is `expose()`, which gateways call when building a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Build a credential, rejecting empty or whitespace-only input.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into().trim().to_string();
        if secret.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(Self(secret))
    }

    /// The raw secret, for the Authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Errors from credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("No stored credential for {account}")]
    NotFound { account: String },

    #[error("Failed to store credential: {message}")]
    StoreFailed { message: String },

    #[error("Failed to delete credential: {message}")]
    DeleteFailed { message: String },

    #[error("Keyring backend not available: {message}")]
    BackendUnavailable { message: String },
}

/// Storage backend for API keys, keyed by provider name.
pub trait CredentialStore: Send + Sync {
    fn store_key(&self, provider: &str, api_key: &str) -> Result<(), CredentialError>;

    fn get_key(&self, provider: &str) -> Result<String, CredentialError>;

    fn delete_key(&self, provider: &str) -> Result<(), CredentialError>;

    fn has_key(&self, provider: &str) -> bool {
        self.get_key(provider).is_ok()
    }
}

/// Account name used for a provider's key in every backend.
pub fn account_name(provider: &str) -> String {
    format!("researcher_api_key:{provider}")
}

/// OS-native credential store using the `keyring` crate.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            service: "researcher".to_string(),
        }
    }

    fn entry(&self, provider: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, &account_name(provider)).map_err(|e| {
            CredentialError::BackendUnavailable {
                message: e.to_string(),
            }
        })
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn store_key(&self, provider: &str, api_key: &str) -> Result<(), CredentialError> {
        self.entry(provider)?
            .set_password(api_key.trim())
            .map_err(|e| CredentialError::StoreFailed {
                message: e.to_string(),
            })
    }

    fn get_key(&self, provider: &str) -> Result<String, CredentialError> {
        self.entry(provider)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => CredentialError::NotFound {
                account: account_name(provider),
            },
            other => CredentialError::StoreFailed {
                message: other.to_string(),
            },
        })
    }

    fn delete_key(&self, provider: &str) -> Result<(), CredentialError> {
        match self.entry(provider)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::DeleteFailed {
                message: e.to_string(),
            }),
        }
    }
}

/// In-memory credential store for tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    store: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn store_key(&self, provider: &str, api_key: &str) -> Result<(), CredentialError> {
        let mut store = self.store.lock().map_err(|e| CredentialError::StoreFailed {
            message: e.to_string(),
        })?;
        store.insert(account_name(provider), api_key.trim().to_string());
        Ok(())
    }

    fn get_key(&self, provider: &str) -> Result<String, CredentialError> {
        let account = account_name(provider);
        let store = self.store.lock().map_err(|e| CredentialError::StoreFailed {
            message: e.to_string(),
        })?;
        store
            .get(&account)
            .cloned()
            .ok_or(CredentialError::NotFound { account })
    }

    fn delete_key(&self, provider: &str) -> Result<(), CredentialError> {
        let mut store = self.store.lock().map_err(|e| CredentialError::DeleteFailed {
            message: e.to_string(),
        })?;
        store.remove(&account_name(provider));
        Ok(())
    }
}
