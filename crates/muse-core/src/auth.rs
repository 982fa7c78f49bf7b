//! Caller authentication
//!
//! Provides:
//! - API key / bearer token resolution to a stable caller id
//! - SHA-256 hashed key storage (raw keys are never kept)
//! - Constant-time hash comparison
//! - Key generation and revocation

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of generated API keys
pub const KEY_PREFIX: &str = "muse_";

// ============================================================================
// Error Types
// ============================================================================

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credentials provided
    #[error("Authentication required")]
    MissingCredentials,

    /// Invalid token or API key
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token has been revoked
    #[error("Token revoked")]
    TokenRevoked,

    /// Malformed key hash in configuration
    #[error("Invalid key hash: {0}")]
    InvalidKeyHash(String),

    /// Internal error
    #[error("Auth internal error: {0}")]
    Internal(String),
}

/// Auth result type
pub type Result<T> = std::result::Result<T, AuthError>;

// ============================================================================
// Auth Context
// ============================================================================

/// Authentication method used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer token or API key matched a stored hash
    ApiKey,
    /// Authentication disabled; fixed development caller
    Disabled,
}

/// Authenticated caller attached to each request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Stable caller identifier
    pub caller_id: String,
    /// How the caller authenticated
    pub method: AuthMethod,
}

// ============================================================================
// Auth Store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredKey {
    key_hash: [u8; 32],
    caller_id: String,
    label: String,
    created_at: DateTime<Utc>,
    revoked: bool,
}

/// Token storage and validation
pub struct AuthStore {
    /// key_hash_hex → StoredKey
    keys: RwLock<HashMap<String, StoredKey>>,
    enabled: bool,
    dev_caller_id: String,
}

impl AuthStore {
    /// Create a new auth store
    pub fn new(enabled: bool) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            enabled,
            dev_caller_id: "anonymous".to_string(),
        }
    }

    /// Caller id used for every request while authentication is disabled
    #[must_use]
    pub fn with_dev_caller(mut self, caller_id: impl Into<String>) -> Self {
        self.dev_caller_id = caller_id.into();
        self
    }

    /// Check if authentication is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn hash_key(key: &str) -> [u8; 32] {
        let digest = Sha256::digest(key.as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        hash
    }

    fn hash_to_hex(hash: &[u8; 32]) -> String {
        hash.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn hex_to_hash(hex: &str) -> Result<[u8; 32]> {
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(AuthError::InvalidKeyHash(
                "expected 64 hex characters".to_string(),
            ));
        }
        let mut hash = [0u8; 32];
        for (i, byte) in hash.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| AuthError::InvalidKeyHash(e.to_string()))?;
        }
        Ok(hash)
    }

    /// SHA-256 hex digest of a raw key, as stored in configuration
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        Self::hash_to_hex(&Self::hash_key(token))
    }

    /// Register a pre-hashed key (loaded from configuration)
    pub fn register_key_hash(&self, caller_id: &str, key_hash_hex: &str, label: &str) -> Result<()> {
        let normalized = key_hash_hex.trim().to_lowercase();
        let key_hash = Self::hex_to_hash(&normalized)?;

        let mut keys = self
            .keys
            .write()
            .map_err(|e| AuthError::Internal(format!("Lock poisoned: {}", e)))?;
        keys.insert(
            normalized,
            StoredKey {
                key_hash,
                caller_id: caller_id.to_string(),
                label: label.to_string(),
                created_at: Utc::now(),
                revoked: false,
            },
        );
        debug!(caller_id = %caller_id, label = %label, "API key registered");
        Ok(())
    }

    /// Generate a new API key for a caller
    ///
    /// Returns the raw key (only shown once) and its hash.
    pub fn generate_api_key(&self, caller_id: &str, label: &str) -> Result<(String, String)> {
        let raw_key = format!("{}{}", KEY_PREFIX, Uuid::new_v4().as_simple());
        let key_hash_hex = Self::hash_token(&raw_key);
        self.register_key_hash(caller_id, &key_hash_hex, label)?;

        info!(
            caller_id = %caller_id,
            label = %label,
            key_prefix = %&raw_key[..12],
            "API key generated"
        );
        Ok((raw_key, key_hash_hex))
    }

    /// Validate a token/API key and return the caller context
    pub fn authenticate(&self, token: &str) -> Result<AuthContext> {
        if !self.enabled {
            return Ok(AuthContext {
                caller_id: self.dev_caller_id.clone(),
                method: AuthMethod::Disabled,
            });
        }

        if token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let token_hash = Self::hash_key(token);
        let token_hash_hex = Self::hash_to_hex(&token_hash);

        let keys = self
            .keys
            .read()
            .map_err(|e| AuthError::Internal(format!("Lock poisoned: {}", e)))?;

        let Some(stored) = keys.get(&token_hash_hex) else {
            warn!("Invalid token attempt");
            return Err(AuthError::InvalidCredentials);
        };

        let hashes_match: bool = stored.key_hash.ct_eq(&token_hash).into();
        if !hashes_match {
            return Err(AuthError::InvalidCredentials);
        }
        if stored.revoked {
            return Err(AuthError::TokenRevoked);
        }

        debug!(caller_id = %stored.caller_id, label = %stored.label, "Token validated");
        Ok(AuthContext {
            caller_id: stored.caller_id.clone(),
            method: AuthMethod::ApiKey,
        })
    }

    /// Revoke a key by its hash
    pub fn revoke_key(&self, key_hash_hex: &str) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|e| AuthError::Internal(format!("Lock poisoned: {}", e)))?;

        let stored = keys
            .get_mut(&key_hash_hex.trim().to_lowercase())
            .ok_or(AuthError::InvalidCredentials)?;
        stored.revoked = true;
        info!(
            caller_id = %stored.caller_id,
            label = %stored.label,
            registered_at = %stored.created_at,
            "API key revoked"
        );
        Ok(())
    }

    /// Get count of active (non-revoked) keys
    pub fn active_key_count(&self) -> usize {
        self.keys
            .read()
            .map(|keys| keys.values().filter(|k| !k.revoked).count())
            .unwrap_or(0)
    }
}
