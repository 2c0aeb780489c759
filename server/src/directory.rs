//! In-memory account directory.
//!
//! The directory owns every account record: registration assigns sequential
//! identities, lookups are by email or id, and records are never mutated or
//! deleted. It is an explicitly owned store injected into handlers through
//! application state, so tests can construct independent instances.
//!
//! # Credential Handling
//!
//! Passwords are never stored or logged. Registration derives a salted
//! SHA-256 digest of the password; authentication recomputes the digest and
//! compares it in constant time. Unknown email and wrong password produce
//! the same error so callers cannot distinguish the two cases.
//!
//! # Thread Safety
//!
//! [`AccountDirectory`] is `Clone` and uses interior mutability with
//! [`RwLock`] for safe access across async tasks; clones share the same
//! underlying store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info};

/// Salt length for credential derivation.
const SALT_BYTES: usize = 16;

/// Errors that can occur during directory operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The email is already registered.
    #[error("email already registered")]
    Conflict,

    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account with the requested id.
    #[error("account not found")]
    NotFound,
}

/// A salted one-way derivation of a password.
#[derive(Debug, Clone)]
struct StoredCredential {
    salt: [u8; SALT_BYTES],
    digest: [u8; 32],
}

impl StoredCredential {
    /// Derives a credential from a password with a fresh random salt.
    fn derive(password: &str) -> Self {
        let mut salt = [0u8; SALT_BYTES];
        rand::rng().fill(&mut salt);
        Self {
            digest: digest_password(&salt, password),
            salt,
        }
    }

    /// Verifies a claimed password against the stored derivation.
    fn verify(&self, password: &str) -> bool {
        let candidate = digest_password(&self.salt, password);
        bool::from(candidate[..].ct_eq(&self.digest[..]))
    }
}

/// SHA-256 over `salt || password`.
fn digest_password(salt: &[u8; SALT_BYTES], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// A stored account record. Created on registration; never mutated.
#[derive(Debug, Clone)]
struct Account {
    id: u64,
    email: String,
    name: String,
    credential: StoredCredential,
    profile_icon: String,
    created_at: DateTime<Utc>,
}

/// Public account view returned by register and authenticate.
///
/// The credential is withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub profile_icon: String,
}

/// Public account view for profile lookups; includes the creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub profile_icon: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            profile_icon: self.profile_icon.clone(),
        }
    }

    fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            profile_icon: self.profile_icon.clone(),
            created_at: self.created_at,
        }
    }
}

struct DirectoryInner {
    /// Accounts keyed by email; email uniqueness follows from the map key.
    accounts: HashMap<String, Account>,

    /// Next identity to assign. Monotonic; ids are never reused.
    next_id: u64,
}

/// Thread-safe in-memory account store.
#[derive(Clone)]
pub struct AccountDirectory {
    inner: Arc<RwLock<DirectoryInner>>,
}

impl Default for AccountDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountDirectory {
    /// Creates an empty directory. The first registered account gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DirectoryInner {
                accounts: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Registers a new account.
    ///
    /// Fails with [`DirectoryError::Conflict`] if the email is already
    /// present (case-sensitive exact match). On success the record is
    /// stored and the public view returned.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserView, DirectoryError> {
        let mut inner = self.inner.write().unwrap();

        if inner.accounts.contains_key(email) {
            debug!(email = %email, "Registration rejected: email exists");
            return Err(DirectoryError::Conflict);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let account = Account {
            id,
            email: email.to_string(),
            name: name.to_string(),
            credential: StoredCredential::derive(password),
            profile_icon: avatar_url(name),
            created_at: Utc::now(),
        };
        let view = account.view();

        inner.accounts.insert(email.to_string(), account);

        info!(user_id = id, email = %email, name = %name, "New user registered");

        Ok(view)
    }

    /// Authenticates an email/password pair.
    ///
    /// Returns the same [`DirectoryError::InvalidCredentials`] whether the
    /// email is unknown or the password mismatches.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserView, DirectoryError> {
        let inner = self.inner.read().unwrap();

        let account = inner
            .accounts
            .get(email)
            .ok_or(DirectoryError::InvalidCredentials)?;

        if !account.credential.verify(password) {
            debug!(email = %email, "Authentication failed");
            return Err(DirectoryError::InvalidCredentials);
        }

        info!(user_id = account.id, email = %email, "User login");

        Ok(account.view())
    }

    /// Looks up an account by identity.
    pub fn find_by_id(&self, id: u64) -> Result<UserProfile, DirectoryError> {
        let inner = self.inner.read().unwrap();

        inner
            .accounts
            .values()
            .find(|account| account.id == id)
            .map(Account::profile)
            .ok_or(DirectoryError::NotFound)
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().accounts.len()
    }

    /// Returns `true` if no accounts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().accounts.is_empty()
    }
}

impl std::fmt::Debug for AccountDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDirectory")
            .field("len", &self.len())
            .finish()
    }
}

/// Derived avatar reference for a display name.
fn avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random&color=fff&size=100",
        urlencoding::encode(name)
    )
}
