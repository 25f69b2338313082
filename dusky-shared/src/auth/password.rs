/// Credential model backed by Argon2id
///
/// A [`Credential`] owns the salted one-way hash of a user's password. The
/// plaintext only ever passes through [`Credential::set`] and
/// [`Credential::verify`]; it is never stored, logged or serialized.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB) by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Output**: 32-byte hash
///
/// The cost parameters live in [`PasswordParams`], which is built once at
/// startup and shared read-only for the lifetime of the process.
///
/// # Example
///
/// ```
/// use dusky_shared::auth::password::{Credential, PasswordParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = PasswordParams::default();
/// let credential = Credential::set("super_secret_password_123", &params)?;
///
/// assert!(credential.verify("super_secret_password_123"));
/// assert!(!credential.verify("wrong_password"));
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use std::fmt;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Cost parameters were rejected by argon2
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

/// Argon2id cost parameters
///
/// Fixed for the process lifetime. Hashes embed their own parameters, so
/// changing these only affects newly set credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl PasswordParams {
    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(self.memory_kib)
            .t_cost(self.iterations)
            .p_cost(self.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Salted one-way hash of a password (PHC string format)
///
/// Stored in `users.password_hash`. The `Debug` impl never prints the hash.
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct Credential(String);

impl Credential {
    /// Hashes `plaintext` with a fresh random salt
    ///
    /// Two calls with the same plaintext yield different hashes; both verify.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError` if the parameters are invalid or hashing fails.
    pub fn set(plaintext: &str, params: &PasswordParams) -> Result<Self, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = params.hasher()?;

        let hash = argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(e.to_string()))?;

        Ok(Self(hash.to_string()))
    }

    /// Wraps a hash previously produced by [`Credential::set`]
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// PHC string for persistence
    pub fn as_hash(&self) -> &str {
        &self.0
    }

    /// Checks `plaintext` against the stored hash
    ///
    /// Comparison is constant-time inside argon2. A malformed stored hash is
    /// reported as a failed verification, never as a panic.
    pub fn verify(&self, plaintext: &str) -> bool {
        let parsed = match PasswordHash::new(&self.0) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential is not a valid PHC string");
                return false;
            }
        };

        // Parameters are read from the PHC string itself
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Credential verification failed");
                false
            }
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
