/// Opaque invitation tokens and their lookup hashes
///
/// Invitation tokens are 32 random bytes from the OS CSPRNG, hex encoded.
/// The plaintext is handed to the caller exactly once; only its SHA-256
/// digest ([`TokenHash`]) is ever written to the database.
///
/// SHA-256 is deliberate here: the token already carries 256 bits of entropy,
/// so the digest only needs to be a deterministic, non-reversible index.
///
/// # Example
///
/// ```
/// use dusky_shared::auth::token::{generate_token, hash_token, TOKEN_LENGTH};
///
/// let token = generate_token();
/// assert_eq!(token.expose().len(), TOKEN_LENGTH);
///
/// // Same input = same hash
/// assert_eq!(hash_token(token.expose()), token.hash());
/// ```

use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes in a token
const TOKEN_BYTES: usize = 32;

/// Length of an encoded plaintext token (hex)
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Length of an encoded token hash (hex SHA-256)
pub const TOKEN_HASH_LENGTH: usize = 64;

/// Plaintext invitation token
///
/// Never persisted. `Debug` redacts the value so it cannot leak through logs.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlaintextToken(String);

impl PlaintextToken {
    /// Returns the raw token for delivery (email, response body)
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Lookup hash of this token
    pub fn hash(&self) -> TokenHash {
        hash_token(&self.0)
    }
}

impl fmt::Debug for PlaintextToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextToken(<redacted>)")
    }
}

/// Hex-encoded SHA-256 digest of a token, safe to store and index
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates a new random token
pub fn generate_token() -> PlaintextToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    PlaintextToken(hex::encode(bytes))
}

/// Derives the lookup hash for a plaintext token
pub fn hash_token(token: &str) -> TokenHash {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    TokenHash(hex::encode(hasher.finalize()))
}

/// Cheap shape check for tokens arriving from URLs
///
/// Lets callers reject garbage without a database round trip.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_hexdigit())
}
