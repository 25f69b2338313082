/// JWT issuing and validation
///
/// Access tokens are signed with HS256 (HMAC-SHA256) and carry the numeric
/// user id as `sub`. Validation pins the algorithm to HS256 and requires
/// `exp`, `aud` and `iss` to be present and to match the configured values.
///
/// # Security
///
/// - **Algorithm**: HS256 only; tokens declaring any other `alg` are rejected
/// - **Expiration**: Configurable TTL, checked on every validation
/// - **Audience / Issuer**: Must match the authenticator's configuration
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use dusky_shared::auth::jwt::JwtAuthenticator;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = JwtAuthenticator::new(
///     "your-secret-key-at-least-32-bytes-long",
///     "dusky",
///     "dusky",
///     Duration::hours(72),
/// );
///
/// let token = auth.issue(42)?;
/// let claims = auth.validate(&token)?;
/// assert_eq!(claims.sub, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature does not verify against the secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Header declares an algorithm other than HS256
    #[error("Unexpected signing algorithm")]
    AlgorithmMismatch,

    /// Audience claim missing or wrong
    #[error("Invalid audience")]
    InvalidAudience,

    /// Issuer claim missing or wrong
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// A required claim is absent
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Anything else: malformed token, bad encoding, wrong claim types
    #[error("Invalid token: {0}")]
    Malformed(String),
}

/// JWT claims
///
/// `sub` is the numeric user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: i64,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

/// Issues and validates access tokens
///
/// Built once at startup from configuration and shared behind an `Arc`.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    audience: String,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    /// Creates an authenticator for the given secret, audience, issuer and token TTL
    pub fn new(
        secret: &str,
        audience: impl Into<String>,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            audience: audience.into(),
            issuer: issuer.into(),
            ttl,
        }
    }

    /// Builds claims for `user_id` expiring after the configured TTL
    pub fn claims_for(&self, user_id: i64) -> Claims {
        self.claims_with_expiration(user_id, self.ttl)
    }

    /// Builds claims with an explicit lifetime (negative = already expired)
    pub fn claims_with_expiration(&self, user_id: i64, expires_in: Duration) -> Claims {
        let now = Utc::now();

        Claims {
            sub: user_id,
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Issues a signed access token for `user_id`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if encoding fails
    pub fn issue(&self, user_id: i64) -> Result<String, JwtError> {
        self.sign(&self.claims_for(user_id))
    }

    /// Signs arbitrary claims with HS256
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::CreateError(e.to_string()))
    }

    /// Validates signature and standard claims, returning the claims
    ///
    /// Verifies:
    /// - Algorithm is HS256
    /// - Signature is valid
    /// - `exp`, `aud`, `iss` are present; token not expired
    /// - Audience and issuer match
    /// - Token is not used before `nbf`
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => JwtError::AlgorithmMismatch,
                ErrorKind::InvalidAudience => JwtError::InvalidAudience,
                ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
                ErrorKind::MissingRequiredClaim(claim) => JwtError::MissingClaim(claim.clone()),
                _ => JwtError::Malformed(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new(SECRET, "dusky-test", "dusky", Duration::hours(1))
    }

    #[test]
    fn test_issue_and_validate() {
        let auth = authenticator();
        let token = auth.issue(7).expect("Should create token");

        let claims = auth.validate(&token).expect("Should validate token");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.aud, "dusky-test");
        assert_eq!(claims.iss, "dusky");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = authenticator().issue(1).unwrap();
        let other = JwtAuthenticator::new("another-secret-key-of-32-bytes-long!", "dusky-test", "dusky", Duration::hours(1));

        assert!(matches!(other.validate(&token), Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_validate_expired_token() {
        let auth = authenticator();
        let claims = auth.claims_with_expiration(1, Duration::seconds(-3600));
        let token = auth.sign(&claims).unwrap();

        assert!(matches!(auth.validate(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_wrong_audience() {
        let token = authenticator().issue(1).unwrap();
        let other = JwtAuthenticator::new(SECRET, "someone-else", "dusky", Duration::hours(1));

        assert!(matches!(other.validate(&token), Err(JwtError::InvalidAudience)));
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let token = authenticator().issue(1).unwrap();
        let other = JwtAuthenticator::new(SECRET, "dusky-test", "not-dusky", Duration::hours(1));

        assert!(matches!(other.validate(&token), Err(JwtError::InvalidIssuer)));
    }

    #[test]
    fn test_validate_rejects_other_algorithm() {
        let auth = authenticator();
        let claims = auth.claims_for(1);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(auth.validate(&token), Err(JwtError::AlgorithmMismatch)));
    }

    #[test]
    fn test_validate_missing_audience() {
        #[derive(Serialize)]
        struct NoAudience {
            sub: i64,
            iss: String,
            exp: i64,
        }

        let auth = authenticator();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoAudience {
                sub: 1,
                iss: "dusky".to_string(),
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(auth.validate(&token).is_err());
    }

    #[test]
    fn test_validate_garbage() {
        let auth = authenticator();

        assert!(matches!(auth.validate("not-a-jwt"), Err(JwtError::Malformed(_))));
        assert!(auth.validate("").is_err());
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", authenticator());
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("dusky-test"));
    }
}
