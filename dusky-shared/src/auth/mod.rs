/// Authentication primitives for Dusky
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing and verification
/// - [`token`]: Random invitation tokens and their SHA-256 lookup hashes
/// - [`jwt`]: HS256 access token issuing and validation
/// - [`identity`]: Typed request-scope slots for the caller and path user
/// - [`middleware`]: Axum middleware that fills those slots
///
/// # Example
///
/// ```
/// use dusky_shared::auth::password::{Credential, PasswordParams};
/// use dusky_shared::auth::token::generate_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credential = Credential::set("user_password", &PasswordParams::default())?;
/// assert!(credential.verify("user_password"));
///
/// let token = generate_token();
/// assert_eq!(token.hash(), dusky_shared::auth::token::hash_token(token.expose()));
/// # Ok(())
/// # }
/// ```

pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod token;
