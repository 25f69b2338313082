/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_URL`: Public base URL of this API (default: http://localhost:8080)
/// - `FRONTEND_URL`: Web client base URL; invitation emails link to its
///   `/auth/confirm` page, which calls the activation endpoint (default: `API_URL`)
/// - `APP_ENV`: `production` enables HSTS, live mail and hides invitation tokens
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_QUERY_TIMEOUT_SECS`: Per-operation storage timeout (default: 5)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `JWT_AUDIENCE` / `JWT_ISSUER`: Expected `aud`/`iss` claims (default: dusky)
/// - `JWT_TTL_HOURS`: Access token lifetime (default: 72)
/// - `INVITATION_TTL_HOURS`: Invitation lifetime (default: 24)
/// - `SENDGRID_API_KEY`: Enables SendGrid delivery; mail is only logged without it
/// - `MAIL_FROM_EMAIL`: Sender address (default: noreply@dusky.dev)
/// - `MAIL_MAX_RETRIES`: Delivery attempts per message (default: 3)
/// - `EXPOSE_INVITATION_TOKEN`: Return the invitation token in the register
///   response (default: true outside production)
///
/// # Example
///
/// ```no_run
/// use dusky_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use dusky_shared::db::pool::PoolConfig;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Minimum accepted JWT secret length
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: PoolConfig,
    pub jwt: JwtConfig,
    pub invitation: InvitationConfig,
    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Public base URL
    pub url: String,

    /// Web client base URL used in activation links
    pub frontend_url: String,

    /// Running with `APP_ENV=production`
    pub production: bool,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,

    /// Include the plaintext invitation token in the register response
    pub expose_invitation_token: bool,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub audience: String,
    pub issuer: String,

    /// Access token lifetime in hours
    pub ttl_hours: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// Invitation configuration
#[derive(Debug, Clone)]
pub struct InvitationConfig {
    /// Invitation lifetime in hours
    pub ttl_hours: i64,
}

/// Outbound mail configuration
#[derive(Clone)]
pub struct MailConfig {
    /// SendGrid API key; `None` selects the logging mailer
    pub sendgrid_api_key: Option<String>,

    pub from_email: String,

    pub max_retries: u32,

    /// Ask the provider to validate without delivering
    pub sandbox: bool,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field(
                "sendgrid_api_key",
                &self.sendgrid_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("from_email", &self.from_email)
            .field("max_retries", &self.max_retries)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// Reads a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&var, "API_PORT", 8080)?;
        let url = var("API_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();
        let frontend_url = var("FRONTEND_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| url.clone());

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let expose_invitation_token = parse_or(&var, "EXPOSE_INVITATION_TOKEN", !production)?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections: u32 = parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?;
        let query_timeout_secs: u64 = parse_or(&var, "DATABASE_QUERY_TIMEOUT_SECS", 5)?;
        if query_timeout_secs == 0 {
            anyhow::bail!("DATABASE_QUERY_TIMEOUT_SECS must be greater than 0");
        }

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LEN);
        }
        let jwt_ttl_hours: i64 = parse_or(&var, "JWT_TTL_HOURS", 72)?;
        let invitation_ttl_hours: i64 = parse_or(&var, "INVITATION_TTL_HOURS", 24)?;
        if jwt_ttl_hours <= 0 || invitation_ttl_hours <= 0 {
            anyhow::bail!("JWT_TTL_HOURS and INVITATION_TTL_HOURS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                url,
                frontend_url,
                production,
                cors_origins,
                expose_invitation_token,
            },
            database: PoolConfig {
                max_connections,
                min_connections: max_connections.min(2),
                query_timeout: Duration::from_secs(query_timeout_secs),
                ..PoolConfig::new(database_url)
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                audience: var("JWT_AUDIENCE").unwrap_or_else(|| "dusky".to_string()),
                issuer: var("JWT_ISSUER").unwrap_or_else(|| "dusky".to_string()),
                ttl_hours: jwt_ttl_hours,
            },
            invitation: InvitationConfig {
                ttl_hours: invitation_ttl_hours,
            },
            mail: MailConfig {
                sendgrid_api_key: var("SENDGRID_API_KEY"),
                from_email: var("MAIL_FROM_EMAIL").unwrap_or_else(|| "noreply@dusky.dev".to_string()),
                max_retries: parse_or(&var, "MAIL_MAX_RETRIES", 3)?,
                sandbox: !production,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}
