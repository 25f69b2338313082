//! # Dusky Shared Library
//!
//! Domain core of the Dusky social backend, used by the API server.
//!
//! ## Module Organization
//!
//! - `accounts`: Registration, invitation, activation and login
//! - `auth`: Credentials, tokens, JWT, request identity and middleware
//! - `db`: Connection pool, migrations and per-operation timeouts
//! - `error`: Domain error taxonomy
//! - `mailer`: Outbound email backends and background dispatch
//! - `models`: Database models (users, invitations, posts, comments, followers, feed)

pub mod accounts;
pub mod auth;
pub mod db;
pub mod error;
pub mod mailer;
pub mod models;

/// Current version of the Dusky shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
