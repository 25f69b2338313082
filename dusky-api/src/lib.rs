//! # Dusky API Server Library
//!
//! HTTP surface of the Dusky social backend.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extractors`: Typed access to the caller and path user
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `seed`: Development data for the `seed` binary

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod seed;
