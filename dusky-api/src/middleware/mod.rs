/// Middleware modules for the API server
///
/// Authentication middleware lives in `dusky_shared::auth::middleware`; this
/// module holds HTTP concerns specific to the server.
///
/// - `security`: Security response headers

pub mod security;
