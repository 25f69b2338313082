/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and invitation resend
/// - `users`: Activation, profiles, follows and the feed
/// - `posts`: Posts and comments

pub mod auth;
pub mod health;
pub mod posts;
pub mod users;
