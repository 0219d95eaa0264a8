//! Middleware.

pub mod auth;

pub use auth::RequireApiKey;
