//! Middleware module for Muse HTTP server
//!
//! Provides authentication (Bearer token / API key) resolving each request
//! to a caller id.

pub mod auth;
