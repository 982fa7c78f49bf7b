//! Server module for Muse
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Production configuration validation
//! - `init`: Store and provider construction, main run loop

pub mod config;
mod init;
mod loader;
mod validation;

// Re-export public API
pub use init::{build_auth_store, open_usage_store, run};
pub use loader::load_config;
