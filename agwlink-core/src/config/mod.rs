//! Configuration types
//!
//! Driver configuration, persisted either as postcard binary data or as TOML
//! text.

pub mod loader;
pub mod types;

pub use loader::ConfigError;
pub use types::*;
