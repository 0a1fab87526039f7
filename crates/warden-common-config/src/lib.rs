//! Configuration for Warden.
//!
//! Configuration lives in `.warden/config.yaml` and covers the audit log,
//! the access policy and proxy deadlines. Every section is optional.

pub mod types;
pub mod loader;
pub mod env;

pub use types::*;
pub use loader::*;
pub use env::*;
