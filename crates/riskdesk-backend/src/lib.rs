//! riskdesk backend
//!
//! The [`Backend`] trait is the single seam between the service layer and
//! persistence/auth. Two implementations ship here:
//!
//! - [`RestBackend`]: PostgREST-style HTTP client for the hosted database
//! - [`MemoryBackend`]: in-process tables for tests and demo mode
//!
//! With the `mock` feature, `MockBackend` (generated by `mockall`) is
//! available to downstream test suites.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backend;
mod error;
mod memory;
pub mod normalize;
mod rest;
mod wire;

#[cfg(any(test, feature = "mock"))]
pub use backend::MockBackend;
pub use backend::Backend;
pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use normalize::OneOrMany;
pub use rest::{BackendConfig, RestBackend};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
