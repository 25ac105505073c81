//! Automation engine adapter.
//!
//! This module owns the lifecycle of one handle to the external Hangul
//! automation engine. It compensates for API variance across engine versions
//! with ordered fallback strategies:
//!
//! - **Connection**: a prioritized list of identities (ProgIDs) is tried in
//!   order; the first that connects wins.
//! - **Save call**: the engine's `SaveAs` takes two arguments on older
//!   versions and requires a third empty argument on newer ones; both
//!   variants are tried in fixed order.
//!
//! The engine is a single exclusive, thread-affine resource: one live handle
//! at a time, created, used, and released on the same worker thread.

mod adapter;
mod config;
mod error;
mod traits;

#[cfg(windows)]
mod com;

pub use adapter::EngineAdapter;
pub use config::EngineConfig;
pub use error::{ConnectAttempt, ConvertError, EngineError};
pub use traits::{ClearScope, EngineBackend, EngineSession, SaveCallVariant};

#[cfg(windows)]
pub use com::ComEngineBackend;
