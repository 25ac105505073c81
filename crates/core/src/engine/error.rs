//! Error types for the engine adapter.

use std::path::PathBuf;
use thiserror::Error;

use super::traits::SaveCallVariant;

/// One failed connection attempt, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    /// The identity (ProgID) that was tried.
    pub identity: String,
    /// The failure diagnostic.
    pub error: String,
}

/// Errors raised by the engine adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No identity connected. Fatal for the batch; nothing has run yet.
    #[error("Failed to connect to the automation engine; tried {}: {}",
        .attempts.len(),
        .attempts.iter().map(|a| format!("{}: {}", a.identity, a.error)).collect::<Vec<_>>().join("; "))]
    ConnectionFailed {
        /// Every attempted identity with its diagnostic.
        attempts: Vec<ConnectAttempt>,
    },

    /// An operation was attempted without a live session.
    #[error("Engine is not connected")]
    NotConnected,
}

/// Failure of a single document conversion.
///
/// Always local to one task; the batch continues.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// No live session.
    #[error("Engine is not connected")]
    NotConnected,

    /// The engine could not open the input document.
    #[error("Failed to open {}: {reason}", .path.display())]
    OpenFailed {
        /// Input document path.
        path: PathBuf,
        /// Engine diagnostic.
        reason: String,
    },

    /// Every save-call variant failed.
    #[error("All save attempts failed for {}: {}", .path.display(),
        .attempts.iter().map(|(v, e)| format!("{}: {}", v.describe(), e)).collect::<Vec<_>>().join("; "))]
    SaveFailed {
        /// Output path that could not be written.
        path: PathBuf,
        /// Each variant tried with its diagnostic, in attempt order.
        attempts: Vec<(SaveCallVariant, String)>,
    },
}
