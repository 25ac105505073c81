//! Test doubles for the engine boundary.
//!
//! Exercises connection, save-variant, and cleanup behavior without a real
//! automation engine. Used by unit and integration tests; also handy for
//! downstream consumers that want to dry-run batch flows.

mod mock_engine;

pub use mock_engine::{ConnectScript, MockEngineBackend, MockEngineSession, SessionCall};
