//! Batch orchestrator.
//!
//! Drives planned conversion tasks sequentially through the engine adapter
//! on a dedicated worker thread, publishing progress events, honoring
//! cooperative cancellation, and guaranteeing adapter cleanup on every exit
//! path.

mod orchestrator;
mod types;

pub use orchestrator::{BatchHandle, BatchOrchestrator};
pub use types::{BatchError, BatchEvent, BatchReport, BatchState, CancelFlag};
