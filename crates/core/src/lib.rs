//! Batch HWP/HWPX document conversion.
//!
//! Drives the single-instance Hangul automation engine through an
//! open/save/close lifecycle per file, with ordered fallback strategies for
//! engine API variance, cooperative cancellation, deterministic output-path
//! planning, and Windows drop interception for elevated processes.

pub mod batch;
pub mod droptarget;
pub mod engine;
pub mod format;
pub mod planner;
pub mod settings;
pub mod task;
pub mod testing;

pub use batch::{
    BatchError, BatchEvent, BatchHandle, BatchOrchestrator, BatchReport, BatchState, CancelFlag,
};
pub use engine::{
    ClearScope, ConnectAttempt, ConvertError, EngineAdapter, EngineBackend, EngineConfig,
    EngineError, EngineSession, SaveCallVariant,
};
pub use format::{catalog, FormatSpec, TargetFormat, UnknownFormat};
pub use planner::{plan_directory, plan_files, PlanOptions, PlannerError};
pub use settings::{load_settings, save_settings, InputMode, Settings};
pub use task::{ConversionTask, TaskStatus};

#[cfg(windows)]
pub use engine::ComEngineBackend;

#[cfg(windows)]
pub use droptarget::win::is_elevated;
