//! Trait seams over the external automation engine.
//!
//! Everything here is synchronous on purpose: the engine's automation
//! runtime is thread-affine, and every call happens on the batch worker
//! thread that created the session.

use std::path::Path;

/// Which `SaveAs` call signature to use.
///
/// Newer engine versions (Hangul 2022 and later) require a third, empty
/// argument; older versions only accept two. [`SaveCallVariant::FALLBACK_ORDER`]
/// lists the variants in the order the adapter tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveCallVariant {
    /// `SaveAs(path, format, "")` - required by Hangul 2022+.
    ThreeArgEmpty,
    /// `SaveAs(path, format)` - the legacy signature.
    TwoArg,
}

impl SaveCallVariant {
    /// Fixed fallback order: newer signature first, legacy second.
    pub const FALLBACK_ORDER: [SaveCallVariant; 2] = [Self::ThreeArgEmpty, Self::TwoArg];

    /// Short label used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ThreeArgEmpty => "SaveAs/3",
            Self::TwoArg => "SaveAs/2",
        }
    }
}

/// Scope of the engine's `Clear` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// Close the active document, discarding unsaved changes.
    CloseActive,
    /// Close every open document.
    CloseAll,
}

impl ClearScope {
    /// The numeric option the engine expects.
    pub fn engine_option(&self) -> i32 {
        match self {
            Self::CloseActive => 1,
            Self::CloseAll => 3,
        }
    }
}

/// One live connection to the automation engine.
///
/// Any call may fail; failures are reported as plain diagnostic strings
/// (the engine surfaces little more than an HRESULT and a message) and the
/// adapter decides what is fatal and what is best-effort.
pub trait EngineSession {
    /// Disables the engine's interactive message boxes.
    fn disable_prompts(&mut self) -> Result<(), String>;

    /// Registers the benign file-path-check compatibility module.
    ///
    /// Not all engine versions support this; callers ignore failures.
    fn register_security_module(&mut self) -> Result<(), String>;

    /// Opens a document with a format hint and open options.
    fn open(&mut self, path: &Path, format_hint: &str, options: &str) -> Result<(), String>;

    /// Saves the active document using the given call-signature variant.
    fn save_as(
        &mut self,
        path: &Path,
        engine_code: &str,
        variant: SaveCallVariant,
    ) -> Result<(), String>;

    /// Closes documents according to `scope`.
    fn clear(&mut self, scope: ClearScope) -> Result<(), String>;

    /// Requests engine shutdown.
    fn quit(&mut self) -> Result<(), String>;
}

/// Factory for engine sessions, one identity at a time.
pub trait EngineBackend {
    /// The session type this backend produces.
    type Session: EngineSession;

    /// Attempts to connect using a single identity.
    ///
    /// The error is the diagnostic recorded for this identity when the
    /// adapter reports a total connection failure.
    fn connect(&self, identity: &str) -> Result<Self::Session, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_order() {
        assert_eq!(
            SaveCallVariant::FALLBACK_ORDER,
            [SaveCallVariant::ThreeArgEmpty, SaveCallVariant::TwoArg]
        );
    }

    #[test]
    fn test_clear_scope_options() {
        assert_eq!(ClearScope::CloseActive.engine_option(), 1);
        assert_eq!(ClearScope::CloseAll.engine_option(), 3);
    }

    #[test]
    fn test_variant_labels() {
        assert_eq!(SaveCallVariant::ThreeArgEmpty.describe(), "SaveAs/3");
        assert_eq!(SaveCallVariant::TwoArg.describe(), "SaveAs/2");
    }
}
