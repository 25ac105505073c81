//! Engine adapter: identity fallback, per-document conversion, cleanup.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::error::{ConnectAttempt, ConvertError, EngineError};
use super::traits::{ClearScope, EngineBackend, EngineSession, SaveCallVariant};

/// Owns one live engine session for the duration of a batch.
///
/// The adapter is constructed at batch start, used for every per-document
/// call on the same worker thread, and released via [`EngineAdapter::cleanup`]
/// on every exit path. It is never shared across batches.
pub struct EngineAdapter<B: EngineBackend> {
    backend: B,
    config: EngineConfig,
    session: Option<B::Session>,
    identity_used: Option<String>,
}

impl<B: EngineBackend> EngineAdapter<B> {
    /// Creates a disconnected adapter.
    pub fn new(backend: B, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            session: None,
            identity_used: None,
        }
    }

    /// Whether a session is live.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// The identity that connected, once [`EngineAdapter::connect`] succeeded.
    pub fn identity_used(&self) -> Option<&str> {
        self.identity_used.as_deref()
    }

    /// Connects to the engine, trying each configured identity in order.
    ///
    /// On success the engine's interactive prompts are disabled and the
    /// file-path-check compatibility module is registered best-effort (some
    /// engine versions do not support it). On total failure every attempt's
    /// diagnostic is reported together.
    pub fn connect(&mut self) -> Result<(), EngineError> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut attempts = Vec::new();

        for identity in &self.config.identities {
            match self.backend.connect(identity) {
                Ok(mut session) => {
                    if let Err(e) = session.register_security_module() {
                        // Unsupported on some engine versions.
                        debug!(identity, error = %e, "Security module registration skipped");
                    }
                    if let Err(e) = session.disable_prompts() {
                        debug!(identity, error = %e, "Failed to disable prompts, trying next identity");
                        attempts.push(ConnectAttempt {
                            identity: identity.clone(),
                            error: e,
                        });
                        continue;
                    }
                    info!(identity, "Connected to automation engine");
                    self.session = Some(session);
                    self.identity_used = Some(identity.clone());
                    return Ok(());
                }
                Err(e) => {
                    debug!(identity, error = %e, "Connection attempt failed");
                    attempts.push(ConnectAttempt {
                        identity: identity.clone(),
                        error: e,
                    });
                }
            }
        }

        Err(EngineError::ConnectionFailed { attempts })
    }

    /// Converts one document.
    ///
    /// Opens the input with automatic format detection and a forced-open
    /// flag, waits the stabilization delay, then tries each save-call
    /// variant in [`SaveCallVariant::FALLBACK_ORDER`], stopping at the first
    /// success. The open document is closed best-effort regardless of the
    /// save outcome. There is no per-call timeout: a genuinely hung engine
    /// stalls the batch, and cancellation only takes effect between tasks.
    pub fn convert(
        &mut self,
        input: &Path,
        output: &Path,
        engine_code: &str,
    ) -> Result<(), ConvertError> {
        let session = self.session.as_mut().ok_or(ConvertError::NotConnected)?;

        if let Err(reason) = session.open(
            input,
            &self.config.open_format_hint,
            &self.config.open_options,
        ) {
            // The open may have left a partial document behind.
            Self::close_active(session);
            return Err(ConvertError::OpenFailed {
                path: input.to_path_buf(),
                reason,
            });
        }

        // The engine finishes loading asynchronously after Open returns.
        if self.config.stabilization_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.stabilization_delay_ms));
        }

        let mut attempts = Vec::new();
        let mut saved = false;

        for variant in SaveCallVariant::FALLBACK_ORDER {
            match session.save_as(output, engine_code, variant) {
                Ok(()) => {
                    debug!(variant = variant.describe(), output = %output.display(), "Save succeeded");
                    saved = true;
                    break;
                }
                Err(e) => {
                    debug!(variant = variant.describe(), error = %e, "Save attempt failed");
                    attempts.push((variant, e));
                }
            }
        }

        Self::close_active(session);

        if saved {
            Ok(())
        } else {
            Err(ConvertError::SaveFailed {
                path: output.to_path_buf(),
                attempts,
            })
        }
    }

    /// Releases the session: closes all documents and quits the engine.
    ///
    /// Each step is independently best-effort; failures are logged and never
    /// propagated. Safe to call when already disconnected.
    pub fn cleanup(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Err(e) = session.clear(ClearScope::CloseAll) {
            warn!(error = %e, "Failed to close documents during cleanup");
        }
        if let Err(e) = session.quit() {
            warn!(error = %e, "Failed to quit engine during cleanup");
        }

        info!("Engine session released");
    }

    fn close_active(session: &mut B::Session) {
        if let Err(e) = session.clear(ClearScope::CloseActive) {
            debug!(error = %e, "Failed to close active document");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ConnectScript, MockEngineBackend, SessionCall};
    use std::path::PathBuf;

    fn adapter_with(backend: MockEngineBackend) -> EngineAdapter<MockEngineBackend> {
        let config = EngineConfig {
            stabilization_delay_ms: 0,
            ..EngineConfig::default()
        };
        EngineAdapter::new(backend, config)
    }

    #[test]
    fn test_connect_uses_first_working_identity() {
        let backend = MockEngineBackend::new(ConnectScript::FailFirst(2));
        let mut adapter = adapter_with(backend);

        adapter.connect().unwrap();
        assert_eq!(adapter.identity_used(), Some("HWPFrame.HwpObject"));
        assert!(adapter.is_connected());
    }

    #[test]
    fn test_connect_reports_every_attempt_on_total_failure() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysFail);
        let mut adapter = adapter_with(backend);

        let err = adapter.connect().unwrap_err();
        match err {
            EngineError::ConnectionFailed { attempts } => {
                assert_eq!(attempts.len(), 3);
                assert_eq!(attempts[0].identity, "HWPControl.HwpCtrl.1");
                assert_eq!(attempts[2].identity, "HWPFrame.HwpObject");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_connect_is_idempotent() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed);
        let mut adapter = adapter_with(backend);

        adapter.connect().unwrap();
        adapter.connect().unwrap();
        assert_eq!(adapter.backend.connect_attempts(), 1);
    }

    #[test]
    fn test_convert_success_closes_document() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed).without_output_files();
        let mut adapter = adapter_with(backend);
        adapter.connect().unwrap();

        adapter
            .convert(
                Path::new("in/a.hwp"),
                Path::new("out/a.pdf"),
                "PDF",
            )
            .unwrap();

        let calls = adapter.backend.session_calls();
        assert!(calls.contains(&SessionCall::Open(PathBuf::from("in/a.hwp"))));
        assert!(calls.contains(&SessionCall::SaveAs(
            PathBuf::from("out/a.pdf"),
            SaveCallVariant::ThreeArgEmpty
        )));
        assert!(calls.contains(&SessionCall::Clear(ClearScope::CloseActive)));
    }

    #[test]
    fn test_save_fallback_succeeds_on_second_variant() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed)
            .without_output_files()
            .with_failing_save_variant(SaveCallVariant::ThreeArgEmpty, "bad arg count");
        let mut adapter = adapter_with(backend);
        adapter.connect().unwrap();

        adapter
            .convert(Path::new("a.hwp"), Path::new("a.pdf"), "PDF")
            .unwrap();

        let calls = adapter.backend.session_calls();
        assert!(calls.contains(&SessionCall::SaveAs(
            PathBuf::from("a.pdf"),
            SaveCallVariant::TwoArg
        )));
    }

    #[test]
    fn test_save_failure_combines_both_diagnostics() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed)
            .with_failing_save_variant(SaveCallVariant::ThreeArgEmpty, "three failed")
            .with_failing_save_variant(SaveCallVariant::TwoArg, "two failed");
        let mut adapter = adapter_with(backend);
        adapter.connect().unwrap();

        let err = adapter
            .convert(Path::new("a.hwp"), Path::new("a.pdf"), "PDF")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("three failed"));
        assert!(msg.contains("two failed"));

        // The document is still closed after a failed save.
        let calls = adapter.backend.session_calls();
        assert!(calls.contains(&SessionCall::Clear(ClearScope::CloseActive)));
    }

    #[test]
    fn test_open_failure_is_local() {
        let backend =
            MockEngineBackend::new(ConnectScript::AlwaysSucceed).with_open_error("file locked");
        let mut adapter = adapter_with(backend);
        adapter.connect().unwrap();

        let err = adapter
            .convert(Path::new("a.hwp"), Path::new("a.pdf"), "PDF")
            .unwrap_err();
        assert!(matches!(err, ConvertError::OpenFailed { .. }));
        assert!(adapter.is_connected());
    }

    #[test]
    fn test_convert_without_connection() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed);
        let mut adapter = adapter_with(backend);

        let err = adapter
            .convert(Path::new("a.hwp"), Path::new("a.pdf"), "PDF")
            .unwrap_err();
        assert!(matches!(err, ConvertError::NotConnected));
    }

    #[test]
    fn test_cleanup_closes_all_and_quits() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed);
        let mut adapter = adapter_with(backend);
        adapter.connect().unwrap();

        adapter.cleanup();
        assert!(!adapter.is_connected());

        let calls = adapter.backend.session_calls();
        assert!(calls.contains(&SessionCall::Clear(ClearScope::CloseAll)));
        assert!(calls.contains(&SessionCall::Quit));
    }

    #[test]
    fn test_cleanup_swallows_failures() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed)
            .with_clear_error("already gone")
            .with_quit_error("engine crashed");
        let mut adapter = adapter_with(backend);
        adapter.connect().unwrap();

        // Must not panic or propagate.
        adapter.cleanup();
        assert!(!adapter.is_connected());
    }

    #[test]
    fn test_cleanup_when_disconnected_is_noop() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed);
        let mut adapter = adapter_with(backend);
        adapter.cleanup();
        assert!(adapter.backend.session_calls().is_empty());
    }
}
