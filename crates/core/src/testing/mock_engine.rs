//! Mock engine backend for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::engine::{ClearScope, EngineBackend, EngineSession, SaveCallVariant};

/// How connection attempts should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectScript {
    /// Every identity connects.
    AlwaysSucceed,
    /// No identity connects.
    AlwaysFail,
    /// The first `n` identities fail, the next succeeds.
    FailFirst(usize),
}

/// A recorded session call, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    DisablePrompts,
    RegisterSecurityModule,
    Open(PathBuf),
    SaveAs(PathBuf, SaveCallVariant),
    Clear(ClearScope),
    Quit,
}

#[derive(Debug, Default)]
struct SharedState {
    connect_attempts: Vec<String>,
    session_calls: Vec<SessionCall>,
    save_errors: HashMap<SaveCallVariant, String>,
    open_error: Option<String>,
    clear_error: Option<String>,
    quit_error: Option<String>,
    /// When set, the save succeeds but no file is written; otherwise the
    /// mock creates an empty output file so planners and tests can observe
    /// on-disk results.
    skip_output_write: bool,
}

/// Mock implementation of [`EngineBackend`].
///
/// Behavior is scripted up front; every call made through the produced
/// sessions is recorded and can be inspected afterwards, even after the
/// session has been moved into an adapter.
#[derive(Debug, Clone)]
pub struct MockEngineBackend {
    script: ConnectScript,
    state: Arc<Mutex<SharedState>>,
}

impl MockEngineBackend {
    /// Creates a mock backend with the given connection script.
    pub fn new(script: ConnectScript) -> Self {
        Self {
            script,
            state: Arc::new(Mutex::new(SharedState::default())),
        }
    }

    /// Scripts a failure for one save-call variant.
    pub fn with_failing_save_variant(
        self,
        variant: SaveCallVariant,
        error: impl Into<String>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .save_errors
            .insert(variant, error.into());
        self
    }

    /// Scripts every `open` call to fail.
    pub fn with_open_error(self, error: impl Into<String>) -> Self {
        self.state.lock().unwrap().open_error = Some(error.into());
        self
    }

    /// Scripts every `clear` call to fail.
    pub fn with_clear_error(self, error: impl Into<String>) -> Self {
        self.state.lock().unwrap().clear_error = Some(error.into());
        self
    }

    /// Scripts every `quit` call to fail.
    pub fn with_quit_error(self, error: impl Into<String>) -> Self {
        self.state.lock().unwrap().quit_error = Some(error.into());
        self
    }

    /// Disables writing empty output files on successful saves.
    pub fn without_output_files(self) -> Self {
        self.state.lock().unwrap().skip_output_write = true;
        self
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_attempts.len()
    }

    /// Identities tried so far, in order.
    pub fn identities_tried(&self) -> Vec<String> {
        self.state.lock().unwrap().connect_attempts.clone()
    }

    /// Every session call recorded so far, in order.
    pub fn session_calls(&self) -> Vec<SessionCall> {
        self.state.lock().unwrap().session_calls.clone()
    }
}

impl EngineBackend for MockEngineBackend {
    type Session = MockEngineSession;

    fn connect(&self, identity: &str) -> Result<Self::Session, String> {
        let mut state = self.state.lock().unwrap();
        let attempt_index = state.connect_attempts.len();
        state.connect_attempts.push(identity.to_string());

        let ok = match self.script {
            ConnectScript::AlwaysSucceed => true,
            ConnectScript::AlwaysFail => false,
            ConnectScript::FailFirst(n) => attempt_index >= n,
        };

        if ok {
            Ok(MockEngineSession {
                state: Arc::clone(&self.state),
            })
        } else {
            Err(format!("{identity}: class not registered"))
        }
    }
}

/// Session produced by [`MockEngineBackend`].
#[derive(Debug)]
pub struct MockEngineSession {
    state: Arc<Mutex<SharedState>>,
}

impl EngineSession for MockEngineSession {
    fn disable_prompts(&mut self) -> Result<(), String> {
        self.state
            .lock()
            .unwrap()
            .session_calls
            .push(SessionCall::DisablePrompts);
        Ok(())
    }

    fn register_security_module(&mut self) -> Result<(), String> {
        self.state
            .lock()
            .unwrap()
            .session_calls
            .push(SessionCall::RegisterSecurityModule);
        Ok(())
    }

    fn open(&mut self, path: &Path, _format_hint: &str, _options: &str) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        state.session_calls.push(SessionCall::Open(path.to_path_buf()));
        match &state.open_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn save_as(
        &mut self,
        path: &Path,
        _engine_code: &str,
        variant: SaveCallVariant,
    ) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        state
            .session_calls
            .push(SessionCall::SaveAs(path.to_path_buf(), variant));
        if let Some(e) = state.save_errors.get(&variant) {
            return Err(e.clone());
        }
        if !state.skip_output_write {
            let _ = std::fs::write(path, b"");
        }
        Ok(())
    }

    fn clear(&mut self, scope: ClearScope) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        state.session_calls.push(SessionCall::Clear(scope));
        match &state.clear_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn quit(&mut self) -> Result<(), String> {
        let mut state = self.state.lock().unwrap();
        state.session_calls.push(SessionCall::Quit);
        match &state.quit_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_first_script() {
        let backend = MockEngineBackend::new(ConnectScript::FailFirst(1));
        assert!(backend.connect("First.Id").is_err());
        assert!(backend.connect("Second.Id").is_ok());
        assert_eq!(backend.identities_tried(), vec!["First.Id", "Second.Id"]);
    }

    #[test]
    fn test_calls_visible_after_session_moved() {
        let backend = MockEngineBackend::new(ConnectScript::AlwaysSucceed);
        let mut session = backend.connect("Any.Id").unwrap();
        session.quit().unwrap();
        drop(session);
        assert_eq!(backend.session_calls(), vec![SessionCall::Quit]);
    }
}
