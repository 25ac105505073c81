//! COM backend for the Hangul automation engine.
//!
//! Late-bound IDispatch automation: the engine is resolved from a ProgID at
//! runtime and every call goes through `GetIDsOfNames`/`Invoke`, because the
//! available interface differs between engine versions. This is the only
//! module that touches raw COM; everything it returns is typed.
//!
//! COM here is apartment-threaded and thread-affine: a session must be
//! created, used, and dropped on the same worker thread.

use std::path::Path;

use tracing::debug;
use windows::core::{BSTR, GUID, PCWSTR, VARIANT};
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoCreateInstance, CoInitializeEx, CoUninitialize, IDispatch,
    CLSCTX_ALL, COINIT_APARTMENTTHREADED, DISPATCH_METHOD, DISPPARAMS, EXCEPINFO,
};

use super::traits::{ClearScope, EngineBackend, EngineSession, SaveCallVariant};

const LOCALE_USER_DEFAULT: u32 = 0x0400;

/// Message-box mode value that suppresses all interactive prompts.
const MESSAGE_BOX_MODE_SILENT: i32 = 0x0000_0001;

/// Produces live COM sessions from ProgID identities.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComEngineBackend;

impl ComEngineBackend {
    /// Creates the backend. Connection happens per identity in
    /// [`EngineBackend::connect`], on the calling thread.
    pub fn new() -> Self {
        Self
    }
}

impl EngineBackend for ComEngineBackend {
    type Session = ComEngineSession;

    fn connect(&self, identity: &str) -> Result<Self::Session, String> {
        // Repeat initialization on an already-initialized thread is fine;
        // a mode mismatch is reported by the subsequent create call anyway.
        let init = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        let com_initialized = init.is_ok();
        if let Err(e) = init.ok() {
            debug!(error = %e, "CoInitializeEx did not initialize (may already be initialized)");
        }

        let wide = to_wide(identity);
        let clsid: GUID = unsafe { CLSIDFromProgID(PCWSTR(wide.as_ptr())) }
            .map_err(|e| format!("CLSIDFromProgID failed: {e}"))?;

        let dispatch: IDispatch = unsafe { CoCreateInstance(&clsid, None, CLSCTX_ALL) }
            .map_err(|e| format!("CoCreateInstance failed: {e}"))?;

        Ok(ComEngineSession {
            dispatch: Some(dispatch),
            com_initialized,
        })
    }
}

/// One live connection to the engine's automation object.
pub struct ComEngineSession {
    dispatch: Option<IDispatch>,
    com_initialized: bool,
}

impl ComEngineSession {
    fn invoke(&self, name: &str, args: &[VARIANT]) -> Result<VARIANT, String> {
        let dispatch = self
            .dispatch
            .as_ref()
            .ok_or_else(|| "session released".to_string())?;

        let wide = to_wide(name);
        let mut dispid = 0i32;
        unsafe {
            dispatch
                .GetIDsOfNames(
                    &GUID::zeroed(),
                    &PCWSTR(wide.as_ptr()),
                    1,
                    LOCALE_USER_DEFAULT,
                    &mut dispid,
                )
                .map_err(|e| format!("{name} is not supported by this engine version: {e}"))?;
        }

        // IDispatch expects arguments in reverse order.
        let mut reversed: Vec<VARIANT> = args.iter().rev().cloned().collect();
        let params = DISPPARAMS {
            rgvarg: if reversed.is_empty() {
                std::ptr::null_mut()
            } else {
                reversed.as_mut_ptr() as *mut _
            },
            rgdispidNamedArgs: std::ptr::null_mut(),
            cArgs: reversed.len() as u32,
            cNamedArgs: 0,
        };

        let mut result = VARIANT::default();
        let mut excep = EXCEPINFO::default();
        let invoked = unsafe {
            dispatch.Invoke(
                dispid,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                DISPATCH_METHOD,
                &params,
                Some(&mut result as *mut _ as *mut _),
                Some(&mut excep),
                None,
            )
        };

        invoked.map_err(|e| {
            let detail = excep.bstrDescription.to_string();
            if detail.is_empty() {
                format!("{name} failed: {e}")
            } else {
                format!("{name} failed: {detail}")
            }
        })?;

        Ok(result)
    }

    fn path_arg(path: &Path) -> VARIANT {
        VARIANT::from(BSTR::from(path.as_os_str().to_string_lossy().as_ref()))
    }
}

impl EngineSession for ComEngineSession {
    fn disable_prompts(&mut self) -> Result<(), String> {
        self.invoke("SetMessageBoxMode", &[VARIANT::from(MESSAGE_BOX_MODE_SILENT)])
            .map(|_| ())
    }

    fn register_security_module(&mut self) -> Result<(), String> {
        self.invoke(
            "RegisterModule",
            &[
                VARIANT::from(BSTR::from("FilePathCheckDLL")),
                VARIANT::from(BSTR::from("FilePathCheckerModuleExample")),
            ],
        )
        .map(|_| ())
    }

    fn open(&mut self, path: &Path, format_hint: &str, options: &str) -> Result<(), String> {
        self.invoke(
            "Open",
            &[
                Self::path_arg(path),
                VARIANT::from(BSTR::from(format_hint)),
                VARIANT::from(BSTR::from(options)),
            ],
        )
        .map(|_| ())
    }

    fn save_as(
        &mut self,
        path: &Path,
        engine_code: &str,
        variant: SaveCallVariant,
    ) -> Result<(), String> {
        let mut args = vec![
            Self::path_arg(path),
            VARIANT::from(BSTR::from(engine_code)),
        ];
        if variant == SaveCallVariant::ThreeArgEmpty {
            args.push(VARIANT::from(BSTR::from("")));
        }
        self.invoke("SaveAs", &args).map(|_| ())
    }

    fn clear(&mut self, scope: ClearScope) -> Result<(), String> {
        self.invoke("Clear", &[VARIANT::from(scope.engine_option())])
            .map(|_| ())
    }

    fn quit(&mut self) -> Result<(), String> {
        self.invoke("Quit", &[]).map(|_| ())
    }
}

impl Drop for ComEngineSession {
    fn drop(&mut self) {
        // Release the automation object before tearing down COM.
        self.dispatch = None;
        if self.com_initialized {
            unsafe { CoUninitialize() };
        }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
