//! Win32 drop interception for elevated processes.
//!
//! UIPI filters out drag-and-drop messages sent from lower-privilege
//! processes (Explorer, typically) to an elevated window, so the toolkit's
//! OLE drop path never fires. The workaround is to opt the window into the
//! raw `WM_DROPFILES` shell notification and explicitly allow the filtered
//! messages through for every window of the process, descendants included,
//! because GUI toolkits create internal child windows that receive the
//! actual drop.
//!
//! This is the only module that touches raw drop handles and message
//! filters; it decodes a payload into a typed path list and nothing else.

use std::path::PathBuf;

use tracing::{debug, warn};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE};
use windows::Win32::UI::Shell::{DragAcceptFiles, DragFinish, DragQueryFileW, IsUserAnAdmin, HDROP};
use windows::Win32::UI::WindowsAndMessaging::{
    ChangeWindowMessageFilterEx, EnumChildWindows, MSGFLT_ALLOW, WM_COPYDATA, WM_DROPFILES,
};

/// `WM_COPYGLOBALDATA` carries the drop payload alongside `WM_DROPFILES`;
/// it has no SDK constant.
const WM_COPYGLOBALDATA: u32 = 0x0049;

/// Index value asking `DragQueryFileW` for the file count.
const DROP_COUNT_QUERY: u32 = 0xFFFF_FFFF;

/// Whether the current process runs elevated.
///
/// Informational: elevation is what makes the filter overrides in this
/// module necessary in the first place.
pub fn is_elevated() -> bool {
    unsafe { IsUserAnAdmin() }.as_bool()
}

/// Registers drop-message filter exceptions for `root` and all of its
/// descendant windows, and flags each as accepting dropped files.
///
/// Descendants are enumerated dynamically at call time; call this again if
/// the toolkit recreates its internal children. Returns the number of
/// windows registered.
pub fn allow_drops(root: HWND) -> usize {
    let mut windows = vec![root];
    enumerate_children(root, &mut windows);

    for &hwnd in &windows {
        allow_drop_messages(hwnd);
    }

    debug!(count = windows.len(), "Registered drop interception");
    windows.len()
}

/// Whether `msg` is the drop notification this module decodes.
pub fn is_drop_message(msg: u32) -> bool {
    msg == WM_DROPFILES
}

/// Decodes one drop payload into absolute paths and releases the handle.
///
/// Runs synchronously inside native message dispatch; keep the caller's
/// work per message to this decode.
pub fn decode_drop(hdrop: HDROP) -> Vec<PathBuf> {
    let count = unsafe { DragQueryFileW(hdrop, DROP_COUNT_QUERY, None) };
    let mut paths = Vec::with_capacity(count as usize);

    for index in 0..count {
        // First query returns the length in characters, without the nul.
        let len = unsafe { DragQueryFileW(hdrop, index, None) };
        if len == 0 {
            continue;
        }

        let mut buffer = vec![0u16; len as usize + 1];
        let copied = unsafe { DragQueryFileW(hdrop, index, Some(&mut buffer)) };
        if copied == 0 {
            warn!(index, "DragQueryFileW returned no data");
            continue;
        }

        let path = String::from_utf16_lossy(&buffer[..copied as usize]);
        paths.push(PathBuf::from(path));
    }

    unsafe { DragFinish(hdrop) };

    debug!(count = paths.len(), "Decoded drop payload");
    paths
}

fn enumerate_children(root: HWND, out: &mut Vec<HWND>) {
    unsafe extern "system" fn push_child(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let out = &mut *(lparam.0 as *mut Vec<HWND>);
        out.push(hwnd);
        TRUE
    }

    unsafe {
        let _ = EnumChildWindows(root, Some(push_child), LPARAM(out as *mut Vec<HWND> as isize));
    }
}

fn allow_drop_messages(hwnd: HWND) {
    for msg in [WM_DROPFILES, WM_COPYDATA, WM_COPYGLOBALDATA] {
        if let Err(e) = unsafe { ChangeWindowMessageFilterEx(hwnd, msg, MSGFLT_ALLOW, None) } {
            warn!(?hwnd, msg, error = %e, "ChangeWindowMessageFilterEx failed");
        }
    }
    unsafe { DragAcceptFiles(hwnd, TRUE) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_elevated_is_callable() {
        // Either answer is valid outside an elevated test runner; the query
        // itself must succeed.
        let _ = is_elevated();
    }
}
