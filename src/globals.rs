//! Thread-local hooks shared by every parser instance on a thread.
//!
//! The parser that calls into this crate is single-threaded per instance, so
//! the hooks live in thread-local storage, just like the parser's own
//! global error and memory settings.

use std::{cell::RefCell, ffi::c_void};

use const_format::concatcp;
use libc::{free, malloc};

use crate::{
    bridge::HostErrorFunc,
    memory::{FreeFunc, MallocFunc},
};

/// `major.minor.patch` of this crate, NUL-terminated for C callers.
pub(crate) const BRIDGE_VERSION: &str = concatcp!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    ".",
    env!("CARGO_PKG_VERSION_MINOR"),
    ".",
    env!("CARGO_PKG_VERSION_PATCH"),
    "\0"
);

pub struct BridgeGlobalState {
    pub(crate) host_error: Option<HostErrorFunc>,
    pub(crate) malloc: MallocFunc,
    pub(crate) free: FreeFunc,
}

impl BridgeGlobalState {
    fn new() -> Self {
        Self {
            host_error: None,
            malloc: malloc as MallocFunc,
            free: free as FreeFunc,
        }
    }
}

thread_local! {
    pub(crate) static GLOBAL_STATE: RefCell<BridgeGlobalState> =
        RefCell::new(BridgeGlobalState::new());
}

/// Register the host function that receives rendered error messages.
///
/// `None` unregisters it; forwarding then becomes a no-op.
pub fn set_host_error_handler(func: Option<HostErrorFunc>) {
    GLOBAL_STATE.with_borrow_mut(|state| state.host_error = func);
}

/// The host function currently registered on this thread.
pub fn host_error_handler() -> Option<HostErrorFunc> {
    GLOBAL_STATE.with_borrow(|state| state.host_error)
}

/// Version string without the terminator.
pub fn bridge_version() -> &'static str {
    BRIDGE_VERSION.trim_end_matches('\0')
}

pub(crate) fn bridge_version_ptr() -> *const c_void {
    BRIDGE_VERSION.as_ptr() as *const c_void
}

#[cfg(test)]
mod tests {
    use std::ffi::{CStr, c_char};

    use super::*;

    unsafe extern "C" fn noop(_ctx: *mut c_void, _msg: *const c_char) {}

    #[test]
    fn handler_registration_round_trip() {
        assert!(host_error_handler().is_none());
        set_host_error_handler(Some(noop));
        assert!(host_error_handler().is_some());
        set_host_error_handler(None);
        assert!(host_error_handler().is_none());
    }

    #[test]
    fn version_is_nul_terminated() {
        let version = unsafe { CStr::from_ptr(bridge_version_ptr() as *const c_char) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
        assert_eq!(bridge_version(), env!("CARGO_PKG_VERSION"));
    }
}
