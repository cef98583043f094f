//! Hand rendered messages to the host across the C boundary.

use std::ffi::{CStr, c_char, c_void};

use crate::globals::host_error_handler;

/// The host's receiving end: `(context, message)`.
///
/// `message` is never NULL and is only valid for the duration of the call.
pub type HostErrorFunc = unsafe extern "C" fn(ctx: *mut c_void, msg: *const c_char);

/// Forward one message to the registered host handler.
///
/// Does nothing when `ctx` is NULL or no handler is registered. The handler
/// is looked up before the call, so it may itself change the registration.
///
/// Returns whether the handler was invoked.
pub fn forward_error(ctx: *mut c_void, msg: &CStr) -> bool {
    if ctx.is_null() {
        log::debug!(target: "saxbridge::bridge", "no context, message dropped");
        return false;
    }
    let Some(handler) = host_error_handler() else {
        log::debug!(target: "saxbridge::bridge", "no host handler registered, message dropped");
        return false;
    };
    log::trace!(target: "saxbridge::bridge", "forwarding {} bytes", msg.count_bytes());
    unsafe { handler(ctx, msg.as_ptr()) };
    true
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, ptr::null_mut};

    use crate::globals::set_host_error_handler;

    use super::*;

    thread_local! {
        static RECEIVED: RefCell<Vec<(usize, String)>> = const { RefCell::new(vec![]) };
    }

    unsafe extern "C" fn record(ctx: *mut c_void, msg: *const c_char) {
        let msg = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
        RECEIVED.with_borrow_mut(|received| received.push((ctx as usize, msg)));
    }

    unsafe extern "C" fn unregister_self(_ctx: *mut c_void, _msg: *const c_char) {
        set_host_error_handler(None);
    }

    #[test]
    fn forwards_once_with_context() {
        set_host_error_handler(Some(record));
        let mut token = 0u8;
        let ctx = &raw mut token as *mut c_void;
        assert!(forward_error(ctx, c"Tag blink invalid"));
        RECEIVED.with_borrow(|received| {
            assert_eq!(received.as_slice(), &[(ctx as usize, "Tag blink invalid".to_owned())]);
        });
        set_host_error_handler(None);
    }

    #[test]
    fn null_context_suppresses_forwarding() {
        set_host_error_handler(Some(record));
        assert!(!forward_error(null_mut(), c"dropped"));
        RECEIVED.with_borrow(|received| assert!(received.is_empty()));
        set_host_error_handler(None);
    }

    #[test]
    fn missing_handler_is_silent() {
        let mut token = 0u8;
        assert!(!forward_error(&raw mut token as *mut c_void, c"dropped"));
    }

    #[test]
    fn handler_may_reregister_while_running() {
        set_host_error_handler(Some(unregister_self));
        let mut token = 0u8;
        assert!(forward_error(&raw mut token as *mut c_void, c"first"));
        assert!(host_error_handler().is_none());
    }
}
