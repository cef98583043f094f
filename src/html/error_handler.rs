//! Route the parser's formatted error reports to the host.
//!
//! [`html_parser_set_error_handler`] installs [`html_parser_error_sax_handler`]
//! into a handler table. From then on every error the parser raises is
//! rendered into a fresh buffer, handed to the host handler registered with
//! [`set_host_error_handler`](crate::globals::set_host_error_handler), and
//! released as soon as the host returns.

use std::ffi::c_void;

use crate::{bridge::forward_error, format::FormatArg, message::FormattedMessage};

use super::HtmlSaxHandler;

/// The error slot: render `msg` with `args` and forward the result.
///
/// With a NULL `ctx` nothing is rendered or forwarded. If rendering fails,
/// a fixed fallback message is forwarded instead, so the host always learns
/// that an error happened.
#[doc(alias = "htmlparser_error_sax_handler")]
pub fn html_parser_error_sax_handler(ctx: *mut c_void, msg: &str, args: &[FormatArg<'_>]) {
    if ctx.is_null() {
        return;
    }
    match FormattedMessage::new(msg, args) {
        Ok(message) => {
            forward_error(ctx, message.as_c_str());
        }
        Err(err) => {
            log::warn!(target: "saxbridge::html", "{err}, forwarding fallback message");
            forward_error(ctx, err.fallback_message());
        }
    }
}

/// Install the error bridge into `sax`.
///
/// Only the `error` slot is set and the `serror` slot cleared, so that the
/// parser never picks its structured error path over this one. Other slots
/// are left as they are. Calling this again simply reinstalls the bridge;
/// `None` is ignored.
#[doc(alias = "htmlparser_set_error_handler")]
pub fn html_parser_set_error_handler(sax: Option<&mut HtmlSaxHandler>) {
    if let Some(sax) = sax {
        sax.error = Some(html_parser_error_sax_handler);
        sax.serror = None;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        ffi::{CStr, c_char},
        ptr::null_mut,
    };

    use crate::{
        error::{ALLOCATION_FAILED_MESSAGE, FORMATTING_FAILED_MESSAGE},
        globals::set_host_error_handler,
        memory::{mem_blocks, mem_free, mem_malloc, mem_reset, mem_setup},
        parser::{SaxError, SaxHandler},
    };

    use super::*;

    thread_local! {
        static RECEIVED: RefCell<Vec<String>> = const { RefCell::new(vec![]) };
    }

    unsafe extern "C" fn record(_ctx: *mut c_void, msg: *const c_char) {
        let msg = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
        RECEIVED.with_borrow_mut(|received| received.push(msg));
    }

    unsafe extern "C" fn no_memory(_size: usize) -> *mut c_void {
        null_mut()
    }

    fn received() -> Vec<String> {
        RECEIVED.with_borrow_mut(std::mem::take)
    }

    fn some_ctx() -> *mut c_void {
        Box::into_raw(Box::new(0u8)) as *mut c_void
    }

    fn on_serror(_ctx: *mut c_void, _error: &SaxError) {}

    #[test]
    fn renders_and_forwards() {
        set_host_error_handler(Some(record));
        let ctx = some_ctx();
        html_parser_error_sax_handler(ctx, "Invalid tag at line %d", &[42.into()]);
        html_parser_error_sax_handler(ctx, "Tag %s invalid\n", &["blink".into()]);
        assert_eq!(received(), ["Invalid tag at line 42", "Tag blink invalid\n"]);
        set_host_error_handler(None);
        drop(unsafe { Box::from_raw(ctx as *mut u8) });
    }

    #[test]
    fn null_context_renders_nothing() {
        set_host_error_handler(Some(record));
        mem_setup(Some(mem_free), Some(mem_malloc)).unwrap();
        let base = mem_blocks();
        html_parser_error_sax_handler(null_mut(), "Invalid tag at line %d", &[42.into()]);
        assert!(received().is_empty());
        assert_eq!(mem_blocks(), base);
        mem_reset();
        set_host_error_handler(None);
    }

    #[test]
    fn failures_forward_fallbacks() {
        set_host_error_handler(Some(record));
        let ctx = some_ctx();
        html_parser_error_sax_handler(ctx, "bad %", &[]);
        mem_setup(Some(mem_free), Some(no_memory)).unwrap();
        html_parser_error_sax_handler(ctx, "Invalid tag at line %d", &[42.into()]);
        mem_reset();
        assert_eq!(
            received(),
            [
                FORMATTING_FAILED_MESSAGE.to_str().unwrap(),
                ALLOCATION_FAILED_MESSAGE.to_str().unwrap(),
            ]
        );
        set_host_error_handler(None);
        drop(unsafe { Box::from_raw(ctx as *mut u8) });
    }

    #[test]
    fn configure_touches_only_error_slots() {
        let mut sax = SaxHandler::sax2();
        sax.serror = Some(on_serror);
        html_parser_set_error_handler(Some(&mut sax));
        assert!(sax.error.is_some());
        assert!(sax.serror.is_none());
        assert!(sax.warning.is_none());
        assert!(sax.start_element.is_none());
        assert!(sax.is_sax2());

        html_parser_set_error_handler(None);
    }
}
