//! C entry points.
//!
//! The handler table is passed by pointer and never dereferenced beyond the
//! two error slots, so C hosts can treat it as opaque.

use std::ffi::c_char;

use crate::{
    bridge::HostErrorFunc,
    globals::{bridge_version_ptr, set_host_error_handler},
    html::{HtmlSaxHandler, html_parser_set_error_handler},
};

/// Install the error bridge into the table at `sax`. NULL is ignored.
///
/// # Safety
/// `sax` must be NULL or point to a live, writable handler table that no one
/// else accesses during the call.
#[allow(improper_ctypes_definitions)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn htmlparser_set_error_handler(sax: *mut HtmlSaxHandler) {
    html_parser_set_error_handler(unsafe { sax.as_mut() });
}

/// Register the function that receives rendered messages on this thread.
/// NULL unregisters it.
#[unsafe(no_mangle)]
pub extern "C" fn htmlparser_set_host_error_handler(func: Option<HostErrorFunc>) {
    set_host_error_handler(func);
}

/// The crate version as a static NUL-terminated string.
#[unsafe(no_mangle)]
pub extern "C" fn htmlparser_bridge_version() -> *const c_char {
    bridge_version_ptr() as *const c_char
}
