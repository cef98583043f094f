//! The owned, NUL-terminated buffer holding one rendered error message.

use std::{
    ffi::{CStr, c_char},
    ptr::NonNull,
    slice,
};

use crate::{
    error::BridgeError,
    format::{self, FormatArg, SliceWriter},
    memory::{FreeFunc, mem_get},
};

/// A rendered message in a buffer from the current malloc hook.
///
/// The buffer is exactly `len + 1` bytes long and is freed when the value is
/// dropped, so a message cannot outlive the error event that produced it.
/// It is released with the `free` that was paired with the allocating
/// `malloc`, even if the hooks are replaced while the message is alive.
#[derive(Debug)]
pub struct FormattedMessage {
    ptr: NonNull<c_char>,
    len: usize,
    free: FreeFunc,
}

impl FormattedMessage {
    /// Measure, allocate exactly, render.
    ///
    /// Nothing is allocated when the dry run fails.
    pub fn new(template: &str, args: &[FormatArg<'_>]) -> Result<Self, BridgeError> {
        let len = format::measure(template, args)?;
        let size = len + 1;
        let (free, malloc) = mem_get();
        let ptr = unsafe { malloc(size) } as *mut c_char;
        let ptr = NonNull::new(ptr).ok_or(BridgeError::AllocationFailure { size })?;
        // From here on `Drop` owns the release.
        let mut message = Self { ptr, len, free };

        let buf = unsafe { slice::from_raw_parts_mut(ptr.as_ptr() as *mut u8, size) };
        let mut writer = SliceWriter::new(&mut buf[..len]);
        format::render(template, args, &mut writer)?;
        debug_assert_eq!(writer.written(), len);
        message.len = writer.written();
        buf[message.len] = 0;
        Ok(message)
    }

    /// Length without the terminator.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr() as *const u8, self.len) }
    }

    pub fn as_c_str(&self) -> &CStr {
        // The dry run rejects interior NULs, so the only NUL is the terminator.
        unsafe {
            let bytes = slice::from_raw_parts(self.ptr.as_ptr() as *const u8, self.len + 1);
            CStr::from_bytes_with_nul_unchecked(bytes)
        }
    }
}

impl Drop for FormattedMessage {
    fn drop(&mut self) {
        unsafe { (self.free)(self.ptr.as_ptr() as _) }
    }
}
