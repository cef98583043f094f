//! Pluggable allocation for message buffers.
//! This module is based on `libxml/xmlmemory.h`, `xmlmemory.c` in `libxml2-v2.11.8`.
//!
//! Message buffers cross the C boundary, so they are allocated with a C
//! `malloc`-compatible function and released with the matching `free`. Both
//! can be replaced per thread, for instance with the counting allocator
//! below, which tags every block and keeps a live block count.

// Copyright of the original code is the following.
// --------
// Summary: interface for the memory allocator
// Description: provides interfaces for the memory allocator,
//              including debugging capabilities.
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// xmlmemory.c:  libxml memory allocator wrapper.
//
// daniel@veillard.com

use std::{cell::Cell, ffi::c_void, ptr::null_mut};

use libc::{free, malloc, memset};

use crate::{error::MemoryError, globals::GLOBAL_STATE};

/// Signature for a free() implementation.
pub type FreeFunc = unsafe extern "C" fn(mem: *mut c_void);
/// Signature for a malloc() implementation.
///
/// Returns a pointer to the newly allocated block or NULL in case of error.
pub type MallocFunc = unsafe extern "C" fn(size: usize) -> *mut c_void;

thread_local! {
    static DEBUG_MEM_SIZE: Cell<i64> = const { Cell::new(0) };
    static DEBUG_MEM_BLOCKS: Cell<i64> = const { Cell::new(0) };
}

const MEMTAG: u32 = 0x5aa5;

#[repr(C)]
struct MemHeader {
    tag: u32,
    size: usize,
}

const ALIGN_SIZE: usize = size_of::<f64>();
const HDR_SIZE: usize = size_of::<MemHeader>();
const RESERVE_SIZE: usize = HDR_SIZE.div_ceil(ALIGN_SIZE) * ALIGN_SIZE;

/// Override the allocation functions used for message buffers on this
/// thread.
///
/// Only later allocations are affected. A message buffer remembers the
/// `free` it was allocated alongside, so hooks may change at any time.
pub fn mem_setup(
    free_func: Option<FreeFunc>,
    malloc_func: Option<MallocFunc>,
) -> Result<(), MemoryError> {
    let free_func = free_func.ok_or(MemoryError::MissingFree)?;
    let malloc_func = malloc_func.ok_or(MemoryError::MissingMalloc)?;
    GLOBAL_STATE.with_borrow_mut(|state| {
        state.free = free_func;
        state.malloc = malloc_func;
    });
    Ok(())
}

/// Provides the allocation functions currently in use.
pub fn mem_get() -> (FreeFunc, MallocFunc) {
    GLOBAL_STATE.with_borrow(|state| (state.free, state.malloc))
}

/// Restore libc `malloc` and `free`.
pub fn mem_reset() {
    GLOBAL_STATE.with_borrow_mut(|state| {
        state.free = free as FreeFunc;
        state.malloc = malloc as MallocFunc;
    });
}

/// Allocate `size` bytes with the current malloc hook.
///
/// # Safety
/// The returned block must be released with [`xml_free`] on the same thread,
/// before the hooks are replaced.
pub unsafe fn xml_malloc(size: usize) -> *mut c_void {
    let malloc = GLOBAL_STATE.with_borrow(|state| state.malloc);
    unsafe { malloc(size) }
}

/// Release a block obtained from [`xml_malloc`].
///
/// # Safety
/// `ptr` must come from [`xml_malloc`] and must not be used afterwards.
pub unsafe fn xml_free(ptr: *mut c_void) {
    let free = GLOBAL_STATE.with_borrow(|state| state.free);
    unsafe { free(ptr) }
}

/// A malloc() equivalent that tags the block and counts it.
///
/// Returns a pointer to the allocated area or NULL in case of lack of memory.
pub unsafe extern "C" fn mem_malloc(size: usize) -> *mut c_void {
    let Some(total) = size.checked_add(RESERVE_SIZE) else {
        log::warn!(target: "saxbridge::memory", "mem_malloc: unsigned overflow for {size} bytes");
        return null_mut();
    };
    unsafe {
        let p = malloc(total) as *mut MemHeader;
        if p.is_null() {
            log::warn!(target: "saxbridge::memory", "mem_malloc: out of memory for {size} bytes");
            return null_mut();
        }
        (*p).tag = MEMTAG;
        (*p).size = size;
        DEBUG_MEM_SIZE.set(DEBUG_MEM_SIZE.get() + size as i64);
        DEBUG_MEM_BLOCKS.set(DEBUG_MEM_BLOCKS.get() + 1);
        (p as *mut u8).add(RESERVE_SIZE) as *mut c_void
    }
}

/// A free() equivalent, with tag checking.
///
/// A block without a valid tag is reported and leaked rather than passed to
/// libc `free`.
pub unsafe extern "C" fn mem_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let p = (ptr as *mut u8).sub(RESERVE_SIZE) as *mut MemHeader;
        if (*p).tag != MEMTAG {
            log::warn!(target: "saxbridge::memory", "mem_free({ptr:?}): memory tag error");
            return;
        }
        (*p).tag = !MEMTAG;
        memset(ptr, -1, (*p).size);
        DEBUG_MEM_SIZE.set(DEBUG_MEM_SIZE.get() - (*p).size as i64);
        DEBUG_MEM_BLOCKS.set(DEBUG_MEM_BLOCKS.get() - 1);
        free(p as *mut c_void);
    }
}

/// Number of blocks allocated by [`mem_malloc`] and not yet freed.
pub fn mem_blocks() -> i64 {
    DEBUG_MEM_BLOCKS.get()
}

/// Number of bytes allocated by [`mem_malloc`] and not yet freed.
pub fn mem_used() -> i64 {
    DEBUG_MEM_SIZE.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn refuse(_size: usize) -> *mut c_void {
        null_mut()
    }

    #[test]
    fn counting_allocator_tracks_blocks() {
        let base = mem_blocks();
        let used = mem_used();
        unsafe {
            let a = mem_malloc(10);
            let b = mem_malloc(0);
            assert!(!a.is_null() && !b.is_null());
            assert_eq!(mem_blocks(), base + 2);
            assert_eq!(mem_used(), used + 10);
            mem_free(a);
            mem_free(b);
            mem_free(null_mut());
        }
        assert_eq!(mem_blocks(), base);
        assert_eq!(mem_used(), used);
    }

    #[test]
    fn setup_requires_both_functions() {
        assert_eq!(mem_setup(None, Some(mem_malloc)), Err(MemoryError::MissingFree));
        assert_eq!(mem_setup(Some(mem_free), None), Err(MemoryError::MissingMalloc));

        mem_setup(Some(mem_free), Some(refuse)).unwrap();
        assert!(unsafe { xml_malloc(8) }.is_null());
        let (_, malloc_func) = mem_get();
        assert!(unsafe { malloc_func(8) }.is_null());

        mem_reset();
        unsafe {
            let p = xml_malloc(8);
            assert!(!p.is_null());
            xml_free(p);
        }
    }
}
