//! Owned buffers handed across the C boundary.
//!
//! Every pointer returned by a `gen_*`, `get_*_vk`, `check_chunk_proofs` or
//! `block_traces_to_chunk_info` call is an [`OwnedBuffer`] turned into a raw
//! pointer. The caller owns it until it passes it back to `free_c_chars`
//! exactly once. A live-buffer counter tracks hand-outs minus releases.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicUsize, Ordering};

static LIVE: AtomicUsize = AtomicUsize::new(0);

/// Buffers handed out and not yet released.
#[must_use]
pub fn owned_buffer_count() -> usize {
    LIVE.load(Ordering::SeqCst)
}

/// NUL-terminated UTF-8 buffer; dropped normally unless handed out with [`OwnedBuffer::into_raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBuffer(CString);

impl OwnedBuffer {
    /// Wrap `s`. Interior NUL bytes cannot cross a C string boundary and are dropped.
    #[must_use]
    pub fn new(s: impl Into<Vec<u8>>) -> Self {
        let c = CString::new(s).unwrap_or_else(|e| {
            let mut v = e.into_vec();
            v.retain(|&b| b != 0);
            v.push(0);
            CString::from_vec_with_nul(v).unwrap_or_default()
        });
        Self(c)
    }

    /// Borrow as a C string.
    #[inline]
    #[must_use]
    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.to_str().unwrap_or_default()
    }

    /// Transfer ownership to the caller.
    #[must_use]
    pub fn into_raw(self) -> *mut c_char {
        LIVE.fetch_add(1, Ordering::SeqCst);
        self.0.into_raw()
    }

    /// Take back a pointer produced by [`OwnedBuffer::into_raw`]. NULL yields `None`.
    ///
    /// # Safety
    /// `ptr` must be NULL or come from [`OwnedBuffer::into_raw`] and not have
    /// been taken back before. Taking back the same pointer twice is a double free.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        LIVE.fetch_sub(1, Ordering::SeqCst);
        // SAFETY: upheld by the caller; the pointer came from `CString::into_raw`.
        Some(Self(unsafe { CString::from_raw(ptr) }))
    }
}
