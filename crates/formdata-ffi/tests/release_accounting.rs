//! Checks that `free_multipart_form_data` returns every byte a parse
//! allocated, and that a failed parse leaves nothing behind.
//!
//! Allocations are counted only on the thread that enables tracking, so the
//! test harness does not disturb the numbers.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicIsize, Ordering};

use formdata_core::MultipartConfig;
use formdata_ffi::decode::decode;
use formdata_ffi::free_multipart_form_data;
use futures_executor::block_on;

struct CountingAllocator;

static LIVE_BYTES: AtomicIsize = AtomicIsize::new(0);

thread_local! {
    static TRACKING: Cell<bool> = const { Cell::new(false) };
}

fn record(delta: isize) {
    if TRACKING.with(Cell::get) {
        LIVE_BYTES.fetch_add(delta, Ordering::SeqCst);
    }
}

fn signed(size: usize) -> isize {
    isize::try_from(size).unwrap_or(isize::MAX)
}

// SAFETY: forwards to the system allocator unchanged.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same contract as `System.alloc`.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record(signed(layout.size()));
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record(-signed(layout.size()));
        // SAFETY: same contract as `System.dealloc`.
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: same contract as `System.realloc`.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            record(signed(new_size) - signed(layout.size()));
        }
        new_ptr
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

/// Net bytes allocated by `f` on this thread and not freed by the time it
/// returns.
fn leaked_by(f: impl FnOnce()) -> isize {
    LIVE_BYTES.store(0, Ordering::SeqCst);
    TRACKING.with(|t| t.set(true));
    f();
    TRACKING.with(|t| t.set(false));
    LIVE_BYTES.load(Ordering::SeqCst)
}

fn body(last_value: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--XYZ\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nalice\r\n");
    for i in 0..3 {
        body.extend_from_slice(
            format!(
                "--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"f{i}.bin\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(std::iter::repeat_n(b'x', 1000 * i));
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"--XYZ\r\nContent-Disposition: form-data; name=\"last\"\r\n\r\n");
    body.extend_from_slice(last_value.as_bytes());
    body.extend_from_slice(b"\r\n--XYZ--\r\n");
    body
}

#[test]
fn test_release_is_exhaustive() {
    let good = body("done");
    let bad = body("nul\0inside");

    // Warm up lazily initialized thread state (executor parker, debug flag).
    let warm = block_on(decode(&good, None, MultipartConfig::default())).unwrap();
    // SAFETY: freshly built form, freed once.
    unsafe { free_multipart_form_data(warm.into_raw()) };

    let success = leaked_by(|| {
        let staged = block_on(decode(&good, None, MultipartConfig::default())).unwrap();
        let raw = staged.into_raw();
        // SAFETY: as above.
        let form = unsafe { &*raw };
        assert_eq!(form.field_count(), 2);
        assert_eq!(form.file_count(), 3);
        // SAFETY: freed once.
        unsafe { free_multipart_form_data(raw) };
    });
    assert_eq!(success, 0, "bytes leaked on the success path");

    let failure = leaked_by(|| {
        let result = block_on(decode(&bad, None, MultipartConfig::default()));
        assert!(result.is_err());
    });
    assert_eq!(failure, 0, "bytes leaked on the failure path");

    let sanity = leaked_by(|| std::mem::forget(vec![0u8; 64]));
    assert_eq!(sanity, 64);
}
