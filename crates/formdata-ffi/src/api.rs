//! Exported C functions.
//!
//! Every function catches panics and reports failure through its return
//! value: null for pointers, `-1` for indices, `0` for counts. The reason is
//! written to the debug log (`FORMDATA_DEBUG=1`).

use std::ffi::{CStr, c_char};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use formdata_core::debug_ffi;

use crate::decode::decode;
use crate::error::FfiError;
use crate::layout::{self, FormData};
use crate::runtime;

/// Run `body`, mapping errors and panics to `failure`.
fn guard<T>(operation: &str, failure: T, body: impl FnOnce() -> Result<T, FfiError>) -> T {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            debug_ffi!("{operation} failed: {err}");
            failure
        }
        Err(_) => {
            debug_ffi!("{operation} failed: {}", FfiError::Panic);
            failure
        }
    }
}

fn parse_on_runtime(body: &[u8], boundary: Option<&str>) -> Result<*mut FormData, FfiError> {
    let handle = runtime::acquire()?;
    let staged = handle.block_on(decode(body, boundary, handle.config().clone()))?;
    Ok(staged.into_raw())
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
unsafe fn c_str_arg<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a CStr, FfiError> {
    if ptr.is_null() {
        return Err(FfiError::NullArgument { what });
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    Ok(unsafe { CStr::from_ptr(ptr) })
}

/// # Safety
///
/// `data` must be null or a live pointer returned by one of the parse
/// functions.
unsafe fn form_arg<'a>(data: *const FormData) -> Result<&'a FormData, FfiError> {
    // SAFETY: null or live per the caller's contract.
    unsafe { data.as_ref() }.ok_or(FfiError::NullArgument { what: "form data" })
}

/// Parse a NUL-terminated multipart body whose boundary is on its first line.
///
/// Returns null on any failure. A non-null result must be freed with
/// [`free_multipart_form_data`].
///
/// # Safety
///
/// `body` must be null or point to a NUL-terminated byte string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn parse_multipart_form_data(body: *const c_char) -> *mut FormData {
    guard("parse_multipart_form_data", ptr::null_mut(), || {
        // SAFETY: forwarded caller contract.
        let body = unsafe { c_str_arg(body, "body") }?;
        parse_on_runtime(body.to_bytes(), None)
    })
}

/// Parse `body_len` bytes at `body`, which may contain NUL bytes.
///
/// `boundary` is either the bare boundary token or a full
/// `multipart/form-data; boundary=...` header value. When it is null the
/// boundary is read from the body's first line.
///
/// Returns null on any failure. A non-null result must be freed with
/// [`free_multipart_form_data`].
///
/// # Safety
///
/// `body` must be valid for reads of `body_len` bytes (it may be null only
/// when `body_len` is 0). `boundary` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn parse_multipart_form_data_with_boundary(
    body: *const u8,
    body_len: usize,
    boundary: *const c_char,
) -> *mut FormData {
    guard(
        "parse_multipart_form_data_with_boundary",
        ptr::null_mut(),
        || {
            let body: &[u8] = if body_len == 0 {
                &[]
            } else if body.is_null() {
                return Err(FfiError::NullArgument { what: "body" });
            } else {
                // SAFETY: caller guarantees `body_len` readable bytes.
                unsafe { std::slice::from_raw_parts(body, body_len) }
            };

            let boundary = if boundary.is_null() {
                None
            } else {
                // SAFETY: non-null, NUL-terminated per the caller's contract.
                let raw = unsafe { CStr::from_ptr(boundary) };
                Some(
                    raw.to_str()
                        .map_err(|_| FfiError::InvalidUtf8 { what: "boundary" })?,
                )
            };

            parse_on_runtime(body, boundary)
        },
    )
}

/// Free a form returned by a parse function. Null is a no-op.
///
/// # Safety
///
/// `data` must be null or a pointer returned by a parse function that has not
/// been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_multipart_form_data(data: *mut FormData) {
    guard("free_multipart_form_data", (), || {
        // SAFETY: forwarded caller contract.
        unsafe { layout::release(data) };
        Ok(())
    });
}

/// Shut the process-wide runtime down. Parse calls made afterwards return
/// null. Calling it again is a no-op.
#[unsafe(no_mangle)]
pub extern "C" fn shutdown_runtime() {
    guard("shutdown_runtime", (), || {
        if !runtime::shutdown() {
            debug_ffi!("shutdown_runtime called again; ignoring");
        }
        Ok(())
    });
}

/// Value of the first field named `name`, or null.
///
/// The returned string is owned by `data` and lives until it is freed.
///
/// # Safety
///
/// `data` must be null or a live form. `name` must be null or a
/// NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn form_data_get_field_value(
    data: *const FormData,
    name: *const c_char,
) -> *const c_char {
    guard("form_data_get_field_value", ptr::null(), || {
        // SAFETY: forwarded caller contract.
        let (form, name) = unsafe { (form_arg(data)?, c_str_arg(name, "name")?) };
        Ok(form.field_value(name).map_or(ptr::null(), CStr::as_ptr))
    })
}

/// Index into `data->files` of the first file uploaded under `name`, or -1.
///
/// # Safety
///
/// `data` must be null or a live form. `name` must be null or a
/// NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn form_data_get_file_index(
    data: *const FormData,
    name: *const c_char,
) -> isize {
    guard("form_data_get_file_index", -1, || {
        // SAFETY: forwarded caller contract.
        let (form, name) = unsafe { (form_arg(data)?, c_str_arg(name, "name")?) };
        Ok(form
            .file_index(name)
            .and_then(|i| isize::try_from(i).ok())
            .unwrap_or(-1))
    })
}

/// Write the indices of every file uploaded under `name` into `out`, up to
/// `capacity` entries. Returns the number written.
///
/// # Safety
///
/// `data` must be null or a live form. `name` must be null or a
/// NUL-terminated string. `out` must be valid for writes of `capacity`
/// elements (it may be null only when `capacity` is 0).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn form_data_get_file_indices(
    data: *const FormData,
    name: *const c_char,
    out: *mut usize,
    capacity: usize,
) -> usize {
    guard("form_data_get_file_indices", 0, || {
        // SAFETY: forwarded caller contract.
        let (form, name) = unsafe { (form_arg(data)?, c_str_arg(name, "name")?) };
        if capacity == 0 {
            return Ok(0);
        }
        if out.is_null() {
            return Err(FfiError::NullArgument { what: "out" });
        }
        // SAFETY: caller guarantees `capacity` writable slots.
        let out = unsafe { std::slice::from_raw_parts_mut(out, capacity) };
        Ok(form.file_indices(name, out))
    })
}
