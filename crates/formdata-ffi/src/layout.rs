//! C representation of a decoded form.
//!
//! # Safety
//!
//! Every struct here is `#[repr(C)]` and mirrors `include/formdata.h`. A
//! [`FormData`] and everything reachable from it is built by
//! [`OwnedFormData::into_raw`] and must be freed exactly once by [`release`]:
//!
//! - every text value is an independently allocated, NUL-terminated string
//! - every payload is an independently allocated buffer of `content_length`
//!   bytes, null when the length is zero
//! - each record array is a single allocation, null when its count is zero
//!
//! Construction happens in two phases. [`OwnedFormData::stage`] performs
//! every fallible step (C string conversion, array reservations) while all
//! values are still owned Rust types, so a failure drops whatever was staged.
//! [`OwnedFormData::into_raw`] then hands ownership to the caller and cannot
//! fail.

use std::ffi::{CStr, CString, c_char};
use std::ptr;
use std::slice;

use formdata_core::{Field, FileEntry, MultipartForm};

use crate::error::FfiError;

/// Root of a decoded form, owned by the C caller.
#[repr(C)]
#[derive(Debug)]
pub struct FormData {
    fields: *mut FormField,
    field_count: usize,
    files: *mut MultipartFile,
    file_count: usize,
}

/// A text field.
#[repr(C)]
#[derive(Debug)]
pub struct FormField {
    name: *const c_char,
    value: *const c_char,
}

/// An uploaded file.
#[repr(C)]
#[derive(Debug)]
pub struct MultipartFile {
    filename: *const c_char,
    content_type: *const c_char,
    content: *mut u8,
    content_length: usize,
    field_name: *const c_char,
}

/// # Safety
///
/// `ptr` must be null or valid for reads of `len` elements for `'a`.
unsafe fn slice_or_empty<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        // SAFETY: caller guarantees `ptr` points at `len` initialized elements.
        unsafe { slice::from_raw_parts(ptr, len) }
    }
}

// The accessors below rely on the construction invariant: a `FormData` can
// only be obtained from `into_raw`, so its pointers are valid until `release`.

impl FormData {
    /// Fields in body order.
    #[must_use]
    pub fn fields(&self) -> &[FormField] {
        // SAFETY: built by `into_raw` with exactly `field_count` records.
        unsafe { slice_or_empty(self.fields, self.field_count) }
    }

    /// Files in body order.
    #[must_use]
    pub fn files(&self) -> &[MultipartFile] {
        // SAFETY: built by `into_raw` with exactly `file_count` records.
        unsafe { slice_or_empty(self.files, self.file_count) }
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Value of the first field named `name`.
    #[must_use]
    pub fn field_value(&self, name: &CStr) -> Option<&CStr> {
        self.fields()
            .iter()
            .find(|f| f.name() == name)
            .map(FormField::value)
    }

    /// Index of the first file uploaded under `name`.
    #[must_use]
    pub fn file_index(&self, name: &CStr) -> Option<usize> {
        self.files().iter().position(|f| f.field_name() == name)
    }

    /// Write the indices of files uploaded under `name` into `out`, stopping
    /// when `out` is full. Returns the number of indices written.
    pub fn file_indices(&self, name: &CStr, out: &mut [usize]) -> usize {
        let matches = self
            .files()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field_name() == name)
            .map(|(i, _)| i);

        let mut count = 0;
        for (slot, index) in out.iter_mut().zip(matches) {
            *slot = index;
            count += 1;
        }
        count
    }
}

impl FormField {
    #[must_use]
    pub fn name(&self) -> &CStr {
        // SAFETY: NUL-terminated string allocated by `CString::into_raw`.
        unsafe { CStr::from_ptr(self.name) }
    }

    #[must_use]
    pub fn value(&self) -> &CStr {
        // SAFETY: as above.
        unsafe { CStr::from_ptr(self.value) }
    }
}

impl MultipartFile {
    #[must_use]
    pub fn field_name(&self) -> &CStr {
        // SAFETY: NUL-terminated string allocated by `CString::into_raw`.
        unsafe { CStr::from_ptr(self.field_name) }
    }

    #[must_use]
    pub fn filename(&self) -> &CStr {
        // SAFETY: as above.
        unsafe { CStr::from_ptr(self.filename) }
    }

    #[must_use]
    pub fn content_type(&self) -> &CStr {
        // SAFETY: as above.
        unsafe { CStr::from_ptr(self.content_type) }
    }

    #[must_use]
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Payload bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        // SAFETY: boxed slice of `content_length` bytes, or null when empty.
        unsafe { slice_or_empty(self.content.cast_const(), self.content_length) }
    }
}

#[derive(Debug)]
struct StagedField {
    name: CString,
    value: CString,
}

impl StagedField {
    fn new(field: Field) -> Result<Self, FfiError> {
        Ok(Self {
            name: c_string(field.name, "field name")?,
            value: c_string(field.value, "field value")?,
        })
    }

    fn into_record(self) -> FormField {
        FormField {
            name: self.name.into_raw().cast_const(),
            value: self.value.into_raw().cast_const(),
        }
    }
}

#[derive(Debug)]
struct StagedFile {
    field_name: CString,
    filename: CString,
    content_type: CString,
    content: Box<[u8]>,
}

impl StagedFile {
    fn new(file: FileEntry) -> Result<Self, FfiError> {
        Ok(Self {
            field_name: c_string(file.field_name, "file field name")?,
            filename: c_string(file.filename, "filename")?,
            content_type: c_string(file.content_type, "content type")?,
            content: file.payload.into_boxed_slice(),
        })
    }

    fn into_record(self) -> MultipartFile {
        let content_length = self.content.len();
        let content = if content_length == 0 {
            ptr::null_mut()
        } else {
            Box::into_raw(self.content).cast::<u8>()
        };
        MultipartFile {
            filename: self.filename.into_raw().cast_const(),
            content_type: self.content_type.into_raw().cast_const(),
            content,
            content_length,
            field_name: self.field_name.into_raw().cast_const(),
        }
    }
}

fn c_string(value: String, what: &'static str) -> Result<CString, FfiError> {
    CString::new(value).map_err(|_| FfiError::InteriorNul { what })
}

/// A decoded form converted to C-compatible buffers but still owned by Rust.
///
/// Dropping it frees everything; [`into_raw`](Self::into_raw) transfers
/// ownership to the caller instead.
#[derive(Debug, Default)]
pub struct OwnedFormData {
    fields: Vec<StagedField>,
    files: Vec<StagedFile>,
    // Reserved up front so `into_raw` never allocates record arrays.
    field_records: Vec<FormField>,
    file_records: Vec<MultipartFile>,
}

impl OwnedFormData {
    /// Convert every value of `form` into a C-compatible buffer.
    pub fn stage(form: MultipartForm) -> Result<Self, FfiError> {
        let (fields, files) = form.into_parts();
        let mut staged = Self::default();

        staged.fields.try_reserve_exact(fields.len())?;
        staged.field_records.try_reserve_exact(fields.len())?;
        staged.files.try_reserve_exact(files.len())?;
        staged.file_records.try_reserve_exact(files.len())?;

        for field in fields {
            staged.fields.push(StagedField::new(field)?);
        }
        for file in files {
            staged.files.push(StagedFile::new(file)?);
        }
        Ok(staged)
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Hand the form to the caller. The result must be passed to [`release`]
    /// exactly once.
    #[must_use]
    pub fn into_raw(self) -> *mut FormData {
        let Self {
            fields,
            files,
            mut field_records,
            mut file_records,
        } = self;

        field_records.extend(fields.into_iter().map(StagedField::into_record));
        file_records.extend(files.into_iter().map(StagedFile::into_record));

        let (fields, field_count) = leak_records(field_records);
        let (files, file_count) = leak_records(file_records);

        Box::into_raw(Box::new(FormData {
            fields,
            field_count,
            files,
            file_count,
        }))
    }
}

fn leak_records<T>(records: Vec<T>) -> (*mut T, usize) {
    if records.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let len = records.len();
    (Box::into_raw(records.into_boxed_slice()).cast::<T>(), len)
}

/// # Safety
///
/// `ptr` must be null or have come from `Box::<[T]>::into_raw` with `len`
/// elements, and must not be used afterwards.
unsafe fn reclaim_records<T>(ptr: *mut T, len: usize) -> Option<Box<[T]>> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: caller guarantees provenance and length.
        Some(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) })
    }
}

/// # Safety
///
/// `ptr` must be null or have come from `CString::into_raw`.
unsafe fn free_c_string(ptr: *const c_char) {
    if !ptr.is_null() {
        // SAFETY: caller guarantees provenance.
        drop(unsafe { CString::from_raw(ptr.cast_mut()) });
    }
}

/// Free a form returned by [`OwnedFormData::into_raw`] and everything it owns.
///
/// Null is a no-op.
///
/// # Safety
///
/// `form` must be null or a pointer obtained from `into_raw` that has not been
/// released yet. No reference into the form may be used afterwards.
pub unsafe fn release(form: *mut FormData) {
    if form.is_null() {
        return;
    }
    // SAFETY: `form` came from `Box::into_raw` in `into_raw`.
    let form = unsafe { Box::from_raw(form) };

    // SAFETY: arrays and their strings were leaked by `into_raw` and are
    // reclaimed exactly once here.
    unsafe {
        if let Some(fields) = reclaim_records(form.fields, form.field_count) {
            for field in &fields {
                free_c_string(field.name);
                free_c_string(field.value);
            }
        }

        if let Some(files) = reclaim_records(form.files, form.file_count) {
            for file in &files {
                free_c_string(file.filename);
                free_c_string(file.content_type);
                free_c_string(file.field_name);
                if let Some(content) = reclaim_records(file.content, file.content_length) {
                    drop(content);
                }
            }
        }
    }
}
