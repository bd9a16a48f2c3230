//! C ABI for the `formdata` multipart/form-data decoder.
//!
//! Build as a `cdylib` or `staticlib` and include `include/formdata.h`.
//!
//! # Lifecycle
//!
//! ```c
//! FormData *form = parse_multipart_form_data(body);
//! if (form != NULL) {
//!     for (size_t i = 0; i < form->field_count; i++) { /* form->fields[i] */ }
//!     for (size_t i = 0; i < form->file_count; i++) { /* form->files[i] */ }
//!     free_multipart_form_data(form);
//! }
//! shutdown_runtime();
//! ```
//!
//! The first parse starts a process-wide runtime ([`runtime`]); it is shared by
//! every parse until [`shutdown_runtime`] is called. Decoding itself is done by
//! `formdata-core`; this crate converts the result into the `#[repr(C)]`
//! records in [`layout`] and owns every allocation handed to C.
//!
//! # Configuration
//!
//! Read once, when the runtime starts:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `FORMDATA_MAX_PARTS` | unlimited |
//! | `FORMDATA_MAX_FILE_SIZE` | unlimited |
//! | `FORMDATA_MAX_TOTAL_SIZE` | unlimited |
//! | `FORMDATA_WORKER_THREADS` | 0 (current-thread) |
//! | `FORMDATA_SHUTDOWN_TIMEOUT_MS` | 5000 |
//! | `FORMDATA_DEBUG` | off |

#![allow(unsafe_code)]

pub mod api;
pub mod decode;
pub mod error;
pub mod layout;
pub mod runtime;

pub use api::{
    form_data_get_field_value, form_data_get_file_index, form_data_get_file_indices,
    free_multipart_form_data, parse_multipart_form_data, parse_multipart_form_data_with_boundary,
    shutdown_runtime,
};
pub use error::FfiError;
pub use layout::{FormData, FormField, MultipartFile, OwnedFormData};
pub use runtime::{RuntimeConfig, RuntimeHandle, RuntimeStatus};
