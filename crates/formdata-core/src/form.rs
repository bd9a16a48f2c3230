//! The decoded form: fields and files in body order.

use crate::part::{Field, FileEntry, Part};

/// Parsed multipart form data.
///
/// Fields and files are kept in two sequences, each in the order the parts
/// appeared in the body. Entries sharing a name are all retained; lookups by
/// name return the first match unless a multi-match helper is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<Field>,
    files: Vec<FileEntry>,
}

impl MultipartForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from already-classified parts, preserving their order.
    #[must_use]
    pub fn from_parts(parts: impl IntoIterator<Item = Part>) -> Self {
        let mut builder = FormBuilder::new();
        for part in parts {
            builder.push(part);
        }
        builder.finish()
    }

    /// All fields, in body order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// All files, in body order.
    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Number of parts without a filename.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of parts with a filename.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len() + self.files.len()
    }

    /// Returns true if the body had no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// Value of the first field named `name`.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Values of every field named `name`, in body order.
    pub fn get_fields<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Returns true if a field or file was submitted under `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name) || self.files.iter().any(|f| f.field_name == name)
    }

    /// The first file uploaded under `name`.
    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.field_name == name)
    }

    /// Every file uploaded under `name`, in body order.
    pub fn get_files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.files.iter().filter(move |f| f.field_name == name)
    }

    /// Index into [`files`](Self::files) of the first file uploaded under `name`.
    #[must_use]
    pub fn file_index(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.field_name == name)
    }

    /// Write the indices of files uploaded under `name` into `out`, stopping
    /// when `out` is full. Returns the number of indices written.
    pub fn file_indices(&self, name: &str, out: &mut [usize]) -> usize {
        let matches = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field_name == name)
            .map(|(i, _)| i);

        let mut count = 0;
        for (slot, index) in out.iter_mut().zip(matches) {
            *slot = index;
            count += 1;
        }
        count
    }

    /// Split the form into its field and file sequences.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Field>, Vec<FileEntry>) {
        (self.fields, self.files)
    }
}

/// Accumulates classified parts into a [`MultipartForm`].
#[derive(Debug, Default)]
pub struct FormBuilder {
    fields: Vec<Field>,
    files: Vec<FileEntry>,
}

impl FormBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part to the matching sequence.
    pub fn push(&mut self, part: Part) {
        match part {
            Part::Field(field) => self.fields.push(field),
            Part::File(file) => self.files.push(file),
        }
    }

    /// Number of parts pushed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len() + self.files.len()
    }

    /// Returns true if nothing has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// Finish building.
    #[must_use]
    pub fn finish(self) -> MultipartForm {
        MultipartForm {
            fields: self.fields,
            files: self.files,
        }
    }
}
