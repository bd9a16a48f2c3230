//! Part header parsing.
//!
//! Each raw part starts with a header block terminated by a blank line. Only
//! `Content-Disposition` (for `name` and `filename`) and `Content-Type` carry
//! meaning for the decoder; every other header is kept as-is.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use memchr::memmem;

use crate::error::MultipartError;

/// Parsed header block of a single part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartHeaders {
    /// Field name from Content-Disposition.
    pub name: String,
    /// Filename from Content-Disposition (if present, even when empty).
    pub filename: Option<String>,
    /// Content-Type of the part (if present and non-empty).
    pub content_type: Option<String>,
    /// All headers, keyed by lower-cased name. The first occurrence wins.
    pub headers: HashMap<String, String>,
}

impl PartHeaders {
    /// Parse a header block (without the terminating blank line).
    pub fn parse(block: &[u8]) -> Result<Self, MultipartError> {
        let headers = parse_header_block(block)?;

        let disposition = headers
            .get("content-disposition")
            .ok_or(MultipartError::MissingContentDisposition)?;
        let (name, filename) = parse_content_disposition(disposition)?;
        let content_type = headers
            .get("content-type")
            .filter(|v| !v.is_empty())
            .cloned();

        Ok(Self {
            name,
            filename,
            content_type,
            headers,
        })
    }

    /// Returns true if the part carries a `filename` parameter.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Look up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Split a raw part into its header block and its payload.
///
/// A header block whose final CRLF was consumed by the following delimiter
/// (no payload line at all) is accepted with an empty payload.
pub fn split_part(raw: &[u8]) -> Result<(&[u8], &[u8]), MultipartError> {
    if raw.is_empty() {
        return Ok((&[], &[]));
    }
    if let Some(payload) = raw.strip_prefix(b"\r\n") {
        return Ok((&[], payload));
    }
    if let Some(pos) = memmem::find(raw, b"\r\n\r\n") {
        return Ok((&raw[..pos + 2], &raw[pos + 4..]));
    }
    if raw.ends_with(b"\r\n") {
        return Ok((raw, &[]));
    }
    Err(MultipartError::InvalidPartHeaders {
        detail: "missing blank line after part headers".to_string(),
    })
}

fn parse_header_block(block: &[u8]) -> Result<HashMap<String, String>, MultipartError> {
    let text = std::str::from_utf8(block).map_err(|_| MultipartError::InvalidPartHeaders {
        detail: "invalid UTF-8 in header".to_string(),
    })?;

    let mut headers: HashMap<String, String> = HashMap::new();
    // Header that a folded continuation line belongs to.
    let mut last: Option<String> = None;

    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            if let Some(value) = last.as_ref().and_then(|key| headers.get_mut(key)) {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(MultipartError::InvalidPartHeaders {
                detail: format!("header line without a colon: {line:?}"),
            });
        };

        match headers.entry(name.trim().to_ascii_lowercase()) {
            Entry::Occupied(_) => last = None,
            Entry::Vacant(slot) => {
                last = Some(slot.key().clone());
                slot.insert(value.trim().to_string());
            }
        }
    }

    Ok(headers)
}

/// Parse Content-Disposition header value.
///
/// Format: `form-data; name="field"; filename="file.txt"`
pub fn parse_content_disposition(
    value: &str,
) -> Result<(String, Option<String>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for param in split_params(value) {
        let Some((key, raw_value)) = param.split_once('=') else {
            // The disposition type itself (`form-data`), or a bare flag.
            continue;
        };

        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name.get_or_insert_with(|| unquote(raw_value));
        } else if key.eq_ignore_ascii_case("filename") {
            filename.get_or_insert_with(|| unquote(raw_value));
        }
    }

    let name = name.ok_or_else(|| MultipartError::InvalidContentDisposition {
        detail: "missing name parameter".to_string(),
    })?;

    Ok((name, filename))
}

/// Split header parameters on `;`, ignoring separators inside quotes.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

/// Strip surrounding quotes. Inside double quotes, `\"` and `\\` are
/// unescaped and any other backslash is kept literally.
fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let inner = &s[1..s.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(&next) = chars.peek() {
                    if next == '"' || next == '\\' {
                        out.push(next);
                        chars.next();
                        continue;
                    }
                }
            }
            out.push(c);
        }
        out
    } else if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_disposition_case_insensitive_params() {
        let (name, filename) =
            parse_content_disposition("form-data; Name=\"field\"; FileName=\"upload.txt\"")
                .expect("content disposition should parse");
        assert_eq!(name, "field");
        assert_eq!(filename.as_deref(), Some("upload.txt"));
    }

    #[test]
    fn test_parse_content_disposition_param_order_is_irrelevant() {
        let (name, filename) =
            parse_content_disposition("form-data; filename=\"a.txt\"; name=\"file\"").unwrap();
        assert_eq!(name, "file");
        assert_eq!(filename.as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_parse_content_disposition_empty_filename_is_present() {
        let (_, filename) =
            parse_content_disposition("form-data; name=\"file\"; filename=\"\"").unwrap();
        assert_eq!(filename.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_content_disposition_missing_name() {
        let result = parse_content_disposition("form-data; filename=\"a.txt\"");
        assert!(matches!(
            result,
            Err(MultipartError::InvalidContentDisposition { .. })
        ));
    }

    #[test]
    fn test_parse_content_disposition_semicolon_inside_quotes() {
        let (name, filename) =
            parse_content_disposition("form-data; name=\"a;b\"; filename=\"x; y.txt\"").unwrap();
        assert_eq!(name, "a;b");
        assert_eq!(filename.as_deref(), Some("x; y.txt"));
    }

    #[test]
    fn test_parse_content_disposition_escaped_quote() {
        let (name, _) = parse_content_disposition(r#"form-data; name="say \"hi\"""#).unwrap();
        assert_eq!(name, "say \"hi\"");
    }

    #[test]
    fn test_parse_content_disposition_keeps_windows_path_backslashes() {
        let (_, filename) =
            parse_content_disposition(r#"form-data; name="f"; filename="C:\tmp\a.txt""#).unwrap();
        assert_eq!(filename.as_deref(), Some(r"C:\tmp\a.txt"));
    }

    #[test]
    fn test_parse_content_disposition_ignores_extended_filename() {
        let (_, filename) =
            parse_content_disposition("form-data; name=\"f\"; filename*=UTF-8''a.txt").unwrap();
        assert_eq!(filename, None);
    }

    #[test]
    fn test_parse_content_disposition_unquoted_values() {
        let (name, filename) =
            parse_content_disposition("form-data; name=field; filename=a.txt").unwrap();
        assert_eq!(name, "field");
        assert_eq!(filename.as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_part_headers_case_insensitive_names() {
        let block = b"content-disposition: form-data; name=\"f\"\r\nCONTENT-TYPE: text/plain\r\n";
        let headers = PartHeaders::parse(block).unwrap();
        assert_eq!(headers.name, "f");
        assert_eq!(headers.content_type.as_deref(), Some("text/plain"));
        assert_eq!(headers.header("Content-Type"), Some("text/plain"));
        assert!(!headers.is_file());
    }

    #[test]
    fn test_part_headers_missing_disposition() {
        let block = b"Content-Type: text/plain\r\n";
        assert_eq!(
            PartHeaders::parse(block),
            Err(MultipartError::MissingContentDisposition)
        );
        assert_eq!(
            PartHeaders::parse(b""),
            Err(MultipartError::MissingContentDisposition)
        );
    }

    #[test]
    fn test_part_headers_folded_line() {
        let block = b"Content-Disposition: form-data;\r\n name=\"folded\"\r\n";
        let headers = PartHeaders::parse(block).unwrap();
        assert_eq!(headers.name, "folded");
    }

    #[test]
    fn test_part_headers_first_occurrence_wins() {
        let block = b"Content-Disposition: form-data; name=\"first\"\r\n\
                      Content-Disposition: form-data; name=\"second\"\r\n";
        assert_eq!(PartHeaders::parse(block).unwrap().name, "first");
    }

    #[test]
    fn test_part_headers_rejects_invalid_utf8() {
        let block = b"Content-Disposition: form-data; name=\"\xff\"\r\n";
        assert!(matches!(
            PartHeaders::parse(block),
            Err(MultipartError::InvalidPartHeaders { .. })
        ));
    }

    #[test]
    fn test_part_headers_rejects_line_without_colon() {
        let block = b"Content-Disposition: form-data; name=\"a\"\r\nsecret value\r\n";
        assert!(matches!(
            PartHeaders::parse(block),
            Err(MultipartError::InvalidPartHeaders { .. })
        ));
    }

    #[test]
    fn test_split_part() {
        let (headers, payload) = split_part(b"H: v\r\n\r\nbody\r\n\r\nmore").unwrap();
        assert_eq!(headers, b"H: v\r\n");
        assert_eq!(payload, b"body\r\n\r\nmore");
    }

    #[test]
    fn test_split_part_without_headers() {
        let (headers, payload) = split_part(b"\r\npayload").unwrap();
        assert!(headers.is_empty());
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_split_part_headers_only() {
        let (headers, payload) = split_part(b"H: v\r\n").unwrap();
        assert_eq!(headers, b"H: v\r\n");
        assert!(payload.is_empty());
    }

    #[test]
    fn test_split_part_unterminated_headers() {
        assert!(matches!(
            split_part(b"H: v"),
            Err(MultipartError::InvalidPartHeaders { .. })
        ));
    }
}
