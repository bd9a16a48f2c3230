//! Boundary scanning.
//!
//! [`PartScanner`] walks a complete body once and yields the raw span of every
//! part, without looking inside it. The grammar is handled as a small state
//! machine:
//!
//! ```text
//! Preamble --first delimiter--> Delimiter --CRLF--> (part) --> Delimiter ...
//!                                   |--"--"-------> Done   (epilogue ignored)
//!                                   `--end of input--> Done (no closing marker)
//! ```
//!
//! A delimiter is `--` followed by the boundary token. Except at the very start
//! of the body it must begin a line, and it must be followed by `--`, optional
//! transport padding and CRLF, or the end of the input. Anything else that
//! merely looks like a delimiter is payload.

use memchr::memmem;

use crate::debug_scan;
use crate::error::MultipartError;

/// RFC 2046 recommends multipart boundary length <= 70 characters.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// The bytes between two delimiters, headers and payload not yet separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPart<'a> {
    /// Zero-based position of the part in the body.
    pub index: usize,
    /// Everything after the opening delimiter line, up to (not including) the
    /// CRLF that precedes the next delimiter.
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Preamble,
    /// At the delimiter starting at this offset.
    Delimiter(usize),
    Done,
}

/// What follows a delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimiterSuffix {
    /// `--`: the closing delimiter.
    Close,
    /// CRLF: a part starts at this offset.
    Open(usize),
    /// Nothing but whitespace until the end of the input.
    End,
}

/// Splits a multipart body into [`RawPart`]s.
#[derive(Debug)]
pub struct PartScanner<'a> {
    body: &'a [u8],
    delimiter_len: usize,
    /// Finds `\r\n--boundary`, i.e. a delimiter at the start of a line.
    line_delimiter: memmem::Finder<'static>,
    dash_boundary: Vec<u8>,
    state: ScanState,
    next_index: usize,
}

impl<'a> PartScanner<'a> {
    /// Create a scanner for `body` using the bare boundary token (without the
    /// leading `--`).
    #[must_use]
    pub fn new(body: &'a [u8], boundary: &[u8]) -> Self {
        let mut dash_boundary = Vec::with_capacity(boundary.len() + 2);
        dash_boundary.extend_from_slice(b"--");
        dash_boundary.extend_from_slice(boundary);

        let mut line_delimiter = Vec::with_capacity(dash_boundary.len() + 2);
        line_delimiter.extend_from_slice(b"\r\n");
        line_delimiter.extend_from_slice(&dash_boundary);

        Self {
            body,
            delimiter_len: dash_boundary.len(),
            line_delimiter: memmem::Finder::new(&line_delimiter).into_owned(),
            dash_boundary,
            state: ScanState::Preamble,
            next_index: 0,
        }
    }

    fn suffix_at(&self, after: usize) -> Option<DelimiterSuffix> {
        let rest = self.body.get(after..)?;
        if rest.starts_with(b"--") {
            return Some(DelimiterSuffix::Close);
        }

        let padding = rest
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count();
        let rest = &rest[padding..];
        if rest.is_empty() {
            return Some(DelimiterSuffix::End);
        }
        if !rest.starts_with(b"\r\n") {
            return None;
        }

        let start = after + padding + 2;
        if self.body[start..].iter().all(u8::is_ascii_whitespace) {
            Some(DelimiterSuffix::End)
        } else {
            Some(DelimiterSuffix::Open(start))
        }
    }

    fn is_delimiter_at(&self, at: usize) -> bool {
        self.suffix_at(at + self.delimiter_len).is_some()
    }

    /// Find the first delimiter that begins a line at or after `from`.
    ///
    /// `from` must point at the CRLF that would precede it.
    fn find_line_delimiter(&self, from: usize) -> Option<usize> {
        let haystack = self.body.get(from..)?;
        self.line_delimiter
            .find_iter(haystack)
            .map(|hit| from + hit + 2)
            .find(|&at| self.is_delimiter_at(at))
    }

    fn find_first_delimiter(&self) -> Option<usize> {
        if self.body.starts_with(&self.dash_boundary) && self.is_delimiter_at(0) {
            return Some(0);
        }
        self.find_line_delimiter(0)
    }

    fn fail(&mut self, err: MultipartError) -> Option<Result<RawPart<'a>, MultipartError>> {
        self.state = ScanState::Done;
        Some(Err(err))
    }
}

impl<'a> Iterator for PartScanner<'a> {
    type Item = Result<RawPart<'a>, MultipartError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Done => return None,
                ScanState::Preamble => {
                    let Some(at) = self.find_first_delimiter() else {
                        debug_scan!("no delimiter in {} byte body", self.body.len());
                        return self.fail(MultipartError::BoundaryNotFound);
                    };
                    if at > 0 {
                        debug_scan!("skipped {at} byte preamble");
                    }
                    self.state = ScanState::Delimiter(at);
                }
                ScanState::Delimiter(at) => {
                    let after = at + self.delimiter_len;
                    match self.suffix_at(after) {
                        None => {
                            return self.fail(MultipartError::InvalidFormat {
                                detail: "expected CRLF after boundary",
                            });
                        }
                        Some(DelimiterSuffix::Close) => {
                            let epilogue = self.body.len().saturating_sub(after + 2);
                            debug_scan!("closing delimiter at {at}, {epilogue} byte epilogue");
                            self.state = ScanState::Done;
                            return None;
                        }
                        Some(DelimiterSuffix::End) => {
                            debug_scan!("body ends after delimiter at {at} without closing marker");
                            self.state = ScanState::Done;
                            return None;
                        }
                        Some(DelimiterSuffix::Open(start)) => {
                            // Search from the CRLF just consumed so an empty part
                            // ("--b\r\n--b") is still found.
                            let Some(next_at) = self.find_line_delimiter(start - 2) else {
                                debug_scan!("part starting at {start} is never closed");
                                return self.fail(MultipartError::UnexpectedEof);
                            };
                            let end = (next_at - 2).max(start);
                            let index = self.next_index;
                            self.next_index += 1;
                            self.state = ScanState::Delimiter(next_at);
                            debug_scan!("part {index}: bytes {start}..{end}");
                            return Some(Ok(RawPart {
                                index,
                                bytes: &self.body[start..end],
                            }));
                        }
                    }
                }
            }
        }
    }
}

impl std::iter::FusedIterator for PartScanner<'_> {}

/// Check that `boundary` can be used as a delimiter token.
pub fn validate_boundary(boundary: &str) -> Result<(), MultipartError> {
    if boundary.is_empty()
        || boundary.len() > MAX_BOUNDARY_LEN
        || boundary.bytes().any(|b| b == b'\r' || b == b'\n')
    {
        return Err(MultipartError::InvalidBoundary);
    }
    Ok(())
}

/// Parse boundary from Content-Type header.
///
/// Content-Type format: `multipart/form-data; boundary=----WebKitFormBoundary...`
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    let content_type = content_type.trim();
    let main = content_type.split(';').next().unwrap_or("").trim();
    if !main.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::InvalidBoundary);
    }

    for part in content_type.split(';').skip(1) {
        let part = part.trim();
        let Some((k, v)) = part.split_once('=') else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case("boundary") {
            let boundary = v.trim().trim_matches('"').trim_matches('\'');
            validate_boundary(boundary)?;
            return Ok(boundary.to_string());
        }
    }

    Err(MultipartError::BoundaryNotFound)
}

/// Infer the boundary token from the first line of `body`.
///
/// The first line must be the opening delimiter (`--` + boundary). A body
/// that is only a closing delimiter (`--boundary--`, no CRLF) yields the
/// boundary as well.
pub fn infer_boundary(body: &[u8]) -> Result<&str, MultipartError> {
    let (line, has_crlf) = match memmem::find(body, b"\r\n") {
        Some(end) => (&body[..end], true),
        None => (body, false),
    };
    let token = line
        .strip_prefix(b"--")
        .ok_or(MultipartError::BoundaryNotFound)?;

    let mut token = trim_trailing_padding(token);
    if !has_crlf {
        token = token.strip_suffix(b"--").unwrap_or(token);
    }

    let boundary = std::str::from_utf8(token).map_err(|_| MultipartError::InvalidBoundary)?;
    validate_boundary(boundary)?;
    Ok(boundary)
}

fn trim_trailing_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t'))
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(body: &str, boundary: &str) -> Result<Vec<Vec<u8>>, MultipartError> {
        PartScanner::new(body.as_bytes(), boundary.as_bytes())
            .map(|part| part.map(|p| p.bytes.to_vec()))
            .collect()
    }

    #[test]
    fn test_parse_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        let boundary = parse_boundary(ct).unwrap();
        assert_eq!(boundary, "----WebKitFormBoundary7MA4YWxkTrZu0gW");
    }

    #[test]
    fn test_parse_boundary_quoted() {
        let ct = r#"multipart/form-data; boundary="simple-boundary""#;
        assert_eq!(parse_boundary(ct).unwrap(), "simple-boundary");
    }

    #[test]
    fn test_parse_boundary_case_insensitive_param_name() {
        let ct = r#"multipart/form-data; Boundary="simple-boundary""#;
        assert_eq!(parse_boundary(ct).unwrap(), "simple-boundary");
    }

    #[test]
    fn test_parse_boundary_missing() {
        let result = parse_boundary("multipart/form-data");
        assert_eq!(result, Err(MultipartError::BoundaryNotFound));
    }

    #[test]
    fn test_parse_boundary_rejects_too_long_value() {
        let too_long = "a".repeat(MAX_BOUNDARY_LEN + 1);
        let ct = format!("multipart/form-data; boundary={too_long}");
        assert_eq!(parse_boundary(&ct), Err(MultipartError::InvalidBoundary));
    }

    #[test]
    fn test_parse_boundary_wrong_content_type() {
        assert_eq!(
            parse_boundary("application/json"),
            Err(MultipartError::InvalidBoundary)
        );
    }

    #[test]
    fn test_infer_boundary_from_first_line() {
        let body = b"----WebKitFormBoundaryak4VBVRUB0vxEAhj\r\nContent-Disposition: form-data";
        assert_eq!(
            infer_boundary(body),
            Ok("--WebKitFormBoundaryak4VBVRUB0vxEAhj")
        );
    }

    #[test]
    fn test_infer_boundary_closing_only_body() {
        assert_eq!(infer_boundary(b"--XYZ--"), Ok("XYZ"));
    }

    #[test]
    fn test_infer_boundary_rejects_non_delimiter_first_line() {
        assert_eq!(
            infer_boundary(b"hello\r\n--XYZ\r\n"),
            Err(MultipartError::BoundaryNotFound)
        );
        assert_eq!(infer_boundary(b""), Err(MultipartError::BoundaryNotFound));
        assert_eq!(infer_boundary(b"--\r\n"), Err(MultipartError::InvalidBoundary));
    }

    #[test]
    fn test_scan_two_parts() {
        let body = "--XYZ\r\nA\r\n--XYZ\r\nB\r\n--XYZ--\r\n";
        let parts = scan(body, "XYZ").unwrap();
        assert_eq!(parts, vec![b"A".to_vec(), b"B".to_vec()]);
    }

    #[test]
    fn test_scan_indexes_parts_in_order() {
        let body = "--XYZ\r\nA\r\n--XYZ\r\nB\r\n--XYZ--";
        let indexes: Vec<usize> = PartScanner::new(body.as_bytes(), b"XYZ")
            .map(|p| p.unwrap().index)
            .collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn test_scan_skips_preamble_and_epilogue() {
        let body = "This is the preamble.\r\n--XYZ\r\nA\r\n--XYZ--\r\nThis is the epilogue.";
        assert_eq!(scan(body, "XYZ").unwrap(), vec![b"A".to_vec()]);
    }

    #[test]
    fn test_scan_zero_parts() {
        assert_eq!(scan("--XYZ--\r\n", "XYZ").unwrap(), Vec::<Vec<u8>>::new());
        assert_eq!(scan("--XYZ--", "XYZ").unwrap(), Vec::<Vec<u8>>::new());
    }

    #[test]
    fn test_scan_empty_body_fails() {
        assert_eq!(scan("", "XYZ"), Err(MultipartError::BoundaryNotFound));
    }

    #[test]
    fn test_scan_missing_boundary_fails() {
        assert_eq!(
            scan("just some text\r\n", "XYZ"),
            Err(MultipartError::BoundaryNotFound)
        );
        assert_eq!(
            scan("--ABC\r\nA\r\n--ABC--", "XYZ"),
            Err(MultipartError::BoundaryNotFound)
        );
    }

    #[test]
    fn test_scan_tolerates_missing_closing_marker() {
        let body = "--XYZ\r\nA\r\n--XYZ\r\n";
        assert_eq!(scan(body, "XYZ").unwrap(), vec![b"A".to_vec()]);

        let body = "--XYZ\r\nA\r\n--XYZ";
        assert_eq!(scan(body, "XYZ").unwrap(), vec![b"A".to_vec()]);
    }

    #[test]
    fn test_scan_unterminated_part_fails() {
        let body = "--XYZ\r\nA\r\n--XYZ\r\nB never ends";
        assert_eq!(scan(body, "XYZ"), Err(MultipartError::UnexpectedEof));
    }

    #[test]
    fn test_scan_garbage_after_delimiter_is_payload() {
        // "--XYZ junk" is not a delimiter, so the part never closes.
        let body = "--XYZ\r\nA\r\n--XYZ junk\r\n";
        assert_eq!(scan(body, "XYZ"), Err(MultipartError::UnexpectedEof));
    }

    #[test]
    fn test_scan_accepts_transport_padding() {
        let body = "--XYZ  \r\nA\r\n--XYZ\t\r\nB\r\n--XYZ--";
        assert_eq!(
            scan(body, "XYZ").unwrap(),
            vec![b"A".to_vec(), b"B".to_vec()]
        );
    }

    #[test]
    fn test_scan_empty_part() {
        let body = "--XYZ\r\n--XYZ\r\nB\r\n--XYZ--";
        assert_eq!(
            scan(body, "XYZ").unwrap(),
            vec![Vec::new(), b"B".to_vec()]
        );
    }

    #[test]
    fn test_boundary_like_sequence_in_payload_does_not_terminate_part() {
        let body = "--XYZ\r\nline1\r\n--XYZW\r\nline2\r\n--XYZ--\r\n";
        assert_eq!(
            scan(body, "XYZ").unwrap(),
            vec![b"line1\r\n--XYZW\r\nline2".to_vec()]
        );
    }

    #[test]
    fn test_delimiter_must_start_a_line() {
        let body = "--XYZ\r\nvalue --XYZ\r\nstill value\r\n--XYZ--";
        assert_eq!(
            scan(body, "XYZ").unwrap(),
            vec![b"value --XYZ\r\nstill value".to_vec()]
        );
    }

    #[test]
    fn test_scanner_is_fused_after_error() {
        let mut scanner = PartScanner::new(b"no delimiter", b"XYZ");
        assert!(matches!(scanner.next(), Some(Err(_))));
        assert!(scanner.next().is_none());
    }
}
