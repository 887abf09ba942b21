//! Multipart parsing
//!
//! Minimal multipart/form-data support for the upload endpoint: boundary
//! splitting and Content-Disposition filename extraction. Parts without a
//! filename (plain form fields) are skipped.

use crate::error::HttpError;

/// One uploaded file extracted from a multipart body.
#[derive(Debug)]
pub struct UploadPart {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Extract the boundary token from a multipart/form-data content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let (media_type, params) = content_type.split_once(';')?;
    if !media_type.trim().eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    for param in params.split(';') {
        if let Some((name, value)) = param.split_once('=') {
            if name.trim().eq_ignore_ascii_case("boundary") {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Parse a complete multipart body into its file parts.
pub fn parse(body: &[u8], boundary: &str) -> Result<Vec<UploadPart>, HttpError> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = Vec::new();

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| HttpError::BadMultipart("boundary not found in body".into()))?
        + delimiter.len();

    loop {
        if body[pos..].starts_with(b"--") {
            // Closing delimiter.
            break;
        }
        if !body[pos..].starts_with(b"\r\n") {
            return Err(HttpError::BadMultipart("missing CRLF after boundary".into()));
        }
        pos += 2;

        let header_end = find(body, b"\r\n\r\n", pos)
            .ok_or_else(|| HttpError::BadMultipart("part headers not terminated".into()))?;
        let headers = std::str::from_utf8(&body[pos..header_end])
            .map_err(|_| HttpError::BadMultipart("part headers not UTF-8".into()))?;

        let data_start = header_end + 4;
        let next_delimiter = find(body, &delimiter, data_start)
            .ok_or_else(|| HttpError::BadMultipart("part not terminated by boundary".into()))?;

        // Part data ends before the CRLF that precedes the next delimiter.
        let data_end = next_delimiter
            .checked_sub(2)
            .filter(|&end| end >= data_start && &body[end..next_delimiter] == b"\r\n")
            .ok_or_else(|| HttpError::BadMultipart("missing CRLF before boundary".into()))?;

        if let Some(filename) = content_disposition_filename(headers) {
            parts.push(UploadPart {
                filename,
                data: body[data_start..data_end].to_vec(),
            });
        }

        pos = next_delimiter + delimiter.len();
    }

    Ok(parts)
}

fn content_disposition_filename(headers: &str) -> Option<String> {
    for line in headers.split("\r\n") {
        let (name, value) = match line.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };
        if !name.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        let marker = "filename=\"";
        let start = value.find(marker)? + marker.len();
        let end = value[start..].find('"')? + start;
        let filename = &value[start..end];
        if filename.is_empty() {
            return None;
        }
        return Some(filename.to_string());
    }
    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}
