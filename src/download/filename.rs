//! Filename derivation for proxied downloads.
//!
//! The name offered to the caller comes from the upstream `Content-Disposition`
//! header when it has one, then from the URL's last path segment, then
//! [`FALLBACK_FILENAME`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::constants::FALLBACK_FILENAME;
use crate::resolver::compile_static_regex;

static DISPOSITION_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"filename[^;=\n]*=("[^"]*"|'[^']*'|[^;\n]*)"#)
});

/// Derives the download filename from an optional `Content-Disposition` value and the target URL.
#[must_use]
pub fn derive_filename(content_disposition: Option<&str>, url: &Url) -> String {
    content_disposition
        .and_then(parse_content_disposition)
        .or_else(|| filename_from_url(url))
        .map(|name| sanitize_header_filename(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Extracts a filename from a `Content-Disposition` header value.
///
/// RFC 5987 `filename*=charset''value` is percent-decoded; otherwise the first
/// `filename=` value is taken with all quote characters removed.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                let decoded = decoded.trim_matches(['"', '\'']).to_string();
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        }
    }

    DISPOSITION_FILENAME_RE
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace(['"', '\''], "").trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Returns the percent-decoded last path segment, if non-empty.
pub(crate) fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    match urlencoding::decode(last) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            debug!(segment = %last, error = %e, "URL decoding failed, using fallback filename");
            None
        }
    }
}

/// Makes a filename safe to place inside `filename="..."`.
///
/// Control characters, double quotes and backslashes become `_`; path
/// separators are reduced to the final component.
pub(crate) fn sanitize_header_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
