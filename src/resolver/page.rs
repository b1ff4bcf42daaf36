//! Share page script inspection.
//!
//! The provider renders share pages with state embedded in inline `<script>`
//! blocks. Two things are looked for: the `jsToken` session global and the
//! embedded file listing. Neither is required for resolution.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::utils::compile_static_regex;
use super::{Extraction, ExtractionStrategy, SharePage};

static SCRIPT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<script\b([^>]*)>(.*?)</script\s*>"));
static SCRIPT_SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?i)\bsrc\s*="#));
static JS_TOKEN_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"jsToken["']?\s*[:=]\s*["']([A-Za-z0-9%_\-]+)["']"#)
});
// Token shipped URL-encoded inside an eval wrapper: fn%28%22<hex>%22%29
static JS_TOKEN_ENCODED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"fn%28%22([A-Fa-f0-9]+)%22%29"));
// Matches up to and including the listing's opening bracket.
static FILE_LIST_START_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"["']?file_list["']?\s*:\s*\["#));

const SESSION_TOKEN_MARKER: &str = "jsToken";
const FILE_LIST_MARKERS: [&str; 2] = ["file_list", "locals.mset"];

/// What inline scripts on a share page revealed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptFindings {
    /// Session token captured from the `jsToken` global.
    pub session_token: Option<String>,
    /// Raw JSON text of the embedded file listing.
    pub file_list_payload: Option<String>,
}

/// Returns the bodies of inline script blocks; external `src=` scripts are skipped.
#[must_use]
pub fn inline_scripts(html: &str) -> Vec<&str> {
    SCRIPT_BLOCK_RE
        .captures_iter(html)
        .filter(|caps| {
            caps.get(1)
                .is_none_or(|attrs| !SCRIPT_SRC_ATTR_RE.is_match(attrs.as_str()))
        })
        .filter_map(|caps| caps.get(2).map(|body| body.as_str()))
        .filter(|body| !body.trim().is_empty())
        .collect()
}

/// Walks every inline script block and collects what it can.
///
/// Extraction failures inside a block are not errors; the field stays `None`.
#[must_use]
pub fn inspect_scripts(html: &str) -> ScriptFindings {
    let mut findings = ScriptFindings::default();

    for script in inline_scripts(html) {
        if findings.session_token.is_none() && script.contains(SESSION_TOKEN_MARKER) {
            findings.session_token = extract_session_token(script);
            if findings.session_token.is_none() {
                debug!("jsToken referenced but not extractable");
            }
        }

        if findings.file_list_payload.is_none()
            && FILE_LIST_MARKERS.iter().any(|marker| script.contains(marker))
        {
            findings.file_list_payload = FILE_LIST_START_RE
                .find(script)
                .and_then(|m| balanced_array(&script[m.end() - 1..]))
                .map(str::to_string);
        }
    }

    findings
}

/// Returns the JSON array at the start of `text`, up to its matching `]`.
///
/// Brackets inside string literals are ignored. `None` when the array never closes.
fn balanced_array(text: &str) -> Option<&str> {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_session_token(script: &str) -> Option<String> {
    JS_TOKEN_ASSIGN_RE
        .captures(script)
        .or_else(|| JS_TOKEN_ENCODED_RE.captures(script))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Page-embedded file listing strategy.
///
/// Locating the listing works; turning it into [`FileMetadata`](super::FileMetadata)
/// is not yet supported, so this strategy never produces a result and the
/// resolver moves on to the share-info API.
#[derive(Debug, Default)]
pub struct EmbeddedListingStrategy;

#[async_trait]
impl ExtractionStrategy for EmbeddedListingStrategy {
    fn name(&self) -> &'static str {
        "embedded-listing"
    }

    async fn extract(&self, page: &SharePage) -> Extraction {
        match &page.findings.file_list_payload {
            None => Extraction::Missed("no embedded file listing on page".to_string()),
            Some(payload) => {
                debug!(
                    payload_bytes = payload.len(),
                    "embedded file listing located"
                );
                Extraction::Unsupported("embedded file listing parsing is not yet supported")
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <script src="/static/app.js"></script>
        <script type="text/javascript">
            window.jsToken = "ABCDEF0123456789";
        </script>
        <script>
            locals.mset({"file_list":[{"server_filename":"movie.mp4","size":42}],"uk":1});
        </script>
        </head><body></body></html>"#;

    #[test]
    fn test_inline_scripts_skips_external_sources() {
        let scripts = inline_scripts(PAGE);
        assert_eq!(scripts.len(), 2);
        assert!(scripts.iter().all(|s| !s.contains("app.js")));
    }

    #[test]
    fn test_inspect_scripts_captures_token_and_listing() {
        let findings = inspect_scripts(PAGE);
        assert_eq!(findings.session_token.as_deref(), Some("ABCDEF0123456789"));
        assert_eq!(
            findings.file_list_payload.as_deref(),
            Some(r#"[{"server_filename":"movie.mp4","size":42}]"#)
        );
    }

    #[test]
    fn test_inspect_scripts_reads_url_encoded_token() {
        let html = r#"<script>var jsToken = decodeURIComponent(`%28function%28%29%7Bfn%28%22A1B2C3%22%29%7D`);</script>"#;
        let findings = inspect_scripts(html);
        assert_eq!(findings.session_token.as_deref(), Some("A1B2C3"));
    }

    #[test]
    fn test_inspect_scripts_tolerates_marker_without_value() {
        let html = "<script>if (typeof jsToken === 'undefined') {}</script>";
        let findings = inspect_scripts(html);
        assert!(findings.session_token.is_none());
        assert!(findings.file_list_payload.is_none());
    }

    #[test]
    fn test_inspect_scripts_keeps_nested_arrays_whole() {
        let html = r#"<script>locals.mset({"file_list":[{"a":[1,2],"b":"x]"}],"uk":1});</script>"#;
        let findings = inspect_scripts(html);
        assert_eq!(
            findings.file_list_payload.as_deref(),
            Some(r#"[{"a":[1,2],"b":"x]"}]"#)
        );
    }

    #[test]
    fn test_balanced_array_unterminated() {
        assert_eq!(balanced_array(r#"[{"a":1}"#), None);
        assert_eq!(balanced_array("[]"), Some("[]"));
    }

    #[test]
    fn test_inspect_scripts_empty_page() {
        assert_eq!(inspect_scripts(""), ScriptFindings::default());
    }
}
