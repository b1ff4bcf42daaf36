//! Shared helpers for resolver modules: static regexes, share identifiers, endpoint URLs.

use regex::Regex;
use url::Url;

use super::ResolveError;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Derives the share identifier from a share URL.
///
/// `/sharing/link?surl=<id>` links carry the identifier in the query; every
/// other form uses the last non-empty path segment, percent-decoded.
#[must_use]
pub(crate) fn share_id_from_url(url: &Url) -> Option<String> {
    if url.path().starts_with("/sharing/link")
        && let Some((_, surl)) = url.query_pairs().find(|(key, _)| key == "surl")
        && !surl.trim().is_empty()
    {
        return Some(surl.trim().to_string());
    }

    let segment = url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()?;
    // Query builders encode again, so hand back the decoded form.
    match urlencoding::decode(segment) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(segment.to_string()),
    }
}

/// Joins `path` onto the provider base URL.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidShareUrl`] when the base URL does not parse.
pub(crate) fn provider_endpoint(base_url: &str, path: &str) -> Result<Url, ResolveError> {
    let base = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join(path.trim_start_matches('/')))
        .map_err(|_| ResolveError::invalid_share_url(base_url))
}

/// Returns the trimmed value when it is not blank.
#[must_use]
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_share_id_from_short_link_path() {
        let url = Url::parse("https://www.terabox.com/s/1AbCdEf").unwrap();
        assert_eq!(share_id_from_url(&url).unwrap(), "1AbCdEf");
    }

    #[test]
    fn test_share_id_ignores_trailing_slash() {
        let url = Url::parse("https://terabox.com/s/1AbCdEf/").unwrap();
        assert_eq!(share_id_from_url(&url).unwrap(), "1AbCdEf");
    }

    #[test]
    fn test_share_id_prefers_surl_query_on_sharing_link() {
        let url = Url::parse("https://terabox.com/sharing/link?surl=AbCdEf").unwrap();
        assert_eq!(share_id_from_url(&url).unwrap(), "AbCdEf");
    }

    #[test]
    fn test_share_id_falls_back_to_segment_without_surl() {
        let url = Url::parse("https://terabox.com/sharing/link").unwrap();
        assert_eq!(share_id_from_url(&url).unwrap(), "link");
    }

    #[test]
    fn test_share_id_path_segment_is_percent_decoded() {
        let url = Url::parse("https://terabox.com/s/1ab%20c").unwrap();
        assert_eq!(share_id_from_url(&url).unwrap(), "1ab c");

        let mut endpoint = Url::parse("https://www.terabox.com/api/shorturlinfo").unwrap();
        endpoint
            .query_pairs_mut()
            .append_pair("shorturl", &share_id_from_url(&url).unwrap());
        assert_eq!(endpoint.query(), Some("shorturl=1ab+c"));
    }

    #[test]
    fn test_share_id_none_for_root_path() {
        let url = Url::parse("https://terabox.com/").unwrap();
        assert!(share_id_from_url(&url).is_none());
    }

    #[test]
    fn test_provider_endpoint_joins_with_or_without_trailing_slash() {
        assert_eq!(
            provider_endpoint("https://www.terabox.com", "/api/shorturlinfo")
                .unwrap()
                .as_str(),
            "https://www.terabox.com/api/shorturlinfo"
        );
        assert_eq!(
            provider_endpoint("http://127.0.0.1:9000/", "share/download")
                .unwrap()
                .as_str(),
            "http://127.0.0.1:9000/share/download"
        );
        assert!(provider_endpoint("not a url", "x").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  a ")).unwrap(), "a");
        assert!(non_empty(Some("   ")).is_none());
        assert!(non_empty(None).is_none());
    }
}
