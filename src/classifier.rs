//! Link classification against the provider's trusted host set.
//!
//! A link is only ever fetched when its host belongs to the provider. The same
//! [`HostAllowList`] is reused by the streaming proxy to pin redirect chains.

use url::Url;

/// Hosts accepted verbatim.
pub const PROVIDER_HOSTS: [&str; 4] = [
    "terabox.com",
    "www.terabox.com",
    "1024terabox.com",
    "www.1024terabox.com",
];

/// Any host ending in one of these suffixes is accepted.
pub const PROVIDER_HOST_SUFFIXES: [&str; 2] = [".terabox.com", ".1024terabox.com"];

const SHARE_PATH_PREFIXES: [&str; 2] = ["/s/", "/sharing/link"];

/// What kind of link the caller supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Unparseable, or the host is outside the allow-list.
    Invalid,
    /// Points straight at a byte-serving endpoint.
    DirectLink,
    /// A share page that must be resolved first.
    ShareLink,
}

impl Classification {
    /// Returns true for [`Classification::DirectLink`] and [`Classification::ShareLink`].
    #[must_use]
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Set of trusted hostnames, matched case-insensitively by exact name or suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowList {
    exact: Vec<String>,
    suffixes: Vec<String>,
}

impl HostAllowList {
    /// The provider's own domains.
    #[must_use]
    pub fn provider_default() -> Self {
        Self {
            exact: PROVIDER_HOSTS.iter().map(|h| (*h).to_string()).collect(),
            suffixes: PROVIDER_HOST_SUFFIXES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Adds exact-match hosts on top of the current list.
    ///
    /// Blank entries are ignored.
    #[must_use]
    pub fn with_extra_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for host in hosts {
            let host = host.as_ref().trim().to_ascii_lowercase();
            if !host.is_empty() && !self.exact.contains(&host) {
                self.exact.push(host);
            }
        }
        self
    }

    /// Returns true if `host` is trusted.
    #[must_use]
    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.exact.iter().any(|candidate| *candidate == host)
            || self
                .suffixes
                .iter()
                .any(|suffix| host.ends_with(suffix.as_str()))
    }

    /// Returns true if the URL has a host and that host is trusted.
    #[must_use]
    pub fn allows_url(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.allows_host(host))
    }

    /// Classifies raw caller input against this allow-list.
    #[must_use]
    pub fn classify(&self, input: &str) -> Classification {
        let Ok(url) = Url::parse(input.trim()) else {
            return Classification::Invalid;
        };
        if !self.allows_url(&url) {
            return Classification::Invalid;
        }

        let path = url.path();
        if SHARE_PATH_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            Classification::ShareLink
        } else {
            Classification::DirectLink
        }
    }
}

impl Default for HostAllowList {
    fn default() -> Self {
        Self::provider_default()
    }
}

/// Classifies `input` against the provider's default allow-list.
#[must_use]
pub fn classify(input: &str) -> Classification {
    HostAllowList::provider_default().classify(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rejects_foreign_hosts_for_any_path() {
        for url in [
            "https://evil.com/file",
            "https://evil.com/s/abc",
            "http://terabox.com.evil.com/sharing/link?surl=x",
            "https://notterabox.com/file.mp4",
            "ftp://example.org/s/",
        ] {
            assert_eq!(classify(url), Classification::Invalid, "{url}");
        }
    }

    #[test]
    fn test_classify_rejects_unparseable_input() {
        assert_eq!(classify(""), Classification::Invalid);
        assert_eq!(classify("terabox.com/s/abc"), Classification::Invalid);
        assert_eq!(classify("not a url"), Classification::Invalid);
    }

    #[test]
    fn test_classify_share_paths_on_every_provider_host() {
        for host in [
            "terabox.com",
            "www.terabox.com",
            "1024terabox.com",
            "www.1024terabox.com",
            "data.terabox.com",
            "d.1024terabox.com",
        ] {
            assert_eq!(
                classify(&format!("https://{host}/s/1AbCdEf")),
                Classification::ShareLink,
                "{host}"
            );
            assert_eq!(
                classify(&format!("https://{host}/sharing/link?surl=AbCdEf")),
                Classification::ShareLink,
                "{host}"
            );
            assert_eq!(
                classify(&format!("https://{host}/file.mp4")),
                Classification::DirectLink,
                "{host}"
            );
        }
    }

    #[test]
    fn test_classify_host_match_is_case_insensitive() {
        assert_eq!(
            classify("https://WWW.TeraBox.COM/s/1abc"),
            Classification::ShareLink
        );
    }

    #[test]
    fn test_classify_share_prefix_requires_segment_boundary() {
        assert_eq!(
            classify("https://terabox.com/sx/abc"),
            Classification::DirectLink
        );
        assert_eq!(classify("https://terabox.com/s"), Classification::DirectLink);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let url = "https://www.terabox.com/s/1xyz";
        assert_eq!(classify(url), classify(url));
    }

    #[test]
    fn test_extra_hosts_extend_the_default_list() {
        let allow = HostAllowList::provider_default().with_extra_hosts([" 127.0.0.1 ", ""]);
        assert!(allow.allows_host("127.0.0.1"));
        assert!(allow.allows_host("terabox.com"));
        assert!(!allow.allows_host("localhost"));
        assert_eq!(
            allow.classify("http://127.0.0.1:8080/s/abc"),
            Classification::ShareLink
        );
    }

    #[test]
    fn test_is_valid() {
        assert!(!Classification::Invalid.is_valid());
        assert!(Classification::DirectLink.is_valid());
        assert!(Classification::ShareLink.is_valid());
    }
}
