//! Parsed primary and mirror addresses.

use std::fmt;

use url::Url;

use crate::error::DuplicateError;

/// A configured server that receives requests, as a base URL.
///
/// Accepts bare `host:port` (plain `http`) or an absolute `http`/`https` URL.
/// Any path, query or fragment on the configured address is replaced by the
/// inbound request's path and query when a request is cloned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    address: String,
    base: Url,
}

fn parse_base(address: &str) -> Result<Url, String> {
    if address.is_empty() {
        return Err("empty address".to_string());
    }

    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };

    let base = Url::parse(&candidate).map_err(|e| e.to_string())?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}", base.scheme()));
    }
    if base.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(base)
}

impl Destination {
    pub fn parse(address: &str) -> Result<Self, DuplicateError> {
        let address = address.trim();
        let base = parse_base(address).map_err(|reason| DuplicateError::InvalidDestination {
            address: address.to_string(),
            reason,
        })?;
        Ok(Self {
            address: address.to_string(),
            base,
        })
    }

    /// The address as it was configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Target URL for an inbound `path` and optional `query`.
    ///
    /// The result is a WHATWG URL: dot segments in `path` are resolved and
    /// query bytes outside the query percent-encode set are escaped, so
    /// `/a/../b` goes out as `/b`.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(query);
        url.set_fragment(None);
        url
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// A configured mirror.
///
/// A malformed mirror address does not stop the duplicator. It is kept as
/// `Invalid` and every copy addressed to it fails with `InvalidDestination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorTarget {
    Valid(Destination),
    Invalid { address: String, reason: String },
}

impl MirrorTarget {
    pub fn parse(address: &str) -> Self {
        let address = address.trim();
        match parse_base(address) {
            Ok(base) => Self::Valid(Destination {
                address: address.to_string(),
                base,
            }),
            Err(reason) => Self::Invalid {
                address: address.to_string(),
                reason,
            },
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::Valid(destination) => destination.address(),
            Self::Invalid { address, .. } => address,
        }
    }

    /// The parsed destination, or the error every dispatch to it reports.
    pub fn destination(&self) -> Result<&Destination, DuplicateError> {
        match self {
            Self::Valid(destination) => Ok(destination),
            Self::Invalid { address, reason } => Err(DuplicateError::InvalidDestination {
                address: address.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

impl fmt::Display for MirrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_port_defaults_to_http() {
        let dest = Destination::parse("127.0.0.1:8081").unwrap();
        assert_eq!(dest.url_for("/", None).as_str(), "http://127.0.0.1:8081/");
        assert_eq!(dest.to_string(), "127.0.0.1:8081");
    }

    #[test]
    fn test_absolute_url_is_kept() {
        let dest = Destination::parse("https://mirror.internal:9443").unwrap();
        assert_eq!(dest.url_for("/", None).as_str(), "https://mirror.internal:9443/");
    }

    #[test]
    fn test_url_for_replaces_path_and_query() {
        let dest = Destination::parse("http://mirror:8080/ignored?x=1#frag").unwrap();
        let url = dest.url_for("/items", Some("id=3"));
        assert_eq!(url.as_str(), "http://mirror:8080/items?id=3");

        let url = dest.url_for("/", None);
        assert_eq!(url.as_str(), "http://mirror:8080/");
    }

    #[test]
    fn test_url_for_normalizes_request_target() {
        let dest = Destination::parse("mirror:80").unwrap();
        assert_eq!(dest.url_for("/a/../b", None).path(), "/b");
        assert_eq!(dest.url_for("/%7Efoo/./bar", None).path(), "/%7Efoo/bar");
        assert_eq!(
            dest.url_for("/x", Some("name=o'neil")).query(),
            Some("name=o%27neil")
        );
        // Already-encoded and unreserved bytes pass through.
        assert_eq!(
            dest.url_for("/search", Some("q=a%20b&tag=x")).query(),
            Some("q=a%20b&tag=x")
        );
    }

    #[test]
    fn test_malformed_addresses_are_rejected() {
        for bad in ["", "   ", "ftp://host:21", "http://", "host:notaport"] {
            let err = Destination::parse(bad).unwrap_err();
            assert!(
                matches!(err, DuplicateError::InvalidDestination { .. }),
                "{bad:?} should be invalid, got {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_mirror_is_kept_and_fails_each_use() {
        let target = MirrorTarget::parse(" ftp://typo ");
        assert_eq!(target.address(), "ftp://typo");
        assert_eq!(target.to_string(), "ftp://typo");

        for _ in 0..2 {
            match target.destination() {
                Err(DuplicateError::InvalidDestination { address, reason }) => {
                    assert_eq!(address, "ftp://typo");
                    assert!(reason.contains("ftp"), "{reason}");
                }
                other => panic!("expected InvalidDestination, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_valid_mirror_matches_destination() {
        let target = MirrorTarget::parse("10.0.0.2:80");
        assert_eq!(
            target.destination().unwrap(),
            &Destination::parse("10.0.0.2:80").unwrap()
        );
    }
}
