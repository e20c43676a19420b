//! Server address construction
//!
//! A session connects to `ws(s)://host:port/path` with query parameters that
//! identify the tool version, the shared secret token, the target, and the
//! last compiled timestamp. The server uses the timestamp to tell a fresh
//! page load from a resumed session.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use elmlink_core::prelude::*;

/// Characters that must be escaped inside a path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Where the build server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Use `wss` instead of `ws` (matches the page's own scheme)
    pub secure: bool,
    pub host: String,
    pub port: u16,
    /// Absolute path, normally `/`
    pub path: String,
}

impl ServerAddress {
    pub fn new(secure: bool, host: impl Into<String>, port: u16) -> Self {
        Self {
            secure,
            host: host.into(),
            port,
            path: "/".to_string(),
        }
    }

    /// Build the full connection URL for one target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Address`] if the host/port/path combination does not
    /// form a valid URL.
    pub fn to_url(&self, params: &ConnectParams) -> Result<Url> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let path = utf8_percent_encode(&self.path, PATH_SEGMENT);
        let base = format!("{scheme}://{}:{}{path}", self.host, self.port);
        let mut url =
            Url::parse(&base).map_err(|err| Error::address(format!("{base}: {err}")))?;

        url.query_pairs_mut()
            .append_pair("elmWatchVersion", &params.version)
            .append_pair("webSocketToken", params.token.as_deref().unwrap_or(""))
            .append_pair("targetName", &params.target_name)
            .append_pair(
                "elmCompiledTimestamp",
                &params.elm_compiled_timestamp.to_string(),
            );

        Ok(url)
    }
}

/// Per-connection identification sent as query parameters
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Tool version, so the server can reject incompatible clients
    pub version: String,
    /// Shared secret proving this client belongs to this server instance
    pub token: Option<String>,
    pub target_name: String,
    /// Timestamp of the compile the page is currently running
    pub elm_compiled_timestamp: i64,
}

impl ConnectParams {
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            token: None,
            target_name: target_name.into(),
            elm_compiled_timestamp: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_scheme_matches_page() {
        let params = ConnectParams::new("app");
        let insecure = ServerAddress::new(false, "localhost", 9870);
        assert_eq!(insecure.to_url(&params).unwrap().scheme(), "ws");

        let secure = ServerAddress::new(true, "localhost", 9870);
        assert_eq!(secure.to_url(&params).unwrap().scheme(), "wss");
    }

    #[test]
    fn test_url_query_parameters() {
        let mut params = ConnectParams::new("my app");
        params.token = Some("s3cret".to_string());
        params.elm_compiled_timestamp = 1_700_000_000_000;

        let url = ServerAddress::new(false, "127.0.0.1", 9870)
            .to_url(&params)
            .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("webSocketToken".to_string(), "s3cret".to_string())));
        assert!(pairs.contains(&("targetName".to_string(), "my app".to_string())));
        assert!(pairs.contains(&(
            "elmCompiledTimestamp".to_string(),
            "1700000000000".to_string()
        )));
        assert!(pairs.iter().any(|(k, _)| k == "elmWatchVersion"));
    }

    #[test]
    fn test_target_name_is_percent_encoded_on_the_wire() {
        let params = ConnectParams::new("my target & more");
        let url = ServerAddress::new(false, "localhost", 9870)
            .to_url(&params)
            .unwrap();
        let raw = url.as_str();
        assert!(!raw.contains("target & more"));
        // Decodes back to the original
        let (_, v) = url
            .query_pairs()
            .find(|(k, _)| k == "targetName")
            .unwrap();
        assert_eq!(v, "my target & more");
    }

    #[test]
    fn test_path_is_kept() {
        let mut addr = ServerAddress::new(false, "localhost", 9870);
        addr.path = "/elmlink".to_string();
        let url = addr.to_url(&ConnectParams::new("app")).unwrap();
        assert_eq!(url.path(), "/elmlink");
    }

    #[test]
    fn test_bad_host_is_an_address_error() {
        let addr = ServerAddress::new(false, "bad host", 9870);
        let err = addr.to_url(&ConnectParams::new("app")).unwrap_err();
        assert!(matches!(err, Error::Address { .. }));
        assert!(err.is_fatal());
    }
}
