//! Client configuration and URL resolution.
//!
//! All defaults that used to be ambient state in clients of this kind
//! (bearer token, content type) live in an explicit [`ClientConfig`] value
//! threaded through the transports.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use url::Url;

use fedikit_core::{query, Encoding, Error, Result};

/// Minimum instance version that accepts the access token as a WebSocket
/// subprotocol instead of a query parameter.
const SECURE_TOKEN_VERSION: (u64, u64, u64) = (2, 8, 4);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    streaming_url: Option<Url>,
    access_token: Option<String>,
    version: Option<String>,
    timeout: Duration,
    default_headers: Vec<(String, String)>,
    disable_version_check: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Transport(format!("invalid base url {base_url}: {e}")))?;

        Ok(Self {
            base_url,
            streaming_url: None,
            access_token: None,
            version: None,
            timeout: Duration::from_secs(30),
            default_headers: Vec::new(),
            disable_version_check: false,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Streaming API endpoint advertised by the instance. When unset the
    /// streaming URL is derived from the base URL by switching schemes.
    pub fn with_streaming_url(mut self, url: &str) -> Result<Self> {
        self.streaming_url = Some(
            Url::parse(url)
                .map_err(|e| Error::Transport(format!("invalid streaming url {url}: {e}")))?,
        );
        Ok(self)
    }

    /// Instance version, used to gate secure token delivery.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn disable_version_check(mut self) -> Self {
        self.disable_version_check = true;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Resolve a relative path against the base URL.
    ///
    /// Explicit `params` replace any query string embedded in `path`
    /// wholesale; with no params an embedded query string is preserved
    /// verbatim.
    pub fn resolve(&self, path: &str, params: Option<&Value>) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Transport(format!("invalid path {path}: {e}")))?;

        if let Some(params) = params {
            let rendered = query::stringify(params);
            url.set_query(if rendered.is_empty() {
                None
            } else {
                Some(&rendered)
            });
        }

        Ok(url)
    }

    /// Merge caller-supplied headers with the defaults. Caller headers win
    /// on collision; the content type tracks the request encoding.
    pub fn merge_headers(
        &self,
        encoding: Encoding,
        overrides: &[(String, String)],
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, header_value(encoding.content_type())?);

        if let Some(token) = &self.access_token {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }

        for (name, value) in self.default_headers.iter().chain(overrides) {
            headers.insert(header_name(name)?, header_value(value)?);
        }

        Ok(headers)
    }

    /// Resolve the streaming endpoint for `path`, returning the URL and the
    /// subprotocols to offer during the WebSocket handshake.
    ///
    /// When the instance is known to support it and the connection is
    /// secure, the access token travels as a subprotocol; otherwise it is
    /// appended as an `access_token` query parameter. Callers never need to
    /// know which mode is in effect.
    pub fn resolve_streaming(
        &self,
        path: &str,
        params: Option<&Value>,
    ) -> Result<(Url, Vec<String>)> {
        let base = self.streaming_base()?;
        let mut url = base
            .join(path)
            .map_err(|e| Error::Transport(format!("invalid streaming path {path}: {e}")))?;

        let mut params = match params.cloned() {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };

        let mut protocols = Vec::new();
        match &self.access_token {
            Some(token) if self.supports_secure_token() => {
                protocols.push(token.clone());
            }
            Some(token) => {
                params.insert("access_token".to_string(), Value::String(token.clone()));
            }
            None => {}
        }

        let rendered = query::stringify(&Value::Object(params));
        if !rendered.is_empty() {
            url.set_query(Some(&rendered));
        }

        Ok((url, protocols))
    }

    fn streaming_base(&self) -> Result<Url> {
        if let Some(url) = &self.streaming_url {
            return Ok(url.clone());
        }

        let mut url = self.base_url.clone();
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::Transport("cannot derive streaming url".to_string()))?;
        Ok(url)
    }

    // Passing the token via `Sec-WebSocket-Protocol` is supported since
    // instance version 2.8.4, and only over a secure transport.
    fn supports_secure_token(&self) -> bool {
        if self.disable_version_check {
            return false;
        }

        let secure = self
            .streaming_base()
            .map(|url| url.scheme() == "wss")
            .unwrap_or(false);

        secure
            && self
                .version
                .as_deref()
                .and_then(parse_version)
                .map(|v| v >= SECURE_TOKEN_VERSION)
                .unwrap_or(false)
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    name.parse()
        .map_err(|_| Error::Transport(format!("invalid header name: {name}")))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    value
        .parse()
        .map_err(|_| Error::Transport(format!("invalid header value for {value}")))
}

/// Lenient dotted-triple parse. Trailing non-digit suffixes on a segment
/// (`4.0.0rc1`) are ignored, missing segments are zero.
fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.').map(|segment| {
        let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().ok()
    });

    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig::new("https://mastodon.social")
            .unwrap()
            .with_access_token("token")
    }

    #[test]
    fn creates_default_headers() {
        let headers = config()
            .merge_headers(Encoding::Json, &[("extra".to_string(), "header".to_string())])
            .unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer token");
        assert_eq!(headers.get("extra").unwrap(), "header");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn caller_overrides_content_type() {
        let headers = config()
            .merge_headers(
                Encoding::Json,
                &[("Content-Type".to_string(), "multipart/form-data".to_string())],
            )
            .unwrap();

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "multipart/form-data");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer token");
    }

    #[test]
    fn resolves_http_path() {
        let url = config().resolve("/api/v1/yay", None).unwrap();
        assert_eq!(url.as_str(), "https://mastodon.social/api/v1/yay");
    }

    #[test]
    fn resolves_http_path_with_query() {
        let url = config()
            .resolve(
                "/api/v1/yay",
                Some(&json!({ "query": "true", "list": ["1", "2", "3"] })),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://mastodon.social/api/v1/yay?list[]=1&list[]=2&list[]=3&query=true"
        );
    }

    #[test]
    fn preserves_embedded_query_without_params() {
        let url = config().resolve("/path/to/somewhere?foo=bar", None).unwrap();
        assert_eq!(url.as_str(), "https://mastodon.social/path/to/somewhere?foo=bar");
    }

    #[test]
    fn revokes_embedded_query_with_params() {
        let url = config()
            .resolve("/path/to/somewhere?foo=bar", Some(&json!({ "foo2": "bar2" })))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://mastodon.social/path/to/somewhere?foo2=bar2"
        );
    }

    #[test]
    fn secure_token_travels_as_subprotocol() {
        let config = config().with_version("4.2.1");
        let (url, protocols) = config
            .resolve_streaming("/api/v1/streaming", None)
            .unwrap();

        assert_eq!(url.as_str(), "wss://mastodon.social/api/v1/streaming");
        assert_eq!(protocols, vec!["token".to_string()]);
    }

    #[test]
    fn old_instances_get_token_as_query_param() {
        let config = config().with_version("2.7.0");
        let (url, protocols) = config
            .resolve_streaming("/api/v1/streaming", None)
            .unwrap();

        assert_eq!(
            url.as_str(),
            "wss://mastodon.social/api/v1/streaming?access_token=token"
        );
        assert!(protocols.is_empty());
    }

    #[test]
    fn unknown_version_falls_back_to_query_param() {
        let (url, protocols) = config().resolve_streaming("/api/v1/streaming", None).unwrap();
        assert!(url.query().unwrap_or("").contains("access_token=token"));
        assert!(protocols.is_empty());
    }

    #[test]
    fn version_check_can_be_disabled() {
        let config = config().with_version("4.2.1").disable_version_check();
        let (_, protocols) = config.resolve_streaming("/api/v1/streaming", None).unwrap();
        assert!(protocols.is_empty());
    }

    #[test]
    fn parses_loose_versions() {
        assert_eq!(parse_version("4.0.0rc1"), Some((4, 0, 0)));
        assert_eq!(parse_version("2.8"), Some((2, 8, 0)));
        assert_eq!(parse_version("nightly"), None);
    }
}
