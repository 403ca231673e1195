use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Extra HTTP headers sent with every request to a client's endpoint,
/// e.g. credentials for an authenticating reverse proxy.
pub type CustomHeaders = BTreeMap<String, String>;

/// Transport security of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkSecurity {
    Http,
    Https,
}

impl NetworkSecurity {
    pub fn from_is_http(is_http: bool) -> Self {
        if is_http {
            NetworkSecurity::Http
        } else {
            NetworkSecurity::Https
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            NetworkSecurity::Http => "http",
            NetworkSecurity::Https => "https",
        }
    }
}

/// Connection settings for one Deluge Web UI endpoint.
///
/// A config is immutable: editing a client builds a new value through
/// [`ClientConfig::new`]. The RPC and upload URLs are derived from the
/// other fields and cannot be set on their own.
///
/// Equality only looks at the connection fields (see
/// [`ClientConfig::same_connection`]); custom headers and derived URLs are
/// ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ClientConfigRecord", into = "ClientConfigRecord")]
pub struct ClientConfig {
    nickname: String,
    hostname: String,
    relative_path: String,
    port: u16,
    password: String,
    is_http: bool,
    custom_headers: CustomHeaders,
    url: String,
    upload_url: String,
}

impl ClientConfig {
    /// Build a config, or `None` when the host, port and path do not form a
    /// valid absolute URL.
    pub fn new(
        nickname: impl Into<String>,
        hostname: impl Into<String>,
        relative_path: impl Into<String>,
        port: u16,
        password: impl Into<String>,
        is_http: bool,
        custom_headers: CustomHeaders,
    ) -> Option<Self> {
        let hostname = hostname.into();
        let relative_path = relative_path.into();
        let security = NetworkSecurity::from_is_http(is_http);
        let (url, upload_url) = endpoint_urls(security, &hostname, port, &relative_path)?;
        log::debug!("Built client endpoint {}", url);

        Some(Self {
            nickname: nickname.into(),
            hostname,
            relative_path,
            port,
            password: password.into(),
            is_http,
            custom_headers,
            url,
            upload_url,
        })
    }

    /// Same as [`ClientConfig::new`] with no custom headers.
    pub fn without_headers(
        nickname: impl Into<String>,
        hostname: impl Into<String>,
        relative_path: impl Into<String>,
        port: u16,
        password: impl Into<String>,
        is_http: bool,
    ) -> Option<Self> {
        Self::new(
            nickname,
            hostname,
            relative_path,
            port,
            password,
            is_http,
            CustomHeaders::new(),
        )
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_http(&self) -> bool {
        self.is_http
    }

    pub fn custom_headers(&self) -> &CustomHeaders {
        &self.custom_headers
    }

    /// JSON-RPC endpoint (`.../json`).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Torrent upload endpoint (`.../upload`).
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Whether two configs describe the same connection.
    ///
    /// Compares nickname, hostname, relative path, port, password and the
    /// transport flag. Custom headers and the derived URLs are not part of
    /// the comparison.
    pub fn same_connection(&self, other: &ClientConfig) -> bool {
        self.nickname == other.nickname
            && self.hostname == other.hostname
            && self.relative_path == other.relative_path
            && self.port == other.port
            && self.password == other.password
            && self.is_http == other.is_http
    }
}

impl PartialEq for ClientConfig {
    fn eq(&self, other: &Self) -> bool {
        self.same_connection(other)
    }
}

impl Eq for ClientConfig {}

/// Persisted shape of a [`ClientConfig`].
///
/// Every field is required except `customHeaders`, which older records do
/// not carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigRecord {
    pub nickname: String,
    pub hostname: String,
    pub relative_path: String,
    pub port: u16,
    pub password: String,
    #[serde(rename = "isHTTP")]
    pub is_http: bool,
    pub url: String,
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(default)]
    pub custom_headers: CustomHeaders,
}

/// A stored record whose host, port and path cannot form a URL.
#[derive(Debug, thiserror::Error)]
#[error("invalid client config {nickname:?}: cannot build a URL from host {hostname:?}, port {port} and path {relative_path:?}")]
pub struct InvalidClientConfig {
    pub nickname: String,
    pub hostname: String,
    pub port: u16,
    pub relative_path: String,
}

impl TryFrom<ClientConfigRecord> for ClientConfig {
    type Error = InvalidClientConfig;

    fn try_from(record: ClientConfigRecord) -> Result<Self, Self::Error> {
        let ClientConfigRecord {
            nickname,
            hostname,
            relative_path,
            port,
            password,
            is_http,
            url,
            upload_url,
            custom_headers,
        } = record;

        let invalid = || InvalidClientConfig {
            nickname: nickname.clone(),
            hostname: hostname.clone(),
            port,
            relative_path: relative_path.clone(),
        };

        let config = ClientConfig::new(
            nickname.clone(),
            hostname.clone(),
            relative_path.clone(),
            port,
            password,
            is_http,
            custom_headers,
        )
        .ok_or_else(invalid)?;

        if config.url != url || config.upload_url != upload_url {
            log::warn!(
                "Stored URLs for client {:?} are stale, rebuilt as {}",
                config.nickname,
                config.url
            );
        }

        Ok(config)
    }
}

impl From<ClientConfig> for ClientConfigRecord {
    fn from(config: ClientConfig) -> Self {
        Self {
            nickname: config.nickname,
            hostname: config.hostname,
            relative_path: config.relative_path,
            port: config.port,
            password: config.password,
            is_http: config.is_http,
            url: config.url,
            upload_url: config.upload_url,
            custom_headers: config.custom_headers,
        }
    }
}

/// Build the `(json, upload)` endpoint URLs sharing one scheme, host, port
/// and path prefix. The port is always written out, even for the scheme's
/// default port.
///
/// Hostnames with percent escapes and paths with `.`/`..` segments are
/// rejected: both would be rewritten by URL parsing, so the stored URL would
/// not be the one requests go to.
fn endpoint_urls(
    security: NetworkSecurity,
    hostname: &str,
    port: u16,
    relative_path: &str,
) -> Option<(String, String)> {
    if hostname.contains('%') {
        return None;
    }
    url::Host::parse(hostname).ok()?;

    let segments: Vec<&str> = relative_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.iter().any(|segment| matches!(*segment, "." | "..")) {
        return None;
    }

    // Only used to percent-encode the path segments.
    let mut base = Url::parse("http://localhost/").ok()?;
    base.path_segments_mut()
        .ok()?
        .clear()
        .extend(segments);

    let endpoint = |leaf: &str| -> Option<String> {
        let mut path = base.clone();
        path.path_segments_mut().ok()?.pop_if_empty().push(leaf);
        let full = format!("{}://{}:{}{}", security.scheme(), hostname, port, path.path());
        Url::parse(&full).ok()?;
        Some(full)
    };

    Some((endpoint("json")?, endpoint("upload")?))
}
