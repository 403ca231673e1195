use crate::client::error::ClientError;
use crate::client::rpc::{HostEntry, HostStatus, RpcRequest, RpcResponse};
use crate::config::{ClientConfig, CustomHeaders};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-request timeout used when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC client for one Deluge Web UI endpoint.
///
/// Every request goes to [`ClientConfig::url`] with the config's custom
/// headers attached. The Web UI session cookie set by `auth.login` is kept in
/// the client's cookie store, so one `DelugeClient` is one session.
pub struct DelugeClient {
    config: ClientConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl DelugeClient {
    pub fn with_timeout(config: ClientConfig, timeout: Duration) -> Result<Self, ClientError> {
        let headers = header_map(config.custom_headers())?;
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and decode its `result`.
    ///
    /// A populated `error` member wins over `result`. A body that is not a
    /// Deluge envelope, or a `result` of the wrong shape, is reported as
    /// [`ClientError::MalformedResponse`].
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("RPC {} (id {}) -> {}", method, id, self.config.url());

        let resp = self
            .http
            .post(self.config.url())
            .json(&RpcRequest { method, params, id })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("RPC {} failed: HTTP {}", method, status);
            return Err(ClientError::HttpStatus(status.as_u16()));
        }

        let body = resp.text().await?;
        let envelope: RpcResponse = serde_json::from_str(&body).map_err(|e| {
            ClientError::MalformedResponse(format!("{} returned invalid JSON-RPC: {}", method, e))
        })?;

        if let Some(error) = envelope.error {
            log::warn!("RPC {} returned error {}: {}", method, error.code, error.message);
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(envelope.result).map_err(|e| {
            ClientError::MalformedResponse(format!("unexpected result for {}: {}", method, e))
        })
    }

    /// `auth.login` with the configured password.
    pub async fn authenticate(&self) -> Result<(), ClientError> {
        let accepted: bool = self
            .call("auth.login", json!([self.config.password()]))
            .await?;
        if accepted {
            log::info!("Authenticated with {}", self.config.url());
            Ok(())
        } else {
            log::warn!("Password rejected by {}", self.config.url());
            Err(ClientError::AuthenticationRejected)
        }
    }

    /// Whether the Web UI is already attached to a daemon.
    pub async fn is_connected(&self) -> Result<bool, ClientError> {
        self.call("web.connected", json!([])).await
    }

    pub async fn get_hosts(&self) -> Result<Vec<HostEntry>, ClientError> {
        let rows: Vec<Value> = self.call("web.get_hosts", json!([])).await?;
        Ok(rows.iter().filter_map(HostEntry::from_value).collect())
    }

    pub async fn get_host_status(&self, host_id: &str) -> Result<HostStatus, ClientError> {
        let value: Value = self.call("web.get_host_status", json!([host_id])).await?;
        Ok(HostStatus::from_value(&value))
    }

    /// Attach the Web UI to a daemon host. The result payload differs between
    /// Deluge versions and is ignored.
    pub async fn connect_to_host(&self, host_id: &str) -> Result<(), ClientError> {
        let _: Value = self.call("web.connect", json!([host_id])).await?;
        log::info!("Web UI at {} connected to daemon {}", self.config.url(), host_id);
        Ok(())
    }

    /// Log in, then make sure the Web UI is attached to a daemon.
    ///
    /// 1. `auth.login` with the password
    /// 2. `web.connected`; done if already attached
    /// 3. otherwise connect to the first host reporting Online/Connected
    pub async fn authenticate_and_connect(&self) -> Result<(), ClientError> {
        self.authenticate().await?;

        if self.is_connected().await? {
            log::info!("Web UI at {} already connected to a daemon", self.config.url());
            return Ok(());
        }

        let hosts = self.get_hosts().await?;
        if hosts.is_empty() {
            return Err(ClientError::NoHosts);
        }

        for host in &hosts {
            let status = self.get_host_status(&host.id).await?;
            log::debug!("Daemon {} ({}:{}) is {:?}", host.id, host.host, host.port, status);
            if status.is_reachable() {
                return self.connect_to_host(&host.id).await;
            }
        }

        Err(ClientError::NoOnlineHosts)
    }
}

fn header_map(headers: &CustomHeaders) -> Result<HeaderMap, ClientError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
