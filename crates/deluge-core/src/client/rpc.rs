use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Deluge Web JSON-RPC envelope ────────────────────────────────────────────

/// POST `.../json` request body
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: Value,
    pub id: u64,
}

/// POST `.../json` response body
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

// ── Daemon hosts known to the Web UI ────────────────────────────────────────

/// One entry of `web.get_hosts`: `[id, host, port, ...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostEntry {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl HostEntry {
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_array()?;
        let id = fields.first()?.as_str()?.to_string();
        let host = fields
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let port = fields
            .get(2)
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or_default();
        Some(Self { id, host, port })
    }
}

/// Daemon state reported by `web.get_host_status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostStatus {
    Online,
    Connected,
    Offline,
    Unknown,
}

impl HostStatus {
    /// The status response is `[id, status, version]` on Deluge 2 and carries
    /// host and port before the status on 1.3, so look for the status word.
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_array() else {
            return HostStatus::Unknown;
        };
        fields
            .iter()
            .filter_map(Value::as_str)
            .find_map(|field| match field {
                "Online" => Some(HostStatus::Online),
                "Connected" => Some(HostStatus::Connected),
                "Offline" => Some(HostStatus::Offline),
                _ => None,
            })
            .unwrap_or(HostStatus::Unknown)
    }

    /// Whether `web.connect` can be issued for this host.
    pub fn is_reachable(self) -> bool {
        matches!(self, HostStatus::Online | HostStatus::Connected)
    }
}
