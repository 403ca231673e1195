pub mod config;
pub mod headers;

#[cfg(feature = "client")]
pub mod client;

pub use config::{ClientConfig, ClientConfigRecord, CustomHeaders, NetworkSecurity};
pub use headers::{headers_from_pairs, pairs_from_headers};
