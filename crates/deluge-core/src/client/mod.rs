pub mod connection;
pub mod error;
pub mod rpc;
pub mod types;
pub mod validator;

pub use connection::{DelugeClient, DEFAULT_TIMEOUT};
pub use error::ClientError;
pub use rpc::{HostEntry, HostStatus};
pub use types::ValidationStatus;
pub use validator::{ConnectionValidator, DelugeValidator};
