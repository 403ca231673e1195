/// Why a connection attempt failed.
///
/// The `Display` text is meant to be shown to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot reach server: {0}")]
    Unreachable(String),
    #[error("Connection failed: {0}")]
    Transport(String),
    #[error("The server did not respond in time")]
    Timeout,
    #[error("Authentication failed: the server rejected the password")]
    AuthenticationRejected,
    #[error("Unexpected HTTP status {0} from server")]
    HttpStatus(u16),
    #[error("Unexpected response from server: {0}")]
    MalformedResponse(String),
    #[error("Server error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid custom header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("The Deluge Web UI has no daemon hosts configured")]
    NoHosts,
    #[error("None of the daemon hosts known to the Web UI are online")]
    NoOnlineHosts,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Unreachable(describe(&err))
        } else if err.is_decode() {
            ClientError::MalformedResponse(describe(&err))
        } else if let Some(status) = err.status() {
            ClientError::HttpStatus(status.as_u16())
        } else {
            ClientError::Transport(describe(&err))
        }
    }
}

/// Flatten an error and its sources into one line; reqwest's top-level
/// message alone rarely says what went wrong (DNS, refused, TLS, ...).
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_readable() {
        assert_eq!(
            ClientError::AuthenticationRejected.to_string(),
            "Authentication failed: the server rejected the password"
        );
        assert_eq!(
            ClientError::HttpStatus(502).to_string(),
            "Unexpected HTTP status 502 from server"
        );
        assert_eq!(
            ClientError::Rpc {
                code: 2,
                message: "Unknown method".to_string()
            }
            .to_string(),
            "Server error 2: Unknown method"
        );
    }

    #[derive(Debug, thiserror::Error)]
    #[error("error sending request")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn describe_joins_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(
            describe(&Outer(inner)),
            "error sending request: connection refused"
        );
    }
}
