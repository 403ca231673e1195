/// Progress of a connection test for a candidate config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Nothing tested since the last edit
    Idle,
    /// Handshake in flight
    Testing,
    /// Handshake succeeded; the config may be saved
    Valid,
    /// Handshake or local validation failed
    Failed(String),
}

impl ValidationStatus {
    /// Short text for status lines.
    pub fn label(&self) -> String {
        match self {
            ValidationStatus::Idle => "Not tested".to_string(),
            ValidationStatus::Testing => "Testing connection...".to_string(),
            ValidationStatus::Valid => "Valid Configuration".to_string(),
            ValidationStatus::Failed(err) => format!("Connection failure: {}", err),
        }
    }
}
