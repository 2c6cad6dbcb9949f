use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Device unreachable: {0}")]
    Transport(String),

    #[error("Device returned {status} for {endpoint}")]
    Device { endpoint: String, status: u16 },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Error: Unknown state (running with no phase flag set)")]
    UnknownPhase,

    #[error("Another action is still pending: {0}")]
    Busy(String),

    #[error("Action requires confirmation: {0}")]
    NotConfirmed(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<PanelError> for String {
    fn from(err: PanelError) -> Self {
        err.to_string()
    }
}
