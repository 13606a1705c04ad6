use thiserror::Error;

/// Errors raised while defining or running a conversation
#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("State '{0}' not found")]
    UnknownState(String),

    #[error("Flow '{0}' is not registered")]
    UnknownFlow(String),

    #[error("No flow found for service code: {0}")]
    UnroutedServiceCode(String),

    #[error("Invalid flow definition: {0}")]
    InvalidFlow(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConduitError {
    /// True for errors caused by a broken flow definition or routing table
    /// rather than by a collaborator failing at runtime.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ConduitError::UnknownState(_)
                | ConduitError::UnknownFlow(_)
                | ConduitError::UnroutedServiceCode(_)
                | ConduitError::InvalidFlow(_)
                | ConduitError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConduitError>;
