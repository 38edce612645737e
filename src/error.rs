use thiserror::Error;

pub const MISSING_KEY_MESSAGE: &str =
    "API key not set. Configure it in settings (`fieldgen settings set-key`).";

/// Everything that can stop a relay call short of generated content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("security check failed")]
    Authorization,
    #[error("unknown action: {action}")]
    UnknownAction { action: String },
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("transport failed: {message}")]
    Transport { message: String },
    #[error("request failed with status {status}")]
    UpstreamStatus { status: u16 },
    #[error("invalid response structure")]
    UpstreamShape,
}

impl RelayError {
    pub fn missing_key() -> Self {
        Self::configuration(MISSING_KEY_MESSAGE)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Rejections happen before any credential or network access.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Authorization | Self::UnknownAction { .. })
    }

    /// Text placed in the failure envelope.
    pub fn user_message(&self) -> String {
        match self {
            Self::Authorization => "Security check failed. Reload the editor and try again.".to_string(),
            Self::UnknownAction { action } => format!("Unknown action: {action}"),
            Self::Configuration { message } | Self::Transport { message } => message.clone(),
            Self::UpstreamStatus { status } => format!("API request failed with status {status}"),
            Self::UpstreamShape => "Invalid response structure.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_carries_code() {
        let err = RelayError::UpstreamStatus { status: 500 };
        assert!(err.user_message().ends_with("status 500"));
    }

    #[test]
    fn only_pre_checks_are_rejections() {
        assert!(RelayError::Authorization.is_rejection());
        assert!(RelayError::UnknownAction { action: "x".into() }.is_rejection());
        assert!(!RelayError::UpstreamShape.is_rejection());
        assert!(!RelayError::configuration("missing").is_rejection());
    }
}
