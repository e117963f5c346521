use thiserror::Error;

/// Core domain errors
///
/// A structurally invalid workflow is never reported through this type: the
/// validator and the repair loop return it as a normal result value.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Whether a transport layer may retry the failed call
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("workflow must be a JSON object");
        assert_eq!(
            error.to_string(),
            "Validation error: workflow must be a JSON object"
        );
    }

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("engine", "HTTP 502: bad gateway");
        assert_eq!(
            error.to_string(),
            "Provider error: engine - HTTP 502: bad gateway"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(DomainError::provider("http", "connection reset").is_transient());
        assert!(DomainError::timeout("deadline").is_transient());
        assert!(!DomainError::parse("not json").is_transient());
        assert!(!DomainError::validation("bad").is_transient());
    }
}
