//! Error types for the Researcher core library.
//!
//! Uses `thiserror` for public API error types. Search failures have their own
//! type but never leave the search gateway; completion failures are fatal to the
//! cycle they occur in and are wrapped with the cycle number by the orchestrator.

/// Top-level error type for the Researcher core library.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Cycle {cycle} failed: {source}")]
    Cycle {
        cycle: u32,
        #[source]
        source: Box<ResearchError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResearchError {
    /// Wrap an error with the 1-based cycle number it happened in.
    pub fn in_cycle(self, cycle: u32) -> Self {
        ResearchError::Cycle {
            cycle,
            source: Box::new(self),
        }
    }

    /// The cycle a failure is attributed to, if any.
    pub fn cycle(&self) -> Option<u32> {
        match self {
            ResearchError::Cycle { cycle, .. } => Some(*cycle),
            _ => None,
        }
    }
}

/// Errors from completion (language model) calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors raised while searching or fetching pages.
///
/// These are absorbed inside the search gateway: a failed search becomes an
/// empty result set and a failed page fetch falls back to the snippet.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search request returned HTTP {status}")]
    Status { status: u16 },

    #[error("Failed to parse search response: {message}")]
    Parse { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No API key provided")]
    MissingCredential,

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from the report history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("History file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No saved report with id {id}")]
    NotFound { id: i64 },
}

/// Convenience result alias for the core library.
pub type Result<T, E = ResearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::ApiRequest {
            message: "HTTP 500: boom".into(),
        };
        assert_eq!(err.to_string(), "API request failed: HTTP 500: boom");
    }

    #[test]
    fn test_cycle_wrapping_keeps_source() {
        let err = ResearchError::from(LlmError::AuthFailed {
            provider: "openai".into(),
        })
        .in_cycle(2);
        assert_eq!(err.cycle(), Some(2));
        assert!(err.to_string().contains("Cycle 2 failed"));
        assert!(err.to_string().contains("Authentication failed"));
    }

    #[test]
    fn test_missing_credential_converts() {
        let err: ResearchError = ConfigError::MissingCredential.into();
        assert!(matches!(
            err,
            ResearchError::Config(ConfigError::MissingCredential)
        ));
        assert_eq!(err.cycle(), None);
    }
}
