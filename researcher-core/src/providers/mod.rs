//! Completion gateway implementations.
//!
//! Use `create_gateway()` to build the HTTP gateway from config.

pub mod openai_compat;

use crate::brain::CompletionGateway;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatibleGateway;

/// Build the completion gateway described by `config`.
pub fn create_gateway(config: &LlmConfig) -> Result<Arc<dyn CompletionGateway>, LlmError> {
    tracing::debug!(base_url = %config.base_url, model = %config.model, "Creating completion gateway");
    Ok(Arc::new(OpenAiCompatibleGateway::new(config)?))
}
