//! # Researcher Core
//!
//! Engine for iterative, cited research reports: web search, follow-up
//! question generation, synthesis through a chat-completions model, citation
//! linking and per-model cost tracking.

pub mod brain;
pub mod config;
pub mod cost;
pub mod credentials;
pub mod error;
pub mod history;
pub mod providers;
pub mod research;
pub mod search;
pub mod types;

pub use brain::{CompletionGateway, MockCompletionGateway};
pub use config::{AppConfig, ResearchConfig, ResearchSettings, load_config};
pub use cost::{compute_cost, format_cost};
pub use credentials::{Credential, CredentialStore, KeyringCredentialStore};
pub use error::{ConfigError, HistoryError, LlmError, ResearchError, Result, SearchError};
pub use history::{InMemoryHistory, JsonFileHistory, ReportHistory, SavedReport};
pub use providers::{OpenAiCompatibleGateway, create_gateway};
pub use research::{
    CycleReport, ResearchCallback, ResearchOrchestrator, ResearchSession, SessionOutcome,
    SessionPhase,
};
pub use search::{DuckDuckGoSearch, SearchGateway, SearchResponse, SearchResult};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
