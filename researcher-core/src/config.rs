//! Configuration system for Researcher.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. Files are read
//! from `~/.config/researcher/config.toml` and `.researcher/config.toml` in the
//! workspace directory.
//!
//! The four bounded research settings are stored raw in `ResearchSettings` and
//! only become usable once clamped into a `ResearchConfig`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub research: ResearchSettings,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier (e.g., "gpt-4o", "o3-mini").
    pub model: String,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Environment variable consulted for the API key when none is stored.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: Some(16_000),
            timeout_secs: 600,
        }
    }
}

/// Web search and page fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// HTML search endpoint; the query is appended as `?q=`.
    pub endpoint: String,
    /// User agent sent with search and page requests.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent page fetches per search.
    pub fetch_concurrency: usize,
    /// How long search responses and page contents stay cached, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            timeout_secs: 10,
            fetch_concurrency: 5,
            cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Where saved reports live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// History file path; defaults to `history.json` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl HistoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| data_dir().join("history.json"))
    }
}

/// Raw, unvalidated research settings as read from files, env, or flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSettings {
    pub follow_up_questions: i64,
    pub search_results: i64,
    pub max_content_length: i64,
    pub depth_cycle: i64,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            follow_up_questions: FOLLOW_UP_QUESTIONS.default as i64,
            search_results: SEARCH_RESULTS.default as i64,
            max_content_length: MAX_CONTENT_LENGTH.default as i64,
            depth_cycle: DEPTH_CYCLE.default as i64,
        }
    }
}

impl ResearchSettings {
    /// Clamp every field into its allowed range.
    pub fn validated(&self) -> ResearchConfig {
        ResearchConfig {
            follow_up_questions: FOLLOW_UP_QUESTIONS.clamp(self.follow_up_questions),
            search_results: SEARCH_RESULTS.clamp(self.search_results),
            max_content_length: MAX_CONTENT_LENGTH.clamp(self.max_content_length),
            depth_cycle: DEPTH_CYCLE.clamp(self.depth_cycle) as u32,
        }
    }
}

/// A closed integer range with a fallback for unset (zero) input.
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl Bound {
    /// Zero means "not provided" and takes the default; anything else is
    /// clamped to the nearest bound.
    pub fn clamp(&self, raw: i64) -> usize {
        if raw == 0 {
            return self.default;
        }
        raw.clamp(self.min as i64, self.max as i64) as usize
    }
}

pub const FOLLOW_UP_QUESTIONS: Bound = Bound {
    min: 1,
    max: 20,
    default: 10,
};
pub const SEARCH_RESULTS: Bound = Bound {
    min: 1,
    max: 20,
    default: 10,
};
pub const MAX_CONTENT_LENGTH: Bound = Bound {
    min: 1000,
    max: 16000,
    default: 8000,
};
pub const DEPTH_CYCLE: Bound = Bound {
    min: 1,
    max: 3,
    default: 1,
};

/// Validated research settings for one session.
///
/// Only constructible through clamping, so every field is always inside its
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchConfig {
    follow_up_questions: usize,
    search_results: usize,
    max_content_length: usize,
    depth_cycle: u32,
}

impl ResearchConfig {
    /// Clamp raw values into a config.
    pub fn new(
        follow_up_questions: i64,
        search_results: i64,
        max_content_length: i64,
        depth_cycle: i64,
    ) -> Self {
        ResearchSettings {
            follow_up_questions,
            search_results,
            max_content_length,
            depth_cycle,
        }
        .validated()
    }

    /// Follow-up question count requested from the model.
    pub fn follow_up_questions(&self) -> usize {
        self.follow_up_questions
    }

    /// Results kept per search.
    pub fn search_results(&self) -> usize {
        self.search_results
    }

    /// Character cap on fetched page content.
    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }

    /// Number of research cycles.
    pub fn depth_cycle(&self) -> u32 {
        self.depth_cycle
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        ResearchSettings::default().validated()
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "researcher", "researcher")
}

/// Platform data directory (history, logs).
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".researcher"))
}

/// Load configuration from all layers.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AppConfig>,
) -> Result<AppConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".researcher").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // RESEARCHER_LLM__MODEL, RESEARCHER_RESEARCH__DEPTH_CYCLE, ...
    figment = figment.merge(Env::prefixed("RESEARCHER_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
