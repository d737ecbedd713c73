//! One research cycle: search, follow-up questions, follow-up searches,
//! synthesis, cost.

use super::prompts::{SYSTEM_PROMPT, follow_up_prompt, synthesis_prompt};
use super::questions;
use super::session::ResearchCallback;
use crate::brain::CompletionGateway;
use crate::config::{LlmConfig, ResearchConfig};
use crate::cost::{compute_cost, cost_string};
use crate::credentials::Credential;
use crate::error::LlmError;
use crate::search::{SearchGateway, SearchResult};
use crate::types::{CompletionRequest, Message};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Output of one cycle. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    /// Unlinked synthesized report.
    pub report_text: String,
    /// Primary results, then each follow-up's results in question order.
    pub sources: Vec<SearchResult>,
    /// Cost of both completion calls, 4 decimal places.
    pub cost: String,
    pub model_id: String,
}

impl CycleResult {
    pub fn cost_value(&self) -> f64 {
        self.cost.parse().unwrap_or(0.0)
    }
}

/// A follow-up question and what searching it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub question: String,
    pub results: Vec<SearchResult>,
}

pub const STATUS_SEARCHING: &str = "Searching the web...";
pub const STATUS_ANALYZING: &str = "Analyzing results...";
pub const STATUS_GATHERING: &str = "Gathering additional information...";
pub const STATUS_SYNTHESIZING: &str = "Synthesizing report...";

/// Runs single cycles against a search and a completion gateway.
pub struct CycleRunner {
    search: Arc<dyn SearchGateway>,
    llm: Arc<dyn CompletionGateway>,
    config: ResearchConfig,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl CycleRunner {
    pub fn new(
        search: Arc<dyn SearchGateway>,
        llm: Arc<dyn CompletionGateway>,
        config: ResearchConfig,
    ) -> Self {
        let defaults = LlmConfig::default();
        Self {
            search,
            llm,
            config,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        }
    }

    /// Use sampling settings from `llm` for both completion calls.
    pub fn with_sampling(mut self, llm: &LlmConfig) -> Self {
        self.temperature = llm.temperature;
        self.max_tokens = llm.max_tokens;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    fn request(&self, model_id: &str, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest::new(model_id, messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Run cycle `cycle` (1-based). `previous_report` is empty on the first
    /// cycle.
    ///
    /// Completion failures end the cycle with an error. Search failures never
    /// do: an unlucky search simply contributes no sources.
    pub async fn run(
        &self,
        question: &str,
        credential: &Credential,
        model_id: &str,
        cycle: u32,
        previous_report: &str,
        callback: &dyn ResearchCallback,
    ) -> Result<CycleResult, LlmError> {
        let total = self.config.depth_cycle();

        callback.on_status(cycle, total, STATUS_SEARCHING);
        let primary = self.search.search(question, &self.config).await.results;
        debug!(results = primary.len(), "Primary search finished");

        callback.on_status(cycle, total, STATUS_ANALYZING);
        let prompt = follow_up_prompt(
            question,
            &primary,
            self.config.follow_up_questions(),
            cycle,
            previous_report,
        );
        debug!(prompt_chars = prompt.len(), "Requesting follow-up questions");
        let follow_up_response = self
            .llm
            .complete(
                self.request(model_id, vec![Message::user(prompt)]),
                credential,
            )
            .await?;
        let follow_up_questions = questions::extract(&follow_up_response.text);
        info!(
            questions = follow_up_questions.len(),
            "Extracted follow-up questions"
        );

        callback.on_status(cycle, total, STATUS_GATHERING);
        let responses = join_all(
            follow_up_questions
                .iter()
                .map(|q| self.search.search(q, &self.config)),
        )
        .await;
        let follow_ups: Vec<FollowUp> = follow_up_questions
            .into_iter()
            .zip(responses)
            .map(|(question, response)| FollowUp {
                question,
                results: response.results,
            })
            .collect();

        callback.on_status(cycle, total, STATUS_SYNTHESIZING);
        let research_data =
            synthesis_prompt(question, cycle, previous_report, &primary, &follow_ups);
        debug!(prompt_chars = research_data.len(), "Requesting synthesis");
        let synthesis = self
            .llm
            .complete(
                self.request(
                    model_id,
                    vec![Message::system(SYSTEM_PROMPT), Message::user(research_data)],
                ),
                credential,
            )
            .await?;

        let cost = compute_cost(
            follow_up_response.usage.input_tokens,
            follow_up_response.usage.output_tokens,
            model_id,
        ) + compute_cost(
            synthesis.usage.input_tokens,
            synthesis.usage.output_tokens,
            model_id,
        );

        let mut sources = primary;
        sources.extend(follow_ups.into_iter().flat_map(|fu| fu.results));

        Ok(CycleResult {
            report_text: synthesis.text,
            sources,
            cost: cost_string(cost),
            model_id: model_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockCompletionGateway;
    use crate::research::session::{NoOpResearchCallback, RecordingCallback};
    use crate::search::StaticSearchGateway;
    use crate::types::{CompletionResponse, Role, TokenUsage};
    use pretty_assertions::assert_eq;

    fn result(url: &str) -> SearchResult {
        SearchResult::new("Title", "snippet", url, "content")
    }

    fn cred() -> Credential {
        Credential::new("sk-test").unwrap()
    }

    fn search() -> Arc<StaticSearchGateway> {
        Arc::new(
            StaticSearchGateway::new()
                .with_results("main", vec![result("https://a.com"), result("https://b.com")])
                .with_results("Q one?", vec![result("https://c.com")])
                .with_results("Q two?", vec![result("https://d.com"), result("https://a.com")]),
        )
    }

    #[tokio::test]
    async fn test_run_collects_sources_in_order() {
        let llm = Arc::new(MockCompletionGateway::new());
        llm.queue_text("1. Q one?\n2. Q two?");
        llm.queue_text("Report [a]");
        let search = search();
        let runner = CycleRunner::new(search.clone(), llm.clone(), ResearchConfig::new(2, 5, 1000, 1));

        let result = runner
            .run("main", &cred(), "gpt-4o", 1, "", &NoOpResearchCallback)
            .await
            .unwrap();

        assert_eq!(result.report_text, "Report [a]");
        let urls: Vec<&str> = result.sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.com", "https://b.com", "https://c.com", "https://d.com", "https://a.com"]
        );
        assert_eq!(search.queries()[0], "main");
        assert_eq!(search.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_message_shapes() {
        let llm = Arc::new(MockCompletionGateway::new());
        llm.queue_text("1. Q one?");
        llm.queue_text("Report");
        let runner = CycleRunner::new(search(), llm.clone(), ResearchConfig::default());
        runner
            .run("main", &cred(), "gpt-4o", 1, "", &NoOpResearchCallback)
            .await
            .unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert_eq!(requests[1].messages[0].role, Role::System);
        assert_eq!(requests[1].messages[0].content, SYSTEM_PROMPT);
        assert!(requests[1].messages[1].content.contains("Follow-up Question 1: Q one?"));
        assert_eq!(requests[1].max_tokens, Some(16_000));
    }

    #[tokio::test]
    async fn test_cost_sums_both_calls() {
        let llm = Arc::new(MockCompletionGateway::new());
        llm.queue_response(Ok(CompletionResponse::new(
            "1. Q one?",
            TokenUsage::new(1_000_000, 0),
            "gpt-4o",
        )));
        llm.queue_response(Ok(CompletionResponse::new(
            "Report",
            TokenUsage::new(0, 100_000),
            "gpt-4o",
        )));
        let runner = CycleRunner::new(search(), llm, ResearchConfig::default());
        let result = runner
            .run("main", &cred(), "gpt-4o", 1, "", &NoOpResearchCallback)
            .await
            .unwrap();
        // 2.50 + 1.00
        assert_eq!(result.cost, "3.5000");
        assert_eq!(result.cost_value(), 3.5);
    }

    #[tokio::test]
    async fn test_no_follow_ups_still_synthesizes() {
        let llm = Arc::new(MockCompletionGateway::new());
        llm.queue_text("I cannot produce a list.");
        llm.queue_text("Narrow report");
        let search = search();
        let runner = CycleRunner::new(search.clone(), llm, ResearchConfig::default());
        let result = runner
            .run("main", &cred(), "mystery-model", 1, "", &NoOpResearchCallback)
            .await
            .unwrap();
        assert_eq!(result.report_text, "Narrow report");
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.cost, "0.0000");
        assert_eq!(search.queries(), vec!["main"]);
    }

    #[tokio::test]
    async fn test_follow_up_failure_is_fatal() {
        let llm = Arc::new(MockCompletionGateway::new());
        llm.queue_error(LlmError::AuthFailed {
            provider: "OpenAI-compatible".into(),
        });
        let runner = CycleRunner::new(search(), llm.clone(), ResearchConfig::default());
        let err = runner
            .run("main", &cred(), "gpt-4o", 1, "", &NoOpResearchCallback)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_status_sequence() {
        let llm = Arc::new(MockCompletionGateway::new());
        llm.queue_text("1. Q one?");
        llm.queue_text("Report");
        let runner = CycleRunner::new(search(), llm, ResearchConfig::new(1, 1, 1000, 2));
        let callback = RecordingCallback::new();
        runner
            .run("main", &cred(), "gpt-4o", 2, "previous", &callback)
            .await
            .unwrap();
        assert_eq!(
            callback.statuses(),
            vec![
                "Cycle 2/2: Searching the web...",
                "Cycle 2/2: Analyzing results...",
                "Cycle 2/2: Gathering additional information...",
                "Cycle 2/2: Synthesizing report...",
            ]
        );
    }
}
