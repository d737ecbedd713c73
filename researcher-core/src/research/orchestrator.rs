//! Multi-cycle research orchestration.
//!
//! Cycles run strictly one after another: each cycle's prompts include the
//! previous cycle's report. After every completed cycle the accumulated
//! sources are deduplicated, the report is linked and the callback is told.
//! The first failed cycle ends the session; earlier cycles stay available.

use super::cycle::CycleRunner;
use super::session::{CycleReport, ResearchCallback, ResearchSession, SessionPhase};
use crate::brain::CompletionGateway;
use crate::config::{LlmConfig, ResearchConfig};
use crate::cost::cost_string;
use crate::credentials::Credential;
use crate::error::{HistoryError, ResearchError};
use crate::history::{ReportHistory, SavedReport};
use crate::search::SearchGateway;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

/// The result of `run_session`: final session state plus the error that
/// stopped it, if any.
#[derive(Debug)]
pub struct SessionOutcome {
    pub session: ResearchSession,
    pub error: Option<ResearchError>,
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        self.session.phase == SessionPhase::Completed
    }

    /// The last report emitted, from the latest successful cycle.
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.session.last_report.as_ref()
    }

    pub fn total_cost(&self) -> f64 {
        self.session.total_cost
    }

    /// Save a completed session's final report. Failed sessions are not
    /// saved and return `Ok(None)`.
    pub fn persist(
        &self,
        history: &dyn ReportHistory,
    ) -> Result<Option<SavedReport>, HistoryError> {
        if !self.is_completed() {
            return Ok(None);
        }
        history
            .save(
                &self.session.question,
                &self.session.accumulated_report,
                &cost_string(self.session.total_cost),
                &self.session.model_id,
            )
            .map(Some)
    }
}

/// Drives research sessions over a search and a completion gateway.
pub struct ResearchOrchestrator {
    search: Arc<dyn SearchGateway>,
    llm: Arc<dyn CompletionGateway>,
    sampling: LlmConfig,
}

impl ResearchOrchestrator {
    pub fn new(search: Arc<dyn SearchGateway>, llm: Arc<dyn CompletionGateway>) -> Self {
        Self {
            search,
            llm,
            sampling: LlmConfig::default(),
        }
    }

    /// Take temperature and max tokens from `llm`.
    pub fn with_llm_config(mut self, llm: LlmConfig) -> Self {
        self.sampling = llm;
        self
    }

    /// Run `config.depth_cycle()` cycles for `question`.
    ///
    /// Never returns early with an error: a failing cycle moves the session
    /// to `Failed` and the error is returned alongside everything that
    /// completed before it.
    pub async fn run_session(
        &self,
        question: &str,
        credential: &Credential,
        model_id: &str,
        config: ResearchConfig,
        callback: &dyn ResearchCallback,
    ) -> SessionOutcome {
        let session = ResearchSession::new(question, model_id, config);
        let span = info_span!("research_session", id = %session.id, model = %model_id);
        self.drive(session, credential, callback)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        mut session: ResearchSession,
        credential: &Credential,
        callback: &dyn ResearchCallback,
    ) -> SessionOutcome {
        let runner = CycleRunner::new(self.search.clone(), self.llm.clone(), session.config)
            .with_sampling(&self.sampling);
        info!(
            question = %session.question,
            cycles = session.total_cycles(),
            "Starting research session"
        );

        while let Some(cycle) = session.begin_cycle() {
            info!(cycle, "Starting cycle");
            let result = runner
                .run(
                    &session.question,
                    credential,
                    &session.model_id,
                    cycle,
                    &session.accumulated_report,
                    callback,
                )
                .instrument(info_span!("research_cycle", cycle))
                .await;

            match result {
                Ok(result) => {
                    let report = session.record_cycle(result);
                    info!(
                        cycle,
                        sources = report.source_count,
                        cycle_cost = report.cycle_cost,
                        total_cost = report.total_cost,
                        "Cycle complete"
                    );
                    callback.on_cycle_complete(&report);
                }
                Err(e) => {
                    let err = ResearchError::from(e).in_cycle(cycle);
                    error!(cycle, error = %err, "Cycle failed; stopping session");
                    session.fail(cycle, err.to_string());
                    return SessionOutcome {
                        session,
                        error: Some(err),
                    };
                }
            }
        }

        session.complete();
        info!(total_cost = session.total_cost, "Research session complete");
        SessionOutcome {
            session,
            error: None,
        }
    }
}
