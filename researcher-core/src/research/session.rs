//! Research session state machine.
//!
//! A session moves `Idle -> Running{1} -> ... -> Running{depth} -> Completed`,
//! or to `Failed` from any running cycle. Sources, cost and the latest report
//! are only touched after a whole cycle has finished.

use super::citations;
use super::cycle::CycleResult;
use super::sources::SourceSet;
use crate::config::ResearchConfig;
use crate::cost::round_cost;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Current phase of a research session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum SessionPhase {
    /// Created, no cycle started yet.
    Idle,
    /// Running the given 1-based cycle.
    Running { cycle: u32 },
    /// Every configured cycle finished.
    Completed,
    /// A cycle failed; later cycles were not started.
    Failed { cycle: u32, error: String },
}

/// What a caller can display after a cycle completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u32,
    pub total_cycles: u32,
    /// Markdown report with citation markers resolved.
    pub linked_report: String,
    pub cycle_cost: f64,
    pub total_cost: f64,
    pub model_id: String,
    /// Distinct sources accumulated so far.
    pub source_count: usize,
}

/// State owned by one orchestration run.
#[derive(Debug, Clone)]
pub struct ResearchSession {
    pub id: Uuid,
    pub question: String,
    pub model_id: String,
    pub config: ResearchConfig,
    pub phase: SessionPhase,
    /// Latest cycle's raw report text; replaced every cycle.
    pub accumulated_report: String,
    pub sources: SourceSet,
    pub total_cost: f64,
    /// Cycles that finished successfully.
    pub completed_cycles: u32,
    pub last_report: Option<CycleReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResearchSession {
    pub fn new(
        question: impl Into<String>,
        model_id: impl Into<String>,
        config: ResearchConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            model_id: model_id.into(),
            config,
            phase: SessionPhase::Idle,
            accumulated_report: String::new(),
            sources: SourceSet::new(),
            total_cost: 0.0,
            completed_cycles: 0,
            last_report: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_cycles(&self) -> u32 {
        self.config.depth_cycle()
    }

    /// The cycle that should run next, if any.
    pub fn next_cycle(&self) -> Option<u32> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Running { .. }
                if self.completed_cycles < self.total_cycles() =>
            {
                Some(self.completed_cycles + 1)
            }
            _ => None,
        }
    }

    /// Enter `Running` for the next cycle. Returns its number, or `None`
    /// when the session is finished or failed.
    pub fn begin_cycle(&mut self) -> Option<u32> {
        let cycle = self.next_cycle()?;
        self.transition(SessionPhase::Running { cycle });
        Some(cycle)
    }

    /// Fold a finished cycle into the session and build its display report.
    pub fn record_cycle(&mut self, result: CycleResult) -> CycleReport {
        let cycle = self.completed_cycles + 1;
        let cycle_cost = result.cost_value();

        self.sources.extend(result.sources);
        self.total_cost = round_cost(self.total_cost + cycle_cost);
        self.accumulated_report = result.report_text;
        self.completed_cycles = cycle;

        let report = CycleReport {
            cycle,
            total_cycles: self.total_cycles(),
            linked_report: citations::link(&self.accumulated_report, self.sources.as_slice()),
            cycle_cost,
            total_cost: self.total_cost,
            model_id: result.model_id,
            source_count: self.sources.len(),
        };
        self.last_report = Some(report.clone());
        self.updated_at = Utc::now();
        report
    }

    pub fn complete(&mut self) {
        self.transition(SessionPhase::Completed);
    }

    pub fn fail(&mut self, cycle: u32, error: impl Into<String>) {
        self.transition(SessionPhase::Failed {
            cycle,
            error: error.into(),
        });
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Idle | SessionPhase::Running { .. })
    }

    fn transition(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.updated_at = Utc::now();
    }
}

/// Callback trait for progressive research updates.
pub trait ResearchCallback: Send + Sync {
    /// A cycle moved to a new step, e.g. "Searching the web...".
    fn on_status(&self, cycle: u32, total_cycles: u32, status: &str);
    /// A cycle finished and its linked report is ready to show.
    fn on_cycle_complete(&self, report: &CycleReport);
}

/// No-op callback.
pub struct NoOpResearchCallback;

impl ResearchCallback for NoOpResearchCallback {
    fn on_status(&self, _cycle: u32, _total_cycles: u32, _status: &str) {}
    fn on_cycle_complete(&self, _report: &CycleReport) {}
}

/// Callback that keeps everything it is told, for tests.
#[derive(Default)]
pub struct RecordingCallback {
    statuses: Mutex<Vec<String>>,
    reports: Mutex<Vec<CycleReport>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status lines formatted as `Cycle N/M: status`.
    pub fn statuses(&self) -> Vec<String> {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn reports(&self) -> Vec<CycleReport> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ResearchCallback for RecordingCallback {
    fn on_status(&self, cycle: u32, total_cycles: u32, status: &str) {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("Cycle {cycle}/{total_cycles}: {status}"));
    }

    fn on_cycle_complete(&self, report: &CycleReport) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
    }
}
