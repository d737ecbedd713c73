//! Iterative research engine.
//!
//! Each cycle runs a primary search, asks the model for follow-up questions,
//! searches those concurrently and synthesizes everything into a cited
//! report. The orchestrator repeats cycles up to the configured depth,
//! feeding each report into the next cycle.

pub mod citations;
pub mod cycle;
pub mod orchestrator;
pub mod prompts;
pub mod questions;
pub mod session;
pub mod sources;

pub use cycle::{CycleResult, CycleRunner, FollowUp};
pub use orchestrator::{ResearchOrchestrator, SessionOutcome};
pub use session::{
    CycleReport, NoOpResearchCallback, RecordingCallback, ResearchCallback, ResearchSession,
    SessionPhase,
};
pub use sources::SourceSet;
