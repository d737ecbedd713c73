//! Running a research session from the terminal.

use anyhow::Context;
use researcher_core::config::AppConfig;
use researcher_core::cost::format_cost;
use researcher_core::credentials::{Credential, CredentialStore, KeyringCredentialStore};
use researcher_core::error::ConfigError;
use researcher_core::research::{CycleReport, ResearchCallback, ResearchOrchestrator};
use researcher_core::{DuckDuckGoSearch, JsonFileHistory, create_gateway};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Provider name the API key is stored under.
pub const PROVIDER: &str = "openai";

/// Options that only matter to a terminal run.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub api_key: Option<String>,
    /// `Some(None)` writes to the default file name.
    pub output: Option<Option<PathBuf>>,
    pub quiet: bool,
}

/// Pick the API key: explicit flag, then the credential store, then the
/// environment variable named in config.
pub fn resolve_credential(
    flag: Option<&str>,
    store: &dyn CredentialStore,
    env_var: &str,
) -> Result<Credential, ConfigError> {
    if let Some(key) = flag.filter(|k| !k.trim().is_empty()) {
        return Credential::new(key);
    }
    if let Ok(key) = store.get_key(PROVIDER) {
        return Credential::new(key);
    }
    Credential::new(std::env::var(env_var).unwrap_or_default())
}

/// File name for a saved report: the question lowercased with every run of
/// non-alphanumeric characters turned into one dash.
pub fn report_file_name(question: &str) -> String {
    let mut slug = String::with_capacity(question.len());
    for c in question.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "research-report.md".to_string()
    } else {
        format!("{slug}-report.md")
    }
}

/// The line printed under each cycle's report.
pub fn cycle_footer(report: &CycleReport) -> String {
    format!(
        "Model: {} | Current Cycle Cost: {} | Total Cost: {}",
        report.model_id,
        format_cost(report.cycle_cost),
        format_cost(report.total_cost)
    )
}

/// Prints progress to stderr and each cycle's report to stdout.
struct TerminalCallback {
    quiet: bool,
}

impl ResearchCallback for TerminalCallback {
    fn on_status(&self, cycle: u32, total_cycles: u32, status: &str) {
        if !self.quiet {
            eprintln!("Cycle {cycle}/{total_cycles}: {status}");
        }
    }

    fn on_cycle_complete(&self, report: &CycleReport) {
        println!();
        println!("=== Cycle {}/{} ===", report.cycle, report.total_cycles);
        println!();
        println!("{}", report.linked_report);
        println!();
        println!("{}", cycle_footer(report));
    }
}

fn write_report(path: &Path, report: &str) -> anyhow::Result<()> {
    std::fs::write(path, report)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

pub async fn run_research(
    question: &str,
    config: AppConfig,
    options: RunOptions,
) -> anyhow::Result<()> {
    let store = KeyringCredentialStore::new();
    let credential = resolve_credential(options.api_key.as_deref(), &store, &config.llm.api_key_env)
        .with_context(|| {
            format!(
                "Pass --api-key, run `researcher auth set <key>`, or set {}",
                config.llm.api_key_env
            )
        })?;

    let llm = create_gateway(&config.llm)?;
    let search = Arc::new(DuckDuckGoSearch::new(&config.search)?);
    let orchestrator = ResearchOrchestrator::new(search, llm).with_llm_config(config.llm.clone());

    if !options.quiet {
        eprintln!("Researching: {question}");
    }
    let callback = TerminalCallback {
        quiet: options.quiet,
    };
    let outcome = orchestrator
        .run_session(
            question,
            &credential,
            &config.llm.model,
            config.research.validated(),
            &callback,
        )
        .await;

    if let Some(err) = outcome.error {
        // Reports from cycles that finished are already on screen.
        return Err(err.into());
    }

    let history = JsonFileHistory::new(config.history.resolved_path());
    match outcome.persist(&history) {
        Ok(Some(saved)) => {
            if !options.quiet {
                eprintln!("Saved to history as #{}", saved.id);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to save report to history"),
    }

    if let (Some(output), Some(report)) = (options.output, outcome.last_report()) {
        let path = output.unwrap_or_else(|| PathBuf::from(report_file_name(question)));
        write_report(&path, &report.linked_report)?;
        if !options.quiet {
            eprintln!("Report written to {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use researcher_core::credentials::InMemoryCredentialStore;

    const UNSET_ENV: &str = "RESEARCHER_TEST_KEY_THAT_IS_NEVER_SET";

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("What is renewable energy storage?"),
            "what-is-renewable-energy-storage-report.md"
        );
        assert_eq!(report_file_name("  C++ vs. Rust!! "), "c-vs-rust-report.md");
        assert_eq!(report_file_name("???"), "research-report.md");
    }

    #[test]
    fn test_flag_wins_over_store() {
        let store = InMemoryCredentialStore::new();
        store.store_key(PROVIDER, "sk-stored").unwrap();
        let cred = resolve_credential(Some("sk-flag"), &store, UNSET_ENV).unwrap();
        assert_eq!(cred.expose(), "sk-flag");
    }

    #[test]
    fn test_store_used_when_flag_blank() {
        let store = InMemoryCredentialStore::new();
        store.store_key(PROVIDER, "sk-stored").unwrap();
        let cred = resolve_credential(Some("  "), &store, UNSET_ENV).unwrap();
        assert_eq!(cred.expose(), "sk-stored");
    }

    #[test]
    fn test_missing_everywhere() {
        let store = InMemoryCredentialStore::new();
        assert!(matches!(
            resolve_credential(None, &store, UNSET_ENV),
            Err(ConfigError::MissingCredential)
        ));
    }

    #[test]
    fn test_cycle_footer() {
        let report = CycleReport {
            cycle: 2,
            total_cycles: 3,
            linked_report: "body".into(),
            cycle_cost: 0.02,
            total_cost: 0.04,
            model_id: "gpt-4o".into(),
            source_count: 5,
        };
        assert_eq!(
            cycle_footer(&report),
            "Model: gpt-4o | Current Cycle Cost: $0.0200 | Total Cost: $0.0400"
        );
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(report_file_name("Battery chemistry"));
        write_report(&path, "# Report").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Report");
        assert!(path.ends_with("battery-chemistry-report.md"));
    }
}
