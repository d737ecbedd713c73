//! CLI subcommand handlers.

use crate::AuthAction;
use crate::Commands;
use crate::ConfigAction;
use crate::HistoryAction;
use crate::research::PROVIDER;
use researcher_core::config::AppConfig;
use researcher_core::credentials::{Credential, CredentialStore, KeyringCredentialStore};
use researcher_core::history::{JsonFileHistory, ReportHistory, SavedReport};
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::History { action } => handle_history(action, workspace).await,
        Commands::Auth { action } => handle_auth(action, workspace).await,
        Commands::Config { action } => handle_config(action, workspace).await,
    }
}

fn load(workspace: &Path) -> anyhow::Result<AppConfig> {
    researcher_core::config::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

/// One line per saved report for `history list`.
fn summary_line(report: &SavedReport) -> String {
    format!(
        "{:<14} {}  {:<12} ${:<9} {}",
        report.id,
        report.timestamp.format("%Y-%m-%d %H:%M"),
        report.model,
        report.cost,
        report.question
    )
}

async fn handle_history(action: HistoryAction, workspace: &Path) -> anyhow::Result<()> {
    let config = load(workspace)?;
    let history = JsonFileHistory::new(config.history.resolved_path());

    match action {
        HistoryAction::List => {
            let reports = history.list()?;
            if reports.is_empty() {
                println!("No saved reports.");
                return Ok(());
            }
            for report in &reports {
                println!("{}", summary_line(report));
            }
            Ok(())
        }
        HistoryAction::Show { id } => {
            let report = history.get(id)?;
            println!("Question: {}", report.question);
            println!(
                "Model: {} | Total Cost: ${} | {}",
                report.model,
                report.cost,
                report.timestamp.to_rfc3339()
            );
            println!();
            println!("{}", report.report);
            Ok(())
        }
        HistoryAction::Delete { id } => {
            history.delete(id)?;
            println!("Deleted report {}", id);
            Ok(())
        }
    }
}

async fn handle_auth(action: AuthAction, workspace: &Path) -> anyhow::Result<()> {
    let store = KeyringCredentialStore::new();

    match action {
        AuthAction::Set { key } => {
            let credential = Credential::new(key)?;
            store.store_key(PROVIDER, credential.expose())?;
            println!("API key stored in the OS keyring.");
            Ok(())
        }
        AuthAction::Clear => {
            store.delete_key(PROVIDER)?;
            println!("Stored API key removed.");
            Ok(())
        }
        AuthAction::Status => {
            let config = load(workspace)?;
            let env_var = &config.llm.api_key_env;
            let stored = store.has_key(PROVIDER);
            let from_env = std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty());

            println!(
                "Keyring: {}",
                if stored { "key stored" } else { "no key" }
            );
            println!(
                "{}: {}",
                env_var,
                if from_env { "set" } else { "not set" }
            );
            if !stored && !from_env {
                println!("No API key available. Run `researcher auth set <key>` or set {env_var}.");
            }
            Ok(())
        }
    }
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".researcher");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary_line() {
        let report = SavedReport {
            id: 1700000000000,
            question: "How do flow batteries work?".into(),
            report: "# Report".into(),
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            cost: "0.0421".into(),
            model: "gpt-4o".into(),
        };
        let line = summary_line(&report);
        assert!(line.starts_with("1700000000000"));
        assert!(line.contains("2024-05-01 09:30"));
        assert!(line.contains("$0.0421"));
        assert!(line.ends_with("How do flow batteries work?"));
    }

    #[tokio::test]
    async fn test_config_init_writes_loadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        handle_config(ConfigAction::Init, dir.path()).await.unwrap();

        let path = dir.path().join(".researcher").join("config.toml");
        assert!(path.exists());
        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.research.depth_cycle, AppConfig::default().research.depth_cycle);
    }
}
