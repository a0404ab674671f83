use anyhow::Context;
use cardwise::config::cli::{Cli, Command};
use cardwise::config::toml_config::LogFormat;
use cardwise::core::scheduler;
use cardwise::domain::model::Grade;
use cardwise::utils::error::ErrorSeverity;
use cardwise::utils::{logger, validation::Validate};
use cardwise::{AppConfig, CardError, GenerationClient, GenerationOrchestrator, RetryPolicy};
use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // the config file is optional for the scheduling commands
    let config = if cli.config.exists() {
        match AppConfig::from_file(&cli.config) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    match config.as_ref().map(|c| &c.logging) {
        Some(logging) if logging.format == LogFormat::Json => {
            logger::init_json_logger(&logging.level)
        }
        _ => logger::init_cli_logger(cli.verbose),
    }

    if let Err(e) = run(cli, config).await {
        let Some(card_error) = e.downcast_ref::<CardError>() else {
            tracing::error!("❌ {:#}", e);
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        };

        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            card_error,
            card_error.category(),
            card_error.severity()
        );
        eprintln!("❌ {}", card_error.user_friendly_message());
        eprintln!("💡 {}", card_error.recovery_suggestion());

        let exit_code = match card_error.severity() {
            ErrorSeverity::Low => 130,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli, config: Option<AppConfig>) -> anyhow::Result<()> {
    match cli.command {
        Command::Generate {
            input,
            count,
            model_key,
        } => {
            let config = config.ok_or_else(|| CardError::MissingConfigError {
                field: cli.config.display().to_string(),
            })?;
            config.validate()?;

            let text = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;

            let policy = RetryPolicy::from_config(&config.generation);
            let client = GenerationClient::new(config.generation)?;
            let orchestrator = GenerationOrchestrator::new(client, policy);

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling generation");
                    trigger.cancel();
                }
            });

            let outcome = orchestrator
                .generate_for_collection(&text, count, model_key, &cancel)
                .await?;
            tracing::info!(
                "✅ {} candidates generated ({} dropped, {} attempt(s))",
                outcome.candidates.len(),
                outcome.dropped_count,
                outcome.attempts
            );
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Grade { state, grade } => {
            let grade = Grade::new(grade)?;
            let next = scheduler::grade(&state.to_state()?, grade, Utc::now());
            println!("{}", serde_json::to_string_pretty(&next)?);
        }
        Command::Preview { state } => {
            let preview = scheduler::preview(&state.to_state()?, Utc::now());
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
    }
    Ok(())
}
