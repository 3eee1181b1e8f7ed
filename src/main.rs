//! Fraud pipeline - Main Entry Point

use clap::Parser;
use fraud_pipeline::cli::{cmd_evaluate, cmd_gold, cmd_info, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Gold { data, output, threshold, config, label, save_bundle } => {
            cmd_gold(&data, &output, threshold, config.as_deref(), label.as_deref(), save_bundle.as_deref())?;
        }
        Commands::Evaluate { data, threshold, config, label, plots_dir } => {
            cmd_evaluate(&data, threshold, config.as_deref(), label.as_deref(), plots_dir.as_deref())?;
        }
        Commands::Train { data, output, config, label } => {
            cmd_train(&data, &output, config.as_deref(), label.as_deref())?;
        }
        Commands::Predict { bundle, data, output, threshold } => {
            cmd_predict(&bundle, &data, &output, threshold)?;
        }
        Commands::Info { data, label } => {
            cmd_info(&data, label.as_deref())?;
        }
    }

    Ok(())
}
