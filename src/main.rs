//! Housing AutoML - Main Entry Point

use clap::Parser;
use housing_automl::cli::{cmd_info, cmd_predict, cmd_train, cmd_validate, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "housing_automl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { train, test, config, schema, model_config, artifact_dir, run_id } => {
            cmd_train(
                &train,
                &test,
                config.as_deref(),
                schema.as_deref(),
                model_config.as_deref(),
                artifact_dir.as_deref(),
                run_id.as_deref(),
            )?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Commands::Validate { schema, data, allow_bool_as_numeric } => {
            cmd_validate(&schema, &data, allow_bool_as_numeric)?;
        }
        Commands::Info { model } => {
            cmd_info(&model)?;
        }
    }

    Ok(())
}
