//! ExoSeeker - Main Entry Point
//!
//! Exoplanet disposition classifier with CLI and server modes.

use clap::{CommandFactory, Parser};
use colored::Colorize;
use exoseeker::cli::{cmd_evaluate, cmd_predict, cmd_serve, cmd_train, Cli, Commands};
use exoseeker::training::Hyperparameters;

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Train {
            data,
            estimators,
            rf_n_estimators,
            rf_max_depth,
            gb_n_estimators,
            gb_max_depth,
            mlp_max_iter,
            mlp_alpha,
            seed,
            train_fraction,
            model_path,
        }) => {
            let hyperparameters = Hyperparameters {
                rf_n_estimators,
                rf_max_depth,
                gb_n_estimators,
                gb_max_depth,
                mlp_max_iter,
                mlp_alpha,
            };
            cmd_train(&data, &estimators, hyperparameters, seed, train_fraction, model_path.as_deref())?;
        }
        Some(Commands::Predict { data, output, batch_scaling, model_path }) => {
            cmd_predict(&data, &output, batch_scaling, model_path.as_deref())?;
        }
        Some(Commands::Evaluate { data, model_path }) => {
            cmd_evaluate(&data, model_path.as_deref())?;
        }
        Some(Commands::Serve { port, host, model_path }) => {
            cmd_serve(host, port, model_path).await?;
        }
        None => {
            Cli::command().print_help()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exoseeker=info".into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        println!();
        eprintln!("  {} {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}
