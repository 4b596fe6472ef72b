///
/// This module implements the full CLI interface for review-pipeline,
/// handling command parsing, argument validation, main entrypoints, and
/// user-visible invocations.
///
/// All core business logic (checkpointed ingest, training, prediction) lives
/// in the [`review-pipeline-core`] crate. This module is strictly for CLI
/// glue, ergonomic argument exposure, and orchestration.
///
/// ## Features
/// - Entry struct [`Cli`] defines all user-facing options and subcommands.
/// - Subcommand routing (`ingest`, `train`, `predict`) and argument
///   validation.
/// - Async entrypoint (`run`) for programmatic invocation and integration
///   testing.
/// - Logging, tracing, and structured error output at CLI level; stage
///   reports are printed to stdout as pretty JSON.
///
/// ## Extending
/// When adding subcommands, update [`Commands`] below and keep all
/// non-trivial business logic inside `review-pipeline-core`.
///
/// [`review-pipeline-core`]: ../../review-pipeline-core/
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_pipeline_core::ingest::run_ingest;
use review_pipeline_core::predict::Predictor;
use review_pipeline_core::store::FsStore;
use review_pipeline_core::train::run_train;
use std::path::PathBuf;

/// CLI for review-pipeline: checkpointed batch sentiment analysis.
#[derive(Parser)]
#[clap(
    name = "review-pipeline",
    version,
    about = "Ingest raw review snapshots incrementally, train a sentiment classifier, and serve single-text predictions"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one checkpointed ingest pass: select unprocessed raw files and
    /// consolidate them into the processed dataset
    Ingest {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Train the classifier on the latest processed dataset and publish the
    /// model and vectorizer artifacts
    Train {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Predict the sentiment label for one review text
    Predict {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// The review text to classify
        #[clap(long)]
        text: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Ingest { config } => {
            let config = load_config(config)?;
            config.layout.trace_loaded();
            tracing::info!(command = "ingest", "Starting ingest run");
            let store = FsStore::new(&config.bucket.root_dir);
            let report = run_ingest(&store, &config.layout)
                .await
                .context("ingest run failed")?;
            tracing::info!(command = "ingest", run_id = %report.run_id, "Ingest complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Train { config } => {
            let config = load_config(config)?;
            config.layout.trace_loaded();
            tracing::info!(command = "train", "Starting training run");
            let store = FsStore::new(&config.bucket.root_dir);
            let report = run_train(&store, &config.layout, &config.train)
                .await
                .context("training run failed")?;
            tracing::info!(command = "train", run_id = %report.run_id, "Training complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Predict { config, text } => {
            let config = load_config(config)?;
            tracing::info!(command = "predict", "Scoring input text");
            let store = FsStore::new(&config.bucket.root_dir);
            let predictor = Predictor::new(store, config.layout);
            let prediction = predictor
                .predict(&text)
                .await
                .context("prediction failed")?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
            Ok(())
        }
    }
}
