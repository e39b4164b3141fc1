//! `tagtally-ingest` -- annotate a directory of images.
//!
//! Every image is shrunk to the byte budget, sent to the annotation
//! oracle, and the JSON it returns is saved as `<stem>.json` in the
//! output directory. A failing image is reported and the batch carries on.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default                     |
//! |----------------------------|----------|-----------------------------|
//! | `OPENAI_API_KEY`           | yes      | --                          |
//! | `OPENAI_BASE_URL`          | no       | `https://api.openai.com/v1` |
//! | `OPENAI_MODEL`             | no       | `gpt-4o`                    |
//! | `INGEST_INPUT_DIR`         | no       | `./dist`                    |
//! | `INGEST_OUTPUT_DIR`        | no       | `./json_outputs`            |
//! | `INGEST_SKIP_EXISTING`     | no       | `false`                     |
//!
//! See `OracleConfig::from_env` and `IngestConfig::from_env` for the rest.

use tagtally_oracle::{OpenAiOracle, OracleConfig};
use tagtally_pipeline::{run_ingestion, IngestConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagtally_ingest=info,tagtally_pipeline=info,tagtally_oracle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IngestConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid ingestion configuration");
        std::process::exit(1);
    });

    let oracle_config = OracleConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid oracle configuration");
        std::process::exit(1);
    });

    let oracle = OpenAiOracle::new(oracle_config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build oracle client");
        std::process::exit(1);
    });

    tracing::info!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        model = %oracle.config().model,
        "Starting tagtally-ingest",
    );

    let report = match run_ingestion(&config, &oracle).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Ingestion aborted");
            std::process::exit(1);
        }
    };

    if report.failed.is_empty() {
        println!("All images were processed successfully.");
    } else {
        println!("The following images could not be processed:");
        for name in &report.failed {
            println!("  {name}");
        }
    }
    if !report.overwritten.is_empty() {
        println!("Annotations replaced by an image with the same name:");
        for name in &report.overwritten {
            println!("  {name}");
        }
    }
    if !report.skipped.is_empty() {
        println!("Skipped {} already annotated image(s).", report.skipped.len());
    }
    println!(
        "JSON outputs have been saved to '{}'.",
        config.output_dir.display()
    );
}
