//! `tagtally-aggregate` -- frequency tables over saved annotations.
//!
//! Prints all seven tables and exports each as a CSV file.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default          |
//! |----------------------------|----------|------------------|
//! | `AGGREGATE_INPUT_DIR`      | no       | `./json_outputs` |
//! | `AGGREGATE_OUTPUT_DIR`     | no       | `./output_csv`   |
//! | `AGGREGATE_SKIP_MALFORMED` | no       | `false`          |

use tagtally_pipeline::{run_aggregation, AggregateConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagtally_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AggregateConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid aggregation configuration");
        std::process::exit(1);
    });

    let report = run_aggregation(&config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Aggregation failed");
        std::process::exit(1);
    });

    print!("{}", report.render());
    if !report.skipped.is_empty() {
        println!();
        println!("Skipped malformed annotation files:");
        for name in &report.skipped {
            println!("  {name}");
        }
    }
    println!();
    println!(
        "Frequency tables have been saved to '{}'.",
        config.output_dir.display()
    );
}
