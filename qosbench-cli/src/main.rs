use clap::{Parser, Subcommand};
use qosbench_cli::config::ProfileConfig;
use qosbench_cli::{output, runner};
use schemars::schema_for;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// qosbench: workload generation and trace replay for storage benchmarks
///
/// A run loads `record_count` records and then issues `operation_count`
/// transactions. If `workload.trace_path` names an existing file the run
/// replays it; otherwise every operation is recorded there (or to
/// ./workload.txt) for a later replay.
///
/// Example usage:
///   qosbench run -P profiles/qos-read-heavy.toml
///   qosbench run -P profiles/qos-read-heavy.toml --set workload.trace_path=/tmp/trace.txt
///   qosbench run -P profiles/latest-inserts.toml --set experiment.threads=8 --set output.format=json
///   qosbench schema > profile.schema.json
#[derive(Parser)]
#[command(name = "qosbench")]
#[command(version, about = "QoS-aware workload generator with deterministic replay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load phase followed by a transaction phase
    Run {
        /// Path to TOML profile configuration file (REQUIRED)
        #[arg(short = 'P', long, required = true)]
        profile: PathBuf,

        /// Override any configuration value using dot notation (can be specified multiple times)
        ///
        /// Examples:
        ///   --set workload.record_count=100000
        ///   --set workload.request_distribution=zipfian
        ///   --set workload.seed=42
        ///   --set output.record_logs=true
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Generate JSON Schema for profile files
    Schema,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Schema => {
            let schema = schema_for!(ProfileConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Commands::Run { profile, set } => {
            tracing::info!("Loading profile from {}", profile.display());
            let config = ProfileConfig::from_file_with_overrides(&profile, &set)?;

            let outcome = runner::run(&config)?;
            tracing::info!(
                "Finished '{}' in {:?}: {} operations, {} failed",
                config.experiment.name,
                outcome.summary.runtime,
                outcome.summary.operations(),
                outcome.summary.failures()
            );

            let mut exporter = output::open_exporter(&config.output)?;
            output::write_results(&outcome, exporter.as_mut())?;
            Ok(())
        }
    }
}
