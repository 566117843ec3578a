//! Command-line interface for protofuzz
//!
//! # Usage Examples
//!
//! ```bash
//! # Count the instances of every message type
//! protofuzz list --schema schema.yaml
//!
//! # Only Address and Other, capped at 1000 instances each
//! protofuzz generate --schema schema.yaml --output-dir out \
//!   --messages Address,Other --limit 1000
//!
//! # Keep the last 20 instances on disk while feeding a target
//! protofuzz generate --schema schema.yaml --output-dir out \
//!   --recent-log recent.jsonl --recent-size 20 --on-error abort
//! ```

use clap::Parser;
use protofuzz::{run_generate, run_list, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { args } => {
            let summaries = run_list(&args)?;
            if args.json {
                for summary in &summaries {
                    println!("{}", serde_json::to_string(summary)?);
                }
            } else {
                for summary in &summaries {
                    let instances = summary
                        .instances
                        .map_or_else(|| "overflow".to_string(), |n| n.to_string());
                    println!(
                        "{}\t{} fields\t{} dependencies\t{} instances ({})",
                        summary.message,
                        summary.fields,
                        summary.dependencies,
                        instances,
                        summary.strategy
                    );
                }
            }
        }
        Commands::Generate { args } => {
            let results = run_generate(&args)?;
            let total: u64 = results.iter().map(|(_, m)| m.instances_written).sum();
            tracing::info!(
                "Generated {} instances across {} files",
                total,
                results.len()
            );
        }
    }

    Ok(())
}
