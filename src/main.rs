// src/main.rs

mod cli;
mod cloc;
mod config;
mod error;
mod git;
mod metrics;
mod model;
mod report;
mod store;
mod sync;
#[cfg(test)]
mod testutil;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Args, Command};
use config::Config;
use store::JsonFileStore;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    match args.command {
        Command::Status { grouping } => {
            if let Some(grouping) = grouping {
                config.grouping = grouping;
            }
            let store = JsonFileStore::open(&config.store_path)?;
            let report = report::run_report(&config, &store);
            println!(
                "\nStack deployment status compared to {}:",
                config.reference_branch
            );
            println!("{}", report.render());
        }
        Command::Sync { source, target } => {
            let source = source.or_else(|| config.source_environment.clone());
            let target = target.or_else(|| config.target_environment.clone());
            let (Some(source), Some(target)) = (source, target) else {
                bail!("sync requires a source and a target environment (flag or config)");
            };
            if config.deploy_command.is_empty() {
                bail!("no deploy command configured");
            }
            let store = JsonFileStore::open(&config.store_path)?;
            let deployer =
                sync::CommandDeployer::new(config.deploy_command.clone(), config.checkout_root.clone());
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            sync::run_sync(
                &config,
                &source,
                &target,
                &store,
                &deployer,
                &mut stdin.lock(),
                &mut stdout,
            )?;
        }
        Command::Record => {
            let Some(sweep) = config.sweep else {
                bail!("no sweep range configured");
            };
            let contexts = metrics::load_contexts(&config)?;
            let mut store = JsonFileStore::open(&config.store_path)?;
            let recorded =
                metrics::run_sweep(&contexts, &sweep.dates(), &mut store, &config.reference_branch);
            println!("Recorded {recorded} new code metrics samples.");
        }
        Command::Series { output } => {
            let Some(sweep) = config.sweep else {
                bail!("no sweep range configured");
            };
            let contexts = metrics::load_contexts(&config)?;
            let series = metrics::compute_series(&contexts, &sweep.dates(), &config.reference_branch);
            series.save(&output)?;
            println!(
                "Saved {} samples to {}",
                series.timestamps.len(),
                output.display()
            );
        }
    }
    Ok(())
}
