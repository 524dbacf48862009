// src/cli.rs

use crate::model::Grouping;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "stackops.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report deployed revisions per stack and environment against the reference branch
    Status {
        /// Override the configured report grouping
        #[arg(long, value_enum)]
        grouping: Option<Grouping>,
    },
    /// Re-deploy each stack's source-environment revision to the target environment
    Sync {
        /// Environment to read deployed revisions from
        #[arg(long)]
        source: Option<String>,
        /// Environment to deploy to
        #[arg(long)]
        target: Option<String>,
    },
    /// Record historical code-size metrics over the configured date range
    Record,
    /// Compute lines-of-code time series and save them as JSON
    Series {
        /// Output file for the series data
        #[arg(short, long, default_value = "code_metrics.json")]
        output: PathBuf,
    },
}
