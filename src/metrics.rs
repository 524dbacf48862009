// src/metrics.rs

use crate::cloc::{ClocRunner, LineCounter};
use crate::config::Config;
use crate::error::{AdminError, Result};
use crate::git::RepoInspector;
use crate::model::CodeMetricsRecord;
use crate::store::MetricsStore;
use chrono::{NaiveDate, NaiveTime};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

/// Everything needed to sample one repository: an open inspector, a line
/// counter scoped to its checkout, and the date of its first commit.
pub struct RepoContext<C: LineCounter> {
    pub name: String,
    pub inspector: RepoInspector,
    pub counter: C,
    pub earliest: NaiveDate,
}

/// Opens a context per configured repository.
pub fn load_contexts(config: &Config) -> Result<Vec<RepoContext<ClocRunner>>> {
    let mut contexts = Vec::new();
    for repo in &config.repos {
        let path = config.repo_path(repo);
        let inspector = RepoInspector::open(&path)?;
        let earliest = inspector.earliest_commit_date(&config.reference_branch)?;
        contexts.push(RepoContext {
            name: repo.clone(),
            counter: ClocRunner::new(&path, &config.cloc),
            inspector,
            earliest,
        });
    }
    Ok(contexts)
}

/// Records one code-size sample. The presence check runs first, so neither
/// git nor the counting tool is touched for a key that is already populated.
pub fn record_metrics<C: LineCounter, S: MetricsStore>(
    repo: &str,
    date: NaiveDate,
    inspector: &RepoInspector,
    counter: &C,
    store: &mut S,
    reference_branch: &str,
) -> Result<CodeMetricsRecord> {
    let timestamp = date.format("%Y-%m-%d").to_string();
    if store.exists(repo, &timestamp)? {
        return Err(AdminError::AlreadyRecorded {
            repo: repo.to_string(),
            timestamp,
        });
    }
    let cutoff = date.and_time(NaiveTime::MIN).and_utc();
    let revision = inspector.resolve_revision_at_or_before(cutoff, reference_branch)?;
    let report = counter.count(&revision)?;
    let record = CodeMetricsRecord {
        repo: repo.to_string(),
        timestamp,
        revision,
        code: report.sum.code,
        comment: report.sum.comment,
        blank: report.sum.blank,
        detail: report,
        source: "cloc".to_string(),
    };
    // key absence was checked above; single-writer batch usage
    store.put(&record, true)?;
    Ok(record)
}

/// Sweeps the date range, recording a sample per repository per date.
/// Dates before a repository's first commit are skipped outright; other
/// per-item failures are logged and the sweep continues. Returns the number
/// of new records written.
pub fn run_sweep<C: LineCounter, S: MetricsStore>(
    contexts: &[RepoContext<C>],
    dates: &[NaiveDate],
    store: &mut S,
    reference_branch: &str,
) -> usize {
    let bar = ProgressBar::new(dates.len() as u64);
    bar.set_message("Recording code metrics");
    let mut recorded = 0;
    for date in dates {
        for ctx in contexts {
            if *date < ctx.earliest {
                continue;
            }
            match record_metrics(&ctx.name, *date, &ctx.inspector, &ctx.counter, store, reference_branch) {
                Ok(record) => {
                    recorded += 1;
                    info!(
                        "recorded {} lines of code for {} at {}",
                        record.code, ctx.name, record.timestamp
                    );
                }
                Err(AdminError::AlreadyRecorded { repo, timestamp }) => {
                    info!("metrics for {repo} at {timestamp} already recorded; skipped");
                }
                Err(err) => error!("failed to record metrics for {} at {date}: {err}", ctx.name),
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("Sweep complete");
    recorded
}

/// Lines-of-code time series per repository plus the platform-wide total.
/// Saved as JSON for the external charting pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocSeries {
    pub timestamps: Vec<String>,
    #[serde(rename = "platform_total")]
    pub total: Vec<u64>,
    #[serde(rename = "services")]
    pub per_repo: BTreeMap<String, Vec<u64>>,
}

impl LocSeries {
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

/// Computes the series without persisting anything. Pre-history dates and
/// failed samples contribute a zero data point so the series stay rectangular.
pub fn compute_series<C: LineCounter>(
    contexts: &[RepoContext<C>],
    dates: &[NaiveDate],
    reference_branch: &str,
) -> LocSeries {
    let mut series = LocSeries::default();
    let bar = ProgressBar::new(dates.len() as u64);
    bar.set_message("Computing code metrics series");
    for date in dates {
        series.timestamps.push(date.format("%Y-%m-%d").to_string());
        let mut total = 0;
        for ctx in contexts {
            let loc = if *date < ctx.earliest {
                0
            } else {
                sample_loc(ctx, *date, reference_branch).unwrap_or_else(|err| {
                    error!("metrics sample for {} at {date} failed: {err}", ctx.name);
                    0
                })
            };
            series.per_repo.entry(ctx.name.clone()).or_default().push(loc);
            total += loc;
        }
        series.total.push(total);
        bar.inc(1);
    }
    bar.finish_with_message("Series complete");
    series
}

fn sample_loc<C: LineCounter>(
    ctx: &RepoContext<C>,
    date: NaiveDate,
    reference_branch: &str,
) -> Result<u64> {
    let cutoff = date.and_time(NaiveTime::MIN).and_utc();
    let revision = ctx
        .inspector
        .resolve_revision_at_or_before(cutoff, reference_branch)?;
    Ok(ctx.counter.count(&revision)?.sum.code)
}
