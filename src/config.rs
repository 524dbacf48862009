// src/config.rs

use crate::error::Result;
use crate::model::Grouping;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool configuration, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory containing one checkout per repository
    pub checkout_root: PathBuf,
    /// Repositories/stacks to operate on
    pub repos: Vec<String>,
    /// Environments covered by the status report
    pub environments: Vec<String>,
    #[serde(default = "default_reference_branch")]
    pub reference_branch: String,
    #[serde(default)]
    pub grouping: Grouping,
    #[serde(default)]
    pub source_environment: Option<String>,
    #[serde(default)]
    pub target_environment: Option<String>,
    /// Environments that require interactive confirmation before a sync
    #[serde(default = "default_protected_environments")]
    pub protected_environments: Vec<String>,
    /// Deployment command, run in the stack's checkout with the stack name appended
    #[serde(default)]
    pub deploy_command: Vec<String>,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default)]
    pub cloc: ClocConfig,
    /// Timestamp range for historical metrics sweeps
    #[serde(default)]
    pub sweep: Option<SweepRange>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    pub fn repo_path(&self, repo: &str) -> PathBuf {
        self.checkout_root.join(repo)
    }
}

/// Directories and extensions excluded from line counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClocConfig {
    pub exclude_dirs: Vec<String>,
    pub exclude_exts: Vec<String>,
}

impl Default for ClocConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: vec!["vendors".to_string(), "public".to_string()],
            exclude_exts: vec!["sty".to_string()],
        }
    }
}

/// Date range and sampling interval for historical metrics sweeps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweepRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
}

impl SweepRange {
    /// Sample dates from `start` up to but not including `end`.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = self.start;
        while date < self.end {
            dates.push(date);
            date = date + chrono::Duration::days(i64::from(self.interval_days));
        }
        dates
    }
}

fn default_reference_branch() -> String {
    "origin/master".to_string()
}

fn default_protected_environments() -> Vec<String> {
    vec!["prod".to_string(), "staging".to_string()]
}

fn default_store_path() -> PathBuf {
    PathBuf::from("stackops-store.json")
}

fn default_interval_days() -> u32 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_dates_step_by_interval_and_exclude_end() {
        let range = SweepRange {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 1, 29).unwrap(),
            interval_days: 7,
        };
        let dates = range.dates();
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(dates[3], NaiveDate::from_ymd_opt(2020, 1, 22).unwrap());
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let raw = r#"{
            "checkout_root": "/tmp/checkouts",
            "repos": ["core-api", "web"],
            "environments": ["test", "prod"]
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.reference_branch, "origin/master");
        assert_eq!(config.grouping, Grouping::Stack);
        assert_eq!(config.protected_environments, vec!["prod", "staging"]);
        assert_eq!(config.cloc.exclude_dirs, vec!["vendors", "public"]);
        assert_eq!(config.cloc.exclude_exts, vec!["sty"]);
        assert!(config.sweep.is_none());
        assert_eq!(
            config.repo_path("core-api"),
            PathBuf::from("/tmp/checkouts/core-api")
        );
    }
}
