// src/model.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One deployment of a stack to an environment. Written by the deployment
/// pipeline; read-only from this tool's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub stack: String,
    pub environment: String,
    /// Commit hash of the deployed revision
    pub revision: String,
    /// Deployment creation time, ISO 8601
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_version: Option<String>,
}

/// Code-size sample for one repository at one timestamp. Written at most once
/// per (repo, timestamp) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMetricsRecord {
    pub repo: String,
    /// Sample date, `YYYY-MM-DD`
    pub timestamp: String,
    /// Reference-branch revision resolved for the sample date
    pub revision: String,
    pub code: u64,
    pub comment: u64,
    pub blank: u64,
    /// Full cloc report with the header reduced to reproducible fields
    pub detail: ClocReport,
    pub source: String,
}

/// Commit counts from a two-way comparison against the reference branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitDelta {
    /// Commits the reference branch has that the revision lacks
    pub behind: usize,
    /// Commits the revision has that the reference branch lacks
    pub ahead: usize,
}

/// Column order preference for the deployment status report.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Iterate stacks first, stack column leads
    #[default]
    Stack,
    /// Iterate environments first, environment column leads
    Environment,
}

/// Parsed cloc report: aggregate counts plus the per-language breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClocReport {
    pub header: ClocHeader,
    #[serde(rename = "SUM")]
    pub sum: LanguageCount,
    #[serde(flatten)]
    pub languages: BTreeMap<String, LanguageCount>,
}

/// cloc report header. The volatile timing fields (elapsed seconds, files and
/// lines per second) are not represented, so they are dropped on parse and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClocHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloc_url: Option<String>,
    /// cloc emits its version as a JSON number; normalized to a string
    #[serde(deserialize_with = "version_string")]
    pub cloc_version: String,
    #[serde(default)]
    pub n_files: u64,
    #[serde(default)]
    pub n_lines: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCount {
    #[serde(default, rename = "nFiles")]
    pub n_files: u64,
    pub blank: u64,
    pub comment: u64,
    pub code: u64,
}

fn version_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(version) => Ok(version),
        serde_json::Value::Number(version) => Ok(version.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected cloc_version: {other}"
        ))),
    }
}
