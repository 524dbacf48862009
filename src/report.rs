// src/report.rs

use crate::config::Config;
use crate::error::{AdminError, Result};
use crate::git::RepoInspector;
use crate::model::{DeploymentRecord, Grouping};
use crate::store::DeploymentStore;
use tracing::{error, info};

pub const NA: &str = "NA";
pub const ERROR_STR: &str = "Error";

/// One report row: a stack+environment's latest deployment and its delta to
/// the reference branch. Placeholder strings stand in for missing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub stack: String,
    pub environment: String,
    pub behind: String,
    pub ahead: String,
    pub deployed_revision: String,
    pub revision_datetime: String,
    pub lib_revision: String,
    pub layer_version: String,
    pub deployment_datetime: String,
}

impl StatusRow {
    /// Row for a pair with no deployment history.
    fn not_deployed(stack: &str, environment: &str) -> Self {
        Self::placeholder(stack, environment, NA)
    }

    /// Row for a pair whose lookup failed outright.
    fn failed(stack: &str, environment: &str) -> Self {
        Self::placeholder(stack, environment, ERROR_STR)
    }

    fn placeholder(stack: &str, environment: &str, fill: &str) -> Self {
        Self {
            stack: stack.to_string(),
            environment: environment.to_string(),
            behind: fill.to_string(),
            ahead: fill.to_string(),
            deployed_revision: fill.to_string(),
            revision_datetime: fill.to_string(),
            lib_revision: fill.to_string(),
            layer_version: fill.to_string(),
            deployment_datetime: fill.to_string(),
        }
    }

    fn cells(&self, grouping: Grouping) -> Vec<&str> {
        let mut cells: Vec<&str> = match grouping {
            Grouping::Stack => vec![self.stack.as_str(), self.environment.as_str()],
            Grouping::Environment => vec![self.environment.as_str(), self.stack.as_str()],
        };
        cells.extend([
            self.behind.as_str(),
            self.ahead.as_str(),
            self.deployed_revision.as_str(),
            self.revision_datetime.as_str(),
            self.lib_revision.as_str(),
            self.layer_version.as_str(),
            self.deployment_datetime.as_str(),
        ]);
        cells
    }
}

/// Tabular deployment status report.
#[derive(Debug)]
pub struct StatusReport {
    grouping: Grouping,
    rows: Vec<StatusRow>,
}

impl StatusReport {
    pub fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: StatusRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[StatusRow] {
        &self.rows
    }

    fn column_names(&self) -> Vec<&'static str> {
        let mut names = match self.grouping {
            Grouping::Stack => vec!["Stack", "Env"],
            Grouping::Environment => vec!["Env", "Stack"],
        };
        names.extend([
            "Behind",
            "Ahead",
            "Deployed rev",
            "Revision datetime",
            "Library rev",
            "Layer version",
            "Deployment datetime",
        ]);
        names
    }

    /// Renders the rows as an aligned text table.
    pub fn render(&self) -> String {
        let names = self.column_names();
        let rows: Vec<Vec<&str>> = self.rows.iter().map(|row| row.cells(self.grouping)).collect();

        let mut widths: Vec<usize> = names.iter().map(|name| name.len()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let rule = format!(
            "+{}+",
            widths
                .iter()
                .map(|width| "-".repeat(width + 2))
                .collect::<Vec<_>>()
                .join("+")
        );
        let format_row = |cells: &[&str]| {
            let body = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!(" {:<width$} ", cell, width = *width))
                .collect::<Vec<_>>()
                .join("|");
            format!("|{body}|")
        };

        let mut lines = vec![rule.clone(), format_row(&names), rule.clone()];
        for row in &rows {
            lines.push(format_row(row));
        }
        lines.push(rule);
        lines.join("\n")
    }
}

/// Most recent deployment for the pair, or `NoDeploymentFound`.
pub fn latest_deployment<D: DeploymentStore>(
    store: &D,
    stack: &str,
    environment: &str,
) -> Result<DeploymentRecord> {
    store
        .latest_deployment(stack, environment)?
        .ok_or_else(|| AdminError::NoDeploymentFound {
            stack: stack.to_string(),
            environment: environment.to_string(),
        })
}

pub(crate) fn clip(s: &str, len: usize) -> &str {
    s.get(..len).unwrap_or(s)
}

/// Builds the row for one stack+environment pair. A missing deployment yields
/// an all-NA row; a failure in any derived field degrades that field to an
/// "Error" placeholder instead of failing the row.
pub fn status_row<D: DeploymentStore>(
    stack: &str,
    environment: &str,
    inspector: &RepoInspector,
    store: &D,
    reference_branch: &str,
) -> Result<StatusRow> {
    let deployment = match latest_deployment(store, stack, environment) {
        Ok(deployment) => deployment,
        Err(AdminError::NoDeploymentFound { .. }) => {
            info!("no deployment found for stack {stack} in environment {environment}");
            return Ok(StatusRow::not_deployed(stack, environment));
        }
        Err(err) => return Err(err),
    };

    inspector.fetch_origin();

    let (behind, ahead) = match inspector.ahead_behind(&deployment.revision, reference_branch) {
        Ok(delta) => (delta.behind.to_string(), delta.ahead.to_string()),
        Err(err) => {
            error!("commit delta for {stack} {environment} failed: {err}");
            (ERROR_STR.to_string(), ERROR_STR.to_string())
        }
    };
    let revision_datetime = match inspector.commit_timestamp(&deployment.revision) {
        Ok(timestamp) => clip(&timestamp, 19).to_string(),
        Err(err) => {
            error!("revision datetime for {stack} {environment} failed: {err}");
            ERROR_STR.to_string()
        }
    };

    Ok(StatusRow {
        stack: stack.to_string(),
        environment: environment.to_string(),
        behind,
        ahead,
        deployed_revision: clip(&deployment.revision, 8).to_string(),
        revision_datetime,
        lib_revision: deployment
            .lib_revision
            .as_deref()
            .map(|rev| clip(rev, 8).to_string())
            .unwrap_or_else(|| NA.to_string()),
        layer_version: deployment
            .layer_version
            .clone()
            .unwrap_or_else(|| NA.to_string()),
        deployment_datetime: clip(&deployment.created, 19).to_string(),
    })
}

/// Builds the full report, one row per (stack, environment) pair in grouping
/// order. Row failures are isolated; the batch always completes.
pub fn run_report<D: DeploymentStore>(config: &Config, store: &D) -> StatusReport {
    let mut report = StatusReport::new(config.grouping);
    let pairs: Vec<(String, String)> = match config.grouping {
        Grouping::Stack => config
            .repos
            .iter()
            .flat_map(|repo| {
                config
                    .environments
                    .iter()
                    .map(move |env| (repo.clone(), env.clone()))
            })
            .collect(),
        Grouping::Environment => config
            .environments
            .iter()
            .flat_map(|env| {
                config
                    .repos
                    .iter()
                    .map(move |repo| (repo.clone(), env.clone()))
            })
            .collect(),
    };

    for (stack, environment) in pairs {
        info!("working on {stack} {environment}");
        let row = match RepoInspector::open(&config.repo_path(&stack)) {
            Ok(inspector) => {
                status_row(&stack, &environment, &inspector, store, &config.reference_branch)
                    .unwrap_or_else(|err| {
                        error!("status row for {stack} {environment} failed: {err}");
                        StatusRow::failed(&stack, &environment)
                    })
            }
            Err(err) => {
                error!("could not open repository for {stack}: {err}");
                StatusRow::failed(&stack, &environment)
            }
        };
        report.push(row);
    }
    report
}
