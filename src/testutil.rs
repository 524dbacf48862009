// src/testutil.rs

use crate::cloc::{parse_report, LineCounter};
use crate::error::Result;
use crate::model::{ClocReport, CodeMetricsRecord, DeploymentRecord};
use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use std::cell::Cell;
use std::path::Path;
use tempfile::TempDir;

/// Representative cloc output, volatile header fields included.
pub const SAMPLE_CLOC_JSON: &str = r#"{
  "header": {
    "cloc_url": "github.com/AlDanial/cloc",
    "cloc_version": 1.90,
    "elapsed_seconds": 0.085,
    "n_files": 52,
    "n_lines": 6430,
    "files_per_second": 611.76,
    "lines_per_second": 75647.05
  },
  "Python": { "nFiles": 40, "blank": 500, "comment": 300, "code": 4000 },
  "YAML": { "nFiles": 12, "blank": 30, "comment": 20, "code": 1580 },
  "SUM": { "blank": 530, "comment": 320, "code": 5580, "nFiles": 52 }
}"#;

pub fn sample_report() -> ClocReport {
    parse_report(SAMPLE_CLOC_JSON).unwrap()
}

pub fn metrics_record(repo: &str, timestamp: &str) -> CodeMetricsRecord {
    let report = sample_report();
    CodeMetricsRecord {
        repo: repo.to_string(),
        timestamp: timestamp.to_string(),
        revision: "abc123def".to_string(),
        code: report.sum.code,
        comment: report.sum.comment,
        blank: report.sum.blank,
        detail: report,
        source: "cloc".to_string(),
    }
}

pub fn deployment(stack: &str, environment: &str, revision: &str, created: &str) -> DeploymentRecord {
    DeploymentRecord {
        stack: stack.to_string(),
        environment: environment.to_string(),
        revision: revision.to_string(),
        created: created.to_string(),
        lib_revision: None,
        layer_version: None,
    }
}

/// Line counter double returning a fixed report and counting invocations.
pub struct FixedCounter {
    pub report: ClocReport,
    pub calls: Cell<usize>,
}

impl FixedCounter {
    pub fn new() -> Self {
        Self {
            report: sample_report(),
            calls: Cell::new(0),
        }
    }
}

impl LineCounter for FixedCounter {
    fn count(&self, _revision: &str) -> Result<ClocReport> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.report.clone())
    }
}

/// A scratch checkout root containing one repository named `name`, with its
/// initial branch pinned to `master` regardless of host git configuration.
pub fn repo_fixture(name: &str) -> (TempDir, Repository) {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(name);
    std::fs::create_dir(&dir).unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("master");
    let repo = Repository::init_opts(&dir, &opts).unwrap();
    (root, repo)
}

/// Commits `content` to `file` on the current branch with the given commit
/// time (unix seconds, UTC).
pub fn add_commit(repo: &Repository, file: &str, content: &str, seconds: i64) -> Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(file), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = Signature::new("Tester", "tester@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &format!("update {file}"),
        &tree,
        &parents,
    )
    .unwrap()
}
