// src/cloc.rs

use crate::config::ClocConfig;
use crate::error::{AdminError, Result};
use crate::model::ClocReport;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Counts lines of code at a given revision. Trait seam so batch drivers can
/// run against a test double instead of the external tool.
pub trait LineCounter {
    fn count(&self, revision: &str) -> Result<ClocReport>;
}

/// Invokes the cloc command line tool (https://github.com/AlDanial/cloc)
/// against a revision of the repository at `repo_dir`.
pub struct ClocRunner {
    repo_dir: PathBuf,
    exclude_dirs: Vec<String>,
    exclude_exts: Vec<String>,
}

impl ClocRunner {
    pub fn new(repo_dir: &Path, config: &ClocConfig) -> Self {
        Self {
            repo_dir: repo_dir.to_path_buf(),
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_exts: config.exclude_exts.clone(),
        }
    }

    fn args(&self, revision: &str) -> Vec<String> {
        let mut args = Vec::new();
        if !self.exclude_dirs.is_empty() {
            args.push(format!("--exclude-dir={}", self.exclude_dirs.join(",")));
        }
        if !self.exclude_exts.is_empty() {
            args.push(format!("--exclude-ext={}", self.exclude_exts.join(",")));
        }
        args.push("--json".to_string());
        args.push("--git".to_string());
        args.push(revision.to_string());
        args
    }
}

impl LineCounter for ClocRunner {
    fn count(&self, revision: &str) -> Result<ClocReport> {
        let output = Command::new("cloc")
            .args(self.args(revision))
            .current_dir(&self.repo_dir)
            .output()?;
        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                command: format!("cloc --git {revision}"),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        parse_report(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses cloc's JSON report. The volatile timing fields in the header are
/// dropped here so stored records are reproducible.
pub fn parse_report(raw: &str) -> Result<ClocReport> {
    serde_json::from_str(raw.trim()).map_err(|err| AdminError::ClocParse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SAMPLE_CLOC_JSON;

    #[test]
    fn parses_sum_and_language_breakdown() {
        let report = parse_report(SAMPLE_CLOC_JSON).unwrap();
        assert_eq!(report.sum.code, 5580);
        assert_eq!(report.sum.comment, 320);
        assert_eq!(report.sum.blank, 530);
        assert_eq!(report.languages.len(), 2);
        assert_eq!(report.languages["Python"].code, 4000);
        assert_eq!(report.languages["YAML"].n_files, 12);
    }

    #[test]
    fn strips_volatile_header_fields_and_normalizes_version() {
        let report = parse_report(SAMPLE_CLOC_JSON).unwrap();
        assert_eq!(report.header.cloc_version, "1.9");

        let header = serde_json::to_value(&report.header).unwrap();
        assert!(header.get("elapsed_seconds").is_none());
        assert!(header.get("files_per_second").is_none());
        assert!(header.get("lines_per_second").is_none());
        assert_eq!(header["n_files"], 52);
        assert_eq!(header["n_lines"], 6430);
    }

    #[test]
    fn rejects_unparseable_output() {
        let err = parse_report("cloc: command mangled").unwrap_err();
        assert!(matches!(err, AdminError::ClocParse(_)));
    }

    #[test]
    fn builds_exclusion_arguments() {
        let runner = ClocRunner::new(Path::new("."), &ClocConfig::default());
        assert_eq!(
            runner.args("abc123"),
            vec![
                "--exclude-dir=vendors,public",
                "--exclude-ext=sty",
                "--json",
                "--git",
                "abc123",
            ]
        );
    }
}
