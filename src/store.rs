// src/store.rs

use crate::error::{AdminError, Result};
use crate::model::{CodeMetricsRecord, DeploymentRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Keyed store of code-size samples, one record per (repository, timestamp).
pub trait MetricsStore {
    fn exists(&self, repo: &str, timestamp: &str) -> Result<bool>;
    fn get(&self, repo: &str, timestamp: &str) -> Result<Option<CodeMetricsRecord>>;
    /// Upserts a record. With `allow_overwrite` false an existing key is
    /// rejected with `AlreadyRecorded` before anything is written.
    fn put(&mut self, record: &CodeMetricsRecord, allow_overwrite: bool) -> Result<()>;
}

/// Read-only view of the deployment history written by the deployment
/// pipeline.
pub trait DeploymentStore {
    /// Most recent deployment for the stack-environment partition, if any.
    fn latest_deployment(&self, stack: &str, environment: &str)
        -> Result<Option<DeploymentRecord>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    metrics: BTreeMap<String, CodeMetricsRecord>,
    #[serde(default)]
    deployments: Vec<DeploymentRecord>,
}

/// Single-document JSON store on the local filesystem. Stands in for the
/// managed key-value service in offline use; the whole document is rewritten
/// on every put. Single-writer batch usage, see DESIGN.md.
pub struct JsonFileStore {
    path: PathBuf,
    doc: StoreDocument,
}

impl JsonFileStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    fn key(repo: &str, timestamp: &str) -> String {
        format!("{repo}|{timestamp}")
    }

    fn save(&self) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.doc)?)?;
        Ok(())
    }
}

impl MetricsStore for JsonFileStore {
    fn exists(&self, repo: &str, timestamp: &str) -> Result<bool> {
        Ok(self.doc.metrics.contains_key(&Self::key(repo, timestamp)))
    }

    fn get(&self, repo: &str, timestamp: &str) -> Result<Option<CodeMetricsRecord>> {
        Ok(self.doc.metrics.get(&Self::key(repo, timestamp)).cloned())
    }

    fn put(&mut self, record: &CodeMetricsRecord, allow_overwrite: bool) -> Result<()> {
        let key = Self::key(&record.repo, &record.timestamp);
        if !allow_overwrite && self.doc.metrics.contains_key(&key) {
            return Err(AdminError::AlreadyRecorded {
                repo: record.repo.clone(),
                timestamp: record.timestamp.clone(),
            });
        }
        self.doc.metrics.insert(key, record.clone());
        self.save()
    }
}

impl DeploymentStore for JsonFileStore {
    fn latest_deployment(
        &self,
        stack: &str,
        environment: &str,
    ) -> Result<Option<DeploymentRecord>> {
        Ok(latest_of(&self.doc.deployments, stack, environment))
    }
}

fn latest_of(
    deployments: &[DeploymentRecord],
    stack: &str,
    environment: &str,
) -> Option<DeploymentRecord> {
    deployments
        .iter()
        .filter(|d| d.stack == stack && d.environment == environment)
        .max_by(|a, b| a.created.cmp(&b.created))
        .cloned()
}

/// In-memory store used by tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    metrics: BTreeMap<(String, String), CodeMetricsRecord>,
    deployments: Vec<DeploymentRecord>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn add_deployment(&mut self, record: DeploymentRecord) {
        self.deployments.push(record);
    }
}

#[cfg(test)]
impl MetricsStore for MemoryStore {
    fn exists(&self, repo: &str, timestamp: &str) -> Result<bool> {
        Ok(self
            .metrics
            .contains_key(&(repo.to_string(), timestamp.to_string())))
    }

    fn get(&self, repo: &str, timestamp: &str) -> Result<Option<CodeMetricsRecord>> {
        Ok(self
            .metrics
            .get(&(repo.to_string(), timestamp.to_string()))
            .cloned())
    }

    fn put(&mut self, record: &CodeMetricsRecord, allow_overwrite: bool) -> Result<()> {
        let key = (record.repo.clone(), record.timestamp.clone());
        if !allow_overwrite && self.metrics.contains_key(&key) {
            return Err(AdminError::AlreadyRecorded {
                repo: record.repo.clone(),
                timestamp: record.timestamp.clone(),
            });
        }
        self.metrics.insert(key, record.clone());
        Ok(())
    }
}

#[cfg(test)]
impl DeploymentStore for MemoryStore {
    fn latest_deployment(
        &self,
        stack: &str,
        environment: &str,
    ) -> Result<Option<DeploymentRecord>> {
        Ok(latest_of(&self.deployments, stack, environment))
    }
}
