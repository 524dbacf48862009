// src/sync.rs

use crate::config::Config;
use crate::error::{AdminError, Result};
use crate::git::RepoInspector;
use crate::report::{clip, latest_deployment};
use crate::store::DeploymentStore;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info};

/// Triggers deployment of the currently checked-out revision of a stack.
/// The deployment mechanism itself is a collaborator.
pub trait Deployer {
    fn deploy(&self, stack: &str, skip_confirmation: bool) -> Result<()>;
}

/// Runs a configured deployment command in the stack's checkout directory,
/// with the stack name appended.
pub struct CommandDeployer {
    command: Vec<String>,
    checkout_root: PathBuf,
}

impl CommandDeployer {
    pub fn new(command: Vec<String>, checkout_root: PathBuf) -> Self {
        Self {
            command,
            checkout_root,
        }
    }
}

impl Deployer for CommandDeployer {
    fn deploy(&self, stack: &str, skip_confirmation: bool) -> Result<()> {
        let (program, args) = self.command.split_first().ok_or_else(|| {
            AdminError::CommandFailed {
                command: String::new(),
                status: -1,
                stderr: "empty deploy command".to_string(),
            }
        })?;
        let mut command = Command::new(program);
        command
            .args(args)
            .arg(stack)
            .current_dir(self.checkout_root.join(stack));
        if skip_confirmation {
            command.arg("--skip-confirmation");
        }
        let output = command.output()?;
        if !output.status.success() {
            return Err(AdminError::CommandFailed {
                command: format!("{program} {stack}"),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

/// Result of syncing one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Deployed { revision: String },
    AlreadyInSync,
}

/// Protected targets need an explicit yes before any stack is processed; a
/// decline aborts the whole batch.
pub fn confirm_protected_target(
    target: &str,
    source: &str,
    protected: &[String],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<()> {
    if !protected.iter().any(|env| env == target) {
        return Ok(());
    }
    write!(output, "Are you sure you want to sync {target} to {source}? (y/N) ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    if line.trim().eq_ignore_ascii_case("y") {
        Ok(())
    } else {
        Err(AdminError::SyncDeclined {
            environment: target.to_string(),
        })
    }
}

/// Syncs one stack: checks out the source environment's deployed revision and
/// redeploys it to the target environment, unless the two already match.
pub fn sync_stack<S: DeploymentStore, D: Deployer>(
    stack: &str,
    source_env: &str,
    target_env: &str,
    store: &S,
    inspector: &RepoInspector,
    deployer: &D,
) -> Result<SyncOutcome> {
    let source = latest_deployment(store, stack, source_env)?;
    let target = latest_deployment(store, stack, target_env)?;
    if source.revision == target.revision {
        return Ok(SyncOutcome::AlreadyInSync);
    }
    inspector.checkout(&source.revision, None)?;
    info!("initiating deployment of {stack} to {target_env}");
    deployer.deploy(stack, true)?;
    Ok(SyncOutcome::Deployed {
        revision: source.revision,
    })
}

/// Syncs every configured stack. Per-stack failures are logged and the batch
/// continues; only a declined confirmation aborts the run.
pub fn run_sync<S: DeploymentStore, D: Deployer>(
    config: &Config,
    source_env: &str,
    target_env: &str,
    store: &S,
    deployer: &D,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<()> {
    confirm_protected_target(
        target_env,
        source_env,
        &config.protected_environments,
        input,
        output,
    )?;
    for stack in &config.repos {
        let outcome = RepoInspector::open(&config.repo_path(stack))
            .and_then(|inspector| sync_stack(stack, source_env, target_env, store, &inspector, deployer));
        match outcome {
            Ok(SyncOutcome::Deployed { revision }) => {
                info!("deployed {stack} revision {} to {target_env}", clip(&revision, 8));
            }
            Ok(SyncOutcome::AlreadyInSync) => {
                info!("stack {stack} is already in sync in {source_env} and {target_env}; skipped");
            }
            Err(err) => error!("failed to sync stack {stack}: {err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Grouping;
    use crate::store::MemoryStore;
    use crate::testutil::{add_commit, deployment, repo_fixture};
    use git2::Repository;
    use std::cell::RefCell;
    use std::io::Cursor;

    const T1: i64 = 1_577_836_800; // 2020-01-01
    const T2: i64 = 1_580_515_200; // 2020-02-01

    #[derive(Default)]
    struct RecordingDeployer {
        calls: RefCell<Vec<(String, bool)>>,
    }

    impl Deployer for RecordingDeployer {
        fn deploy(&self, stack: &str, skip_confirmation: bool) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((stack.to_string(), skip_confirmation));
            Ok(())
        }
    }

    #[test]
    fn mismatched_revisions_trigger_one_checkout_and_one_deploy() {
        let (_root, repo) = repo_fixture("alpha");
        let c1 = add_commit(&repo, "a.txt", "one", T1);
        let c2 = add_commit(&repo, "a.txt", "two", T2);
        let inspector = RepoInspector::open(repo.workdir().unwrap()).unwrap();
        let mut store = MemoryStore::default();
        store.add_deployment(deployment("alpha", "prod", &c2.to_string(), "2021-02-01T09:00:00Z"));
        store.add_deployment(deployment("alpha", "test", &c1.to_string(), "2021-01-01T09:00:00Z"));
        let deployer = RecordingDeployer::default();

        let outcome =
            sync_stack("alpha", "prod", "test", &store, &inspector, &deployer).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Deployed {
                revision: c2.to_string()
            }
        );
        assert_eq!(*deployer.calls.borrow(), vec![("alpha".to_string(), true)]);

        // the source revision was checked out before deploying
        let reopened = Repository::open(repo.workdir().unwrap()).unwrap();
        assert!(reopened.head_detached().unwrap());
        assert_eq!(reopened.head().unwrap().target().unwrap(), c2);
    }

    #[test]
    fn matching_revisions_skip_checkout_and_deploy() {
        let (_root, repo) = repo_fixture("alpha");
        let c1 = add_commit(&repo, "a.txt", "one", T1);
        let inspector = RepoInspector::open(repo.workdir().unwrap()).unwrap();
        let mut store = MemoryStore::default();
        store.add_deployment(deployment("alpha", "prod", &c1.to_string(), "2021-02-01T09:00:00Z"));
        store.add_deployment(deployment("alpha", "test", &c1.to_string(), "2021-01-01T09:00:00Z"));
        let deployer = RecordingDeployer::default();

        let outcome =
            sync_stack("alpha", "prod", "test", &store, &inspector, &deployer).unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadyInSync);
        assert!(deployer.calls.borrow().is_empty());

        let reopened = Repository::open(repo.workdir().unwrap()).unwrap();
        assert!(!reopened.head_detached().unwrap());
        assert_eq!(reopened.head().unwrap().shorthand(), Some("master"));
    }

    #[test]
    fn missing_target_deployment_is_an_error() {
        let (_root, repo) = repo_fixture("alpha");
        let c1 = add_commit(&repo, "a.txt", "one", T1);
        let inspector = RepoInspector::open(repo.workdir().unwrap()).unwrap();
        let mut store = MemoryStore::default();
        store.add_deployment(deployment("alpha", "prod", &c1.to_string(), "2021-02-01T09:00:00Z"));
        let deployer = RecordingDeployer::default();

        let err = sync_stack("alpha", "prod", "test", &store, &inspector, &deployer).unwrap_err();
        assert!(matches!(err, AdminError::NoDeploymentFound { .. }));
        assert!(deployer.calls.borrow().is_empty());
    }

    #[test]
    fn protected_target_requires_confirmation() {
        let protected = vec!["prod".to_string(), "staging".to_string()];
        let mut output = Vec::new();

        let mut declined = Cursor::new(b"n\n".to_vec());
        let err = confirm_protected_target("prod", "test", &protected, &mut declined, &mut output)
            .unwrap_err();
        assert!(matches!(err, AdminError::SyncDeclined { .. }));
        assert!(String::from_utf8(output.clone()).unwrap().contains("prod"));

        let mut accepted = Cursor::new(b"y\n".to_vec());
        confirm_protected_target("prod", "test", &protected, &mut accepted, &mut output).unwrap();

        // unprotected targets never prompt
        let mut empty = Cursor::new(Vec::new());
        confirm_protected_target("dev", "test", &protected, &mut empty, &mut output).unwrap();
    }

    #[test]
    fn run_sync_aborts_whole_batch_when_declined() {
        let root = tempfile::TempDir::new().unwrap();
        let config = Config {
            checkout_root: root.path().to_path_buf(),
            repos: vec!["alpha".to_string()],
            environments: vec!["test".to_string(), "prod".to_string()],
            reference_branch: "master".to_string(),
            grouping: Grouping::Stack,
            source_environment: None,
            target_environment: None,
            protected_environments: vec!["prod".to_string()],
            deploy_command: Vec::new(),
            store_path: root.path().join("store.json"),
            cloc: Default::default(),
            sweep: None,
        };
        let store = MemoryStore::default();
        let deployer = RecordingDeployer::default();
        let mut input = Cursor::new(b"n\n".to_vec());
        let mut output = Vec::new();

        let err = run_sync(&config, "test", "prod", &store, &deployer, &mut input, &mut output)
            .unwrap_err();
        assert!(matches!(err, AdminError::SyncDeclined { .. }));
        assert!(deployer.calls.borrow().is_empty());
    }
}
