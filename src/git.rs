// src/git.rs

use crate::error::{AdminError, Result};
use crate::model::CommitDelta;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use git2::{Oid, Repository};
use std::path::Path;

/// Wraps one repository checkout. `checkout` mutates the working tree, so
/// callers must serialize access per checkout.
pub struct RepoInspector {
    repo: Repository,
}

impl RepoInspector {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            repo: Repository::open(path)?,
        })
    }

    /// Most recent commit on `branch` with commit time at or before `cutoff`.
    /// On a miss, fetches from origin once and retries before failing with
    /// `RevisionNotFound`.
    pub fn resolve_revision_at_or_before(
        &self,
        cutoff: DateTime<Utc>,
        branch: &str,
    ) -> Result<String> {
        match self.try_resolve(cutoff.timestamp(), branch) {
            Ok(Some(oid)) => return Ok(oid.to_string()),
            Ok(None) | Err(_) => self.fetch_origin(),
        }
        match self.try_resolve(cutoff.timestamp(), branch)? {
            Some(oid) => Ok(oid.to_string()),
            None => Err(AdminError::RevisionNotFound {
                branch: branch.to_string(),
                timestamp: cutoff.format("%Y-%m-%d %H:%M:%S").to_string(),
            }),
        }
    }

    fn try_resolve(&self, cutoff_secs: i64, branch: &str) -> Result<Option<Oid>> {
        let tip = self.repo.revparse_single(branch)?.peel_to_commit()?;
        let mut walk = self.repo.revwalk()?;
        walk.push(tip.id())?;
        walk.set_sorting(git2::Sort::TIME)?;
        for oid in walk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            if commit.time().seconds() <= cutoff_secs {
                return Ok(Some(oid));
            }
        }
        Ok(None)
    }

    /// Symmetric-difference commit counts between `revision` and the
    /// reference branch. Retries once after a fetch on failure.
    pub fn ahead_behind(&self, revision: &str, reference_branch: &str) -> Result<CommitDelta> {
        match self.try_ahead_behind(revision, reference_branch) {
            Ok(delta) => Ok(delta),
            Err(_) => {
                self.fetch_origin();
                self.try_ahead_behind(revision, reference_branch)
            }
        }
    }

    fn try_ahead_behind(&self, revision: &str, reference_branch: &str) -> Result<CommitDelta> {
        let local = self.repo.revparse_single(revision)?.peel_to_commit()?.id();
        let upstream = self
            .repo
            .revparse_single(reference_branch)?
            .peel_to_commit()?
            .id();
        let (ahead, behind) = self.repo.graph_ahead_behind(local, upstream)?;
        Ok(CommitDelta { behind, ahead })
    }

    /// Commit time of `revision` in git's `%ci` format,
    /// e.g. `2021-03-01 09:30:00 +0000`.
    pub fn commit_timestamp(&self, revision: &str) -> Result<String> {
        let commit = self.repo.revparse_single(revision)?.peel_to_commit()?;
        let time = commit.time();
        let datetime: Option<DateTime<FixedOffset>> =
            FixedOffset::east_opt(time.offset_minutes() * 60)
                .and_then(|offset| offset.timestamp_opt(time.seconds(), 0).single());
        match datetime {
            Some(datetime) => Ok(datetime.format("%Y-%m-%d %H:%M:%S %z").to_string()),
            None => Err(AdminError::Git(git2::Error::from_str(
                "commit timestamp out of range",
            ))),
        }
    }

    /// Switches the working tree to `revision`, leaving HEAD detached, or on
    /// a new branch at that point when `new_branch` is given.
    pub fn checkout(&self, revision: &str, new_branch: Option<&str>) -> Result<()> {
        let object = self.repo.revparse_single(revision)?;
        let commit = object.peel_to_commit()?;
        let mut builder = git2::build::CheckoutBuilder::new();
        builder.force();
        self.repo.checkout_tree(&object, Some(&mut builder))?;
        match new_branch {
            Some(name) => {
                self.repo.branch(name, &commit, false)?;
                self.repo.set_head(&format!("refs/heads/{name}"))?;
            }
            None => self.repo.set_head_detached(commit.id())?,
        }
        Ok(())
    }

    /// Root commit (no parents) reachable from `branch`.
    pub fn earliest_commit(&self, branch: &str) -> Result<String> {
        let tip = self.repo.revparse_single(branch)?.peel_to_commit()?;
        let mut walk = self.repo.revwalk()?;
        walk.push(tip.id())?;
        walk.set_sorting(git2::Sort::TIME | git2::Sort::REVERSE)?;
        for oid in walk {
            let oid = oid?;
            if self.repo.find_commit(oid)?.parent_count() == 0 {
                return Ok(oid.to_string());
            }
        }
        Err(AdminError::Git(git2::Error::from_str(
            "branch has no root commit",
        )))
    }

    /// Date of the root commit, used to skip pre-history sweep samples.
    pub fn earliest_commit_date(&self, branch: &str) -> Result<NaiveDate> {
        let timestamp = self.commit_timestamp(&self.earliest_commit(branch)?)?;
        let date = timestamp.get(..10).unwrap_or(&timestamp);
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AdminError::Git(git2::Error::from_str("unparseable commit timestamp")))
    }

    /// Best-effort fetch from origin. Errors are ignored so a missing remote
    /// does not mask the failure that triggered the retry.
    pub fn fetch_origin(&self) {
        if let Ok(mut remote) = self.repo.find_remote("origin") {
            let _ = remote.fetch(&[] as &[&str], None, None);
        }
    }
}
