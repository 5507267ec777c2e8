#![allow(async_fn_in_trait)]

use std::fmt::Display;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// GitOps trait

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(pub String);

impl Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of replaying a single commit onto the current branch tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The commit applied cleanly.
    Applied,
    /// The patch introduced no changes; the stopped sequencer was skipped.
    Empty,
    /// The working tree has conflicts awaiting manual resolution.
    Conflict,
}

/// Operations for interacting with Git
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Name of the branch currently checked out.
    async fn current_branch(&self) -> Result<String>;

    /// Committer identity from the local git configuration.
    async fn user_identity(&self) -> Result<String>;

    /// Parent commit ids of `commit`, in order.
    async fn commit_parents(&self, commit: &CommitId) -> Result<Vec<CommitId>>;

    /// First line of the commit message.
    async fn commit_summary(&self, commit: &CommitId) -> Result<String>;

    /// Replay `commit` onto the current branch tip. For merge commits the
    /// mainline parent number selects which parent the diff is taken against.
    async fn cherry_pick(&self, commit: &CommitId, mainline: Option<u32>) -> Result<ApplyResult>;

    /// Whether the working tree still has unmerged paths.
    async fn has_unmerged_paths(&self) -> Result<bool>;

    /// Commit summaries reachable from `range` (any revspec accepted by
    /// `git log`, e.g. `HEAD` or `v2.2.0..v2.3.1`), newest first.
    async fn log_summaries(&self, range: &str) -> Result<Vec<String>>;

    /// All tag names in the repository.
    async fn tags(&self) -> Result<Vec<String>>;
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that drives the git CLI inside one repository.
pub struct RealGit {
    path: std::path::PathBuf,
}

impl RealGit {
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new("git")
            .current_dir(&self.path)
            .args(args)
            .output()
            .await
            .context("Failed to execute git command")
    }

    async fn git_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.git(args).await?;

        if !output.status.success() {
            bail!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}

impl GitOps for RealGit {
    async fn current_branch(&self) -> Result<String> {
        self.git_ok(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn user_identity(&self) -> Result<String> {
        let name = self
            .git_ok(&["config", "user.name"])
            .await
            .context("git user.name is not configured")?;
        let email = self
            .git_ok(&["config", "user.email"])
            .await
            .context("git user.email is not configured")?;
        Ok(format!("{name} <{email}>"))
    }

    async fn commit_parents(&self, commit: &CommitId) -> Result<Vec<CommitId>> {
        let parents = self.git_ok(&["log", "-1", "--format=%P", &commit.0]).await?;
        Ok(parents
            .split_whitespace()
            .map(|parent| CommitId(parent.to_string()))
            .collect())
    }

    async fn commit_summary(&self, commit: &CommitId) -> Result<String> {
        self.git_ok(&["log", "-1", "--format=%s", &commit.0]).await
    }

    async fn cherry_pick(&self, commit: &CommitId, mainline: Option<u32>) -> Result<ApplyResult> {
        let mainline_arg;
        let mut args = vec!["cherry-pick"];
        if let Some(parent) = mainline {
            mainline_arg = parent.to_string();
            args.push("-m");
            args.push(&mainline_arg);
        }
        args.push(&commit.0);

        let output = self.git(&args).await?;
        if output.status.success() {
            return Ok(ApplyResult::Applied);
        }

        // git reports the empty / conflict cases over a mix of stdout and
        // stderr depending on version.
        let detail = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        if detail.contains("is now empty") || detail.contains("nothing to commit") {
            // Clear the stopped sequencer so the next pick starts clean.
            self.git_ok(&["cherry-pick", "--skip"]).await?;
            return Ok(ApplyResult::Empty);
        }
        if detail.contains("could not apply") || detail.contains("conflict") {
            return Ok(ApplyResult::Conflict);
        }
        bail!("git cherry-pick failed: {}", detail);
    }

    async fn has_unmerged_paths(&self) -> Result<bool> {
        let unmerged = self
            .git_ok(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(!unmerged.is_empty())
    }

    async fn log_summaries(&self, range: &str) -> Result<Vec<String>> {
        let log = self.git_ok(&["log", "--format=%s", range]).await?;
        Ok(log.lines().map(|line| line.to_string()).collect())
    }

    async fn tags(&self) -> Result<Vec<String>> {
        let tags = self.git_ok(&["tag", "--list"]).await?;
        Ok(tags.lines().map(|line| line.to_string()).collect())
    }
}
