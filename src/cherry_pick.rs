use anyhow::Result;
use colored::Colorize;

use crate::cancel::UserCancelled;
use crate::candidate::Candidate;
use crate::ops::git::ApplyResult;
use crate::ops::git::GitOps;
use crate::ops::prompt::Prompter;

// -----------------------------------------------------------------------------
// Types

/// Outcome of replaying one candidate. Transient; a declined prompt surfaces
/// as a [`UserCancelled`] error instead of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CherryPickOutcome {
    Applied,
    AppliedEmpty,
    ConflictPendingResolution,
}

/// Counts for one completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub empty: usize,
}

// -----------------------------------------------------------------------------
// CherryPickEngine

/// Applies candidates to the current branch tip, strictly in the order given.
///
/// Conflicts are expected to be common and always need a human: the engine
/// never resolves them itself and never proceeds past a conflicted candidate
/// without explicit confirmation. There is no reordering and no retry.
pub struct CherryPickEngine<'a, G: GitOps, P: Prompter> {
    git: &'a G,
    prompt: &'a P,
}

impl<'a, G: GitOps, P: Prompter> CherryPickEngine<'a, G, P> {
    pub fn new(git: &'a G, prompt: &'a P) -> Self {
        Self { git, prompt }
    }

    /// Apply the candidates one by one. A declined prompt cancels the
    /// remaining sequence; the branch keeps whatever the completed prefix
    /// produced.
    pub async fn run(
        &self,
        candidates: &[Candidate],
        stdout: &mut impl std::io::Write,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for candidate in candidates {
            writeln!(
                stdout,
                "{} #{} {}",
                "Picking".green(),
                candidate.number,
                candidate.title
            )?;
            if !self.prompt.confirm(&format!("Apply #{}?", candidate.number))? {
                return Err(UserCancelled.into());
            }

            match self.apply(candidate).await? {
                CherryPickOutcome::Applied => {
                    summary.applied += 1;
                }
                CherryPickOutcome::AppliedEmpty => {
                    summary.empty += 1;
                    writeln!(
                        stdout,
                        "  #{} introduced no changes; skipped",
                        candidate.number
                    )?;
                }
                CherryPickOutcome::ConflictPendingResolution => {
                    self.wait_for_resolution(candidate, stdout).await?;
                    summary.applied += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Replay one candidate's merge commit onto the current branch tip.
    async fn apply(&self, candidate: &Candidate) -> Result<CherryPickOutcome> {
        let parents = self.git.commit_parents(&candidate.merge_commit).await?;
        // A true merge commit replays against its first parent, the branch
        // that was merged into; the other parent would pick the wrong diff.
        let mainline = if parents.len() > 1 { Some(1) } else { None };

        let outcome = match self.git.cherry_pick(&candidate.merge_commit, mainline).await? {
            ApplyResult::Applied => CherryPickOutcome::Applied,
            ApplyResult::Empty => {
                log::debug!("#{} already present, patch was empty", candidate.number);
                CherryPickOutcome::AppliedEmpty
            }
            ApplyResult::Conflict => CherryPickOutcome::ConflictPendingResolution,
        };
        Ok(outcome)
    }

    /// Conflict resolution happens out of band. Wait for the user to commit
    /// the fix, then re-read the working tree before moving on; whatever was
    /// cached before the manual fix is stale.
    async fn wait_for_resolution(
        &self,
        candidate: &Candidate,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(
            stdout,
            "{} #{} has conflicts. Resolve them and run 'git cherry-pick --continue'.",
            "Conflict:".red(),
            candidate.number
        )?;

        loop {
            if !self.prompt.confirm("Continue with the next PR?")? {
                return Err(UserCancelled.into());
            }
            if !self.git.has_unmerged_paths().await? {
                return Ok(());
            }
            writeln!(stdout, "The working tree still has unmerged paths.")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::ops::git::CommitId;
    use crate::ops::git::MockGitOps;
    use crate::ops::prompt::MockPrompter;

    fn candidate(number: u64) -> Candidate {
        Candidate {
            id: format!("PR_{number}"),
            number,
            title: format!("PR {number}"),
            labels: vec![],
            merge_commit: CommitId(format!("{number:040}")),
            merged_at: Some("2024-01-01T00:00:00Z".parse().unwrap()),
        }
    }

    fn accept_all() -> MockPrompter {
        let mut prompt = MockPrompter::new();
        prompt.expect_confirm().returning(|_| Ok(true));
        prompt
    }

    #[tokio::test]
    async fn test_merge_commit_replays_against_mainline_parent() {
        let mut git = MockGitOps::new();
        git.expect_commit_parents().returning(|_| {
            Ok(vec![
                CommitId("parent1".to_string()),
                CommitId("parent2".to_string()),
            ])
        });
        git.expect_cherry_pick()
            .withf(|_, mainline| *mainline == Some(1))
            .returning(|_, _| Ok(ApplyResult::Applied));

        let prompt = accept_all();
        let engine = CherryPickEngine::new(&git, &prompt);

        let mut stdout = Vec::new();
        let summary = engine.run(&[candidate(10)], &mut stdout).await.unwrap();
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn test_single_parent_commit_replays_directly() {
        let mut git = MockGitOps::new();
        git.expect_commit_parents()
            .returning(|_| Ok(vec![CommitId("parent1".to_string())]));
        git.expect_cherry_pick()
            .withf(|_, mainline| mainline.is_none())
            .returning(|_, _| Ok(ApplyResult::Applied));

        let prompt = accept_all();
        let engine = CherryPickEngine::new(&git, &prompt);

        let mut stdout = Vec::new();
        let summary = engine.run(&[candidate(10)], &mut stdout).await.unwrap();
        assert_eq!(summary.applied, 1);
    }

    #[tokio::test]
    async fn test_empty_patch_does_not_halt_the_sequence() {
        let mut git = MockGitOps::new();
        git.expect_commit_parents()
            .returning(|_| Ok(vec![CommitId("parent1".to_string())]));

        let calls = AtomicUsize::new(0);
        git.expect_cherry_pick().returning(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ApplyResult::Empty)
            } else {
                Ok(ApplyResult::Applied)
            }
        });

        let prompt = accept_all();
        let engine = CherryPickEngine::new(&git, &prompt);

        let mut stdout = Vec::new();
        let summary = engine
            .run(&[candidate(10), candidate(11)], &mut stdout)
            .await
            .unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.empty, 1);
    }

    #[tokio::test]
    async fn test_conflict_waits_for_resolution_then_continues() {
        let mut git = MockGitOps::new();
        git.expect_commit_parents()
            .returning(|_| Ok(vec![CommitId("parent1".to_string())]));
        git.expect_cherry_pick()
            .returning(|_, _| Ok(ApplyResult::Conflict));

        // Still unmerged after the first confirmation, resolved after the second.
        let checks = AtomicUsize::new(0);
        git.expect_has_unmerged_paths()
            .returning(move || Ok(checks.fetch_add(1, Ordering::SeqCst) == 0));

        let prompt = accept_all();
        let engine = CherryPickEngine::new(&git, &prompt);

        let mut stdout = Vec::new();
        let summary = engine.run(&[candidate(10)], &mut stdout).await.unwrap();
        assert_eq!(summary.applied, 1);

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("unmerged paths"));
    }

    #[tokio::test]
    async fn test_declined_prompt_cancels_the_run() {
        let git = MockGitOps::new();
        let mut prompt = MockPrompter::new();
        prompt.expect_confirm().returning(|_| Ok(false));

        let engine = CherryPickEngine::new(&git, &prompt);

        let mut stdout = Vec::new();
        let err = engine
            .run(&[candidate(10), candidate(11)], &mut stdout)
            .await
            .unwrap_err();
        assert!(err.is::<UserCancelled>());
    }

    #[tokio::test]
    async fn test_declined_conflict_prompt_cancels_the_run() {
        let mut git = MockGitOps::new();
        git.expect_commit_parents()
            .returning(|_| Ok(vec![CommitId("parent1".to_string())]));
        git.expect_cherry_pick()
            .returning(|_, _| Ok(ApplyResult::Conflict));

        let mut prompt = MockPrompter::new();
        prompt
            .expect_confirm()
            .returning(|message| Ok(message.starts_with("Apply")));

        let engine = CherryPickEngine::new(&git, &prompt);

        let mut stdout = Vec::new();
        let err = engine.run(&[candidate(10)], &mut stdout).await.unwrap_err();
        assert!(err.is::<UserCancelled>());
    }
}
