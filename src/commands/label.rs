use anyhow::Result;
use anyhow::bail;
use colored::Colorize;

use crate::App;
use crate::candidate;
use crate::candidate::BackportedFilter;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::Prompter;
use crate::reconcile;
use crate::version;

impl<G: GitOps, H: GithubOps, P: Prompter> App<G, H, P> {
    /// Flip labels on candidates that already exist on the current branch:
    /// add the backported label, drop the candidate label.
    pub async fn cmd_label(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let branch = self.git.current_branch().await?;
        let labels = version::resolve_labels(
            &branch,
            self.config.candidates_label.as_deref(),
            self.config.backported_label.as_deref(),
        )?;
        let Some(backported_label) = labels.backported.clone() else {
            bail!("A backported label is required; pass --backported or run from a release branch");
        };
        writeln!(
            stdout,
            "Using labels {} / {}",
            labels.candidate.cyan(),
            backported_label.cyan()
        )?;

        let all = self.gh.list_merged_prs(&labels.candidate).await?;
        let selected = candidate::select(
            all,
            &[candidate::WONT_BACKPORT_LABEL],
            &BackportedFilter::Exact(backported_label.clone()),
            None,
        );
        if selected.is_empty() {
            writeln!(stdout, "No candidates to reconcile.")?;
            return Ok(());
        }

        let report = reconcile::reconcile(&self.git, &selected).await?;

        let candidate_label_id = self.gh.label_id(&labels.candidate).await?;
        let backported_label_id = self.gh.label_id(&backported_label).await?;

        for c in &report.backported {
            writeln!(stdout, "{} #{} {}", "backported".green(), c.number, c.title)?;
            // The pair is not atomic; attempt both mutations even if the
            // first fails, then report the first error.
            let added = self.gh.add_label(&c.id, &backported_label_id).await;
            let removed = self.gh.remove_label(&c.id, &candidate_label_id).await;
            added?;
            removed?;
        }
        for c in &report.pending {
            writeln!(stdout, "{} #{} {}", "pending".yellow(), c.number, c.title)?;
        }

        writeln!(
            stdout,
            "{} backported, {} still pending",
            report.backported.len(),
            report.pending.len()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::App;
    use crate::Config;
    use crate::candidate::Candidate;
    use crate::ops::git::CommitId;
    use crate::ops::git::MockGitOps;
    use crate::ops::github::MockGithubOps;
    use crate::ops::prompt::MockPrompter;

    fn candidate(number: u64, merged_at: &str) -> Candidate {
        Candidate {
            id: format!("PR_{number}"),
            number,
            title: format!("PR {number}"),
            labels: vec![],
            merge_commit: CommitId(format!("commit_{number}")),
            merged_at: Some(merged_at.parse().unwrap()),
        }
    }

    fn mock_git(history: Vec<&str>) -> MockGitOps {
        let history: Vec<String> = history.into_iter().map(|s| s.to_string()).collect();
        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|| Ok("release/2.3".to_string()));
        git.expect_log_summaries()
            .returning(move |_| Ok(history.clone()));
        git.expect_commit_summary()
            .returning(|commit| Ok(format!("Summary of {commit}")));
        git
    }

    #[tokio::test]
    async fn test_cmd_label_flips_labels_on_reconciled_candidates() {
        let git = mock_git(vec!["Summary of commit_10", "Other work"]);

        let mut gh = MockGithubOps::new();
        gh.expect_list_merged_prs().returning(|_| {
            Ok(vec![
                candidate(10, "2024-01-01T00:00:00Z"),
                candidate(11, "2024-02-02T00:00:00Z"),
            ])
        });
        gh.expect_label_id()
            .returning(|name| Ok(format!("LBL_{name}")));
        gh.expect_add_label()
            .withf(|pr_id, label_id| pr_id == "PR_10" && label_id == "LBL_backported-2.3.x")
            .times(1)
            .returning(|_, _| Ok(()));
        gh.expect_remove_label()
            .withf(|pr_id, label_id| {
                pr_id == "PR_10" && label_id == "LBL_backport-candidate-2.3.x"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let app = App::new(Config::default_for_tests(), git, gh, MockPrompter::new());

        let mut stdout = Vec::new();
        app.cmd_label(&mut stdout).await.unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("backported #10"));
        assert!(output.contains("pending #11"));
        assert!(output.contains("1 backported, 1 still pending"));
    }

    #[tokio::test]
    async fn test_cmd_label_attempts_removal_even_when_add_fails() {
        let git = mock_git(vec!["Summary of commit_10"]);

        let mut gh = MockGithubOps::new();
        gh.expect_list_merged_prs()
            .returning(|_| Ok(vec![candidate(10, "2024-01-01T00:00:00Z")]));
        gh.expect_label_id()
            .returning(|name| Ok(format!("LBL_{name}")));
        gh.expect_add_label()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("add failed")));
        gh.expect_remove_label().times(1).returning(|_, _| Ok(()));

        let app = App::new(Config::default_for_tests(), git, gh, MockPrompter::new());

        let mut stdout = Vec::new();
        let err = app.cmd_label(&mut stdout).await.unwrap_err();
        assert!(err.to_string().contains("add failed"));
    }

    #[tokio::test]
    async fn test_cmd_label_requires_backported_label() {
        let mut git = MockGitOps::new();
        git.expect_current_branch().returning(|| Ok("main".to_string()));

        let config = Config::new(Some("needs-port".to_string()), None);
        let app = App::new(config, git, MockGithubOps::new(), MockPrompter::new());

        let mut stdout = Vec::new();
        let err = app.cmd_label(&mut stdout).await.unwrap_err();
        assert!(err.to_string().contains("backported label is required"));
    }
}
