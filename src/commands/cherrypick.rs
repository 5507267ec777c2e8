use std::collections::HashSet;

use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::candidate;
use crate::candidate::BackportedFilter;
use crate::candidate::Candidate;
use crate::cherry_pick::CherryPickEngine;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::Prompter;
use crate::version;

impl<G: GitOps, H: GithubOps, P: Prompter> App<G, H, P> {
    /// Replay candidate PR merge commits onto the current branch.
    ///
    /// 1. Derive the candidate/backported labels from the branch name.
    /// 2. Fetch merged PRs carrying the candidate label and select the ones
    ///    still to port, in merge order.
    /// 3. Optionally narrow to an explicit subset, then hand the sequence to
    ///    the cherry-pick engine.
    pub async fn cmd_cherry_pick(
        &self,
        after: Option<u64>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let identity = self.git.user_identity().await?;
        writeln!(stdout, "Cherry-picking as {identity}")?;

        let branch = self.git.current_branch().await?;
        let labels = version::resolve_labels(
            &branch,
            self.config.candidates_label.as_deref(),
            self.config.backported_label.as_deref(),
        )?;
        writeln!(stdout, "Using candidate label {}", labels.candidate.cyan())?;

        let all = self.gh.list_merged_prs(&labels.candidate).await?;
        let filter = match &labels.backported {
            Some(label) => BackportedFilter::Exact(label.clone()),
            None => BackportedFilter::AnyPrefixed,
        };
        let selected = candidate::select(all, &[candidate::WONT_BACKPORT_LABEL], &filter, after);

        if selected.is_empty() {
            writeln!(stdout, "Nothing to backport.")?;
            return Ok(());
        }

        for c in &selected {
            let merged = c
                .merged_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            writeln!(stdout, "  #{} {} ({merged})", c.number, c.title)?;
        }

        let chosen = self.choose_subset(selected, stdout)?;

        let engine = CherryPickEngine::new(&self.git, &self.prompt);
        let summary = engine.run(&chosen, stdout).await?;
        writeln!(
            stdout,
            "{} {} applied, {} empty",
            "Done:".green(),
            summary.applied,
            summary.empty
        )?;
        Ok(())
    }

    /// Let the user narrow the run to an explicit subset of the listed PR
    /// numbers. Unknown numbers re-prompt instead of being dropped silently.
    fn choose_subset(
        &self,
        selected: Vec<Candidate>,
        stdout: &mut impl std::io::Write,
    ) -> Result<Vec<Candidate>> {
        loop {
            let input = self.prompt.read_line("PR numbers to apply (blank for all): ")?;
            let input = input.trim();
            if input.is_empty() {
                return Ok(selected);
            }

            match parse_subset(input, &selected) {
                Ok(numbers) => {
                    return Ok(selected
                        .into_iter()
                        .filter(|c| numbers.contains(&c.number))
                        .collect());
                }
                Err(message) => writeln!(stdout, "{}", message.red())?,
            }
        }
    }
}

fn parse_subset(input: &str, selected: &[Candidate]) -> Result<HashSet<u64>, String> {
    let mut numbers = HashSet::new();

    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        let number: u64 = token
            .trim_start_matches('#')
            .parse()
            .map_err(|_| format!("'{token}' is not a PR number"))?;
        if !selected.iter().any(|c| c.number == number) {
            return Err(format!("#{number} is not in the candidate list"));
        }
        numbers.insert(number);
    }

    Ok(numbers)
}
