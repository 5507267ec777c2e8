use anyhow::Result;
use anyhow::anyhow;
use colored::Colorize;

use crate::App;
use crate::changelog::ChangelogDiffer;
use crate::changelog::DualLabelPolicy;
use crate::changelog::Section;
use crate::changelog::classify;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::github::PullRequestSummary;
use crate::ops::prompt::Prompter;
use crate::version::VersionPoint;

impl<G: GitOps, H: GithubOps, P: Prompter> App<G, H, P> {
    /// Assemble categorized release notes between two release tags.
    pub async fn cmd_changelog(
        &self,
        tag: &str,
        previous_tag: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let current =
            VersionPoint::from_tag(tag).ok_or_else(|| anyhow!("'{tag}' is not a version tag"))?;
        let previous = VersionPoint::from_tag(previous_tag)
            .ok_or_else(|| anyhow!("'{previous_tag}' is not a version tag"))?;

        let differ = ChangelogDiffer::new(&self.git);
        let diff = differ.diff(&current, &previous).await?;

        writeln!(stdout, "# Changes in {current} since {previous}")?;

        let mut features = Vec::new();
        let mut fixes = Vec::new();
        let mut misc = Vec::new();

        for number in &diff.new_prs {
            // One bad PR (deleted, or a failed lookup) must not sink the
            // whole changelog.
            let summary = match self.gh.pr_by_number(*number).await {
                Ok(summary) => summary,
                Err(err) => {
                    log::warn!("Skipping PR #{number}: {err:#}");
                    continue;
                }
            };
            match classify(&summary.labels, DualLabelPolicy::default()) {
                Section::Features => features.push(summary),
                Section::Fixes => fixes.push(summary),
                Section::Misc => misc.push(summary),
            }
        }

        write_section(stdout, "Features", &features)?;
        write_section(stdout, "Fixes", &fixes)?;
        write_section(stdout, "Miscellaneous", &misc)?;

        if !diff.missing_prs.is_empty() {
            writeln!(stdout)?;
            writeln!(
                stdout,
                "{}",
                format!("Backported to {previous} but missing from {current}:").yellow()
            )?;
            for number in &diff.missing_prs {
                match self.gh.pr_by_number(*number).await {
                    Ok(summary) => writeln!(stdout, "- {} (#{})", summary.title, summary.number)?,
                    Err(_) => writeln!(stdout, "- #{number}")?,
                }
            }
        }

        Ok(())
    }
}

fn write_section(
    stdout: &mut impl std::io::Write,
    heading: &str,
    prs: &[PullRequestSummary],
) -> Result<()> {
    if prs.is_empty() {
        return Ok(());
    }
    writeln!(stdout)?;
    writeln!(stdout, "## {heading}")?;
    for pr in prs {
        writeln!(
            stdout,
            "- {} ([#{}]({})) by @{}",
            pr.title, pr.number, pr.url, pr.author
        )?;
    }
    Ok(())
}
