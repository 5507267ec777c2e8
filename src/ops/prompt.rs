use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;

// -----------------------------------------------------------------------------
// Prompter trait

/// Interactive confirmation and line input from the user.
#[cfg_attr(test, automock)]
pub trait Prompter {
    /// Ask a yes/no question; anything other than the accept key declines.
    fn confirm(&self, message: &str) -> Result<bool>;

    /// Print `prompt` and read one line of input.
    fn read_line(&self, prompt: &str) -> Result<String>;
}

// -----------------------------------------------------------------------------
// StdinPrompter

/// Real implementation reading from the terminal. Waits are unbounded; a
/// stalled terminal simply blocks.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&self, message: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{message} [y/N] "))?;
        Ok(matches!(answer.trim(), "y" | "Y"))
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        use std::io::Write;

        print!("{prompt}");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim_end().to_string())
    }
}
