/// Run configuration handed in by the CLI layer.
///
/// Labels left unset are derived from the current release branch name.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Explicit override for the backport-candidate label.
    pub candidates_label: Option<String>,
    /// Explicit override for the backported label.
    pub backported_label: Option<String>,
}

impl Config {
    pub fn new(candidates_label: Option<String>, backported_label: Option<String>) -> Self {
        Self {
            candidates_label,
            backported_label,
        }
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self::default()
    }
}
