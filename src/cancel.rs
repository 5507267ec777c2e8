use std::fmt;

/// Marker error for a deliberate user abort.
///
/// `main` maps this to exit code 2 so scripts can tell "the user said no"
/// apart from an actual failure.
#[derive(Debug, Clone, Copy)]
pub struct UserCancelled;

impl fmt::Display for UserCancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled by user")
    }
}

impl std::error::Error for UserCancelled {}
