pub mod ops;

mod app;
pub mod cancel;
pub mod candidate;
pub mod changelog;
pub mod cherry_pick;
pub mod commands;
pub mod config;
pub mod reconcile;
pub mod version;

// Re-export App and Config from modules
pub use app::App;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
