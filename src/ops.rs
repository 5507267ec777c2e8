//! Operations modules for interacting with external collaborators.
//!
//! This module contains the integration layers for the systems that
//! `backport` coordinates:
//!
//! - [`git`]: Local repository operations (cherry-picking, history and tag
//!   queries, identity lookup)
//! - [`github`]: Merged-PR catalog and label mutations via the GitHub
//!   GraphQL API
//! - [`curl`]: Curl-based HTTP client carrying the GraphQL requests
//! - [`prompt`]: Interactive confirmation at the terminal
//!
//! Each submodule provides trait-based abstractions with real and mock
//! implementations to support both production use and testing.

pub mod curl;
pub mod git;
pub mod github;
pub mod prompt;
