//! One submodule per CLI subcommand; each extends [`crate::App`] with a
//! `cmd_*` method writing its output to an injected writer.

mod changelog;
mod cherrypick;
mod label;
