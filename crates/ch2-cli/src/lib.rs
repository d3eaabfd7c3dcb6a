//! ch2 CLI library.
//!
//! This crate provides the command-line interface to the statistics engine.

mod cli;
pub mod commands;
mod config;
pub mod decode;

pub use cli::{Cli, Commands, DiaryArgs, MeasureArgs};
pub use config::Config;
