//! CLI subcommand implementations.

pub mod diary;
pub mod import;
pub mod measure;
pub mod scan;
pub mod show;
pub mod status;
