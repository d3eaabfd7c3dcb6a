use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ch2_cli::commands::{diary, import, measure, scan, show, status};
use ch2_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(ch2_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = ch2_db::Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.database_path.display()
        )
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: tests may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();
    match command {
        Commands::Scan { force, paths } => scan::run(&mut stdout, &mut db, paths, *force)?,
        Commands::Import { force, paths } => {
            import::run(&mut stdout, &mut db, &config, paths, *force)?;
        }
        Commands::Diary(args) => diary::run(&mut stdout, &mut db, &config, args)?,
        Commands::Show { date } => show::run(&mut stdout, &db, &config, *date)?,
        Commands::Measure(args) => measure::run(&mut stdout, &mut db, &config, args)?,
        Commands::Status => status::run(&mut stdout, &db, &config)?,
    }

    Ok(())
}
