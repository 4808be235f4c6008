use clap::Parser;
use color_eyre::Result;
use gtdesk::cli::{Cli, Commands, Session};
use gtdesk::{Config, Database, Profile, Store, SystemClock};
use std::env;
use std::io;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let profile = Profile::from_dev_flag(cli.dev);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_with_profile(profile)?,
    };

    let db_path = config.get_database_path();
    let db = Database::new(&db_path)?;
    let mut store = Store::restore(db.load_snapshot()?, SystemClock);
    debug!(?store, path = %db_path.display(), "store loaded");

    let stdout = io::stdout();
    let stdin = io::stdin();
    let mut out = stdout.lock();
    let mut input = stdin.lock();
    let mut session = Session {
        store: &mut store,
        db: &db,
        config: &config,
        out: &mut out,
        input: &mut input,
        assume_yes: cli.yes,
    };
    let changed = session.run(cli.command.unwrap_or(Commands::Dashboard))?;

    if changed {
        db.save_snapshot(&store.snapshot())?;
    }
    Ok(())
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GTD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "gtdesk=debug,info"
        } else {
            "gtdesk=info,warn"
        })
    });

    let format = env::var("GTD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false).with_writer(io::stderr)).init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(io::stderr)).init();
        }
    }
}
