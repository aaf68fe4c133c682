//! RosterOn CLI - print the logged-in user's RosterOn Mobile roster

mod cli;
mod config;
mod error;
mod output;

use clap::Parser;
use cli::Args;
use config::Config;
use error::CliError;
use log::info;
use output::OutputFormatter;
use rosteron::Session;

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = Config::from_args(args)?;
    let mut session = build_session(&config)?;

    if !config.quiet {
        println!("Logging in to {} as {}...", session.base_url(), config.username);
    }

    let snapshot = session.scoped(|session| -> Result<_, CliError> {
        session.log_in(&config.username, &config.password)?;
        Ok(session.get_roster()?)
    })?;
    info!(
        "session finished after {} request(s), logged in: {}",
        session.requests(),
        session.is_logged_in()
    );

    OutputFormatter::new(config.quiet, config.limit).print_snapshot(&snapshot);
    Ok(())
}

/// Build a session from resolved config
fn build_session(config: &Config) -> Result<Session, CliError> {
    let mut builder = Session::builder().base_url(config.url.as_str())?;
    if let Some(dir) = &config.log_dir {
        builder = builder.log_dir(dir);
    }
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}
