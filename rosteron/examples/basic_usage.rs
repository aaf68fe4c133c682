//! Basic usage example for rosteron
//!
//! This example demonstrates how to:
//! - Configure a session with a timeout and a debug log directory
//! - Log in, fetch the roster and always log out via `scoped`
//! - Tell bad credentials apart from unexpected pages
//!
//! Note: This example needs a real RosterOn Mobile instance. Set
//! `ROSTERON_URL`, `ROSTERON_USERNAME` and `ROSTERON_PASSWORD` before running.

use rosteron::{RosterError, Session};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::var("ROSTERON_URL").expect("ROSTERON_URL environment variable not set");
    let username =
        std::env::var("ROSTERON_USERNAME").expect("ROSTERON_USERNAME environment variable not set");
    let password =
        std::env::var("ROSTERON_PASSWORD").expect("ROSTERON_PASSWORD environment variable not set");

    let log_dir = std::env::temp_dir().join("rosteron-example");
    std::fs::create_dir_all(&log_dir)?;

    let mut session = Session::builder()
        .base_url(url.as_str())?
        .timeout(Duration::from_secs(30))
        .log_dir(&log_dir)
        .build()?;
    println!("Requests and responses will be logged to {}", log_dir.display());

    let result = session.scoped(|session| {
        session.log_in(&username, &password)?;
        println!("Logged in as {}", username);
        session.get_roster()
    });

    match result {
        Ok(snapshot) => {
            println!("{}", snapshot);
            for item in &snapshot {
                println!("  {}", item);
            }
        }
        Err(RosterError::BadCredentials { username }) => {
            println!("RosterOn rejected the password for {}", username);
        }
        Err(e @ RosterError::BadResponse { .. }) => {
            println!("Unexpected page ({}); see {}", e, log_dir.display());
        }
        Err(e) => return Err(e.into()),
    }

    println!("Logged out: {}", !session.is_logged_in());
    Ok(())
}
