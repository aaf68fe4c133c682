//! Error types for the CLI

use thiserror::Error;

/// Main CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Roster session error
    #[error("{0}")]
    Roster(#[from] rosteron::RosterError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code: 2 for rejected credentials, 1 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Roster(rosteron::RosterError::BadCredentials { .. }) => 2,
            _ => 1,
        }
    }
}
