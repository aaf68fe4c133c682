//! Error types for RosterOn sessions

use thiserror::Error;

/// Errors that can occur while talking to a RosterOn Mobile instance
#[derive(Error, Debug)]
pub enum RosterError {
    /// RosterOn rejected the supplied username and password
    #[error("RosterOn rejected the login credentials for username {username:?}")]
    BadCredentials {
        /// The username that was rejected
        username: String,
    },

    /// An operation requiring an authenticated session was attempted while logged out
    #[error("a RosterOn user must successfully log in before a roster can be retrieved")]
    NotLoggedIn,

    /// `log_in` was called on a session that is already logged in
    #[error("a RosterOn user is already logged in on this session")]
    AlreadyLoggedIn,

    /// RosterOn returned content that doesn't match what the operation expects
    #[error("RosterOn returned an unexpected response for an operation expecting {purpose:?}: {reason}")]
    BadResponse {
        /// The type of page the operation expected (`login`, `home`, `roster`, `logout`)
        purpose: &'static str,
        /// What was wrong with the response
        reason: String,
    },

    /// HTTP request failed at the transport level (connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Session initialization failed
    #[error("Session initialization failed: {0}")]
    ClientInit(String),
}

impl RosterError {
    pub(crate) fn bad_response(purpose: &'static str, reason: impl Into<String>) -> Self {
        RosterError::BadResponse {
            purpose,
            reason: reason.into(),
        }
    }
}
