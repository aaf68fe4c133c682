//! Configuration resolution from CLI args

use crate::cli::Args;
use crate::error::CliError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Resolved runtime configuration
pub struct Config {
    /// Base URL of the RosterOn Mobile instance
    pub url: String,
    /// User name to log in with
    pub username: String,
    /// Password (zeroized on drop)
    pub password: Zeroizing<String>,
    /// Debug log directory, created if missing
    pub log_dir: Option<PathBuf>,
    /// Request timeout
    pub timeout: Option<Duration>,
    /// Maximum number of items to print
    pub limit: Option<usize>,
    /// Quiet mode
    pub quiet: bool,
}

impl Config {
    /// Build config from CLI args, prompting for anything the environment lacks
    pub fn from_args(args: Args) -> Result<Self, CliError> {
        let log_dir = args.log_dir.as_deref().map(prepare_log_dir).transpose()?;

        let username = match args.username {
            Some(username) => username,
            None => prompt_username()?,
        };
        let password = resolve_password(std::env::var("ROSTERON_PASSWORD").ok())?;

        Ok(Config {
            url: args.url,
            username,
            password,
            log_dir,
            timeout: args.timeout,
            limit: args.limit,
            quiet: args.quiet,
        })
    }
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str()
        && (path_str.starts_with("~/") || path_str == "~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path_str.get(2..).unwrap_or(""));
    }
    path.to_path_buf()
}

/// Expand and create the debug log directory
fn prepare_log_dir(dir: &Path) -> Result<PathBuf, CliError> {
    let dir = expand_tilde(dir);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Prompt user for their RosterOn user name
fn prompt_username() -> Result<String, CliError> {
    use std::io::Write;
    print!("User name: ");
    std::io::stdout().flush().ok();

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| CliError::Config(format!("Failed to read user name: {}", e)))?;

    let username = input.trim();
    if username.is_empty() {
        return Err(CliError::Config("User name is required.".to_string()));
    }
    Ok(username.to_string())
}

/// Use the password from the environment, prompting without echo otherwise
fn resolve_password(env_password: Option<String>) -> Result<Zeroizing<String>, CliError> {
    let password = match env_password {
        Some(p) => Zeroizing::new(p),
        None => Zeroizing::new(
            rpassword::prompt_password("Password: ")
                .map_err(|e| CliError::Config(format!("Failed to read password: {}", e)))?,
        ),
    };
    if password.is_empty() {
        return Err(CliError::Config("Password is required.".to_string()));
    }
    Ok(password)
}
