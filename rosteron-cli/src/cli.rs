//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// RosterOn Mobile roster reader
#[derive(Parser, Debug)]
#[command(name = "rosteron", about = "Print your RosterOn Mobile roster", version)]
pub struct Args {
    /// Base URL of the RosterOn Mobile instance
    /// (e.g. https://rosteron.xyz.com.au/RosterOnProd/Mobile)
    #[arg(long, env = "ROSTERON_URL")]
    pub url: String,

    /// User name to log in with (prompted for if omitted)
    #[arg(short, long, env = "ROSTERON_USERNAME")]
    pub username: Option<String>,

    /// Directory to write request/response logs to
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Request timeout (e.g. "30s", "1m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Only print the first N roster items
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Quiet mode - only output roster items
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_args() {
        let args = Args::try_parse_from([
            "rosteron",
            "--url",
            "https://rosteron.example.com/RosterOnProd/Mobile",
            "-u",
            "joe.bloggs",
            "--log-dir",
            "/tmp/rosteron",
            "--timeout",
            "1m 30s",
            "-n",
            "5",
            "-q",
        ])
        .unwrap();

        assert_eq!(args.url, "https://rosteron.example.com/RosterOnProd/Mobile");
        assert_eq!(args.username.as_deref(), Some("joe.bloggs"));
        assert_eq!(args.log_dir, Some(PathBuf::from("/tmp/rosteron")));
        assert_eq!(args.timeout, Some(Duration::from_secs(90)));
        assert_eq!(args.limit, Some(5));
        assert!(args.quiet);
    }

    #[test]
    fn test_rejects_bad_timeout() {
        let result = Args::try_parse_from([
            "rosteron",
            "--url",
            "https://rosteron.example.com/",
            "--timeout",
            "soon",
        ]);
        assert!(result.is_err());
    }
}
