//! RosterOn session: configuration, authentication state and roster retrieval

use crate::auth::{AuthState, Authenticator};
use crate::browser::Browser;
use crate::error::RosterError;
use crate::roster::{RosterParser, Snapshot};
use crate::transport::HttpTransport;
use log::{info, warn};
use reqwest::{Method, Url};
use std::path::PathBuf;
use std::time::Duration;

const ROSTER_PATH: &str = "Roster/List?pageNo=1&row=1";

/// A connection to one RosterOn Mobile instance
///
/// A `Session` logs in, retrieves roster [`Snapshot`]s and logs out. Cookies
/// persist between requests, so a successful [`log_in`](Session::log_in)
/// authenticates every later request on the same session.
///
/// Sessions are single-threaded: every method takes `&mut self` and blocks
/// until the server has answered.
///
/// # Example
///
/// ```no_run
/// use rosteron::Session;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::new("https://rosteron.xyz.com.au/RosterOnProd/Mobile")?;
/// let snapshot = session.scoped(|session| {
///     session.log_in("joe.bloggs", "abc123")?;
///     session.get_roster()
/// })?;
///
/// println!("{}", snapshot);
/// for item in &snapshot[..3] {
///     println!("{}", item);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    browser: Browser,
    auth: Authenticator,
    parser: RosterParser,
}

impl Session {
    /// Create a session for the given base URL with default settings
    ///
    /// The base URL is the part of the Mobile "Log In" page URL before
    /// `/Account/Login`, e.g. `https://rosteron.example.com.au/RosterOnProd/Mobile`.
    pub fn new(base_url: impl reqwest::IntoUrl) -> Result<Self, RosterError> {
        Self::builder().base_url(base_url)?.build()
    }

    /// Create a builder for configuring a session
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The base URL every RosterOn path is resolved against
    pub fn base_url(&self) -> &Url {
        self.browser.base_url()
    }

    /// Current authentication state
    pub fn state(&self) -> AuthState {
        self.auth.state()
    }

    /// Whether a user is logged in
    pub fn is_logged_in(&self) -> bool {
        self.state() == AuthState::LoggedIn
    }

    /// Number of HTTP requests this session has made
    pub fn requests(&self) -> u32 {
        self.browser.requests()
    }

    /// Number of debug log entries that could not be written
    ///
    /// Each failure is also reported through the `log` facade at error level.
    pub fn log_failures(&self) -> u32 {
        self.browser.log_failures()
    }

    /// Log in with the given credentials
    ///
    /// # Errors
    ///
    /// * `RosterError::AlreadyLoggedIn` - the session is already logged in (no request is made)
    /// * `RosterError::BadCredentials` - RosterOn rejected the username/password
    /// * `RosterError::BadResponse` - RosterOn returned a page this crate doesn't recognise
    /// * `RosterError::Transport` - network, TLS or timeout failure
    pub fn log_in(&mut self, username: &str, password: &str) -> Result<(), RosterError> {
        self.auth.log_in(&mut self.browser, username, password)
    }

    /// Retrieve a snapshot of the logged-in user's roster
    ///
    /// Every call fetches and parses the roster afresh.
    ///
    /// # Errors
    ///
    /// * `RosterError::NotLoggedIn` - no user is logged in (no request is made), or
    ///   RosterOn answered with its login page because the server-side session ended
    /// * `RosterError::BadResponse` - the roster page couldn't be read in full
    /// * `RosterError::Transport` - network, TLS or timeout failure
    pub fn get_roster(&mut self) -> Result<Snapshot, RosterError> {
        if !self.is_logged_in() {
            return Err(RosterError::NotLoggedIn);
        }

        let url = self.browser.url_for(ROSTER_PATH, "roster")?;
        let page = self.browser.browse(Method::GET, url, "roster", None)?;
        if self.auth.is_login_page(&page) {
            self.auth.expire();
            return Err(RosterError::NotLoggedIn);
        }

        let snapshot = self.parser.parse(&page)?;
        info!("Retrieved roster with {} item(s)", snapshot.len());
        Ok(snapshot)
    }

    /// Log out if a user is logged in; otherwise do nothing
    ///
    /// The session is `LoggedOut` afterwards even when the logout request
    /// fails; that failure is still returned.
    pub fn log_out(&mut self) -> Result<(), RosterError> {
        self.auth.log_out(&mut self.browser)
    }

    /// Run `body` with this session, then log out exactly once
    ///
    /// The logout happens on every exit path, including an early `Err` and a
    /// panic inside `body`. When `body` fails, a logout failure is only
    /// logged and the body's error is returned; when `body` succeeds, a
    /// logout failure is returned instead of the value.
    pub fn scoped<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<RosterError>,
    {
        let mut guard = LogoutGuard {
            session: self,
            armed: true,
        };
        let result = body(&mut *guard.session);
        guard.armed = false;
        let logout = guard.session.log_out();

        match (result, logout) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(logout)) => {
                warn!("Logout after a failed session scope also failed: {}", logout);
                Err(e)
            }
        }
    }
}

/// Logs the session out if dropped while armed (i.e. while unwinding)
struct LogoutGuard<'a> {
    session: &'a mut Session,
    armed: bool,
}

impl Drop for LogoutGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.session.log_out()
        {
            warn!("Logout while unwinding a session scope failed: {}", e);
        }
    }
}

/// Builder for configuring a [`Session`]
///
/// # Example
///
/// ```no_run
/// use rosteron::Session;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::builder()
///     .base_url("https://rosteron.xyz.com.au/RosterOnProd/Mobile")?
///     .timeout(Duration::from_secs(10))
///     .log_dir("/tmp/rosteron")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    base_url: Option<Url>,
    log_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    client_builder: Option<reqwest::blocking::ClientBuilder>,
}

impl SessionBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL of the RosterOn Mobile instance
    ///
    /// The URL is validated here. A trailing slash is added if missing so
    /// relative paths resolve beneath it, and any query or fragment is dropped.
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, RosterError> {
        let mut url = url
            .into_url()
            .map_err(|e| RosterError::ClientInit(format!("invalid base URL: {}", e)))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        self.base_url = Some(url);
        Ok(self)
    }

    /// Write every request/response pair into `dir` for offline diagnosis
    ///
    /// The directory must already exist. Failures to write are logged and
    /// don't affect the session.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Per-request timeout; a timed-out request fails with `RosterError::Transport`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a custom HTTP client builder (proxies, TLS settings, user agent)
    ///
    /// The cookie store is always enabled on top of the provided configuration.
    pub fn client_builder(mut self, builder: reqwest::blocking::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Build the session
    ///
    /// # Errors
    ///
    /// Returns `RosterError::ClientInit` if no base URL was given or the HTTP
    /// client cannot be initialized.
    pub fn build(self) -> Result<Session, RosterError> {
        let base_url = self
            .base_url
            .ok_or_else(|| RosterError::ClientInit("a base URL is required".to_string()))?;

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::blocking::Client::builder().use_rustls_tls());
        let transport = HttpTransport::new(builder, self.timeout)?;

        Ok(Session {
            browser: Browser::new(transport, base_url, self.log_dir),
            auth: Authenticator::new(),
            parser: RosterParser::new(),
        })
    }
}
