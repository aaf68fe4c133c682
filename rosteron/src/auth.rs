//! Login/logout handshake and authentication state

use crate::browser::{Browser, ResponseEnvelope};
use crate::error::RosterError;
use log::{debug, info};
use reqwest::{Method, Url};
use scraper::Selector;
use std::cell::OnceCell;
use zeroize::{Zeroize, Zeroizing};

const LOGIN_PATH: &str = "Account/Login";
const LOGOUT_PATH: &str = "Account/LogOff";
const LOGIN_PAGE_ID: &str = "account-login";
const HOME_PAGE_ID: &str = "home-index";
const BAD_CREDENTIALS_MESSAGE: &str = "Logon failure: unknown user name or bad password.";
const USERNAME_FIELD: &str = "UserName";
const PASSWORD_FIELD: &str = "Password";

/// Submitted form fields; wiped on drop since they carry the password
pub(crate) type FormFields = Zeroizing<Vec<(String, String)>>;

/// Whether the session holds an authenticated RosterOn login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No user is logged in
    #[default]
    LoggedOut,
    /// A user logged in successfully and hasn't logged out
    LoggedIn,
}

/// What a login response says about the submitted credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginOutcome {
    /// The home page (or a logout control) came back
    Success,
    /// The login page came back with the bad-credentials message
    BadCredentials,
    /// Neither marker was found; the site may have changed
    UnrecognizedShape,
}

/// Drives the login/logout pages and owns the authentication state
///
/// The state only changes here: to `LoggedIn` after an unambiguous login,
/// and back to `LoggedOut` on logout or when the server is seen to have
/// dropped the session.
#[derive(Debug, Default)]
pub(crate) struct Authenticator {
    state: AuthState,
    form_selector: OnceCell<Selector>,
    input_selector: OnceCell<Selector>,
    error_selector: OnceCell<Selector>,
    logout_selector: OnceCell<Selector>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    fn form_selector(&self) -> &Selector {
        self.form_selector
            .get_or_init(|| Selector::parse("form").unwrap())
    }

    fn input_selector(&self) -> &Selector {
        self.input_selector
            .get_or_init(|| Selector::parse("input[name]").unwrap())
    }

    fn error_selector(&self) -> &Selector {
        self.error_selector
            .get_or_init(|| Selector::parse(".validation-summary-errors li").unwrap())
    }

    fn logout_selector(&self) -> &Selector {
        self.logout_selector
            .get_or_init(|| Selector::parse(r#"a[href*="Account/LogOff"]"#).unwrap())
    }

    /// Whether RosterOn answered with its login page
    pub fn is_login_page(&self, envelope: &ResponseEnvelope) -> bool {
        envelope.page_id == LOGIN_PAGE_ID
    }

    /// Classify the page returned after submitting credentials
    pub fn classify(&self, envelope: &ResponseEnvelope) -> LoginOutcome {
        let errors: Vec<String> = envelope
            .content()
            .select(self.error_selector())
            .map(|li| li.text().collect::<String>().trim().to_string())
            .collect();
        if errors.len() == 1 && errors[0] == BAD_CREDENTIALS_MESSAGE {
            return LoginOutcome::BadCredentials;
        }

        let has_logout = envelope
            .content()
            .select(self.logout_selector())
            .next()
            .is_some();
        if envelope.page_id == HOME_PAGE_ID || has_logout {
            return LoginOutcome::Success;
        }

        LoginOutcome::UnrecognizedShape
    }

    /// Build the login form submission from the login page
    ///
    /// Every named field keeps the value the page gave it (the anti-forgery
    /// token travels this way); the credential fields are filled in last, once
    /// nothing else can fail.
    pub fn login_form(
        &self,
        envelope: &ResponseEnvelope,
        username: &str,
        password: &str,
    ) -> Result<(Method, Url, FormFields), RosterError> {
        let form = envelope
            .content()
            .select(self.form_selector())
            .next()
            .ok_or_else(|| RosterError::bad_response("login", "login page has no form"))?;

        let action = form.value().attr("action").unwrap_or("");
        let url = envelope.url.join(action).map_err(|e| {
            RosterError::bad_response("login", format!("bad form action {:?}: {}", action, e))
        })?;
        let method = match form.value().attr("method") {
            Some(method) if method.eq_ignore_ascii_case("post") => Method::POST,
            _ => Method::GET,
        };

        let mut fields: FormFields = Zeroizing::new(
            form
                .select(self.input_selector())
                .filter(|input| {
                    let input = input.value();
                    match input.attr("type").map(str::to_ascii_lowercase).as_deref() {
                        Some("submit" | "button" | "image" | "reset") => false,
                        Some("checkbox" | "radio") => input.attr("checked").is_some(),
                        _ => true,
                    }
                })
                .filter_map(|input| {
                    let input = input.value();
                    let name = input.attr("name")?;
                    Some((name.to_string(), input.attr("value").unwrap_or("").to_string()))
                })
                .collect(),
        );

        for (name, value) in [(USERNAME_FIELD, username), (PASSWORD_FIELD, password)] {
            match fields.iter_mut().find(|(field, _)| field == name) {
                Some((_, existing)) => {
                    existing.zeroize();
                    *existing = value.to_string();
                }
                None => fields.push((name.to_string(), value.to_string())),
            }
        }

        Ok((method, url, fields))
    }

    /// Log in with the given credentials
    ///
    /// Fails fast with `AlreadyLoggedIn` instead of silently logging in again.
    /// The state is left `LoggedOut` unless the login unambiguously succeeds.
    pub fn log_in(
        &mut self,
        browser: &mut Browser,
        username: &str,
        password: &str,
    ) -> Result<(), RosterError> {
        if self.state == AuthState::LoggedIn {
            return Err(RosterError::AlreadyLoggedIn);
        }

        let url = browser.url_for(LOGIN_PATH, "login")?;
        let login_page = browser.browse(Method::GET, url, "login", None)?;
        if !self.is_login_page(&login_page) {
            return Err(RosterError::bad_response(
                "login",
                format!("expected page {:?}, got {:?}", LOGIN_PAGE_ID, login_page.page_id),
            ));
        }

        let (method, action, form) = self.login_form(&login_page, username, password)?;
        let home = browser.browse(method, action, "home", Some(form.as_slice()))?;
        drop(form);

        match self.classify(&home) {
            LoginOutcome::Success => {
                self.state = AuthState::LoggedIn;
                info!("Logged in to {} as {}", browser.base_url(), username);
                Ok(())
            }
            LoginOutcome::BadCredentials => Err(RosterError::BadCredentials {
                username: username.to_string(),
            }),
            LoginOutcome::UnrecognizedShape => Err(RosterError::bad_response(
                "home",
                format!("unrecognised post-login page {:?}", home.page_id),
            )),
        }
    }

    /// Log out if logged in; otherwise do nothing
    ///
    /// The local state becomes `LoggedOut` before the logout page is
    /// requested, so a failed round-trip still relinquishes the session
    /// locally. The failure itself is returned.
    pub fn log_out(&mut self, browser: &mut Browser) -> Result<(), RosterError> {
        if self.state == AuthState::LoggedOut {
            debug!("Already logged out");
            return Ok(());
        }
        self.state = AuthState::LoggedOut;
        info!("Logging out of {}", browser.base_url());

        let url = browser.url_for(LOGOUT_PATH, "logout")?;
        browser.browse(Method::GET, url, "logout", None).map(|_| ())
    }

    /// Record that the server no longer considers the session logged in
    pub fn expire(&mut self) {
        if self.state == AuthState::LoggedIn {
            info!("RosterOn session expired on the server");
        }
        self.state = AuthState::LoggedOut;
    }
}
