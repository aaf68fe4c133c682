//! Single-page navigation: request, optional debug log, shape validation

use crate::debug_log::{LogEntry, loggable_url};
use crate::error::RosterError;
use crate::transport::{HttpTransport, RawResponse};
use chrono::{DateTime, Utc};
use log::{debug, error};
use reqwest::header::DATE;
use reqwest::{Method, Url};
use scraper::{ElementRef, Html, Selector};
use std::cell::OnceCell;
use std::io;
use std::path::{Path, PathBuf};

/// A semi-evaluated RosterOn page
///
/// Every interesting RosterOn Mobile page keeps its content in the same
/// jQuery Mobile skeleton:
///
/// ```html
/// <div data-role="page" id="account-login">
///     <div data-role="content">
///         <!-- content of interest -->
///     </div>
/// </div>
/// ```
///
/// The page `id` says cheaply and reliably what kind of page came back;
/// the content container is kept as an owned fragment for further parsing.
#[derive(Debug)]
pub(crate) struct ResponseEnvelope {
    /// Client time when the request was started
    pub time: DateTime<Utc>,
    /// Zero-padded request sequence number
    pub id: String,
    /// The `id` attribute of the `data-role="page"` element
    pub page_id: String,
    /// The server's `Date` header, when present and well-formed
    pub server_time: Option<DateTime<Utc>>,
    /// Final URL of the page, used to resolve relative form actions
    pub url: Url,
    content: Html,
}

impl ResponseEnvelope {
    /// Root of the content fragment; selecting from it covers the whole container
    pub fn content(&self) -> ElementRef<'_> {
        self.content.root_element()
    }
}

/// Cached selectors for the page skeleton
#[derive(Debug, Default)]
pub(crate) struct PageShape {
    page: OnceCell<Selector>,
    content: OnceCell<Selector>,
}

impl PageShape {
    fn page(&self) -> &Selector {
        self.page
            .get_or_init(|| Selector::parse(r#"[data-role="page"]"#).unwrap())
    }

    fn content(&self) -> &Selector {
        self.content
            .get_or_init(|| Selector::parse(r#"[data-role="content"]"#).unwrap())
    }

    /// Validate a raw response and wrap its content into an envelope
    pub fn envelope(
        &self,
        response: &RawResponse,
        time: DateTime<Utc>,
        seq: u32,
        purpose: &'static str,
    ) -> Result<ResponseEnvelope, RosterError> {
        if !response.status.is_success() {
            return Err(RosterError::bad_response(
                purpose,
                format!("HTTP status {}", response.status),
            ));
        }

        let document = Html::parse_document(&response.body);
        let page = document
            .select(self.page())
            .next()
            .ok_or_else(|| RosterError::bad_response(purpose, "no page container"))?;
        let page_id = page
            .value()
            .attr("id")
            .ok_or_else(|| RosterError::bad_response(purpose, "page container has no id"))?;
        let content = page
            .select(self.content())
            .next()
            .ok_or_else(|| RosterError::bad_response(purpose, "no content container"))?;

        let server_time = response
            .headers
            .get(DATE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(ResponseEnvelope {
            time,
            id: format!("{:04}", seq),
            page_id: page_id.to_string(),
            server_time,
            url: response.url.clone(),
            content: Html::parse_fragment(&content.html()),
        })
    }
}

/// Issues navigations against one RosterOn instance
///
/// Owns the cookie-bearing transport and the request counter. No retries are
/// made here: a failed login must not be silently repeated against a real
/// account.
#[derive(Debug)]
pub(crate) struct Browser {
    transport: HttpTransport,
    base_url: Url,
    log_dir: Option<PathBuf>,
    counter: u32,
    log_failures: u32,
    shape: PageShape,
}

impl Browser {
    pub fn new(transport: HttpTransport, base_url: Url, log_dir: Option<PathBuf>) -> Self {
        Self {
            transport,
            base_url,
            log_dir,
            counter: 0,
            log_failures: 0,
            shape: PageShape::default(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Number of requests issued so far
    pub fn requests(&self) -> u32 {
        self.counter
    }

    /// Number of debug log entries that could not be written
    pub fn log_failures(&self) -> u32 {
        self.log_failures
    }

    /// Resolve a path relative to the instance's base URL
    pub fn url_for(&self, path: &str, purpose: &'static str) -> Result<Url, RosterError> {
        self.base_url
            .join(path)
            .map_err(|e| RosterError::bad_response(purpose, format!("invalid URL {:?}: {}", path, e)))
    }

    /// Navigate once and return the validated page
    pub fn browse(
        &mut self,
        method: Method,
        url: Url,
        purpose: &'static str,
        form: Option<&[(String, String)]>,
    ) -> Result<ResponseEnvelope, RosterError> {
        let time = Utc::now();
        self.counter += 1;
        let seq = self.counter;

        let redact_query = form.is_some() && method == Method::GET;
        debug!(
            "#{} {} {} (expecting {})",
            seq,
            method,
            loggable_url(&url, redact_query),
            purpose
        );
        let response = self.transport.request(method, url, form)?;
        debug!(
            "#{} {} {}",
            seq,
            response.status,
            loggable_url(&response.url, redact_query)
        );

        let entry = LogEntry {
            time,
            seq,
            response: &response,
            purpose,
            redact_query,
        };
        match self.record(&entry) {
            Ok(Some(path)) => debug!("Logged response to {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                self.log_failures += 1;
                let dir = self.log_dir.as_deref().unwrap_or(Path::new(""));
                error!(
                    "Failed to write debug log {}: {}",
                    dir.join(entry.file_name()).display(),
                    e
                );
            }
        }

        let envelope = self.shape.envelope(&response, time, seq, purpose)?;
        debug!("#{} is page {:?}", envelope.id, envelope.page_id);
        Ok(envelope)
    }

    /// Write `entry` if a log directory is configured, returning the path written
    fn record(&self, entry: &LogEntry<'_>) -> io::Result<Option<PathBuf>> {
        match &self.log_dir {
            Some(dir) => entry.write(dir).map(Some),
            None => Ok(None),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{page, raw};
    use super::*;
    use reqwest::StatusCode;
    use reqwest::header::HeaderValue;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_envelope_extracts_page_id_and_content() {
        let body = page("home-index", "<p class=\"greeting\">Welcome</p>");
        let envelope = PageShape::default()
            .envelope(&raw(StatusCode::OK, &body), Utc::now(), 12, "home")
            .unwrap();

        assert_eq!(envelope.page_id, "home-index");
        assert_eq!(envelope.id, "0012");
        let greeting = Selector::parse(".greeting").unwrap();
        let text: String = envelope
            .content()
            .select(&greeting)
            .next()
            .unwrap()
            .text()
            .collect();
        assert_eq!(text, "Welcome");
    }

    #[test]
    fn test_content_excludes_rest_of_page() {
        let body = page("home-index", "<p>inside</p>");
        let envelope = super::fixtures::envelope(&body);

        let h1 = Selector::parse("h1").unwrap();
        assert!(envelope.content().select(&h1).next().is_none());
    }

    #[test]
    fn test_envelope_reads_server_date() {
        let mut response = raw(StatusCode::OK, &page("home-index", ""));
        response.headers.insert(
            DATE,
            HeaderValue::from_static("Mon, 10 Jun 2019 04:28:38 GMT"),
        );
        let envelope = PageShape::default()
            .envelope(&response, Utc::now(), 1, "home")
            .unwrap();

        assert_eq!(
            envelope.server_time.unwrap().to_rfc3339(),
            "2019-06-10T04:28:38+00:00"
        );
    }

    #[test]
    fn test_envelope_rejects_error_status() {
        let body = page("home-index", "");
        let result =
            PageShape::default().envelope(&raw(StatusCode::BAD_GATEWAY, &body), Utc::now(), 1, "home");

        assert!(matches!(
            result,
            Err(RosterError::BadResponse { purpose: "home", .. })
        ));
    }

    #[test]
    fn test_envelope_rejects_missing_containers() {
        let shape = PageShape::default();
        let cases = [
            "<html><body><h1>Server Error in '/' Application.</h1></body></html>",
            r#"<html><body><div data-role="page"><div data-role="content"></div></div></body></html>"#,
            r#"<html><body><div data-role="page" id="home-index"></div></body></html>"#,
            "",
        ];

        for body in cases {
            let result = shape.envelope(&raw(StatusCode::OK, body), Utc::now(), 1, "roster");
            assert!(
                matches!(result, Err(RosterError::BadResponse { purpose: "roster", .. })),
                "expected BadResponse for {:?}",
                body
            );
        }
    }

    fn browser(server: &mockito::Server, log_dir: Option<PathBuf>) -> Browser {
        let transport = HttpTransport::new(
            reqwest::blocking::Client::builder().use_rustls_tls(),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let base_url = Url::parse(&format!("{}/RosterOnProd/Mobile/", server.url())).unwrap();
        Browser::new(transport, base_url, log_dir)
    }

    #[test]
    fn test_browse_counts_requests_and_resolves_paths() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/RosterOnProd/Mobile/Account/Login")
            .with_status(200)
            .with_body(page("account-login", "<form></form>"))
            .expect(2)
            .create();

        let mut browser = browser(&server, None);
        let url = browser.url_for("Account/Login", "login").unwrap();
        browser.browse(Method::GET, url.clone(), "login", None).unwrap();
        let envelope = browser.browse(Method::GET, url, "login", None).unwrap();

        assert_eq!(browser.requests(), 2);
        assert_eq!(envelope.id, "0002");
        assert_eq!(envelope.page_id, "account-login");
        mock.assert();
    }

    #[test]
    fn test_browse_writes_debug_log() {
        let mut server = mockito::Server::new();
        let body = page("account-login", "");
        let _mock = server
            .mock("GET", "/RosterOnProd/Mobile/Account/Login")
            .with_status(200)
            .with_body(&body)
            .create();

        let temp = TempDir::new().unwrap();
        let mut browser = browser(&server, Some(temp.path().to_path_buf()));
        let url = browser.url_for("Account/Login", "login").unwrap();
        browser.browse(Method::GET, url, "login", None).unwrap();

        let files: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("0001-"));
        assert!(name.ends_with("Z-login.txt"));
        assert!(std::fs::read_to_string(&files[0]).unwrap().ends_with(&body));
    }

    #[test]
    fn test_browse_survives_unwritable_log_dir() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/RosterOnProd/Mobile/Account/Login")
            .with_status(200)
            .with_body(page("account-login", ""))
            .create();

        let temp = TempDir::new().unwrap();
        let mut browser = browser(&server, Some(temp.path().join("does-not-exist")));
        let url = browser.url_for("Account/Login", "login").unwrap();

        assert!(browser.browse(Method::GET, url.clone(), "login", None).is_ok());
        assert_eq!(browser.log_failures(), 1);
        assert!(browser.browse(Method::GET, url, "login", None).is_ok());
        assert_eq!(browser.log_failures(), 2);
    }

    #[test]
    fn test_record_reports_write_errors() {
        let response = raw(StatusCode::OK, "");
        let entry = LogEntry {
            time: Utc::now(),
            seq: 1,
            response: &response,
            purpose: "login",
            redact_query: false,
        };
        let server = mockito::Server::new();
        let temp = TempDir::new().unwrap();

        let missing = browser(&server, Some(temp.path().join("missing")));
        assert!(missing.record(&entry).is_err());

        let unlogged = browser(&server, None);
        assert!(matches!(unlogged.record(&entry), Ok(None)));

        let logged = browser(&server, Some(temp.path().to_path_buf()));
        let path = logged.record(&entry).unwrap().unwrap();
        assert!(path.is_file());
        assert_eq!(logged.log_failures(), 0);
    }

    #[test]
    fn test_browse_logs_even_bad_responses() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/RosterOnProd/Mobile/Roster/List")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("<html><body>Server Error</body></html>")
            .create();

        let temp = TempDir::new().unwrap();
        let mut browser = browser(&server, Some(temp.path().to_path_buf()));
        let url = browser.url_for("Roster/List?pageNo=1&row=1", "roster").unwrap();
        let result = browser.browse(Method::GET, url, "roster", None);

        assert!(matches!(result, Err(RosterError::BadResponse { .. })));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
