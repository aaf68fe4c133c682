//! On-disk request/response log for diagnosing markup drift

use crate::transport::RawResponse;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One timestamped request/response pair, written only when a log directory is configured
///
/// Files are named `<seq>-<yyyymmddThhmmss.ffffffZ>-<purpose>.txt` so that a
/// plain directory listing is chronological. The request body is never
/// written, so login credentials stay out of the log.
#[derive(Debug)]
pub(crate) struct LogEntry<'a> {
    /// Client time when the request was started
    pub time: DateTime<Utc>,
    /// Request sequence number within the session
    pub seq: u32,
    /// The response as returned by the transport
    pub response: &'a RawResponse,
    /// The type of page the request expected
    pub purpose: &'static str,
    /// Drop the query string from the logged URL (a `GET` form carries its fields there)
    pub redact_query: bool,
}

impl LogEntry<'_> {
    /// File name this entry is stored under
    pub fn file_name(&self) -> String {
        format!(
            "{:04}-{}-{}.txt",
            self.seq,
            self.time.format("%Y%m%dT%H%M%S%.6fZ"),
            self.purpose
        )
    }

    /// Render the entry as it appears on disk
    pub fn render(&self) -> String {
        let response = self.response;
        let mut out = String::new();

        let _ = writeln!(out, "{}", self.time.to_rfc3339_opts(SecondsFormat::Micros, true));
        let _ = writeln!(
            out,
            "{} {}",
            response.method,
            loggable_url(&response.request_url, self.redact_query)
        );
        if response.url != response.request_url {
            let _ = writeln!(
                out,
                "Redirected to {}",
                loggable_url(&response.url, self.redact_query)
            );
        }
        let _ = writeln!(
            out,
            "{} {}",
            response.status.as_u16(),
            response.status.canonical_reason().unwrap_or("")
        );
        out.push('\n');
        for (name, value) in &response.headers {
            let _ = writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
        }
        out.push('\n');
        out.push_str(&response.body);
        out
    }

    /// Write the entry into `dir`, returning the path written
    pub fn write(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(self.file_name());
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

/// `url` as it may appear in logs; a `GET` form carries its fields in the query
pub(crate) fn loggable_url(url: &Url, redact_query: bool) -> Url {
    let mut url = url.clone();
    if redact_query {
        url.set_query(None);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::{Method, StatusCode};
    use tempfile::TempDir;

    fn response() -> RawResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/html; charset=utf-8"));
        let url = Url::parse("http://example.com/RosterOnProd/Mobile/Account/Login").unwrap();
        RawResponse {
            method: Method::GET,
            request_url: url.clone(),
            url,
            status: StatusCode::OK,
            headers,
            body: "<!DOCTYPE html>\n<html></html>".to_string(),
        }
    }

    #[test]
    fn test_file_name_sorts_by_sequence() {
        let response = response();
        let time = Utc.with_ymd_and_hms(2019, 6, 10, 4, 28, 37).unwrap();
        let entry = LogEntry {
            time,
            seq: 7,
            response: &response,
            purpose: "login",
            redact_query: false,
        };

        assert_eq!(entry.file_name(), "0007-20190610T042837.000000Z-login.txt");
    }

    #[test]
    fn test_render_layout() {
        let response = response();
        let entry = LogEntry {
            time: Utc::now(),
            seq: 1,
            response: &response,
            purpose: "login",
            redact_query: false,
        };
        let rendered = entry.render();
        let mut lines = rendered.lines();

        assert!(DateTime::parse_from_rfc3339(lines.next().unwrap()).is_ok());
        assert_eq!(
            lines.next().unwrap(),
            "GET http://example.com/RosterOnProd/Mobile/Account/Login"
        );
        assert_eq!(lines.next().unwrap(), "200 OK");
        assert_eq!(lines.next().unwrap(), "");
        assert_eq!(lines.next().unwrap(), "content-type: text/html; charset=utf-8");
        assert!(rendered.ends_with(&response.body));
    }

    #[test]
    fn test_render_redacts_form_query() {
        let mut response = response();
        response.request_url =
            Url::parse("http://example.com/Account/Login?UserName=joe&Password=abc123").unwrap();
        response.url = response.request_url.clone();
        let entry = LogEntry {
            time: Utc::now(),
            seq: 2,
            response: &response,
            purpose: "home",
            redact_query: true,
        };

        let rendered = entry.render();
        assert!(rendered.contains("GET http://example.com/Account/Login\n"));
        assert!(!rendered.contains("abc123"));
    }

    #[test]
    fn test_render_shows_redirect_target() {
        let mut response = response();
        response.method = Method::POST;
        response.url = Url::parse("http://example.com/RosterOnProd/Mobile/Home/Index?x=1").unwrap();
        let entry = LogEntry {
            time: Utc::now(),
            seq: 2,
            response: &response,
            purpose: "home",
            redact_query: false,
        };
        let rendered = entry.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(
            lines[1],
            "POST http://example.com/RosterOnProd/Mobile/Account/Login"
        );
        assert_eq!(
            lines[2],
            "Redirected to http://example.com/RosterOnProd/Mobile/Home/Index?x=1"
        );
        assert_eq!(lines[3], "200 OK");
    }

    #[test]
    fn test_loggable_url_redaction() {
        let url = Url::parse("http://example.com/Account/Login?Password=abc123").unwrap();

        assert_eq!(loggable_url(&url, false), url);
        assert_eq!(
            loggable_url(&url, true).as_str(),
            "http://example.com/Account/Login"
        );
    }

    #[test]
    fn test_write_creates_file() {
        let temp = TempDir::new().unwrap();
        let response = response();
        let entry = LogEntry {
            time: Utc::now(),
            seq: 3,
            response: &response,
            purpose: "roster",
            redact_query: false,
        };

        let path = entry.write(temp.path()).unwrap();

        assert!(path.starts_with(temp.path()));
        assert!(fs::read_to_string(&path).unwrap().ends_with(&response.body));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let response = response();
        let entry = LogEntry {
            time: Utc::now(),
            seq: 1,
            response: &response,
            purpose: "login",
            redact_query: false,
        };

        assert!(entry.write(&temp.path().join("missing")).is_err());
    }
}
