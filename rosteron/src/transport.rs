//! Blocking HTTP transport with a persistent cookie store

use crate::error::RosterError;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;

/// A response exactly as the server returned it, before any interpretation
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Method of the request that produced this response
    pub method: Method,
    /// URL the request was sent to
    pub request_url: Url,
    /// Final URL, after any redirects were followed
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded response body
    pub body: String,
}

/// Thin wrapper over a cookie-bearing `reqwest` client
///
/// Cookies set by the server (notably the ASP.NET auth cookie) are kept
/// between calls, which is what keeps a login alive.
#[derive(Debug)]
pub(crate) struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build the transport from a client builder, forcing the cookie store on
    pub fn new(
        builder: reqwest::blocking::ClientBuilder,
        timeout: Option<Duration>,
    ) -> Result<Self, RosterError> {
        let builder = builder.cookie_store(true);
        let builder = match timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        let client = builder
            .build()
            .map_err(|e| RosterError::ClientInit(e.to_string()))?;
        Ok(Self { client })
    }

    /// Perform one request
    ///
    /// Form fields are sent as the query string for `GET` and as an
    /// urlencoded body otherwise. Network failures are returned as
    /// `RosterError::Transport`; the status code is not checked here.
    pub fn request(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> Result<RawResponse, RosterError> {
        let request_url = url.clone();
        let mut request = self.client.request(method.clone(), url);
        if let Some(form) = form {
            request = if method == Method::GET {
                request.query(form)
            } else {
                request.form(form)
            };
        }

        let response = request.send()?;
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text()?;

        Ok(RawResponse {
            method,
            request_url,
            url,
            status,
            headers,
            body,
        })
    }
}
