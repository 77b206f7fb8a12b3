//! Authenticated HTTP transport against the configuration server.
//!
//! Every request is `<base_url><path>` with a `flow-token` header and a JSON
//! content type. Status codes are never interpreted here: a 404 or 500 comes
//! back as a [`RawResponse`] just like a 200. Only failures that produce no
//! response at all (DNS, refused connection, TLS) become errors.

use pathisync_core::{config::normalize_base_url, Settings};

use crate::error::{io_err, SyncError};

pub const TOKEN_HEADER: &str = "flow-token";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// Per-request overrides. Headers here replace defaults of the same name.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: String) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::Delete,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking HTTP client bound to one server and credential.
#[derive(Clone)]
pub struct Transport {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl Transport {
    /// Build a transport from already-validated settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: settings.server_url.clone(),
            token: settings.token.clone(),
        }
    }

    /// Build a transport from raw strings, validating the base URL.
    pub fn from_parts(base_url: &str, token: &str) -> Result<Self, SyncError> {
        Ok(Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: normalize_base_url(base_url)?,
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a server-relative `path`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one request and return whatever the server answered.
    pub fn request(&self, path: &str, options: RequestOptions) -> Result<RawResponse, SyncError> {
        let url = self.url_for(path);
        let mut request = self.agent.request(options.method.as_str(), &url);
        for (name, value) in self.headers_for(&options) {
            request = request.set(&name, &value);
        }

        tracing::debug!(method = options.method.as_str(), %url, "remote request");
        let result = match options.body.as_deref() {
            Some(body) => request.send_string(body),
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(SyncError::Transport {
                    url,
                    message: err.to_string(),
                })
            }
        };

        let status = response.status();
        let body = response.into_string().map_err(|e| io_err(&url, e))?;
        Ok(RawResponse { status, body })
    }

    fn headers_for(&self, options: &RequestOptions) -> Vec<(String, String)> {
        let mut headers = vec![
            (CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string()),
            (TOKEN_HEADER.to_string(), self.token.clone()),
        ];
        for (name, value) in &options.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }
}
