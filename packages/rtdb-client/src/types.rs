use std::fmt;
use std::time::Duration;

use http::header::{HeaderMap, LOCATION};

/// HTTP methods used against the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    GET,
    PUT,
    PATCH,
    POST,
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::PUT => http::Method::PUT,
            Method::PATCH => http::Method::PATCH,
            Method::POST => http::Method::POST,
            Method::DELETE => http::Method::DELETE,
        }
    }
}

/// One request handed to a transport.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,

    /// Fully rendered URL, query string included.
    pub url: String,

    pub headers: HeaderMap,

    pub body: Option<Vec<u8>>,

    /// Per-request timeout, derived from the caller's deadline.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Build the request that follows a redirect answered with `status`.
    ///
    /// 307 and 308 repeat the method and body; other redirects continue as a
    /// bodiless GET. Every header in `original_headers` is copied over.
    pub(crate) fn redirected(
        &self,
        status: u16,
        url: impl Into<String>,
        original_headers: &HeaderMap,
    ) -> Self {
        let (method, body) = match status {
            307 | 308 => (self.method, self.body.clone()),
            _ => (Method::GET, None),
        };

        let mut headers = self.headers.clone();
        for name in original_headers.keys() {
            headers.remove(name);
            for value in original_headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        Self {
            method,
            url: url.into(),
            headers,
            body,
            timeout: self.timeout,
        }
    }
}

/// A response whose body has been read to the end.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Check if the response status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Redirect statuses the executor follows.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
