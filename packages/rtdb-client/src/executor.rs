//! Request dispatch: redirects, timeouts and outcome classification.

use std::sync::Arc;

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::config::{ClientConfig, DEFAULT_REDIRECT_LIMIT};
use crate::context::Context;
use crate::error::{Error, Result, TransportError};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Method, Request, Response};

/// Runs requests through a shared [`Transport`].
///
/// Outcomes are classified in this order:
/// 1. transport timeout: [`Error::Timeout`]
/// 2. any other transport failure, including a rejected redirect chain:
///    [`Error::Transport`]
/// 3. non-2xx status: [`Error::Application`] carrying the raw body
/// 4. otherwise the response body
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    max_redirects: usize,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, max_redirects: usize) -> Self {
        Self {
            transport,
            max_redirects,
        }
    }

    /// Wrap a transport with the default redirect limit.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, DEFAULT_REDIRECT_LIMIT)
    }

    /// Build a reqwest-backed executor from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.max_redirects))
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Execute `method` against `url` and return the successful response body.
    pub fn execute(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let mut request = Request::new(method, url);
        if let Some(body) = body {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = Some(body);
        }
        self.execute_request(ctx, request)
    }

    /// Execute a prepared request, headers included.
    pub fn execute_request(&self, ctx: &Context, request: Request) -> Result<Vec<u8>> {
        let response = self.send(ctx, request)?;

        if !response.is_success() {
            return Err(Error::Application {
                status: response.status,
                message: response.text(),
            });
        }

        Ok(response.body)
    }

    /// Send `request`, following redirects with the first request's headers.
    fn send(&self, ctx: &Context, request: Request) -> Result<Response> {
        let original_headers: HeaderMap = request.headers.clone();
        let mut request = request;
        let mut hops = 0;

        loop {
            request.timeout = ctx.check()?;

            tracing::debug!(method = %request.method, url = %request.url, hops, "dispatching request");
            let response = self.transport.perform(&request)?;

            if !response.is_redirect() {
                return Ok(response);
            }
            // A redirect status without a target is handed back as-is.
            let Some(location) = response.location() else {
                return Ok(response);
            };

            hops += 1;
            if hops > self.max_redirects {
                return Err(TransportError::TooManyRedirects { hops }.into());
            }

            let next = Url::parse(&request.url)
                .and_then(|base| base.join(location))
                .map_err(TransportError::from)?;

            tracing::debug!(status = response.status, location = %next, hops, "following redirect");
            request = request.redirected(response.status, next, &original_headers);
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancelToken;
    use crate::transport::mock::MockTransport;
    use http::header::AUTHORIZATION;
    use std::io;
    use std::time::{Duration, Instant};

    const URL: &str = "https://db.example/a/.json";

    fn executor(transport: &MockTransport) -> RequestExecutor {
        RequestExecutor::with_transport(Arc::new(transport.clone()))
    }

    #[test]
    fn success_returns_body() {
        let transport = MockTransport::new().with_response(URL, MockTransport::ok(r#"{"x":1}"#));
        let body = executor(&transport)
            .execute(&Context::background(), Method::GET, URL, None)
            .unwrap();
        assert_eq!(body, br#"{"x":1}"#);
    }

    #[test]
    fn body_sets_json_content_type() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok("null"));
        executor(&transport)
            .execute(&Context::background(), Method::PUT, URL, Some(b"1".to_vec()))
            .unwrap();

        let recorded = transport.recorded_requests();
        assert_eq!(recorded[0].method, Method::PUT);
        assert_eq!(recorded[0].body.as_deref(), Some(&b"1"[..]));
        assert_eq!(recorded[0].headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn non_2xx_is_application_error_with_raw_body() {
        let transport =
            MockTransport::new().with_response(URL, Response::new(401, "permission denied"));
        let err = executor(&transport)
            .execute(&Context::background(), Method::GET, URL, None)
            .unwrap_err();

        match err {
            Error::Application { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn connect_timeout_is_timeout() {
        let transport = MockTransport::new().fail_with(io::ErrorKind::TimedOut, "dial tcp: i/o timeout");
        let err = executor(&transport)
            .execute(&Context::background(), Method::GET, URL, None)
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn other_transport_errors_are_passed_through() {
        let transport = MockTransport::new().fail_with(io::ErrorKind::ConnectionRefused, "connection refused");
        let err = executor(&transport)
            .execute(&Context::background(), Method::GET, URL, None)
            .unwrap_err();

        match err {
            Error::Transport(TransportError::Io(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused);
                assert_eq!(e.to_string(), "connection refused");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn redirect_copies_first_request_headers() {
        let transport = MockTransport::new()
            .with_response(URL, MockTransport::redirect(307, "https://other.example/b/.json"))
            .with_response("https://other.example/b/.json", MockTransport::ok("true"));

        let mut request = Request::new(Method::GET, URL);
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        request
            .headers
            .insert("x-firebase-trace", HeaderValue::from_static("abc"));

        let body = executor(&transport)
            .execute_request(&Context::background(), request)
            .unwrap();
        assert_eq!(body, b"true");

        let recorded = transport.recorded_requests();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[1].url, "https://other.example/b/.json");
        for (name, value) in recorded[0].headers.iter() {
            assert_eq!(recorded[1].headers.get(name), Some(value));
        }
        assert_eq!(recorded[1].headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
    }

    #[test]
    fn relative_location_is_resolved() {
        let transport = MockTransport::new()
            .with_response(URL, MockTransport::redirect(302, "/moved/.json"))
            .with_response("https://db.example/moved/.json", MockTransport::ok("1"));

        let body = executor(&transport)
            .execute(&Context::background(), Method::GET, URL, None)
            .unwrap();
        assert_eq!(body, b"1");
    }

    fn chain(length: usize) -> MockTransport {
        let mut transport = MockTransport::new();
        for hop in 0..length {
            let from = format!("https://db.example/{}/.json", hop);
            let to = format!("https://db.example/{}/.json", hop + 1);
            transport = transport.with_response(from, MockTransport::redirect(302, &to));
        }
        transport.with_response(
            format!("https://db.example/{}/.json", length),
            MockTransport::ok("\"end\""),
        )
    }

    #[test]
    fn redirect_chain_within_limit_is_followed() {
        let transport = chain(2);
        let executor = RequestExecutor::new(Arc::new(transport.clone()), 2);

        let body = executor
            .execute(&Context::background(), Method::GET, "https://db.example/0/.json", None)
            .unwrap();
        assert_eq!(body, br#""end""#);
        assert_eq!(transport.recorded_requests().len(), 3);
    }

    #[test]
    fn redirect_chain_over_limit_is_rejected() {
        let transport = chain(3);
        let executor = RequestExecutor::new(Arc::new(transport.clone()), 2);

        let err = executor
            .execute(&Context::background(), Method::GET, "https://db.example/0/.json", None)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transport(TransportError::TooManyRedirects { hops: 3 })
        ));
        // The third redirect is never followed.
        assert_eq!(transport.recorded_requests().len(), 3);
    }

    #[test]
    fn redirect_without_location_is_returned() {
        let transport = MockTransport::new().with_response(URL, Response::new(302, "moved"));
        let err = executor(&transport)
            .execute(&Context::background(), Method::GET, URL, None)
            .unwrap_err();
        assert_eq!(err.status(), Some(302));
    }

    #[test]
    fn canceled_context_never_dispatches() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok("1"));
        let token = CancelToken::new();
        token.cancel();

        let err = executor(&transport)
            .execute(&Context::background().with_cancel(token), Method::GET, URL, None)
            .unwrap_err();

        assert!(matches!(err, Error::Canceled));
        assert!(transport.recorded_requests().is_empty());
    }

    #[test]
    fn expired_deadline_is_timeout() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok("1"));
        let ctx = Context::background().with_deadline(Instant::now() - Duration::from_secs(1));

        let err = executor(&transport)
            .execute(&ctx, Method::GET, URL, None)
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(transport.recorded_requests().is_empty());
    }

    #[test]
    fn deadline_becomes_request_timeout() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok("1"));
        let ctx = Context::background().with_timeout(Duration::from_secs(5));

        executor(&transport)
            .execute(&ctx, Method::GET, URL, None)
            .unwrap();

        let timeout = transport.recorded_requests()[0].timeout.unwrap();
        assert!(timeout <= Duration::from_secs(5));
    }
}
