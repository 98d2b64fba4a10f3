//! HTTP transport abstraction.
//!
//! The [`Transport`] trait performs exactly one HTTP exchange. Redirects,
//! status handling and error classification live in
//! [`RequestExecutor`](crate::executor::RequestExecutor), so a transport can be
//! swapped for a mock in tests without any network calls.

use std::io;
use std::time::Duration;

use reqwest::redirect;
use reqwest::Client;
use tokio::runtime::{self, Runtime};
use tokio::time::{self, Instant};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::types::{Request, Response};

/// Performs one HTTP round trip.
///
/// Implementations must read the response body to the end before returning
/// and must not follow redirects themselves.
pub trait Transport: Send + Sync {
    fn perform(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Production transport using reqwest, driven on a private runtime so calls
/// block the caller.
///
/// The configured timeout bounds connecting and waiting for the response
/// headers. Reading the body is not limited by it; only a caller deadline
/// (`Request::timeout`) applies there.
pub struct ReqwestTransport {
    client: Client,
    runtime: Runtime,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a client from `config`.
    ///
    /// Automatic redirects are disabled; the executor follows them so the
    /// original headers survive cross-host hops.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(config.timeout)
            .redirect(redirect::Policy::none());

        if !config.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("rtdb-client-transport")
            .enable_all()
            .build()?;

        Ok(Self {
            client: builder.build()?,
            runtime,
            timeout: config.timeout,
        })
    }

    /// Create with the default configuration (30 second timeout).
    pub fn with_default_config() -> Result<Self, TransportError> {
        Self::new(&ClientConfig::default())
    }

    async fn round_trip(&self, request: &Request) -> Result<Response, TransportError> {
        let started = Instant::now();
        let method: http::Method = request.method.into();

        let mut req_builder = self
            .client
            .request(method, request.url.as_str())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let header_limit = request
            .timeout
            .map_or(self.timeout, |timeout| timeout.min(self.timeout));

        let response = time::timeout(header_limit, req_builder.send())
            .await
            .map_err(|_| timed_out("timed out waiting for response headers"))??;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let body = match request.timeout {
            Some(timeout) => time::timeout_at(started + timeout, response.bytes())
                .await
                .map_err(|_| timed_out("deadline exceeded while reading response body"))??,
            None => response.bytes().await?,
        };

        Ok(Response {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn timed_out(message: &str) -> TransportError {
    TransportError::Io(io::Error::new(io::ErrorKind::TimedOut, message.to_string()))
}

impl Transport for ReqwestTransport {
    fn perform(&self, request: &Request) -> Result<Response, TransportError> {
        self.runtime.block_on(self.round_trip(request))
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use crate::types::Method;
    use std::io;

    #[test]
    fn mock_returns_configured_response() {
        let transport =
            MockTransport::new().with_response("https://db.example/a/.json", MockTransport::ok("1"));

        let response = transport
            .perform(&Request::new(Method::GET, "https://db.example/a/.json"))
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"1");
    }

    #[test]
    fn mock_returns_404_when_no_match() {
        let transport = MockTransport::new();
        let response = transport
            .perform(&Request::new(Method::GET, "https://db.example/.json"))
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn mock_fails_when_configured() {
        let transport = MockTransport::new().fail_with(io::ErrorKind::ConnectionRefused, "refused");
        let err = transport
            .perform(&Request::new(Method::GET, "https://db.example/.json"))
            .unwrap_err();
        assert!(!err.is_timeout());
    }

    #[test]
    fn mock_records_requests() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok("null"));

        transport
            .perform(&Request::new(Method::GET, "https://db.example/first/.json"))
            .unwrap();
        transport
            .perform(&Request::new(Method::DELETE, "https://db.example/second/.json"))
            .unwrap();

        let recorded = transport.recorded_requests();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].method, Method::GET);
        assert_eq!(recorded[1].url, "https://db.example/second/.json");
    }

    #[test]
    fn reqwest_transport_creation() {
        assert!(ReqwestTransport::with_default_config().is_ok());
    }

    #[test]
    fn reqwest_transport_with_keep_alive() {
        let config = ClientConfig::default()
            .with_timeout(Duration::from_secs(10))
            .with_keep_alive(true);
        assert!(ReqwestTransport::new(&config).is_ok());
    }
}
