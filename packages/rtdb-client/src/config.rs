//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time allowed to establish a connection and receive response headers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of redirects followed for a single request.
pub const DEFAULT_REDIRECT_LIMIT: usize = 30;

/// Settings used to build a transport and request executor.
///
/// Several clients with different settings can coexist in one process; nothing
/// here is global.
///
/// ```
/// use std::time::Duration;
/// use rtdb_client::ClientConfig;
///
/// let config = ClientConfig::default().with_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_redirects, 30);
/// assert!(!config.keep_alive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Connect and header-wait timeout.
    #[serde(rename = "timeout_ms", with = "duration_millis")]
    pub timeout: Duration,

    /// Redirect hops followed before the request is rejected.
    pub max_redirects: usize,

    /// Reuse pooled connections between requests. Off by default so every
    /// request gets a fresh connection.
    pub keep_alive: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_REDIRECT_LIMIT,
            keep_alive: false,
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
