//! # rtdb-client
//!
//! Blocking REST client for Firebase-style hierarchical JSON databases.
//!
//! A [`Reference`] names a node in the tree (a URL plus query parameters) and
//! maps CRUD operations onto HTTP requests against `<node>/.json`:
//!
//! ```ignore
//! use rtdb_client::{Context, Reference};
//! use std::time::Duration;
//!
//! let mut root = Reference::new("my-db.firebaseio.com")?;
//! root.auth("database-secret");
//!
//! // PUT
//! root.child("users/alice").write(&serde_json::json!({"age": 31}))?;
//!
//! // POST, returns a reference to the generated key
//! let message = root.child("messages").create_child(&"hello")?;
//!
//! // GET with a deadline
//! let ctx = Context::background().with_timeout(Duration::from_secs(2));
//! let age: u32 = root.child("users/alice/age").read_with(&ctx)?;
//!
//! // Range queries derive new references
//! let tallest = root.child("dinosaurs").order_by("height").limit_to_last(3);
//! let top: serde_json::Value = tallest.read()?;
//! ```
//!
//! ## Errors
//!
//! Timeouts ([`Error::Timeout`]) are reported separately from other transport
//! failures ([`Error::Transport`]). A non-2xx response becomes
//! [`Error::Application`] with the raw response body as its message.
//!
//! ## Redirects
//!
//! The executor follows redirects itself and re-sends every header of the
//! original request on each hop, up to [`ClientConfig::max_redirects`].

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod query;
pub mod token;
pub mod transport;
pub mod types;

mod reference;
mod watch;

// Re-export main types
pub use config::ClientConfig;
pub use context::{CancelToken, Context};
pub use error::{Error, Result, TransportError};
pub use executor::RequestExecutor;
pub use query::QueryParams;
pub use token::{AccessToken, StaticTokenSource, TokenError, TokenSource};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Method, Request, Response};

pub use crate::reference::{sanitize_url, Reference};
