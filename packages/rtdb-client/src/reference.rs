//! Locations in the remote tree.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::context::{CancelToken, Context};
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::query::{self, QueryParams};
use crate::token::{self, TokenSource};
use crate::transport::Transport;
use crate::types::Method;
use crate::watch::Watch;

/// Field of a create response holding the generated key.
#[derive(Deserialize)]
struct GeneratedKey {
    name: String,
}

/// Normalize a database URL: default to `https://` and drop surrounding
/// slashes. Fails with [`Error::InvalidUrl`] when nothing is left after the
/// scheme.
///
/// ```
/// use rtdb_client::sanitize_url;
///
/// assert_eq!(sanitize_url("example.com/").unwrap(), "https://example.com");
/// assert_eq!(sanitize_url("http://localhost:9000").unwrap(), "http://localhost:9000");
/// assert!(sanitize_url("https://").is_err());
/// ```
pub fn sanitize_url(url: &str) -> Result<String> {
    let (scheme, rest) = if let Some(rest) = url.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        ("http", rest)
    } else {
        ("https", url)
    };

    let rest = rest.trim_matches('/');
    if rest.is_empty() {
        return Err(Error::InvalidUrl {
            url: url.to_string(),
        });
    }
    Ok(format!("{}://{}", scheme, rest))
}

/// A location in the remote JSON tree.
///
/// Holds the node URL, its query configuration, and handles to the shared
/// request executor and token source. Operations map onto HTTP verbs:
///
/// | operation        | verb   |
/// |------------------|--------|
/// | [`read`]         | GET    |
/// | [`write`]        | PUT    |
/// | [`update`]       | PATCH  |
/// | [`create_child`] | POST   |
/// | [`delete`]       | DELETE |
///
/// Every operation has a `*_with` variant taking a [`Context`]; the plain
/// variant uses [`Context::background`].
///
/// [`read`]: Reference::read
/// [`write`]: Reference::write
/// [`update`]: Reference::update
/// [`create_child`]: Reference::create_child
/// [`delete`]: Reference::delete
///
/// # Example
///
/// ```ignore
/// use rtdb_client::Reference;
///
/// let mut root = Reference::new("my-db.firebaseio.com")?;
/// root.auth("secret");
///
/// let users = root.child("users");
/// users.child("alice").write(&serde_json::json!({"age": 31}))?;
/// let age: u32 = users.child("alice/age").read()?;
/// ```
pub struct Reference {
    url: String,
    params: QueryParams,
    executor: Arc<RequestExecutor>,
    token_source: Option<Arc<dyn TokenSource>>,
    watch: Watch,
}

impl Reference {
    /// Create a root reference using a reqwest transport with default settings.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, &ClientConfig::default())
    }

    pub fn with_config(url: &str, config: &ClientConfig) -> Result<Self> {
        let url = sanitize_url(url)?;
        let executor = RequestExecutor::from_config(config)?;
        Ok(Self::root(url, Arc::new(executor)))
    }

    /// Create a root reference over a custom transport.
    pub fn with_transport(url: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::with_executor(url, Arc::new(RequestExecutor::with_transport(transport)))
    }

    /// Create a root reference sharing an existing executor.
    pub fn with_executor(url: &str, executor: Arc<RequestExecutor>) -> Result<Self> {
        Ok(Self::root(sanitize_url(url)?, executor))
    }

    fn root(url: String, executor: Arc<RequestExecutor>) -> Self {
        Self {
            url,
            params: QueryParams::new(),
            executor,
            token_source: None,
            watch: Watch::default(),
        }
    }

    /// Normalized node URL, without the `.json` suffix or query.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last path segment, or `None` at the database root.
    pub fn key(&self) -> Option<&str> {
        let without_scheme = self.url.split_once("://").map_or(&*self.url, |(_, rest)| rest);
        let (_, path) = without_scheme.split_once('/')?;
        path.rsplit('/').next().filter(|key| !key.is_empty())
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Set the custom token sent as the `auth` parameter.
    pub fn auth(&mut self, token: impl Into<String>) {
        self.params.set(query::AUTH_PARAM, token);
    }

    /// Remove the `auth` parameter.
    pub fn unauth(&mut self) {
        self.params.remove(query::AUTH_PARAM);
    }

    /// Install the source used to fill `access_token` on every later request.
    pub fn set_token_source(&mut self, source: Arc<dyn TokenSource>) {
        self.token_source = Some(source);
    }

    pub fn clear_token_source(&mut self) {
        self.token_source = None;
    }

    /// Derive a reference for `name` below this one.
    ///
    /// The query configuration is copied as it is now; later changes to either
    /// reference do not affect the other. Watch state is never copied.
    pub fn child(&self, name: &str) -> Reference {
        let mut child = self.copy();
        let name = name.trim_matches('/');
        if !name.is_empty() {
            child.url.push('/');
            child.url.push_str(name);
        }
        child
    }

    /// Request URL: `<url>/.json`, plus the canonical query string.
    ///
    /// The access token is fetched from the token source on every call. If the
    /// source fails, the parameter is left out and the request goes ahead
    /// without it.
    pub fn render(&self) -> String {
        let mut params = self.params.clone();
        let access_token = self
            .token_source
            .as_ref()
            .and_then(|source| token::resolve(source.as_ref()));
        if let Some(access_token) = access_token {
            params.set(query::ACCESS_TOKEN_PARAM, access_token);
        }

        let mut rendered = format!("{}/.json", self.url);
        if !params.is_empty() {
            rendered.push('?');
            rendered.push_str(&params.encode());
        }
        rendered
    }

    // -- query filters ----------------------------------------------------

    /// Only fetch the keys of children (`shallow=true`).
    pub fn shallow(&self, shallow: bool) -> Reference {
        self.with_param(query::SHALLOW_PARAM, shallow.then(|| "true".to_string()))
    }

    /// Include priority metadata (`format=export`).
    pub fn include_priority(&self, include: bool) -> Reference {
        self.with_param(
            query::FORMAT_PARAM,
            include.then(|| query::FORMAT_EXPORT.to_string()),
        )
    }

    /// Order children by `key` (`$key`, `$value`, `$priority` or a child
    /// name). An empty key clears the ordering.
    pub fn order_by(&self, key: &str) -> Reference {
        let value = (!key.is_empty()).then(|| serde_json::Value::from(key).to_string());
        self.with_param(query::ORDER_BY_PARAM, value)
    }

    /// Keep the first `limit` children. Zero clears the limit.
    pub fn limit_to_first(&self, limit: u64) -> Reference {
        self.with_param(query::LIMIT_TO_FIRST_PARAM, (limit > 0).then(|| limit.to_string()))
    }

    /// Keep the last `limit` children. Zero clears the limit.
    pub fn limit_to_last(&self, limit: u64) -> Reference {
        self.with_param(query::LIMIT_TO_LAST_PARAM, (limit > 0).then(|| limit.to_string()))
    }

    /// Start the range at `value`. `null` clears it.
    pub fn start_at(&self, value: impl Into<serde_json::Value>) -> Reference {
        self.with_param(query::START_AT_PARAM, query::json_param(&value.into()))
    }

    /// End the range at `value`. `null` clears it.
    pub fn end_at(&self, value: impl Into<serde_json::Value>) -> Reference {
        self.with_param(query::END_AT_PARAM, query::json_param(&value.into()))
    }

    /// Only match children equal to `value`. `null` clears it.
    pub fn equal_to(&self, value: impl Into<serde_json::Value>) -> Reference {
        self.with_param(query::EQUAL_TO_PARAM, query::json_param(&value.into()))
    }

    // -- operations -------------------------------------------------------

    /// Read the node and deserialize it.
    ///
    /// An empty or `null` body is passed to the deserializer unchanged, so use
    /// an `Option<T>` target to tolerate missing nodes.
    pub fn read<T: DeserializeOwned>(&self) -> Result<T> {
        self.read_with(&Context::background())
    }

    pub fn read_with<T: DeserializeOwned>(&self, ctx: &Context) -> Result<T> {
        let body = self.execute(ctx, Method::GET, None)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Read the node, failing with [`Error::ValueMissing`] if it does not exist.
    pub fn read_required<T: DeserializeOwned>(&self) -> Result<T> {
        self.read_required_with(&Context::background())
    }

    pub fn read_required_with<T: DeserializeOwned>(&self, ctx: &Context) -> Result<T> {
        let body = self.execute(ctx, Method::GET, None)?;
        let trimmed = body.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            return Err(Error::ValueMissing);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Replace the node with `value`.
    pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.write_with(&Context::background(), value)
    }

    pub fn write_with<T: Serialize + ?Sized>(&self, ctx: &Context, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        self.execute(ctx, Method::PUT, Some(body))?;
        Ok(())
    }

    /// Merge the children in `value` into the node.
    pub fn update<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.update_with(&Context::background(), value)
    }

    pub fn update_with<T: Serialize + ?Sized>(&self, ctx: &Context, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        self.execute(ctx, Method::PATCH, Some(body))?;
        Ok(())
    }

    /// Remove the node.
    pub fn delete(&self) -> Result<()> {
        self.delete_with(&Context::background())
    }

    pub fn delete_with(&self, ctx: &Context) -> Result<()> {
        self.execute(ctx, Method::DELETE, None)?;
        Ok(())
    }

    /// Store `value` under a key generated by the server and return a
    /// reference to it.
    ///
    /// The new reference shares this one's executor and token source, but has
    /// no query parameters. If the response cannot be parsed the error is
    /// returned even though the server has already stored the value.
    pub fn create_child<T: Serialize + ?Sized>(&self, value: &T) -> Result<Reference> {
        self.create_child_with(&Context::background(), value)
    }

    pub fn create_child_with<T: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        value: &T,
    ) -> Result<Reference> {
        let body = serde_json::to_vec(value)?;
        let response = self.execute(ctx, Method::POST, Some(body))?;
        let generated: GeneratedKey = serde_json::from_slice(&response)?;
        let key = generated.name.trim_matches('/');
        if key.is_empty() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "create response has an empty `name`",
            )
            .into());
        }

        Ok(Reference {
            url: format!("{}/{}", self.url, key),
            params: QueryParams::new(),
            executor: Arc::clone(&self.executor),
            token_source: self.token_source.clone(),
            watch: Watch::default(),
        })
    }

    // -- watch session ----------------------------------------------------

    /// Begin a watch session on this reference.
    ///
    /// Fails with [`Error::AlreadyWatching`] if one is already running. The
    /// returned token is canceled by [`Reference::stop_watching`].
    pub fn start_watching(&self) -> Result<CancelToken> {
        self.watch.start()
    }

    /// End the current watch session, if any.
    pub fn stop_watching(&self) {
        if self.watch.stop() {
            tracing::debug!(url = %self.url, "stopped watching");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_watching()
    }

    fn execute(&self, ctx: &Context, method: Method, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        self.executor.execute(ctx, method, &self.render(), body)
    }

    fn with_param(&self, name: &str, value: Option<String>) -> Reference {
        let mut copy = self.copy();
        match value {
            Some(value) => copy.params.set(name, value),
            None => copy.params.remove(name),
        }
        copy
    }

    fn copy(&self) -> Reference {
        Reference {
            url: self.url.clone(),
            params: self.params.clone(),
            executor: Arc::clone(&self.executor),
            token_source: self.token_source.clone(),
            watch: Watch::default(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("url", &self.url)
            .field("params", &self.params)
            .field("has_token_source", &self.token_source.is_some())
            .field("watching", &self.watch.is_watching())
            .finish()
    }
}
