//! Bearer token sources used to populate the `access_token` query parameter.

use std::time::SystemTime;

/// A short-lived OAuth2 access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: Option<SystemTime>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= SystemTime::now())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("token source error: {message}")]
pub struct TokenError {
    pub message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Produces access tokens on demand.
///
/// Called once per rendered request URL, so implementations that talk to an
/// authorization server should cache and refresh internally.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<AccessToken, TokenError>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Result<AccessToken, TokenError> + Send + Sync,
{
    fn token(&self) -> Result<AccessToken, TokenError> {
        self()
    }
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: AccessToken,
}

impl StaticTokenSource {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(access_token),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn token(&self) -> Result<AccessToken, TokenError> {
        Ok(self.token.clone())
    }
}

/// Resolve a token for one request. Failures and expired tokens yield `None`.
pub(crate) fn resolve(source: &dyn TokenSource) -> Option<String> {
    match source.token() {
        Ok(token) if !token.is_expired() => Some(token.access_token),
        Ok(_) => {
            tracing::trace!("access token expired, omitting access_token");
            None
        }
        Err(e) => {
            tracing::trace!(error = %e, "token source failed, omitting access_token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn static_source_returns_token() {
        let source = StaticTokenSource::new("abc");
        assert_eq!(source.token().unwrap().access_token, "abc");
        assert_eq!(resolve(&source), Some("abc".to_string()));
    }

    #[test]
    fn closure_source() {
        let source = || -> Result<AccessToken, TokenError> { Ok(AccessToken::new("from-closure")) };
        assert_eq!(resolve(&source), Some("from-closure".to_string()));
    }

    #[test]
    fn failing_source_resolves_to_none() {
        let source =
            || -> Result<AccessToken, TokenError> { Err(TokenError::new("metadata server unreachable")) };
        assert_eq!(resolve(&source), None);
    }

    #[test]
    fn expired_token_resolves_to_none() {
        let expired = AccessToken::new("old").with_expiry(SystemTime::now() - Duration::from_secs(1));
        assert!(expired.is_expired());

        let source = move || -> Result<AccessToken, TokenError> { Ok(expired.clone()) };
        assert_eq!(resolve(&source), None);
    }

    #[test]
    fn token_without_expiry_never_expires() {
        assert!(!AccessToken::new("t").is_expired());
        let future = AccessToken::new("t").with_expiry(SystemTime::now() + Duration::from_secs(3600));
        assert!(!future.is_expired());
    }
}
