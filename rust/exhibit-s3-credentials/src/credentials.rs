//! Storage credentials and the providers that resolve them.
//!
//! Credentials are resolved fresh for every upload. A [`Provider`] may return
//! fixed values ([`Static`]), call out to something that fetches short-lived
//! keys ([`Dynamic`]), or read the conventional AWS variables from the
//! process environment ([`Environment`]). Caching, if any, belongs to the
//! provider.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the access key id.
pub const ACCESS_KEY_ID_VARIABLE: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const SECRET_ACCESS_KEY_VARIABLE: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding the optional session token.
pub const SESSION_TOKEN_VARIABLE: &str = "AWS_SESSION_TOKEN";

/// An access key pair with an optional short-lived session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
}

impl Credentials {
    /// Create long-lived credentials without a session token.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token. An empty token is treated as absent.
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        let session_token = session_token.into();
        self.session_token = (!session_token.is_empty()).then_some(session_token);
        self
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Errors that can occur while resolving credentials.
#[derive(Error, Debug)]
pub enum CredentialsError {
    /// A required value is not available.
    #[error("credential value {0} is not set")]
    Missing(String),
    /// The provider failed to produce credentials.
    #[error("could not resolve credentials: {0}")]
    Resolution(String),
}

/// Source of [`Credentials`].
///
/// Providers may block on I/O and may fail; the caller treats a failure as
/// fatal for the request being built.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Resolve the credentials to use for the next request.
    async fn credentials(&self) -> Result<Credentials, CredentialsError>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for &P {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        (**self).credentials().await
    }
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Box<P> {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        (**self).credentials().await
    }
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        (**self).credentials().await
    }
}

/// Provider that always returns the same credentials.
#[derive(Debug, Clone)]
pub struct Static(Credentials);

impl Static {
    /// Wrap fixed credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl From<Credentials> for Static {
    fn from(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl Provider for Static {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.0.clone())
    }
}

/// Provider backed by an async callback, invoked on every resolution.
///
/// ```
/// use exhibit_s3_credentials::{Credentials, CredentialsError, Dynamic, Provider};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Dynamic::new(|| async {
///     Ok::<_, CredentialsError>(
///         Credentials::new("AKIATEMP", "secret").with_session_token("token"),
///     )
/// });
///
/// let credentials = provider.credentials().await?;
/// assert_eq!(credentials.session_token(), Some("token"));
/// # Ok(())
/// # }
/// ```
pub struct Dynamic<F>(F);

impl<F> Dynamic<F> {
    /// Wrap a callback returning a credentials future.
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> fmt::Debug for Dynamic<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Provider for Dynamic<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Credentials, CredentialsError>> + Send,
{
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        (self.0)().await
    }
}

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Provider reading `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
/// `AWS_SESSION_TOKEN` each time credentials are requested.
#[derive(Clone)]
pub struct Environment {
    lookup: Arc<Lookup>,
}

impl Environment {
    /// Read variables from the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Read variables through a custom lookup instead of the process
    /// environment.
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    fn variable(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, CredentialsError> {
        self.variable(name)
            .ok_or_else(|| CredentialsError::Missing(name.to_string()))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for Environment {
    async fn credentials(&self) -> Result<Credentials, CredentialsError> {
        let credentials = Credentials::new(
            self.required(ACCESS_KEY_ID_VARIABLE)?,
            self.required(SECRET_ACCESS_KEY_VARIABLE)?,
        );

        Ok(match self.variable(SESSION_TOKEN_VARIABLE) {
            Some(token) => credentials.with_session_token(token),
            None => credentials,
        })
    }
}
