//! Storage drivers turning local reports into signed uploads.

use std::panic::AssertUnwindSafe;
use std::path::Path;

use async_trait::async_trait;
use exhibit_s3_credentials::signer::{
    self, ACL_HEADER, AUTHORIZATION_HEADER, CONTENT_SHA256_HEADER, CONTENT_TYPE_HEADER,
    DATE_HEADER, HOST_HEADER, PUBLIC_READ, SECURITY_TOKEN_HEADER, UNSIGNED_PAYLOAD,
    USER_AGENT_HEADER,
};
use exhibit_s3_credentials::{Address, Clock, Credentials, Headers, Provider, SystemClock};
use futures_util::FutureExt;
use hmac::{Hmac, Mac};
use md5::Md5;
use url::Url;

use crate::{DriverError, Request, RequestSender};

/// `User-Agent` sent unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Exhibit";

/// Content type of uploaded reports. Added after signing.
pub const CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Computes where a report lives and puts it there.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Public URL the report with the given local name is stored under.
    async fn url(&self, local_name: &str) -> Result<Url, DriverError>;

    /// Upload the report at `local_path`, returning the URL it was written to.
    ///
    /// Returns `Ok(None)` when the transport fails. Errors are reserved for
    /// failures that prevent building the request at all.
    async fn upload(&self, local_path: &Path) -> Result<Option<Url>, DriverError>;
}

/// Driver for AWS S3 and S3-compatible stores.
///
/// Objects are stored as `/{bucket}/{prefix}{hmac}.html` where `hmac` is the
/// hex HMAC-MD5 of the local file name keyed with the secret access key, so
/// the public URL is stable for a given report yet cannot be guessed from
/// its name.
///
/// # Examples
///
/// ```no_run
/// use exhibit_remote::{CurlSender, Dispatch, S3Driver, StorageDriver};
/// use exhibit_s3_credentials::{Address, Environment};
///
/// # async fn example() -> Result<(), exhibit_remote::DriverError> {
/// let address = Address::new("eu-west-1", "error-reports").with_prefix("prod/");
/// let sender = CurlSender::new().with_dispatch(Dispatch::Detached);
/// let driver = S3Driver::new(address, Environment::new(), sender);
///
/// if let Some(url) = driver.upload("log/exception--2024-01-01--0123456789.html".as_ref()).await? {
///     println!("report at {url}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Driver<P, S, C = SystemClock> {
    address: Address,
    provider: P,
    sender: S,
    clock: C,
    user_agent: String,
}

impl<P, S> S3Driver<P, S>
where
    P: Provider,
    S: RequestSender,
{
    /// Create a driver reading time from the system clock.
    pub fn new(address: Address, provider: P, sender: S) -> Self {
        Self {
            address,
            provider,
            sender,
            clock: SystemClock,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl<P, S, C> S3Driver<P, S, C>
where
    P: Provider,
    S: RequestSender,
    C: Clock,
{
    /// Replace the clock used for request timestamps.
    pub fn with_clock<T: Clock>(self, clock: T) -> S3Driver<P, S, T> {
        S3Driver {
            address: self.address,
            provider: self.provider,
            sender: self.sender,
            clock,
            user_agent: self.user_agent,
        }
    }

    /// Set the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Where objects are stored.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Build the signed request uploading `local_path`, without sending it.
    pub async fn request(&self, local_path: &Path) -> Result<Request, DriverError> {
        let local_name = local_name(local_path)?;
        let credentials = self.provider.credentials().await?;
        let key = name_digest(local_name, credentials.secret_access_key());
        let path = self.address.object_path(&key);
        let url = self.address.object_url(&key)?;
        let time = self.clock.now();

        let mut headers = Headers::new()
            .with(HOST_HEADER, self.address.host()?)
            .with(USER_AGENT_HEADER, self.user_agent.as_str())
            .with(ACL_HEADER, PUBLIC_READ)
            .with(CONTENT_SHA256_HEADER, UNSIGNED_PAYLOAD)
            .with(DATE_HEADER, signer::format_timestamp(&time));

        if let Some(token) = credentials.session_token() {
            headers.insert(SECURITY_TOKEN_HEADER, token);
        }

        let authorization = signer::sign(
            "PUT",
            &path,
            &headers,
            UNSIGNED_PAYLOAD,
            &credentials,
            self.address.region(),
            &time,
        );

        headers.insert(AUTHORIZATION_HEADER, authorization);
        headers.insert(CONTENT_TYPE_HEADER, CONTENT_TYPE);

        Ok(Request {
            method: "PUT".to_string(),
            url,
            headers,
            body: local_path.to_path_buf(),
        })
    }

    fn object_url(&self, local_name: &str, credentials: &Credentials) -> Result<Url, DriverError> {
        let key = name_digest(local_name, credentials.secret_access_key());
        Ok(self.address.object_url(&key)?)
    }
}

#[async_trait]
impl<P, S, C> StorageDriver for S3Driver<P, S, C>
where
    P: Provider,
    S: RequestSender,
    C: Clock,
{
    async fn url(&self, local_name: &str) -> Result<Url, DriverError> {
        let credentials = self.provider.credentials().await?;
        self.object_url(local_name, &credentials)
    }

    async fn upload(&self, local_path: &Path) -> Result<Option<Url>, DriverError> {
        let request = self.request(local_path).await?;
        let url = request.url.clone();
        tracing::debug!(%url, path = %local_path.display(), "uploading report");

        let uploaded = match AssertUnwindSafe(self.sender.send(request))
            .catch_unwind()
            .await
        {
            Ok(uploaded) => uploaded,
            Err(_) => {
                tracing::warn!(%url, "request sender panicked");
                false
            }
        };

        if uploaded {
            tracing::info!(%url, "report uploaded");
            Ok(Some(url))
        } else {
            tracing::warn!(%url, path = %local_path.display(), "report upload failed");
            Ok(None)
        }
    }
}

fn local_name(path: &Path) -> Result<&str, DriverError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| DriverError::InvalidPath(path.to_path_buf()))
}

/// Hex HMAC-MD5 of `name` keyed with `secret`.
fn name_digest(name: &str, secret: &str) -> String {
    let mut mac =
        Hmac::<Md5>::new_from_slice(secret.as_bytes()).expect("HMAC-MD5 accepts keys of any size");
    mac.update(name.as_bytes());
    signer::hex_encode(&mac.finalize().into_bytes())
}
