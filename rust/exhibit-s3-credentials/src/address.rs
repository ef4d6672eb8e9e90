//! Storage location of exception reports.
//!
//! An [`Address`] combines the region, bucket and key prefix under which
//! reports are stored. Requests are path-style
//! (`https://{host}/{bucket}/{key}`) against `s3.{region}.amazonaws.com`
//! unless an endpoint override points at another S3-compatible service.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::signer::percent_encode_path;

/// Errors raised while deriving hosts and URLs from an [`Address`].
#[derive(Error, Debug)]
pub enum AddressError {
    /// The endpoint URL is invalid (e.g., missing host).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Failed to parse a URL.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Region, bucket and key prefix for uploaded reports.
///
/// # Examples
///
/// ```
/// use exhibit_s3_credentials::Address;
///
/// // AWS S3
/// let address = Address::new("eu-central-1", "reports").with_prefix("/app/");
/// assert_eq!(address.host().unwrap(), "s3.eu-central-1.amazonaws.com");
/// assert_eq!(address.object_path("abc"), "/reports/app/abc.html");
///
/// // MinIO (local development)
/// let address = Address::new("us-east-1", "reports").with_endpoint("http://localhost:9000");
/// assert_eq!(address.host().unwrap(), "localhost:9000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// AWS region for signing (e.g., "us-east-1")
    region: String,
    /// Bucket name
    bucket: String,
    /// Key prefix, stored without leading slashes
    #[serde(default)]
    prefix: String,
    /// Optional S3-compatible endpoint replacing `https://s3.{region}.amazonaws.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
}

impl Address {
    /// Create an address for the given region and bucket with no prefix.
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            prefix: String::new(),
            endpoint: None,
        }
    }

    /// Set the key prefix. Leading slashes are dropped.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_start_matches('/').to_string();
        self
    }

    /// Send requests to an S3-compatible endpoint instead of AWS.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Get the region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the key prefix.
    pub fn prefix(&self) -> &str {
        self.prefix.trim_start_matches('/')
    }

    /// Get the endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The value of the `Host` header, including port for non-standard ports.
    pub fn host(&self) -> Result<String, AddressError> {
        match &self.endpoint {
            Some(endpoint) => extract_host(&Url::parse(endpoint)?),
            None => Ok(format!("s3.{}.amazonaws.com", self.region)),
        }
    }

    /// Scheme and host every object URL starts with.
    pub fn origin(&self) -> Result<Url, AddressError> {
        let mut url = match &self.endpoint {
            Some(endpoint) => Url::parse(endpoint)?,
            None => Url::parse(&format!("https://{}", self.host()?))?,
        };
        // validates that the endpoint actually has a host
        extract_host(&url)?;
        url.set_path("/");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Path of the report stored under `key`: `/{bucket}/{prefix}{key}.html`,
    /// percent-encoded per segment as S3 expects it in the canonical request.
    pub fn object_path(&self, key: &str) -> String {
        percent_encode_path(&format!("/{}/{}{}.html", self.bucket, self.prefix(), key))
    }

    /// Full URL of the report stored under `key`.
    pub fn object_url(&self, key: &str) -> Result<Url, AddressError> {
        let mut url = self.origin()?;
        url.set_path(&self.object_path(key));
        Ok(url)
    }
}

/// Extract host string from URL, including port for non-standard ports.
fn extract_host(url: &Url) -> Result<String, AddressError> {
    let hostname = url
        .host_str()
        .ok_or_else(|| AddressError::InvalidEndpoint(format!("{url} has no host")))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    #[test]
    fn it_derives_aws_host_from_region() -> TestResult {
        let address = Address::new("us-east-1", "my-bucket");

        assert_eq!(address.host()?, "s3.us-east-1.amazonaws.com");
        assert_eq!(
            address.origin()?.as_str(),
            "https://s3.us-east-1.amazonaws.com/"
        );
        Ok(())
    }

    #[test]
    fn it_builds_object_urls() -> TestResult {
        let address = Address::new("us-east-1", "bucket").with_prefix("prefix");

        assert_eq!(address.object_path("ABCDEF1234"), "/bucket/prefixABCDEF1234.html");
        assert_eq!(
            address.object_url("ABCDEF1234")?.as_str(),
            "https://s3.us-east-1.amazonaws.com/bucket/prefixABCDEF1234.html"
        );
        Ok(())
    }

    #[test]
    fn it_percent_encodes_object_paths() -> TestResult {
        let address = Address::new("us-east-1", "bucket").with_prefix("env=prod(1)/");

        assert_eq!(address.object_path("abc"), "/bucket/env%3Dprod%281%29/abc.html");

        let url = address.object_url("abc")?;
        assert_eq!(url.path(), address.object_path("abc"));
        assert_eq!(
            url.as_str(),
            "https://s3.us-east-1.amazonaws.com/bucket/env%3Dprod%281%29/abc.html"
        );
        Ok(())
    }

    #[test]
    fn it_strips_leading_slashes_from_prefix() {
        let address = Address::new("us-east-1", "bucket").with_prefix("//reports/");

        assert_eq!(address.prefix(), "reports/");
        assert_eq!(address.object_path("x"), "/bucket/reports/x.html");
    }

    #[test]
    fn it_uses_endpoint_host_and_port() -> TestResult {
        let address = Address::new("us-east-1", "bucket").with_endpoint("http://localhost:9000");

        assert_eq!(address.host()?, "localhost:9000");
        assert_eq!(
            address.object_url("key")?.as_str(),
            "http://localhost:9000/bucket/key.html"
        );
        Ok(())
    }

    #[test]
    fn it_omits_default_ports() -> TestResult {
        let address =
            Address::new("auto", "bucket").with_endpoint("https://account.r2.cloudflarestorage.com:443");

        assert_eq!(address.host()?, "account.r2.cloudflarestorage.com");
        Ok(())
    }

    #[test]
    fn it_rejects_invalid_endpoints() {
        let address = Address::new("us-east-1", "bucket").with_endpoint("not a url");
        assert!(matches!(address.host(), Err(AddressError::UrlParse(_))));

        let address = Address::new("us-east-1", "bucket").with_endpoint("unix:/run/socket");
        assert!(matches!(
            address.origin(),
            Err(AddressError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn it_roundtrips_through_serde() -> TestResult {
        let address = Address::new("us-east-1", "bucket")
            .with_prefix("reports/")
            .with_endpoint("http://localhost:9000");

        let json = serde_json::to_string(&address)?;
        let parsed: Address = serde_json::from_str(&json)?;
        assert_eq!(address, parsed);
        Ok(())
    }
}
