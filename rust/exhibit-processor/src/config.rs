//! Exporter configuration read from the environment.

use std::str::FromStr;
use std::time;

use envconfig::Envconfig;
use exhibit_remote::{CurlSender, Dispatch, HttpSender, RequestSender, S3Driver};
use exhibit_s3_credentials::{Address, AddressError, Environment, SystemClock};
use thiserror::Error;

use crate::ExceptionProcessor;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid environment: {0}")]
    Env(#[from] envconfig::Error),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Exporter settings read from `EXHIBIT_*` variables. Credentials come
/// from the standard `AWS_*` variables at upload time.
#[derive(Envconfig, Debug, Clone)]
pub struct ExporterConfig {
    #[envconfig(from = "EXHIBIT_REGION", default = "us-east-1")]
    pub region: String,

    #[envconfig(from = "EXHIBIT_BUCKET")]
    pub bucket: String,

    #[envconfig(from = "EXHIBIT_PREFIX", default = "")]
    pub prefix: String,

    /// S3-compatible endpoint replacing `https://s3.{region}.amazonaws.com`.
    #[envconfig(from = "EXHIBIT_ENDPOINT")]
    pub endpoint: Option<String>,

    #[envconfig(from = "EXHIBIT_REPORT_DIRECTORY", default = "log")]
    pub report_directory: String,

    #[envconfig(from = "EXHIBIT_TRANSPORT", default = "curl")]
    pub transport: Transport,

    #[envconfig(from = "EXHIBIT_CURL_BINARY", default = "curl")]
    pub curl_binary: String,

    /// Unset means detached unless stderr is a terminal.
    #[envconfig(from = "EXHIBIT_DETACHED")]
    pub detached: Option<bool>,

    #[envconfig(from = "EXHIBIT_TRUNCATE", default = "false")]
    pub truncate: bool,

    #[envconfig(from = "EXHIBIT_USER_AGENT", default = "Exhibit")]
    pub user_agent: String,

    /// Request timeout of the HTTP transport.
    #[envconfig(from = "EXHIBIT_TIMEOUT_MS")]
    pub timeout: Option<EnvMsDuration>,
}

/// How uploads leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Curl,
    Http,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown transport {0:?}, expected curl or http")]
pub struct ParseTransportError(String);

impl FromStr for Transport {
    type Err = ParseTransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curl" => Ok(Transport::Curl),
            "http" => Ok(Transport::Http),
            _ => Err(ParseTransportError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Error, Debug, PartialEq, Eq)]
#[error("expected a duration in milliseconds")]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

/// Driver assembled from [`ExporterConfig`].
pub type ConfiguredDriver = S3Driver<Environment, Box<dyn RequestSender>, SystemClock>;

impl ExporterConfig {
    /// Storage location, validating the endpoint if one is set.
    pub fn address(&self) -> Result<Address, ConfigError> {
        let mut address = Address::new(&self.region, &self.bucket).with_prefix(&self.prefix);
        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.is_empty()) {
            address = address.with_endpoint(endpoint);
        }
        address.origin()?;
        Ok(address)
    }

    pub fn dispatch(&self) -> Dispatch {
        Dispatch::resolve(self.detached)
    }

    /// The configured transport.
    pub fn sender(&self) -> Box<dyn RequestSender> {
        match self.transport {
            Transport::Curl => Box::new(
                CurlSender::new()
                    .with_binary(&self.curl_binary)
                    .with_dispatch(self.dispatch())
                    .with_truncate(self.truncate),
            ),
            Transport::Http => {
                let mut sender = HttpSender::new()
                    .with_dispatch(self.dispatch())
                    .with_truncate(self.truncate);
                if let Some(EnvMsDuration(timeout)) = self.timeout {
                    sender = sender.with_timeout(timeout);
                }
                Box::new(sender)
            }
        }
    }

    pub fn driver(&self) -> Result<ConfiguredDriver, ConfigError> {
        Ok(S3Driver::new(self.address()?, Environment::new(), self.sender())
            .with_user_agent(&self.user_agent))
    }
}

impl ExceptionProcessor<ConfiguredDriver> {
    /// Wire a processor from configuration.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ConfigError> {
        let processor = Self::new(config.driver()?, &config.report_directory);
        tracing::debug!(
            bucket = %config.bucket,
            region = %config.region,
            transport = ?config.transport,
            "exception export configured"
        );
        Ok(processor)
    }

    /// Read configuration from the process environment and wire a processor.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(&ExporterConfig::init_from_env()?)
    }
}
