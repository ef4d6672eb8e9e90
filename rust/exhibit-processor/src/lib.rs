//! Exception report export for log pipelines.
//!
//! [`ExceptionProcessor`] is invoked once per [`Record`]. When the record
//! carries an [`ExceptionChain`], it names the report after the chain's
//! [`fingerprint()`] and the current date, uploads the rendered report through
//! a [`StorageDriver`](exhibit_remote::StorageDriver) and annotates the
//! record with the report's file name and public URL.
//!
//! ```no_run
//! use exhibit_processor::{ExceptionChain, ExceptionProcessor, Level, Processor, Record};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // EXHIBIT_BUCKET, AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set
//! let processor = ExceptionProcessor::from_env()?;
//!
//! let error = std::fs::read("/etc/app.toml").unwrap_err();
//! let record = Record::new("app", Level::Error, "could not load configuration")
//!     .with_exception(ExceptionChain::capture(&error));
//!
//! let record = processor.process(record).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod exception;
pub mod fingerprint;
pub mod processor;
pub mod record;

pub use config::{ConfigError, ConfiguredDriver, EnvMsDuration, ExporterConfig, Transport};
pub use exception::{ExceptionChain, ExceptionFrame, MAX_DEPTH, StackEntry};
pub use fingerprint::{ArtifactName, Fingerprint, artifact_name, fingerprint};
pub use processor::{ExceptionProcessor, Processor, REPORT_FILENAME_KEY, REPORT_URL_KEY};
pub use record::{Level, Record};
