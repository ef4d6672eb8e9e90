//! Record processors annotating log records with exported exception reports.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use exhibit_remote::StorageDriver;
use exhibit_s3_credentials::{Clock, SystemClock};
use serde_json::Value;

use crate::{Record, artifact_name};

/// Context key holding the report's local file name.
pub const REPORT_FILENAME_KEY: &str = "report_filename";

/// Context key holding the report's public URL. Only set after a
/// successful upload.
pub const REPORT_URL_KEY: &str = "report_url";

/// Hook applied to every record before it is handled.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Return the record, possibly annotated. Must not fail.
    async fn process(&self, record: Record) -> Record;
}

#[async_trait]
impl<P: Processor + ?Sized> Processor for Box<P> {
    async fn process(&self, record: Record) -> Record {
        (**self).process(record).await
    }
}

#[async_trait]
impl<P: Processor + ?Sized> Processor for std::sync::Arc<P> {
    async fn process(&self, record: Record) -> Record {
        (**self).process(record).await
    }
}

/// Exports the report of every record carrying an exception.
///
/// The report is expected at `{report_directory}/{artifact name}`, already
/// rendered. The record gains a `report_filename` context entry, and a
/// `report_url` once the upload went through. Failures are logged and never
/// interrupt the record.
///
/// # Examples
///
/// ```no_run
/// use exhibit_processor::{ExceptionFrame, ExceptionProcessor, Level, Processor, Record};
/// use exhibit_remote::{CurlSender, S3Driver};
/// use exhibit_s3_credentials::{Address, Environment};
///
/// # async fn example() {
/// let driver = S3Driver::new(
///     Address::new("eu-west-1", "error-reports"),
///     Environment::new(),
///     CurlSender::new(),
/// );
/// let processor = ExceptionProcessor::new(driver, "log");
///
/// let record = Record::new("app", Level::Error, "checkout failed")
///     .with_exception(ExceptionFrame::new("RuntimeError", "boom"));
/// let record = processor.process(record).await;
///
/// println!("{:?}", record.context_str("report_url"));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExceptionProcessor<D, C = SystemClock> {
    driver: D,
    clock: C,
    report_directory: PathBuf,
}

impl<D: StorageDriver> ExceptionProcessor<D> {
    pub fn new(driver: D, report_directory: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            clock: SystemClock,
            report_directory: report_directory.into(),
        }
    }
}

impl<D: StorageDriver, C: Clock> ExceptionProcessor<D, C> {
    /// Replace the clock used to date report names.
    pub fn with_clock<T: Clock>(self, clock: T) -> ExceptionProcessor<D, T> {
        ExceptionProcessor {
            driver: self.driver,
            clock,
            report_directory: self.report_directory,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Directory reports are read from.
    pub fn report_directory(&self) -> &Path {
        &self.report_directory
    }
}

#[async_trait]
impl<D: StorageDriver, C: Clock> Processor for ExceptionProcessor<D, C> {
    async fn process(&self, mut record: Record) -> Record {
        let Some(exception) = &record.exception else {
            return record;
        };

        let name = artifact_name(exception, self.clock.now().date_naive());
        record.context.insert(
            REPORT_FILENAME_KEY.to_string(),
            Value::String(name.to_string()),
        );

        let path = self.report_directory.join(name.as_str());
        match self.driver.upload(&path).await {
            Ok(Some(url)) => {
                record
                    .context
                    .insert(REPORT_URL_KEY.to_string(), Value::String(url.into()));
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(report = %name, %error, "could not upload report");
            }
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExceptionFrame, Level};
    use chrono::{TimeZone, Utc};
    use exhibit_remote::{DriverError, MemorySender, S3Driver};
    use exhibit_s3_credentials::{
        Address, Credentials, CredentialsError, Dynamic, FixedClock, Static,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use testresult::TestResult;

    const REPORT_NAME: &str = "exception--2024-01-01--55db5d60e0.html";

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap())
    }

    fn record() -> Record {
        Record::new("app", Level::Critical, "unhandled error")
            .with_exception(ExceptionFrame::new("RuntimeError", "boom").at("/app/x", 10))
    }

    fn driver(sender: MemorySender) -> S3Driver<Static, MemorySender, FixedClock> {
        S3Driver::new(
            Address::new("us-east-1", "bucket").with_prefix("reports/"),
            Static::new(Credentials::new("AKIDEXAMPLE", "secret")),
            sender,
        )
        .with_clock(clock())
    }

    #[tokio::test]
    async fn it_passes_records_without_exceptions_through() -> TestResult {
        let sender = MemorySender::new();
        let processor = ExceptionProcessor::new(driver(sender.clone()), "log").with_clock(clock());

        let original = Record::new("app", Level::Info, "hello").with_context("user", 7);
        let processed = processor.process(original.clone()).await;

        assert_eq!(processed, original);
        assert!(sender.requests().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_annotates_uploaded_reports() -> TestResult {
        let directory = tempfile::tempdir()?;
        tokio::fs::write(directory.path().join(REPORT_NAME), b"<html>boom</html>").await?;

        let sender = MemorySender::new();
        let driver = driver(sender.clone());
        let expected = driver.url(REPORT_NAME).await?;
        let processor = ExceptionProcessor::new(driver, directory.path()).with_clock(clock());

        let processed = processor.process(record()).await;

        assert_eq!(processed.context_str(REPORT_FILENAME_KEY), Some(REPORT_NAME));
        assert_eq!(processed.context_str(REPORT_URL_KEY), Some(expected.as_str()));

        let requests = sender.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.as_deref(), Some(&b"<html>boom</html>"[..]));
        Ok(())
    }

    #[tokio::test]
    async fn it_links_the_url_that_was_uploaded_with_rotating_credentials() -> TestResult {
        let directory = tempfile::tempdir()?;
        tokio::fs::write(directory.path().join(REPORT_NAME), b"<html>boom</html>").await?;

        let resolutions = Arc::new(AtomicUsize::new(0));
        let counter = resolutions.clone();
        let provider = Dynamic::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, CredentialsError>(Credentials::new("AKIDEXAMPLE", format!("secret-{n}")))
            }
        });
        let sender = MemorySender::new();
        let driver = S3Driver::new(
            Address::new("us-east-1", "bucket").with_prefix("reports/"),
            provider,
            sender.clone(),
        )
        .with_clock(clock());
        let processor = ExceptionProcessor::new(driver, directory.path()).with_clock(clock());

        let processed = processor.process(record()).await;

        let requests = sender.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(
            processed.context_str(REPORT_URL_KEY),
            Some(requests[0].url.as_str())
        );
        assert_eq!(resolutions.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_the_filename_when_upload_fails() -> TestResult {
        let processor =
            ExceptionProcessor::new(driver(MemorySender::failing()), "log").with_clock(clock());

        let processed = processor.process(record()).await;

        assert_eq!(processed.context_str(REPORT_FILENAME_KEY), Some(REPORT_NAME));
        assert_eq!(processed.context.get(REPORT_URL_KEY), None);
        Ok(())
    }

    #[tokio::test]
    async fn it_swallows_driver_errors() -> TestResult {
        let provider = Dynamic::new(|| async {
            Err::<Credentials, _>(CredentialsError::Resolution("expired".into()))
        });
        let driver = S3Driver::new(
            Address::new("us-east-1", "bucket"),
            provider,
            MemorySender::new(),
        );
        assert!(matches!(
            driver.url(REPORT_NAME).await,
            Err(DriverError::Credentials(_))
        ));

        let processor = ExceptionProcessor::new(driver, "log").with_clock(clock());
        let processed = processor.process(record()).await;

        assert_eq!(processed.context_str(REPORT_FILENAME_KEY), Some(REPORT_NAME));
        assert_eq!(processed.context.get(REPORT_URL_KEY), None);
        assert_eq!(processed.message, "unhandled error");
        Ok(())
    }
}
