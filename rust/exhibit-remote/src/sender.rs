//! Transports that deliver a signed request to object storage.
//!
//! A [`RequestSender`] performs a single upload and answers with a plain
//! success flag. In [`Dispatch::Detached`] mode the transport is launched and
//! the sender reports success right away without observing the outcome, so a
//! user-facing request is never held up by a log upload.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use exhibit_s3_credentials::Headers;
use url::Url;

mod curl;
pub use curl::*;

mod http;
pub use http::*;

mod memory;
pub use memory::*;

/// A signed request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method
    pub method: String,
    /// Target URL
    pub url: Url,
    /// Headers in wire order, including `Authorization`
    pub headers: Headers,
    /// Local file whose bytes form the request body
    pub body: PathBuf,
}

/// Whether the caller waits for the transport to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Wait for the transport and report its actual outcome.
    Blocking,
    /// Launch the transport and report success immediately.
    Detached,
}

impl Dispatch {
    /// Block when attached to an interactive terminal (command-line use),
    /// detach otherwise (services, daemons, request handlers).
    pub fn detect() -> Self {
        if std::io::stderr().is_terminal() {
            Self::Blocking
        } else {
            Self::Detached
        }
    }

    /// Use an explicit choice when given, [`detect`](Self::detect) otherwise.
    pub fn resolve(detached: Option<bool>) -> Self {
        match detached {
            Some(true) => Self::Detached,
            Some(false) => Self::Blocking,
            None => Self::detect(),
        }
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self::detect()
    }
}

/// Performs a signed upload.
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Send the request, returning whether it succeeded.
    ///
    /// Implementations report every failure as `false` instead of erroring.
    async fn send(&self, request: Request) -> bool;
}

#[async_trait]
impl<S: RequestSender + ?Sized> RequestSender for Box<S> {
    async fn send(&self, request: Request) -> bool {
        (**self).send(request).await
    }
}

#[async_trait]
impl<S: RequestSender + ?Sized> RequestSender for Arc<S> {
    async fn send(&self, request: Request) -> bool {
        (**self).send(request).await
    }
}

/// Truncate the uploaded body to reclaim disk space. Best effort.
pub(crate) async fn truncate(path: &Path) {
    let result = async {
        let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(0).await
    }
    .await;

    if let Err(error) = result {
        tracing::debug!(path = %path.display(), %error, "could not truncate uploaded report");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_resolves_explicit_dispatch() {
        assert_eq!(Dispatch::resolve(Some(true)), Dispatch::Detached);
        assert_eq!(Dispatch::resolve(Some(false)), Dispatch::Blocking);
    }

    #[tokio::test]
    async fn it_truncates_files() -> TestResult {
        let directory = tempfile::tempdir()?;
        let path = directory.path().join("report.html");
        tokio::fs::write(&path, b"<html>report</html>").await?;

        truncate(&path).await;

        assert_eq!(tokio::fs::metadata(&path).await?.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn it_ignores_truncation_failures() {
        let directory = tempfile::tempdir().unwrap();
        truncate(&directory.path().join("missing.html")).await;
    }
}
