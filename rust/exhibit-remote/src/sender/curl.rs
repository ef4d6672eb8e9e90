//! Upload through an external `curl` process.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::{Dispatch, Request, RequestSender, truncate};

/// Sends requests by running `curl --upload-file`.
///
/// In [`Dispatch::Blocking`] mode the exit status decides the result; `--fail`
/// makes non-2xx responses exit non-zero. In [`Dispatch::Detached`] mode the
/// process is spawned and left running, and a background task reaps it and
/// truncates the body if configured.
///
/// # Examples
///
/// ```no_run
/// use exhibit_remote::{CurlSender, Dispatch};
///
/// let sender = CurlSender::new()
///     .with_binary("/usr/bin/curl")
///     .with_dispatch(Dispatch::Blocking)
///     .with_truncate(true);
/// ```
#[derive(Debug, Clone)]
pub struct CurlSender {
    binary: PathBuf,
    dispatch: Dispatch,
    truncate: bool,
}

impl CurlSender {
    /// Use `curl` from `PATH`, detecting the dispatch mode.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("curl"),
            dispatch: Dispatch::detect(),
            truncate: false,
        }
    }

    /// Set the curl executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the dispatch mode.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Truncate the body file once the upload finished.
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    fn arguments(request: &Request) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--silent".into(),
            "--show-error".into(),
            "--fail".into(),
            "--request".into(),
            request.method.clone().into(),
            "--url".into(),
            request.url.as_str().into(),
        ];

        for (name, value) in request.headers.iter() {
            args.push("--header".into());
            args.push(format!("{name}: {value}").into());
        }

        args.push("--upload-file".into());
        args.push(request.body.clone().into_os_string());
        args
    }

    fn spawn(&self, request: &Request) -> Option<Child> {
        let result = Command::new(&self.binary)
            .args(Self::arguments(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match result {
            Ok(child) => Some(child),
            Err(error) => {
                tracing::warn!(binary = %self.binary.display(), %error, "could not start curl");
                None
            }
        }
    }
}

impl Default for CurlSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestSender for CurlSender {
    async fn send(&self, request: Request) -> bool {
        let Some(mut child) = self.spawn(&request) else {
            return false;
        };

        match self.dispatch {
            Dispatch::Blocking => {
                let succeeded = match child.wait().await {
                    Ok(status) => {
                        if !status.success() {
                            tracing::debug!(url = %request.url, %status, "curl exited unsuccessfully");
                        }
                        status.success()
                    }
                    Err(error) => {
                        tracing::warn!(url = %request.url, %error, "could not wait for curl");
                        false
                    }
                };

                if self.truncate {
                    truncate(&request.body).await;
                }

                succeeded
            }
            Dispatch::Detached => {
                let truncate_body = self.truncate;
                tokio::spawn(async move {
                    if let Err(error) = child.wait().await {
                        tracing::debug!(%error, "could not reap detached curl");
                    }
                    if truncate_body {
                        truncate(&request.body).await;
                    }
                });

                true
            }
        }
    }
}
