//! In-process upload over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Dispatch, Request, RequestSender, truncate};

/// Sends requests with a reqwest [`Client`].
///
/// The body file is read into memory and sent as a single `PUT`; any 2xx
/// response counts as success.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: Client,
    dispatch: Dispatch,
    truncate: bool,
}

impl HttpSender {
    /// Create a sender with a default client, detecting the dispatch mode.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a sender using the given client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            dispatch: Dispatch::detect(),
            truncate: false,
        }
    }

    /// Replace the client with one enforcing a request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(
                    ?timeout,
                    %error,
                    "could not build HTTP client with timeout, using defaults"
                );
                Client::new()
            });
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
}

impl Default for HttpSender {
    fn default() -> Self {
        Self::new()
    }
}

async fn perform(client: &Client, request: &Request) -> bool {
    let body = match tokio::fs::read(&request.body).await {
        Ok(body) => body,
        Err(error) => {
            tracing::warn!(path = %request.body.display(), %error, "could not read report body");
            return false;
        }
    };

    let method = match reqwest::Method::from_bytes(request.method.as_bytes()) {
        Ok(method) => method,
        Err(error) => {
            tracing::warn!(method = %request.method, %error, "invalid request method");
            return false;
        }
    };

    let mut builder = client.request(method, request.url.clone());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    match builder.body(body).send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            tracing::debug!(
                url = %request.url,
                status = %response.status(),
                "storage rejected the upload"
            );
            false
        }
        Err(error) => {
            tracing::debug!(url = %request.url, %error, "HTTP request failed");
            false
        }
    }
}

#[async_trait]
impl RequestSender for HttpSender {
    async fn send(&self, request: Request) -> bool {
        match self.dispatch {
            Dispatch::Blocking => {
                let succeeded = perform(&self.client, &request).await;
                if self.truncate {
                    truncate(&request.body).await;
                }
                succeeded
            }
            Dispatch::Detached => {
                let client = self.client.clone();
                let truncate_body = self.truncate;
                tokio::spawn(async move {
                    perform(&client, &request).await;
                    if truncate_body {
                        truncate(&request.body).await;
                    }
                });
                true
            }
        }
    }
}
