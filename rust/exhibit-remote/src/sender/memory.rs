//! In-memory sender for testing

use std::sync::Arc;

use async_trait::async_trait;
use exhibit_s3_credentials::Headers;
use tokio::sync::RwLock;
use url::Url;

use super::{Request, RequestSender};

/// A request captured by [`MemorySender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Target URL
    pub url: Url,
    /// Headers as they would go on the wire
    pub headers: Headers,
    /// Body bytes, or `None` if the body file could not be read
    pub body: Option<Vec<u8>>,
}

/// Sender that records requests instead of sending them.
///
/// Clones share the same log, so a test can keep one handle while the driver
/// owns another.
///
/// # Examples
///
/// ```
/// use exhibit_remote::MemorySender;
///
/// # async fn example() {
/// let sender = MemorySender::new();
/// let observer = sender.clone();
///
/// // hand `sender` to a driver, then:
/// assert!(observer.requests().await.is_empty());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemorySender {
    succeed: bool,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl MemorySender {
    /// A sender reporting every request as delivered.
    pub fn new() -> Self {
        Self {
            succeed: true,
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A sender reporting every request as failed.
    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::new()
        }
    }

    /// All requests recorded so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }
}

impl Default for MemorySender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestSender for MemorySender {
    async fn send(&self, request: Request) -> bool {
        let body = tokio::fs::read(&request.body).await.ok();
        self.requests.write().await.push(RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
        });
        self.succeed
    }
}
