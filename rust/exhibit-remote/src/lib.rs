//! Upload orchestration for exception reports.
//!
//! A [`StorageDriver`] turns a rendered report on local disk into a signed
//! `PUT` against object storage and hands it to a [`RequestSender`]:
//!
//! - [`S3Driver`] derives the unguessable object path, assembles and signs
//!   the headers
//! - [`CurlSender`] runs the request through a `curl` process
//! - [`HttpSender`] performs it in-process with reqwest
//! - [`MemorySender`] records requests for tests and dry runs
//!
//! Transport failures never surface as errors: `upload` reports them as
//! `Ok(None)` and returns the URL it wrote to otherwise. Only failing to
//! resolve credentials or derive the URL is an error.

pub mod driver;
pub mod error;
pub mod sender;

pub use driver::{CONTENT_TYPE, DEFAULT_USER_AGENT, S3Driver, StorageDriver};
pub use error::DriverError;
pub use sender::{CurlSender, Dispatch, HttpSender, MemorySender, RecordedRequest, Request, RequestSender};
