//! S3 request signing for exception report uploads.
//!
//! This crate holds everything needed to authenticate a single-object `PUT`
//! against AWS S3 (or an S3-compatible store) without an SDK:
//!
//! - [`Credentials`] and the [`Provider`] trait that resolves them, with
//!   [`Static`], [`Dynamic`] and [`Environment`] implementations
//! - [`Address`] describing region, bucket, key prefix and optional endpoint
//! - [`Headers`], an ordered, case-insensitive header mapping
//! - [`signer`], the AWS Signature Version 4 engine producing the
//!   `Authorization` header value
//! - [`Clock`], so callers can freeze time when reproducing signatures
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use exhibit_s3_credentials::{Credentials, Headers, signer};
//!
//! let credentials = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY");
//! let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//!
//! let headers = Headers::new()
//!     .with("Host", "s3.us-east-1.amazonaws.com")
//!     .with("X-Amz-Date", signer::format_timestamp(&time));
//!
//! let authorization = signer::sign(
//!     "PUT",
//!     "/bucket/report.html",
//!     &headers,
//!     signer::UNSIGNED_PAYLOAD,
//!     &credentials,
//!     "us-east-1",
//!     &time,
//! );
//!
//! assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/"));
//! ```

pub mod address;
pub mod clock;
pub mod credentials;
pub mod headers;
pub mod signer;

pub use address::{Address, AddressError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use credentials::{Credentials, CredentialsError, Dynamic, Environment, Provider, Static};
pub use headers::Headers;
pub use signer::{Authorization, CanonicalRequest};
