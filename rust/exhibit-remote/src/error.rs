use std::path::PathBuf;

use exhibit_s3_credentials::{AddressError, CredentialsError};
use thiserror::Error;

/// Failures that prevent a report request from being built.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Could not resolve storage credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Could not derive the report URL: {0}")]
    Address(#[from] AddressError),

    #[error("Report path {} has no usable file name", .0.display())]
    InvalidPath(PathBuf),
}
