//! Stable names for exception reports.
//!
//! A chain is reduced to a canonical JSON encoding holding, per frame, the
//! type tag, message, code, location and the stack without argument values.
//! The first ten hex characters of its MD5 digest form the [`Fingerprint`],
//! and the [`ArtifactName`] combines it with the calendar date:
//!
//! ```text
//! exception--2024-01-01--55db5d60e0.html
//! ```
//!
//! Fingerprints are opaque identifiers, stable for this encoding only.

use std::fmt;

use chrono::NaiveDate;
use md5::{Digest, Md5};
use serde::Serialize;

use crate::{ExceptionChain, ExceptionFrame, StackEntry};

/// Hex characters kept from the digest.
pub const FINGERPRINT_LENGTH: usize = 10;

/// Short hex identifier of an exception chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File name of a report: `exception--{date}--{fingerprint}.html`.
///
/// Used both as the local file name and as the seed of the remote path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn new(date: NaiveDate, fingerprint: &Fingerprint) -> Self {
        Self(format!(
            "exception--{}--{}.html",
            date.format("%Y-%m-%d"),
            fingerprint
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ArtifactName> for String {
    fn from(name: ArtifactName) -> Self {
        name.0
    }
}

/// `[file, line, function, class, call_type]`
type CanonicalEntry<'a> = (&'a str, u32, &'a str, &'a str, &'a str);

/// `[kind, message, code, file, line, trace]`
type CanonicalFrame<'a> = (&'a str, &'a str, i64, &'a str, u32, Vec<CanonicalEntry<'a>>);

fn canonical_entry(entry: &StackEntry) -> CanonicalEntry<'_> {
    (
        entry.file.as_deref().unwrap_or_default(),
        entry.line.unwrap_or_default(),
        entry.function.as_deref().unwrap_or_default(),
        entry.class.as_deref().unwrap_or_default(),
        entry.call_type.as_deref().unwrap_or_default(),
    )
}

fn canonical_frame(frame: &ExceptionFrame) -> CanonicalFrame<'_> {
    (
        frame.kind.as_str(),
        frame.message.as_str(),
        frame.code,
        frame.file.as_deref().unwrap_or_default(),
        frame.line.unwrap_or_default(),
        frame.trace.iter().map(canonical_entry).collect(),
    )
}

/// The bytes hashed into a fingerprint.
pub fn canonical_encoding(chain: &ExceptionChain) -> Vec<u8> {
    let frames: Vec<CanonicalFrame<'_>> = chain.iter().map(canonical_frame).collect();
    encode(&frames)
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // strings, integers and sequences only; serializing them cannot fail
    serde_json::to_vec(value).unwrap_or_default()
}

/// Fingerprint an exception chain.
pub fn fingerprint(chain: &ExceptionChain) -> Fingerprint {
    let digest = Md5::digest(canonical_encoding(chain));
    let mut hex = exhibit_s3_credentials::signer::hex_encode(&digest);
    hex.truncate(FINGERPRINT_LENGTH);
    Fingerprint(hex)
}

/// Name of the report for `chain` produced on `date`.
pub fn artifact_name(chain: &ExceptionChain, date: NaiveDate) -> ArtifactName {
    ArtifactName::new(date, &fingerprint(chain))
}
