//! AWS Signature Version 4 for header-authenticated S3 requests.
//!
//! Produces the `Authorization` header value for a request whose headers are
//! already known. Only the headers handed to the signer are signed, so
//! anything appended afterwards (such as `Content-Type`) travels unsigned.
//! No query parameters are ever signed and the payload hash is expected to
//! be [`UNSIGNED_PAYLOAD`], which spares reading the body before transport.
//!
//! See [Signature Version 4 signing process].
//!
//! [Signature Version 4 signing process]: https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::{Credentials, Headers};

// AWS S3 Signing Constants
pub const ALGORITHM_IDENTIFIER: &str = "AWS4-HMAC-SHA256";
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
pub const SERVICE: &str = "s3";
pub const KEY_TYPE_IDENTIFIER: &str = "aws4_request";
pub const PUBLIC_READ: &str = "public-read";

pub const HOST_HEADER: &str = "Host";
pub const USER_AGENT_HEADER: &str = "User-Agent";
pub const ACL_HEADER: &str = "X-Amz-ACL";
pub const CONTENT_SHA256_HEADER: &str = "X-Amz-Content-Sha256";
pub const DATE_HEADER: &str = "X-Amz-Date";
pub const SECURITY_TOKEN_HEADER: &str = "X-Amz-Security-Token";
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Format timestamp in the format required by AWS (`YYYYMMDDTHHMMSSZ`).
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format the date part used in the credential scope (`YYYYMMDD`).
pub fn format_date(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%d").to_string()
}

/// Calculate credential scope: `{date}/{region}/s3/aws4_request`.
pub fn credential_scope(time: &DateTime<Utc>, region: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        format_date(time),
        region,
        SERVICE,
        KEY_TYPE_IDENTIFIER
    )
}

/// The canonical form of a request, as hashed into the string to sign.
///
/// Header values are used exactly as supplied; callers are expected to hand
/// in already normalized values.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalRequest<'a> {
    method: &'a str,
    path: &'a str,
    headers: &'a Headers,
    payload_hash: &'a str,
}

impl<'a> CanonicalRequest<'a> {
    /// Describe a request to be signed.
    pub fn new(method: &'a str, path: &'a str, headers: &'a Headers, payload_hash: &'a str) -> Self {
        Self {
            method,
            path,
            headers,
            payload_hash,
        }
    }

    /// Headers with lower-cased names, sorted by name.
    fn sorted_headers(&self) -> Vec<(String, &'a str)> {
        let mut headers: Vec<(String, &'a str)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        headers.sort_by(|a, b| a.0.cmp(&b.0));
        headers
    }

    /// Lower-cased header names, sorted and joined with `;`.
    pub fn signed_header_names(&self) -> String {
        self.sorted_headers()
            .into_iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// `name:value` lines in signed header order, joined with newlines.
    pub fn signed_header_lines(&self) -> String {
        self.sorted_headers()
            .into_iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Hex encoded SHA-256 of the canonical request.
    pub fn digest(&self) -> String {
        hex_encode(&Sha256::digest(self.to_string().as_bytes()))
    }
}

impl fmt::Display for CanonicalRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the query string component is always empty
        write!(
            f,
            "{}\n{}\n\n{}\n\n{}\n{}",
            self.method,
            self.path,
            self.signed_header_lines(),
            self.signed_header_names(),
            self.payload_hash
        )
    }
}

/// Create the string to sign for a canonical request.
pub fn string_to_sign(request: &CanonicalRequest<'_>, time: &DateTime<Utc>, scope: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM_IDENTIFIER,
        format_timestamp(time),
        scope,
        request.digest()
    )
}

/// AWS SigV4 signing key derived from credentials.
///
/// The key is derived through an HMAC chain:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
#[derive(Debug, Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Derive a signing key using the AWS4 key derivation algorithm.
    pub fn derive(secret: &str, date: &str, region: &str, service: &str) -> Self {
        let secret = format!("AWS4{}", secret);
        let k_date = Self::hmac(secret.as_bytes(), date.as_bytes());
        let k_region = Self::hmac(&k_date, region.as_bytes());
        let k_service = Self::hmac(&k_region, service.as_bytes());
        Self(Self::hmac(&k_service, KEY_TYPE_IDENTIFIER.as_bytes()))
    }

    /// Compute HMAC-SHA256.
    fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    /// Sign data using this key.
    pub fn sign(&self, data: &[u8]) -> Signature {
        Signature(Self::hmac(&self.0, data))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// HMAC-SHA256 signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl fmt::Display for Signature {
    /// Displays hex encoded representation of the signature
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

/// The parts of a SigV4 `Authorization` header.
///
/// Renders as `AWS4-HMAC-SHA256 Credential={key}/{scope}, SignedHeaders={names}, Signature={hex}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Access key the request is signed with
    pub access_key_id: String,
    /// Credential scope (`{date}/{region}/s3/aws4_request`)
    pub scope: String,
    /// Sorted, `;`-joined lower-cased names of the signed headers
    pub signed_headers: String,
    /// Hex encoded signature
    pub signature: String,
}

impl Authorization {
    /// Sign a canonical request.
    pub fn create(
        request: &CanonicalRequest<'_>,
        credentials: &Credentials,
        region: &str,
        time: &DateTime<Utc>,
    ) -> Self {
        let scope = credential_scope(time, region);
        let signed_headers = request.signed_header_names();
        tracing::trace!(%scope, %signed_headers, "signing request");

        let key = SigningKey::derive(
            credentials.secret_access_key(),
            &format_date(time),
            region,
            SERVICE,
        );
        let signature = key.sign(string_to_sign(request, time, &scope).as_bytes());

        Self {
            access_key_id: credentials.access_key_id().to_string(),
            scope,
            signed_headers,
            signature: signature.to_string(),
        }
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM_IDENTIFIER, self.access_key_id, self.scope, self.signed_headers, self.signature
        )
    }
}

/// Compute the `Authorization` header value for a request.
pub fn sign(
    method: &str,
    path: &str,
    headers: &Headers,
    payload_hash: &str,
    credentials: &Credentials,
    region: &str,
    time: &DateTime<Utc>,
) -> String {
    let request = CanonicalRequest::new(method, path, headers, payload_hash);
    Authorization::create(&request, credentials, region, time).to_string()
}

/// Hex-encode bytes (lowercase).
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(result, "{:02x}", byte).unwrap();
    }
    result
}

/// Percent-encode everything but RFC 3986 unreserved characters.
pub fn percent_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                write!(result, "%{:02X}", byte).unwrap();
            }
        }
    }
    result
}

/// Percent-encode a URL path (preserving slashes).
pub fn percent_encode_path(path: &str) -> String {
    path.split('/')
        .map(percent_encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";
    const SECRET_ACCESS_KEY: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";

    fn time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn headers() -> Headers {
        Headers::new()
            .with(HOST_HEADER, "s3.us-east-1.amazonaws.com")
            .with(USER_AGENT_HEADER, "Exhibit")
            .with(ACL_HEADER, PUBLIC_READ)
            .with(CONTENT_SHA256_HEADER, UNSIGNED_PAYLOAD)
            .with(DATE_HEADER, format_timestamp(&time()))
    }

    #[test]
    fn it_produces_the_canonical_request() {
        let headers = headers();
        let request = CanonicalRequest::new(
            "PUT",
            "/bucket/prefixABCDEF1234.html",
            &headers,
            UNSIGNED_PAYLOAD,
        );

        assert_eq!(
            request.to_string(),
            "PUT\n/bucket/prefixABCDEF1234.html\n\nhost:s3.us-east-1.amazonaws.com\nuser-agent:Exhibit\nx-amz-acl:public-read\nx-amz-content-sha256:UNSIGNED-PAYLOAD\nx-amz-date:20240101T000000Z\n\nhost;user-agent;x-amz-acl;x-amz-content-sha256;x-amz-date\nUNSIGNED-PAYLOAD"
        );

        assert_eq!(
            string_to_sign(&request, &time(), &credential_scope(&time(), "us-east-1")),
            "AWS4-HMAC-SHA256\n20240101T000000Z\n20240101/us-east-1/s3/aws4_request\n497276eb6882d862ab2ee014715eb0e959803205d126fb3510280375299b706a"
        );
    }

    #[test]
    fn it_produces_a_reproducible_authorization() {
        let credentials = Credentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY);

        let authorization = sign(
            "PUT",
            "/bucket/prefixABCDEF1234.html",
            &headers(),
            UNSIGNED_PAYLOAD,
            &credentials,
            "us-east-1",
            &time(),
        );

        assert_eq!(
            authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/s3/aws4_request, SignedHeaders=host;user-agent;x-amz-acl;x-amz-content-sha256;x-amz-date, Signature=23ec8297600a47747c15e7514b1ff118887938bf2052800195513a60ae8248d3"
        );
    }

    #[test]
    fn it_signs_the_session_token() {
        let credentials =
            Credentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY).with_session_token("session-token");
        let headers = headers().with(SECURITY_TOKEN_HEADER, "session-token");

        let authorization = sign(
            "PUT",
            "/bucket/prefixABCDEF1234.html",
            &headers,
            UNSIGNED_PAYLOAD,
            &credentials,
            "us-east-1",
            &time(),
        );

        assert_eq!(
            authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/s3/aws4_request, SignedHeaders=host;user-agent;x-amz-acl;x-amz-content-sha256;x-amz-date;x-amz-security-token, Signature=f43a0fe4cfa599dd029024035d110a219d45a08c8b43b6a06311ed9370a6fe1b"
        );
    }

    #[test]
    fn it_derives_the_signing_key() {
        let key = SigningKey::derive(SECRET_ACCESS_KEY, "20240101", "us-east-1", SERVICE);
        let expected: [u8; 32] = [
            35, 34, 36, 80, 191, 73, 76, 132, 23, 118, 169, 3, 78, 15, 150, 194, 134, 66, 246, 98,
            24, 23, 245, 69, 212, 18, 80, 69, 157, 25, 159, 96,
        ];
        assert_eq!(key.as_bytes(), expected);

        let key = SigningKey::derive("top secret", "20250507", "auto", SERVICE);
        let expected: [u8; 32] = [
            79, 106, 222, 178, 108, 52, 104, 178, 205, 22, 58, 104, 193, 109, 221, 37, 179, 183,
            58, 87, 9, 22, 242, 56, 155, 133, 98, 156, 239, 136, 247, 8,
        ];
        assert_eq!(key.as_bytes(), expected);
    }

    #[test]
    fn it_sorts_header_names_case_insensitively() {
        let headers = Headers::new()
            .with("Host", "example.com")
            .with("X-Amz-Date", "20240101T000000Z")
            .with("user-agent", "Exhibit");
        let request = CanonicalRequest::new("PUT", "/", &headers, UNSIGNED_PAYLOAD);

        assert_eq!(request.signed_header_names(), "host;user-agent;x-amz-date");
        assert_eq!(
            request.signed_header_lines(),
            "host:example.com\nuser-agent:Exhibit\nx-amz-date:20240101T000000Z"
        );
    }

    #[test]
    fn it_uses_header_values_verbatim() {
        let headers = Headers::new().with("Host", "  example.com ");
        let request = CanonicalRequest::new("PUT", "/", &headers, UNSIGNED_PAYLOAD);

        assert_eq!(request.signed_header_lines(), "host:  example.com ");
    }

    #[test]
    fn it_only_signs_headers_present_at_signing_time() {
        let credentials = Credentials::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY);
        let mut headers = headers();
        let authorization = sign(
            "PUT",
            "/bucket/key.html",
            &headers,
            UNSIGNED_PAYLOAD,
            &credentials,
            "us-east-1",
            &time(),
        );
        headers.insert(CONTENT_TYPE_HEADER, "text/html; charset=utf-8");

        assert!(!authorization.contains("content-type"));
        assert!(headers.contains(CONTENT_TYPE_HEADER));
    }

    #[test]
    fn it_can_derive_a_scope_from_inputs() {
        let time = Utc.with_ymd_and_hms(2022, 1, 1, 12, 30, 0).unwrap();
        assert_eq!(
            credential_scope(&time, "us-east-1"),
            "20220101/us-east-1/s3/aws4_request"
        );
    }

    #[test]
    fn it_formats_timestamps() {
        let time = Utc.with_ymd_and_hms(2025, 5, 7, 5, 48, 59).unwrap();
        assert_eq!(format_timestamp(&time), "20250507T054859Z");
        assert_eq!(format_date(&time), "20250507");
    }

    #[test]
    fn it_percent_encodes_path_segments() {
        assert_eq!(percent_encode("env=prod(1)"), "env%3Dprod%281%29");
        assert_eq!(percent_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(percent_encode("caf\u{e9} +"), "caf%C3%A9%20%2B");
        assert_eq!(
            percent_encode_path("/bucket/env=prod(1)/key.html"),
            "/bucket/env%3Dprod%281%29/key.html"
        );
    }

    #[test]
    fn it_encodes_bytes_as_lowercase_hex() {
        let bytes = [0x01, 0x02, 0x03, 0x0A, 0x0F];
        assert_eq!(hex_encode(&bytes), "0102030a0f");
    }
}
