//! Signature algorithm and verification for the SwapWatch webhook ingress.
//!
//! Every inbound webhook delivery carries an HMAC-SHA256 signature over the
//! raw request body.  The wire format for the header is:
//!
//! ```text
//! Swapwatch-Signature: {unix_timestamp}.{base64_signature}
//! ```
//!
//! where the signature is `HMAC-SHA256("{timestamp}.{raw_body}", secret)`.
//!
//! Verification goes through [`ring::hmac::verify`], which compares in
//! constant time; it is the sole authentication gate for the ingress — no
//! event is routed before its signature checks out.

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Swapwatch-Signature";

/// Maximum allowed age of a signature (in seconds).
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid header format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("signature expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Sign a raw body, returning the full `Swapwatch-Signature` header value
/// (`{timestamp}.{base64}`).
///
/// Used by tests and by clients that emit SwapWatch-compatible deliveries.
pub fn sign_body(body: &str, key: &[u8]) -> String {
    let timestamp = time::OffsetDateTime::now_utc().unix_timestamp();
    sign_body_at(body, key, timestamp)
}

/// Sign a raw body with an explicit timestamp.
pub fn sign_body_at(body: &str, key: &[u8], timestamp: i64) -> String {
    let data = format!("{timestamp}.{body}");
    let sig = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
    );
    format_signature_header(timestamp, sig.as_ref())
}

/// Verify a raw body against a `Swapwatch-Signature` header value.
///
/// Checks `HMAC-SHA256("{timestamp}.{body}", key)` in constant time, then
/// timestamp freshness.  The HMAC check runs first so that an attacker
/// cannot distinguish a stale signature from a forged one without a valid
/// key.
pub fn verify_body(body: &str, header_value: &str, key: &[u8]) -> Result<(), SignatureError> {
    let (timestamp, signature) = parse_signature_header(header_value)?;
    let data = format!("{timestamp}.{body}");
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
        signature.as_ref(),
    )?;
    check_timestamp(timestamp)?;
    Ok(())
}

/// Parse a `Swapwatch-Signature` header value (`{timestamp}.{base64}`) into
/// `(timestamp, raw_signature_bytes)`.
pub fn parse_signature_header(value: &str) -> Result<(i64, Box<[u8]>), SignatureError> {
    let dot_pos = value.find('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp: i64 = value[..dot_pos]
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let signature_bytes = fast32::base64::RFC4648_NOPAD
        .decode_str(&value[dot_pos + 1..])
        .map_err(|_| SignatureError::InvalidBase64)?
        .into_boxed_slice();
    Ok((timestamp, signature_bytes))
}

/// Format a `{timestamp}.{base64}` header value from its parts.
pub fn format_signature_header(timestamp: i64, signature: &[u8]) -> String {
    format!(
        "{}.{}",
        timestamp,
        fast32::base64::RFC4648_NOPAD.encode(signature)
    )
}

/// Check that a signature timestamp is within [`MAX_SIGNATURE_AGE`].
pub fn check_timestamp(timestamp: i64) -> Result<(), SignatureError> {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    if now - timestamp > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}
