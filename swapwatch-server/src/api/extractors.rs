//! Custom Axum extractors for webhook authentication.
//!
//! Provides `VerifiedWebhook` — resolves the `{provider}` path segment to
//! its configured signing secret, verifies the `Swapwatch-Signature` header
//! against the raw request body, and only then parses the body as a
//! [`SwapEvent`].  Nothing downstream of this extractor ever sees an
//! unauthenticated event.
//!
//! All cryptographic operations are delegated to [`swapwatch_sdk::signature`].

use axum::{
    RequestPartsExt,
    extract::{FromRequest, Path, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use swapwatch_sdk::objects::SwapEvent;
use swapwatch_sdk::signature::{self, SIGNATURE_HEADER, SignatureError};

use crate::state::AppState;

/// Webhook bodies above this size are rejected outright.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// An Axum extractor that authenticates and parses a webhook delivery.
///
/// # Header format
///
/// ```text
/// Swapwatch-Signature: {unix_timestamp}.{base64_signature}
/// ```
///
/// The signature is computed as
/// `HMAC-SHA256("{timestamp}.{raw_body}", provider_secret)`.
pub struct VerifiedWebhook {
    pub provider: String,
    pub event: SwapEvent,
}

/// Errors that can occur during webhook verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifiedWebhookError {
    #[error("unknown webhook provider")]
    UnknownProvider,
    #[error("missing Swapwatch-Signature header")]
    MissingHeader,
    #[error("invalid Swapwatch-Signature header format")]
    InvalidHeader,
    #[error("invalid signature encoding")]
    InvalidBase64,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
}

impl From<SignatureError> for VerifiedWebhookError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat => Self::InvalidHeader,
            SignatureError::InvalidBase64 => Self::InvalidBase64,
            SignatureError::SignatureMismatch | SignatureError::Expired => Self::VerificationFailed,
        }
    }
}

impl IntoResponse for VerifiedWebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            VerifiedWebhookError::UnknownProvider => {
                (StatusCode::NOT_FOUND, "unknown webhook provider")
            }
            VerifiedWebhookError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "missing Swapwatch-Signature header")
            }
            VerifiedWebhookError::InvalidHeader => (
                StatusCode::BAD_REQUEST,
                "invalid Swapwatch-Signature header format",
            ),
            VerifiedWebhookError::InvalidBase64 => {
                (StatusCode::BAD_REQUEST, "invalid signature encoding")
            }
            VerifiedWebhookError::BodyReadError => {
                (StatusCode::BAD_REQUEST, "failed to read request body")
            }
            VerifiedWebhookError::JsonError(_) => (StatusCode::BAD_REQUEST, "invalid JSON body"),
            VerifiedWebhookError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "signature verification failed")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequest<AppState> for VerifiedWebhook {
    type Rejection = VerifiedWebhookError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let Path(provider) = parts
            .extract::<Path<String>>()
            .await
            .map_err(|_| VerifiedWebhookError::UnknownProvider)?;

        let header_value = parts
            .headers
            .get(SIGNATURE_HEADER)
            .ok_or(VerifiedWebhookError::MissingHeader)?
            .to_str()
            .map_err(|_| VerifiedWebhookError::InvalidHeader)?
            .to_owned();

        let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| VerifiedWebhookError::BodyReadError)?;
        let raw_body = String::from_utf8(body_bytes.to_vec())
            .map_err(|_| VerifiedWebhookError::BodyReadError)?;

        // Authenticate before parsing: the secret lookup and HMAC check
        // gate everything else, including the index lookup downstream.
        {
            let webhook = state.config.webhook.read().await;
            let secret = webhook
                .secret_for(&provider)
                .ok_or(VerifiedWebhookError::UnknownProvider)?;
            signature::verify_body(&raw_body, &header_value, secret)?;
        }

        let event: SwapEvent =
            serde_json::from_str(&raw_body).map_err(VerifiedWebhookError::JsonError)?;

        Ok(VerifiedWebhook { provider, event })
    }
}
