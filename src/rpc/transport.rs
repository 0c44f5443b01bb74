//! Transport contract used by the session.

use thiserror::Error;

use super::encoder::RequestEnvelope;

/// Synchronous form POST capability.
///
/// Implementations must honour [`RequestEnvelope::timeout`] and return the
/// response even for non-2xx statuses; the session decides what is fatal.
pub trait Transport: Send + Sync {
    fn post_form(&self, envelope: &RequestEnvelope) -> Result<TransportResponse, TransportError>;
}

/// Status and body text of one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Network(String),
    #[error("unexpected http status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("http client initialisation failed: {0}")]
    Client(String),
}
