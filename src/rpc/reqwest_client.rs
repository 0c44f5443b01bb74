//! Reqwest-based implementation of the [`Transport`] trait.
//!
//! Thin adapter around `reqwest::blocking::Client`. Connection reuse, TLS
//! and cookies are left to reqwest.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};

use super::encoder::RequestEnvelope;
use super::transport::{Transport, TransportError, TransportResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Blocking reqwest client preconfigured for the method API.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing blocking client. Headers are still set per request.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn post_form(&self, envelope: &RequestEnvelope) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(envelope.url.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .timeout(envelope.timeout)
            .body(envelope.form_body())
            .send()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
