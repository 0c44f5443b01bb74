//! Turns a [`MethodRequest`] into the form POST handed to the transport.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use url::Url;
use url::form_urlencoded;

use crate::auth::AccessToken;
use crate::external_deps::captcha::CaptchaResponse;

use super::params::stringify_values;
use super::types::MethodRequest;

/// Everything the transport needs for one call.
#[derive(Clone, PartialEq)]
pub struct RequestEnvelope {
    pub method: String,
    pub url: Url,
    pub fields: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl RequestEnvelope {
    /// `application/x-www-form-urlencoded` body, keys in sorted order.
    pub fn form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

impl std::fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: BTreeMap<&str, String> = self
            .fields
            .iter()
            .map(|(key, value)| {
                let shown = if key == "access_token" {
                    AccessToken::new(value.as_str()).masked()
                } else {
                    value.clone()
                };
                (key.as_str(), shown)
            })
            .collect();
        f.debug_struct("RequestEnvelope")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("fields", &fields)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Pure encoder: the same inputs always yield the same envelope.
#[derive(Debug, Clone)]
pub struct RequestEncoder {
    api_url: Url,
    default_args: BTreeMap<String, Value>,
    timeout: Duration,
}

impl RequestEncoder {
    pub fn new(api_url: Url, default_args: BTreeMap<String, Value>, timeout: Duration) -> Self {
        Self {
            api_url,
            default_args,
            timeout,
        }
    }

    pub fn encode(
        &self,
        request: &MethodRequest,
        token: &AccessToken,
        captcha: Option<&CaptchaResponse>,
    ) -> Result<RequestEnvelope, url::ParseError> {
        let url = self.api_url.join(request.method())?;

        let mut fields = stringify_values(&self.default_args);
        fields.extend(stringify_values(request.params()));

        if !token.is_empty() {
            fields.insert("access_token".into(), token.expose().to_string());
        }
        if let Some(captcha) = captcha {
            fields.insert("captcha_sid".into(), captcha.sid.clone());
            fields.insert("captcha_key".into(), captcha.key.clone());
        }

        Ok(RequestEnvelope {
            method: request.method().to_string(),
            url,
            fields,
            timeout: self.timeout,
        })
    }
}
