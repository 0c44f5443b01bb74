//! Remote error envelope and the code taxonomy the session reacts to.

use std::fmt;

use serde_json::{Map, Value};

use crate::external_deps::captcha::CaptchaChallenge;

/// Numeric error codes with their documented names. Only
/// [`ErrorCode::CAPTCHA_NEEDED`], [`ErrorCode::AUTHORIZATION_FAILED`] and
/// [`ErrorCode::ACCESS_DENIED`] change the session's behaviour.
pub struct ErrorCode;

impl ErrorCode {
    pub const UNKNOWN: i64 = 1;
    pub const AUTHORIZATION_FAILED: i64 = 5;
    pub const TOO_MANY_REQUESTS: i64 = 6;
    pub const FLOOD_CONTROL: i64 = 9;
    pub const INTERNAL_SERVER_ERROR: i64 = 10;
    pub const CAPTCHA_NEEDED: i64 = 14;
    pub const ACCESS_DENIED: i64 = 15;
    pub const VALIDATION_REQUIRED: i64 = 17;
    pub const INVALID_PARAMETER: i64 = 100;
    pub const INVALID_USER_ID: i64 = 113;

    const NAMES: &'static [(i64, &'static str)] = &[
        (Self::UNKNOWN, "unknown error"),
        (Self::AUTHORIZATION_FAILED, "user authorization failed"),
        (Self::TOO_MANY_REQUESTS, "too many requests per second"),
        (Self::FLOOD_CONTROL, "flood control"),
        (Self::INTERNAL_SERVER_ERROR, "internal server error"),
        (Self::CAPTCHA_NEEDED, "captcha needed"),
        (Self::ACCESS_DENIED, "access denied"),
        (Self::VALIDATION_REQUIRED, "validation required"),
        (Self::INVALID_PARAMETER, "invalid parameter"),
        (Self::INVALID_USER_ID, "invalid user id"),
    ];

    /// Documented name for `code`, if it is one the crate knows.
    pub fn name(code: i64) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| *name)
    }
}

/// How the session treats a remote error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CaptchaNeeded,
    CredentialIncorrect,
    Other,
}

/// Error object returned by the API under the `error` key.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    code: i64,
    message: String,
    data: Map<String, Value>,
}

impl ApiError {
    /// Builds the error from the value stored under `error`. Non-object
    /// values produce an error with code 0 and the value as its message.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => {
                let code = data.get("error_code").and_then(Value::as_i64).unwrap_or(0);
                let message = data
                    .get("error_msg")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Self {
                    code,
                    message,
                    data,
                }
            }
            other => Self {
                code: 0,
                message: other.to_string(),
                data: Map::new(),
            },
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The full error object, auxiliary fields included.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn code_name(&self) -> Option<&'static str> {
        ErrorCode::name(self.code)
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_captcha_needed() {
            ErrorKind::CaptchaNeeded
        } else if self.is_access_token_incorrect() {
            ErrorKind::CredentialIncorrect
        } else {
            ErrorKind::Other
        }
    }

    pub fn is_captcha_needed(&self) -> bool {
        self.code == ErrorCode::CAPTCHA_NEEDED
    }

    /// Code 5 always means the token was rejected; code 15 only when the
    /// message names the token.
    pub fn is_access_token_incorrect(&self) -> bool {
        self.code == ErrorCode::AUTHORIZATION_FAILED
            || (self.code == ErrorCode::ACCESS_DENIED && self.message.contains("access_token"))
    }

    pub fn captcha_sid(&self) -> Option<String> {
        self.data.get("captcha_sid").and_then(scalar_to_string)
    }

    pub fn captcha_img(&self) -> Option<String> {
        self.data.get("captcha_img").and_then(scalar_to_string)
    }

    /// Captcha carried by this error, when both sid and image are present.
    pub fn captcha_challenge(&self) -> Option<CaptchaChallenge> {
        Some(CaptchaChallenge::new(self.captcha_sid()?, self.captcha_img()?))
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.data.get("redirect_uri").and_then(Value::as_str)
    }

    /// The `request_params` echo as `(key, value)` pairs.
    pub fn request_params(&self) -> Vec<(String, String)> {
        self.data
            .get("request_params")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|param| {
                        let key = param.get("key").and_then(scalar_to_string)?;
                        let value = param.get("value").and_then(scalar_to_string)?;
                        Some((key, value))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}. request_params = {{", self.code, self.message)?;
        for (index, (key, value)) in self.request_params().iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key:?}: {value:?}")?;
        }
        f.write_str("}")?;
        if let Some(uri) = self.redirect_uri() {
            write!(f, ",\nredirect_uri = \"{uri}\"")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
