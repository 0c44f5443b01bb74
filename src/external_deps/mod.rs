//! Integrations with collaborators outside the session.
//!
//! Currently this is the captcha solver seam. Credential acquisition lives in
//! [`crate::auth`] next to the token holder it feeds.

pub mod captcha;

pub use captcha::{CaptchaChallenge, CaptchaResponse, CaptchaSolver, DeclineCaptcha};
