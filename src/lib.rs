//! # vk-session
//!
//! A synchronous client for the VK method API that hides the two errors a
//! caller can usually recover from: captcha challenges and rejected access
//! tokens.
//!
//! ## Features
//!
//! - Explicit method builders instead of string formatting at call sites
//! - Parameter coercion (booleans, lists, nested objects) to form fields
//! - Tolerant parsing of responses carrying two back-to-back JSON objects
//! - Pluggable captcha solver and credential source
//! - Bounded retries with structured session events
//!
//! ## Example
//!
//! ```no_run
//! use vk_session::{MethodRequest, Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::new("my-access-token")?;
//!     let request = MethodRequest::builder("users", "get")
//!         .param("user_ids", vec![1, 2])
//!         .param("fields", "photo_50")
//!         .build();
//!     let users = session.execute(&request)?;
//!     println!("Users: {users}");
//!     Ok(())
//! }
//! ```

mod session;

pub mod auth;
pub mod external_deps;
pub mod modules;
pub mod rpc;

pub use crate::session::{
    DEFAULT_API_VERSION,
    DEFAULT_MAX_ATTEMPTS,
    DEFAULT_TIMEOUT,
    Session,
    SessionBuilder,
    SessionConfig,
    SessionError,
    SessionResult,
};

pub use crate::auth::{AccessToken, AuthError, CredentialHolder, CredentialSource, KeepCurrent};

pub use crate::external_deps::captcha::{
    CaptchaChallenge,
    CaptchaResponse,
    CaptchaSolver,
    DeclineCaptcha,
};

pub use crate::rpc::{
    ApiError,
    Envelope,
    ErrorCode,
    ErrorKind,
    MethodRequest,
    MethodRequestBuilder,
    Namespace,
    ProtocolError,
    ReqwestTransport,
    RequestEncoder,
    RequestEnvelope,
    Transport,
    TransportError,
    TransportResponse,
    classify,
    json_iter_parse,
};

pub use crate::modules::{
    ErrorEvent,
    EventDispatcher,
    EventHandler,
    LoggingHandler,
    PostResponseEvent,
    PreRequestEvent,
    RetryEvent,
    RetryReason,
    SessionEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
