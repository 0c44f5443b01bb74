//! Method call orchestration.
//!
//! Wires together the credential holder, request encoder, transport,
//! response classifier and captcha solver into a session that retries the
//! recoverable API errors (captcha needed, token rejected) on its own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::auth::{AccessToken, AuthError, CredentialHolder, CredentialSource, KeepCurrent};
use crate::external_deps::captcha::{CaptchaResponse, CaptchaSolver, DeclineCaptcha};
use crate::modules::events::{
	ErrorEvent, EventDispatcher, EventHandler, LoggingHandler, PostResponseEvent, PreRequestEvent,
	RetryEvent, RetryReason, SessionEvent,
};
use crate::rpc::{
	ApiError, Envelope, ErrorKind, MethodRequest, ProtocolError, ReqwestTransport, RequestEncoder,
	Transport, TransportError, TransportResponse, classify,
};

pub const DEFAULT_API_VERSION: &str = "5.53";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

static DEFAULT_API_URL: Lazy<Url> =
	Lazy::new(|| Url::parse("https://api.vk.com/method/").expect("default api url is valid"));

/// Result alias used across the session layer.
pub type SessionResult<T> = Result<T, SessionError>;

/// Error surfaced to callers of [`Session::execute`].
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("transport error: {0}")]
	Transport(#[from] TransportError),
	#[error("protocol error: {0}")]
	Protocol(#[from] ProtocolError),
	#[error("api error: {0}")]
	Remote(#[from] ApiError),
	#[error(transparent)]
	Auth(#[from] AuthError),
	#[error("gave up after {attempts} attempt(s), last error: {last}")]
	RetriesExhausted { attempts: usize, last: Box<ApiError> },
	#[error("url parse error: {0}")]
	Url(#[from] url::ParseError),
	#[error("invalid session config: {0}")]
	Config(#[from] serde_json::Error),
}

impl SessionError {
	/// Remote error behind this failure, if the API produced one.
	pub fn api_error(&self) -> Option<&ApiError> {
		match self {
			SessionError::Remote(error) => Some(error),
			SessionError::RetriesExhausted { last, .. } => Some(last),
			_ => None,
		}
	}
}

/// Session configuration used by the builder.
///
/// Deserializable so it can live in a settings file; missing keys take their
/// defaults and `timeout` is given in (fractional) seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	pub api_url: Url,
	#[serde(with = "duration_secs")]
	pub timeout: Duration,
	pub api_version: Option<String>,
	pub default_args: BTreeMap<String, Value>,
	pub max_attempts: usize,
}

impl SessionConfig {
	/// Parses a JSON settings document, e.g. `{"timeout": 2.5, "max_attempts": 3}`.
	pub fn from_json_str(raw: &str) -> SessionResult<Self> {
		let mut config: SessionConfig = serde_json::from_str(raw)?;
		config.max_attempts = config.max_attempts.max(1);
		Ok(config)
	}

	/// Arguments sent with every call: the API version plus `default_args`,
	/// the latter winning on conflict.
	pub fn effective_default_args(&self) -> BTreeMap<String, Value> {
		let mut args = BTreeMap::new();
		if let Some(version) = &self.api_version {
			args.insert("v".to_string(), Value::String(version.clone()));
		}
		args.extend(self.default_args.clone());
		args
	}
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			api_url: (*DEFAULT_API_URL).clone(),
			timeout: DEFAULT_TIMEOUT,
			api_version: Some(DEFAULT_API_VERSION.to_string()),
			default_args: BTreeMap::new(),
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}
}

/// Fluent builder for [`Session`].
pub struct SessionBuilder {
	config: SessionConfig,
	api_url: Option<String>,
	access_token: AccessToken,
	credential_source: Option<Arc<dyn CredentialSource>>,
	captcha_solver: Option<Arc<dyn CaptchaSolver>>,
	transport: Option<Arc<dyn Transport>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	log_events: bool,
}

impl SessionBuilder {
	pub fn new() -> Self {
		Self {
			config: SessionConfig::default(),
			api_url: None,
			access_token: AccessToken::empty(),
			credential_source: None,
			captcha_solver: None,
			transport: None,
			handlers: Vec::new(),
			log_events: true,
		}
	}

	pub fn with_config(mut self, config: SessionConfig) -> Self {
		self.config = config;
		self
	}

	/// Base URL the method name is appended to. A trailing slash is added
	/// when missing.
	pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
		self.api_url = Some(url.into());
		self
	}

	pub fn with_access_token(mut self, token: impl Into<AccessToken>) -> Self {
		self.access_token = token.into();
		self
	}

	pub fn with_credential_source(mut self, source: Arc<dyn CredentialSource>) -> Self {
		self.credential_source = Some(source);
		self
	}

	pub fn with_captcha_solver(mut self, solver: Arc<dyn CaptchaSolver>) -> Self {
		self.captcha_solver = Some(solver);
		self
	}

	pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout = timeout;
		self
	}

	/// Sets the `v` argument. `None` stops sending it.
	pub fn with_api_version(mut self, version: Option<&str>) -> Self {
		self.config.api_version = version.map(str::to_string);
		self
	}

	pub fn with_default_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.config.default_args.insert(key.into(), value.into());
		self
	}

	pub fn with_max_attempts(mut self, attempts: usize) -> Self {
		self.config.max_attempts = attempts.max(1);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn disable_event_logging(mut self) -> Self {
		self.log_events = false;
		self
	}

	pub fn build(self) -> SessionResult<Session> {
		let mut config = self.config;
		if let Some(raw) = self.api_url {
			config.api_url = parse_api_url(&raw)?;
		}
		config.max_attempts = config.max_attempts.max(1);

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestTransport::new()?),
		};

		let mut events = EventDispatcher::new();
		if self.log_events {
			events.register_handler(Arc::new(LoggingHandler));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		let encoder = RequestEncoder::new(
			config.api_url.clone(),
			config.effective_default_args(),
			config.timeout,
		);
		let credentials = CredentialHolder::new(
			self.access_token,
			self.credential_source.unwrap_or_else(|| Arc::new(KeepCurrent)),
		);

		log::debug!(
			"session ready: api_url={} timeout={:?} max_attempts={}",
			config.api_url,
			config.timeout,
			config.max_attempts
		);

		Ok(Session {
			config,
			encoder,
			credentials,
			captcha_solver: self.captcha_solver.unwrap_or_else(|| Arc::new(DeclineCaptcha)),
			transport,
			events,
		})
	}
}

impl Default for SessionBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Method API session.
///
/// Calls take `&mut self`: a session runs one call at a time, and sharing it
/// between threads requires an outer lock.
pub struct Session {
	config: SessionConfig,
	encoder: RequestEncoder,
	credentials: CredentialHolder,
	captcha_solver: Arc<dyn CaptchaSolver>,
	transport: Arc<dyn Transport>,
	events: EventDispatcher,
}

impl Session {
	/// Session with default configuration and the given token.
	pub fn new(access_token: impl Into<AccessToken>) -> SessionResult<Self> {
		SessionBuilder::new().with_access_token(access_token).build()
	}

	pub fn builder() -> SessionBuilder {
		SessionBuilder::new()
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Current token. Asks the credential source first when the held token
	/// has been dropped.
	pub fn access_token(&mut self) -> Result<AccessToken, AuthError> {
		self.credentials.get()
	}

	pub fn set_access_token(&mut self, token: impl Into<AccessToken>) {
		self.credentials.set(token);
	}

	pub fn credentials(&self) -> &CredentialHolder {
		&self.credentials
	}

	/// Calls `request` and returns the `response` payload.
	pub fn execute(&mut self, request: &MethodRequest) -> SessionResult<Value> {
		self.execute_with_captcha(request, None)
	}

	/// Like [`Session::execute`], attaching an already solved captcha to the
	/// first attempt.
	pub fn execute_with_captcha(
		&mut self,
		request: &MethodRequest,
		captcha: Option<CaptchaResponse>,
	) -> SessionResult<Value> {
		log::debug!("prepare api method request {}", request.method());
		let result = self.resolve(request, captcha);
		if let Err(ref err) = result {
			self.events.dispatch(SessionEvent::Error(ErrorEvent {
				method: request.method().to_string(),
				error: err.to_string(),
				timestamp: Utc::now(),
			}));
		}
		result
	}

	fn resolve(
		&mut self,
		request: &MethodRequest,
		mut captcha: Option<CaptchaResponse>,
	) -> SessionResult<Value> {
		let max_attempts = self.config.max_attempts;
		let mut attempt = 0usize;

		loop {
			attempt += 1;

			let pending = captcha.take();
			let response = self.send(request, pending.as_ref(), attempt)?;

			let error = match classify(&response.body)? {
				Envelope::Success(payload) => return Ok(payload),
				Envelope::Error(error) => error,
			};

			let reason = match error.kind() {
				ErrorKind::CaptchaNeeded => {
					let Some(challenge) = error.captcha_challenge() else {
						log::warn!("captcha requested without sid or image");
						return Err(SessionError::Remote(error));
					};
					if attempt >= max_attempts {
						return Err(exhausted(attempt, error));
					}
					let Some(key) = self.captcha_solver.solve(&challenge) else {
						log::debug!("captcha solver {} declined", self.captcha_solver.name());
						return Err(SessionError::Remote(error));
					};
					captcha = Some(CaptchaResponse::new(challenge.sid, key));
					RetryReason::CaptchaSolved
				}
				ErrorKind::CredentialIncorrect => {
					log::info!("authorization failed, access token will be dropped");
					self.credentials.invalidate();
					if attempt >= max_attempts {
						return Err(exhausted(attempt, error));
					}
					RetryReason::CredentialDropped
				}
				ErrorKind::Other => return Err(SessionError::Remote(error)),
			};

			self.events.dispatch(SessionEvent::Retry(RetryEvent {
				method: request.method().to_string(),
				attempt: attempt + 1,
				reason,
				timestamp: Utc::now(),
			}));
		}
	}

	fn send(
		&mut self,
		request: &MethodRequest,
		captcha: Option<&CaptchaResponse>,
		attempt: usize,
	) -> SessionResult<TransportResponse> {
		let token = self.credentials.get()?;
		let envelope = self.encoder.encode(request, &token, captcha)?;

		self.events.dispatch(SessionEvent::PreRequest(PreRequestEvent {
			method: envelope.method.clone(),
			url: envelope.url.clone(),
			attempt,
			with_captcha: captcha.is_some(),
			timestamp: Utc::now(),
		}));

		let started = Instant::now();
		let response = self.transport.post_form(&envelope)?;
		let latency = started.elapsed();

		self.events.dispatch(SessionEvent::PostResponse(PostResponseEvent {
			method: envelope.method.clone(),
			url: envelope.url,
			status: response.status,
			latency,
			timestamp: Utc::now(),
		}));

		if !response.is_success() {
			return Err(TransportError::Status {
				status: response.status,
				body: response.body,
			}
			.into());
		}

		Ok(response)
	}
}

fn exhausted(attempts: usize, last: ApiError) -> SessionError {
	SessionError::RetriesExhausted {
		attempts,
		last: Box::new(last),
	}
}

mod duration_secs {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_f64(value.as_secs_f64())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let secs = f64::deserialize(deserializer)?;
		Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
	}
}

fn parse_api_url(raw: &str) -> Result<Url, url::ParseError> {
	if raw.ends_with('/') {
		Url::parse(raw)
	} else {
		Url::parse(&format!("{raw}/"))
	}
}
