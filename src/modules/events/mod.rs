//! Event system for session activity.
//!
//! Provides hooks for logging and custom reactions around each round trip
//! and retry decision.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Emitted right before a request goes to the transport.
#[derive(Debug, Clone)]
pub struct PreRequestEvent {
    pub method: String,
    pub url: Url,
    pub attempt: usize,
    pub with_captcha: bool,
    pub timestamp: DateTime<Utc>,
}

/// Emitted once the transport returned.
#[derive(Debug, Clone)]
pub struct PostResponseEvent {
    pub method: String,
    pub url: Url,
    pub status: u16,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    CaptchaSolved,
    CredentialDropped,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::CaptchaSolved => f.write_str("captcha solved"),
            RetryReason::CredentialDropped => f.write_str("access token dropped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryEvent {
    pub method: String,
    pub attempt: usize,
    pub reason: RetryReason,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub method: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PreRequest(PreRequestEvent),
    PostResponse(PostResponseEvent),
    Retry(RetryEvent),
    Error(ErrorEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SessionEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: SessionEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &SessionEvent) {
        match event {
            SessionEvent::PreRequest(pre) => {
                log::debug!(
                    "-> {} attempt {}{}",
                    pre.method,
                    pre.attempt,
                    if pre.with_captcha { " (captcha)" } else { "" }
                );
            }
            SessionEvent::PostResponse(post) => {
                log::debug!(
                    "<- {} {} ({:.2}s)",
                    post.method,
                    post.status,
                    post.latency.as_secs_f64()
                );
            }
            SessionEvent::Retry(retry) => {
                log::info!("retry {} attempt {}: {}", retry.method, retry.attempt, retry.reason);
            }
            SessionEvent::Error(error) => {
                log::warn!("{} failed: {}", error.method, error.error);
            }
        }
    }
}
