//! Cross-cutting services module
//!
//! Observability hooks that sit next to the session loop.

pub mod events;

pub use events::{
    ErrorEvent, EventDispatcher, EventHandler, LoggingHandler, PostResponseEvent,
    PreRequestEvent, RetryEvent, RetryReason, SessionEvent,
};
