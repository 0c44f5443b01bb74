//! Access token storage and refresh.
//!
//! The session never reads the token field directly. Every read goes through
//! [`CredentialHolder::get`], which asks the configured [`CredentialSource`]
//! for a new token once the current one has been dropped.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Minimum length for which the masked form keeps a prefix and suffix.
const MASK_VISIBLE_MIN_LEN: usize = 12;

/// Bearer token attached to API calls as `access_token`.
///
/// `Debug` and `Display` only show the masked form.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Empty token, used after invalidation.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw value. Only the request encoder should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Diagnostic form: `abcd***wxyz` for tokens of 12+ characters, `***`
    /// for shorter ones, and an empty string for the empty token.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.is_empty() {
            String::new()
        } else if chars.len() >= MASK_VISIBLE_MIN_LEN {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}***{tail}")
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.masked()).finish()
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Raised by a [`CredentialSource`] that could not produce a token.
#[derive(Debug, Error)]
#[error("authorization error: {0}")]
pub struct AuthError(pub String);

/// Collaborator that obtains a fresh token when the held one is empty.
///
/// Implementations typically run a stored-credential or interactive login.
pub trait CredentialSource: Send + Sync {
    fn acquire(&self, current: &AccessToken) -> Result<AccessToken, AuthError>;
}

impl<F> CredentialSource for F
where
    F: Fn(&AccessToken) -> Result<AccessToken, AuthError> + Send + Sync,
{
    fn acquire(&self, current: &AccessToken) -> Result<AccessToken, AuthError> {
        self(current)
    }
}

/// Default source: hands back whatever is currently held.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepCurrent;

impl CredentialSource for KeepCurrent {
    fn acquire(&self, current: &AccessToken) -> Result<AccessToken, AuthError> {
        log::debug!("no credential source configured, keeping current token");
        Ok(current.clone())
    }
}

/// Owns the current token and the derived refresh flag.
pub struct CredentialHolder {
    token: AccessToken,
    needs_refresh: bool,
    source: Arc<dyn CredentialSource>,
}

impl CredentialHolder {
    pub fn new(token: AccessToken, source: Arc<dyn CredentialSource>) -> Self {
        let needs_refresh = token.is_empty();
        log::debug!("access_token = {:?}", token.masked());
        Self {
            token,
            needs_refresh,
            source,
        }
    }

    /// Returns the current token, acquiring a new one first when the held
    /// value is empty. May call into the credential source.
    pub fn get(&mut self) -> Result<AccessToken, AuthError> {
        if self.needs_refresh {
            log::debug!("access token is missing, asking credential source");
            let fresh = self.source.acquire(&self.token)?;
            self.set(fresh);
        }
        Ok(self.token.clone())
    }

    /// Overwrites the token and recomputes the refresh flag.
    pub fn set(&mut self, token: impl Into<AccessToken>) {
        self.token = token.into();
        self.needs_refresh = self.token.is_empty();
        log::debug!("access_token = {:?}", self.token.masked());
    }

    /// Drops the held token so the next `get` triggers acquisition.
    pub fn invalidate(&mut self) {
        self.set(AccessToken::empty());
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    /// Current value without triggering acquisition.
    pub fn peek(&self) -> &AccessToken {
        &self.token
    }
}

impl fmt::Debug for CredentialHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHolder")
            .field("token", &self.token)
            .field("needs_refresh", &self.needs_refresh)
            .finish()
    }
}
