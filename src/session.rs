//! Signed-in session: bearer token persistence and display-only decoding.
//!
//! DESIGN
//! ======
//! The backend is the only authority on a token. The payload is decoded here
//! purely to show who is signed in and to drop tokens that have visibly
//! expired; the signature is never checked.
//!
//! The context is passed explicitly to whatever needs the token. Storage is
//! behind [`TokenStore`] so tests run against memory instead of the user's
//! config directory.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::net::types::Role;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token: {0}")]
    Decode(String),
    #[error("token expired")]
    Expired,
    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identity claims carried in the token payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Payload as issued. `id` wins over the standard `sub` when both are present.
#[derive(Deserialize)]
struct Claims {
    id: Option<String>,
    sub: Option<String>,
    email: String,
    role: Role,
    #[serde(default)]
    name: String,
    exp: Option<i64>,
}

impl TryFrom<Claims> for Session {
    type Error = SessionError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .id
            .or(claims.sub)
            .ok_or_else(|| SessionError::Decode("payload claims: missing `id` or `sub`".into()))?;
        Ok(Self { id, email: claims.email, role: claims.role, name: claims.name, exp: claims.exp })
    }
}

impl Session {
    /// A token with no `exp` never expires client-side.
    #[must_use]
    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }
}

/// Decode the payload segment of a `header.payload.signature` token.
///
/// Accepts both base64url and standard alphabets, padded or not.
///
/// # Errors
///
/// Returns [`SessionError::Decode`] if the token is not three segments or the
/// payload is not base64-encoded JSON with the expected claims.
pub fn decode_token(token: &str) -> Result<Session, SessionError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::Decode("expected three dot-separated segments".into()));
    };

    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| SessionError::Decode(format!("payload is not base64: {e}")))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| SessionError::Decode(format!("payload claims: {e}")))?;
    Session::try_from(claims)
}

/// Decode and reject a token that has already expired.
///
/// # Errors
///
/// Returns [`SessionError::Decode`] or [`SessionError::Expired`].
pub fn validate_token(token: &str, now_secs: i64) -> Result<Session, SessionError> {
    let session = decode_token(token)?;
    if session.is_expired(now_secs) {
        return Err(SessionError::Expired);
    }
    Ok(session)
}

// =============================================================================
// STORAGE
// =============================================================================

/// Where the bearer token lives between runs.
pub trait TokenStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the store exists but cannot be read.
    fn load(&self) -> Result<Option<String>, SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the token cannot be written.
    fn save(&self, token: &str) -> Result<(), SessionError>;

    /// Removing an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the token cannot be removed.
    fn clear(&self) -> Result<(), SessionError>;
}

/// One token per file.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_owned())) }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &str) -> Result<(), SessionError> {
        *self.slot() = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot() = None;
        Ok(())
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// The current token and the identity decoded from it.
pub struct SessionContext<S: TokenStore> {
    store: S,
    current: Option<(String, Session)>,
}

impl<S: TokenStore> SessionContext<S> {
    /// Rebuild the session from whatever the store holds.
    ///
    /// A stored token that no longer decodes or has expired is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the store cannot be read or cleared.
    pub fn restore(store: S, now_secs: i64) -> Result<Self, SessionError> {
        let current = match store.load()? {
            Some(token) => match validate_token(&token, now_secs) {
                Ok(session) => Some((token, session)),
                Err(e) => {
                    warn!(error = %e, "discarding stored token");
                    store.clear()?;
                    None
                }
            },
            None => None,
        };
        Ok(Self { store, current })
    }

    /// Accept a token issued by the backend and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Decode`] or [`SessionError::Expired`] without
    /// touching the store, or [`SessionError::Io`] if saving fails.
    pub fn login(&mut self, token: &str, now_secs: i64) -> Result<&Session, SessionError> {
        let token = token.trim();
        let session = validate_token(token, now_secs)?;
        self.store.save(token)?;
        info!(user_id = %session.id, role = %session.role, "signed in");
        let (_, session) = self.current.insert((token.to_owned(), session));
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the stored token cannot be removed.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.current = None;
        self.store.clear()?;
        info!("signed out");
        Ok(())
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref().map(|(_, session)| session)
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|(token, _)| token.as_str())
    }
}
