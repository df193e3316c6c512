//! Session context: where the bearer token lives and where the user is sent
//! when it is missing or rejected.
//!
//! # Design
//! The client never touches storage or navigation directly. It talks to a
//! `SessionContext`, so the expiry handling can run against `MemorySession`
//! in tests and against `FileSession` when the token has to outlive the
//! process. Every mutation is a plain overwrite or delete; two requests that
//! both hit a 401 may both clear and redirect, and the end state is the same.
//!
//! Session calls are synchronous and run inline on the caller's task.
//! `FileSession` therefore does blocking file I/O on the async runtime; the
//! file holds a single short token, so each call is one small read or write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, warn};

use crate::error::ApiError;

/// Token storage plus navigation, as seen by `TaskboardClient`.
pub trait SessionContext: Send + Sync {
    /// The stored bearer token, if any.
    fn token(&self) -> Option<String>;

    /// Store `token`, replacing any previous one. Fails only when durable
    /// storage cannot be written; the previous token is then left as it was.
    fn set_token(&self, token: &str) -> Result<(), ApiError>;

    /// Delete the stored token. A no-op when none is stored.
    fn clear_token(&self);

    /// Move navigation to `location` (the login view).
    fn redirect_to_login(&self, location: &str);
}

impl<S: SessionContext + ?Sized> SessionContext for Arc<S> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn set_token(&self, token: &str) -> Result<(), ApiError> {
        (**self).set_token(token)
    }

    fn clear_token(&self) {
        (**self).clear_token()
    }

    fn redirect_to_login(&self, location: &str) {
        (**self).redirect_to_login(location)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    location: Option<String>,
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local session: token and location held in memory.
#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<SessionState>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let session = Self::default();
        lock(&session.state).token = Some(token.to_string());
        session
    }

    /// Last navigation target written by `redirect_to_login`.
    pub fn location(&self) -> Option<String> {
        lock(&self.state).location.clone()
    }
}

impl SessionContext for MemorySession {
    fn token(&self) -> Option<String> {
        lock(&self.state).token.clone()
    }

    fn set_token(&self, token: &str) -> Result<(), ApiError> {
        lock(&self.state).token = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) {
        lock(&self.state).token = None;
    }

    fn redirect_to_login(&self, location: &str) {
        lock(&self.state).location = Some(location.to_string());
    }
}

/// Durable session: the token is kept in a file and survives restarts
/// until it is explicitly cleared. Navigation is tracked in memory.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    location: Mutex<Option<String>>,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            location: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn location(&self) -> Option<String> {
        self.location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionContext for FileSession {
    fn token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read session token");
                None
            }
        }
    }

    fn set_token(&self, token: &str) -> Result<(), ApiError> {
        fs::write(&self.path, token).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to store session token");
            ApiError::Storage(format!("{}: {e}", self.path.display()))
        })
    }

    fn clear_token(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove session token");
            }
        }
    }

    fn redirect_to_login(&self, location: &str) {
        *self
            .location
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(location.to_string());
    }
}
