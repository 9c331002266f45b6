//! Explicit session context for authenticated backend requests.
//!
//! Replaces a process-wide token singleton: the context is constructed on
//! login, handed to whatever issues requests, and invalidated on logout or on
//! a 401. The token is zeroized when the context drops.

use std::sync::Mutex;

use tracing::info;
use zeroize::Zeroizing;

/// Shared, invalidatable holder for one bearer token.
pub struct SessionContext {
    token: Mutex<Option<Zeroizing<String>>>,
}

impl SessionContext {
    /// Create an authenticated context from a freshly issued token.
    pub fn login(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(Zeroizing::new(token.into()))),
        }
    }

    /// Create a context with no credentials, for unauthenticated backends.
    pub fn anonymous() -> Self {
        Self {
            token: Mutex::new(None),
        }
    }

    /// `Authorization` header value, while the session is valid.
    pub fn bearer_header(&self) -> Option<String> {
        self.token
            .lock()
            .expect("session token lock poisoned")
            .as_ref()
            .map(|token| format!("Bearer {}", token.as_str()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .lock()
            .expect("session token lock poisoned")
            .is_some()
    }

    /// Drop the credentials. Called on logout and on a 401 response.
    pub fn invalidate(&self) {
        let mut token = self.token.lock().expect("session token lock poisoned");
        if token.take().is_some() {
            info!("session invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_produces_bearer_header() {
        let session = SessionContext::login("tok-123");
        assert!(session.is_authenticated());
        assert_eq!(session.bearer_header().unwrap(), "Bearer tok-123");
    }

    #[test]
    fn invalidate_clears_credentials() {
        let session = SessionContext::login("tok-123");
        session.invalidate();
        assert!(!session.is_authenticated());
        assert!(session.bearer_header().is_none());
        // idempotent
        session.invalidate();
    }

    #[test]
    fn anonymous_has_no_header() {
        let session = SessionContext::anonymous();
        assert!(!session.is_authenticated());
        assert!(session.bearer_header().is_none());
    }
}
