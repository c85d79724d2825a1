//! Signed cookie sessions.
//!
//! The session rides in a signed cookie, so everything stored in it is
//! visible to the client but tamper-proof. [`SessionInterface`] opens
//! the session from the request cookie and saves it back onto the
//! response after the view has run.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::request::Request;
use crate::response::{CookieOptions, Response};
use crate::signing::TimedSerializer;

/// Key used to flag a session as permanent inside its own payload.
const PERMANENT_KEY: &str = "_permanent";

#[derive(Debug, Default)]
struct SessionData {
    values: Map<String, Value>,
    accessed: bool,
    modified: bool,
    /// No secret key is configured; writes are accepted but never persisted.
    detached: bool,
}

/// A shared handle to the per-request session.
///
/// Clones share the same underlying data, so a view mutating its copy
/// is seen by the dispatcher when the response is finalized.
#[derive(Debug, Clone, Default)]
pub struct Session {
    data: Arc<Mutex<SessionData>>,
}

impl Session {
    /// An empty writable session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that accepts writes but will never be saved, used
    /// when no secret key is configured.
    #[must_use]
    pub fn detached() -> Self {
        let session = Self::new();
        session.lock().detached = true;
        session
    }

    fn from_map(values: Map<String, Value>) -> Self {
        let session = Self::new();
        session.lock().values = values;
        session
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionData> {
        // A poisoned session is still just data; keep serving it.
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut data = self.lock();
        data.accessed = true;
        data.values.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut data = self.lock();
        data.accessed = true;
        data.modified = true;
        if data.detached {
            tracing::warn!(
                "session written without a secret key configured; it will not be persisted"
            );
        }
        data.values.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut data = self.lock();
        data.accessed = true;
        let removed = data.values.remove(key);
        if removed.is_some() {
            data.modified = true;
        }
        removed
    }

    pub fn clear(&self) {
        let mut data = self.lock();
        data.accessed = true;
        if !data.values.is_empty() {
            data.modified = true;
        }
        data.values.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().values.is_empty()
    }

    /// Whether the session should outlive the browser session.
    #[must_use]
    pub fn permanent(&self) -> bool {
        self.get(PERMANENT_KEY)
            .is_some_and(|value| value.as_bool() == Some(true))
    }

    pub fn set_permanent(&self, permanent: bool) {
        self.insert(PERMANENT_KEY, permanent);
    }

    pub(crate) fn accessed(&self) -> bool {
        self.lock().accessed
    }

    pub(crate) fn modified(&self) -> bool {
        self.lock().modified
    }

    pub(crate) fn snapshot(&self) -> Map<String, Value> {
        self.lock().values.clone()
    }
}

/// Opens sessions from request cookies and saves them back to
/// responses.
#[derive(Debug, Clone, Default)]
pub struct SessionInterface;

impl SessionInterface {
    /// Salt for deriving the session signing key.
    pub const SESSION_SALT: &'static str = "cookie-session";
    /// Max acceptable age, in seconds, for an inbound session cookie.
    pub const SESSION_LOAD_MAX_AGE: i64 = 3600;

    fn serializer(config: &Config) -> Option<TimedSerializer> {
        config
            .secret_key
            .as_deref()
            .map(|secret| TimedSerializer::new(secret, Self::SESSION_SALT))
    }

    /// Load the session for a request, or a fresh one when the cookie
    /// is absent, expired or invalid.
    #[must_use]
    pub fn open_session(&self, config: &Config, request: &Request) -> Session {
        let Some(serializer) = Self::serializer(config) else {
            return Session::detached();
        };
        let Some(cookie) = request.cookie(&config.session_cookie_name) else {
            return Session::new();
        };
        match serializer.loads(&cookie, Self::SESSION_LOAD_MAX_AGE) {
            Ok(Value::Object(values)) => Session::from_map(values),
            Ok(_) => Session::new(),
            Err(err) => {
                tracing::debug!("discarding session cookie: {err}");
                Session::new()
            }
        }
    }

    /// Persist the session onto the response when needed.
    pub fn save_session(&self, config: &Config, session: &Session, response: &mut Response) {
        let Some(serializer) = Self::serializer(config) else {
            return;
        };

        if session.accessed() {
            response.add_vary("Cookie");
        }

        let options = CookieOptions {
            domain: config.session_cookie_domain.clone(),
            path: Some(
                config
                    .session_cookie_path
                    .clone()
                    .unwrap_or_else(|| config.application_root.clone()),
            ),
            secure: config.session_cookie_secure,
            http_only: config.session_cookie_httponly,
            same_site: config.session_cookie_samesite.clone(),
            ..CookieOptions::default()
        };

        if session.is_empty() {
            if session.modified() {
                response.delete_cookie(&config.session_cookie_name, &options);
                response.add_vary("Cookie");
            }
            return;
        }

        if !session.modified() && !config.session_refresh_each_request {
            return;
        }

        let options = if session.permanent() {
            CookieOptions {
                expires: Some(Utc::now() + config.permanent_session_lifetime),
                ..options
            }
        } else {
            options
        };

        let token = serializer.dumps(&Value::Object(session.snapshot()));
        response.set_cookie(&config.session_cookie_name, &token, &options);
        response.add_vary("Cookie");
    }
}
