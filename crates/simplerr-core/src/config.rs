//! Application configuration.

use chrono::Duration;

/// Environment variable toggling debug mode.
pub const DEBUG_ENV: &str = "SIMPLERR_DEBUG";

/// Application-wide settings, mirrored onto every request.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enables error detail in responses and debug logging defaults.
    pub debug: bool,
    /// Required for sessions; without it sessions are accepted but
    /// never persisted.
    pub secret_key: Option<String>,
    /// Lifetime of sessions marked permanent.
    pub permanent_session_lifetime: Duration,
    /// External host (and optional port) the app considers its own.
    pub server_name: Option<String>,
    /// Path prefix the application is mounted under.
    pub application_root: String,
    pub session_cookie_name: String,
    pub session_cookie_domain: Option<String>,
    /// Defaults to `application_root` when unset.
    pub session_cookie_path: Option<String>,
    pub session_cookie_httponly: bool,
    pub session_cookie_secure: bool,
    pub session_cookie_samesite: Option<String>,
    /// Re-issue the cookie on every request so permanent sessions
    /// slide their expiry forward.
    pub session_refresh_each_request: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: debug_flag(std::env::var(DEBUG_ENV).ok().as_deref()),
            secret_key: None,
            permanent_session_lifetime: Duration::days(31),
            server_name: None,
            application_root: "/".to_owned(),
            session_cookie_name: "session".to_owned(),
            session_cookie_domain: None,
            session_cookie_path: None,
            session_cookie_httponly: true,
            session_cookie_secure: false,
            session_cookie_samesite: None,
            session_refresh_each_request: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Split `server_name` into host and port.
    #[must_use]
    pub fn server_name_parts(&self) -> (Option<String>, Option<u16>) {
        let Some(name) = self.server_name.as_deref() else {
            return (None, None);
        };
        match name.rsplit_once(':') {
            Some((host, port)) => match port.parse() {
                Ok(port) => (Some(host.to_owned()), Some(port)),
                Err(_) => (Some(name.to_owned()), None),
            },
            None => (Some(name.to_owned()), None),
        }
    }
}

/// Truthiness of the debug environment variable. Unset, empty, `0`,
/// `false` and `no` are off; anything else is on.
fn debug_flag(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no"
        ),
    }
}
