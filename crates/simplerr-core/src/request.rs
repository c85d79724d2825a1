//! The request wrapper handed to views.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, header};
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::routing::{PathArg, PathArgs};
use crate::session::Session;

/// An incoming HTTP request plus everything the dispatcher attaches
/// while routing it: the matched endpoint, converted path arguments
/// and the session handle.
///
/// Cloning is cheap (the body is reference counted) and clones share
/// the same session, so mutations made inside a view are visible when
/// the response is finalized.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    endpoint: Option<String>,
    view_args: PathArgs,
    session: Session,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            remote_addr: None,
            endpoint: None,
            view_args: PathArgs::default(),
            session: Session::detached(),
        }
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[must_use]
    pub fn query_string(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, when present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST.as_str())
            .or_else(|| self.uri.host())
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Decoded query string pairs, in order of appearance.
    #[must_use]
    pub fn args(&self) -> Vec<(String, String)> {
        serde_urlencoded::from_str(self.query_string()).unwrap_or_default()
    }

    /// First query string value for `name`.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<String> {
        self.args()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// The body decoded as a urlencoded form.
    #[must_use]
    pub fn form(&self) -> HashMap<String, String> {
        serde_urlencoded::from_bytes(&self.body).unwrap_or_default()
    }

    /// The body parsed as JSON. Malformed payloads are logged and
    /// yield `None` rather than failing the request.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        match serde_json::from_slice(&self.body) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!("error decoding json body: {err}");
                None
            }
        }
    }

    /// Cookies from the `Cookie` header(s).
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for value in self.headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for pair in raw.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let value = percent_decode_str(value)
                        .decode_utf8()
                        .map_or_else(|_| value.to_owned(), |decoded| decoded.into_owned());
                    cookies.insert(name.trim().to_owned(), value);
                }
            }
        }
        cookies
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        let mut cookies = self.cookies();
        cookies.remove(name)
    }

    /// The endpoint of the matched route, once routing has run.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    #[must_use]
    pub fn view_args(&self) -> &PathArgs {
        &self.view_args
    }

    #[must_use]
    pub fn view_arg(&self, name: &str) -> Option<&PathArg> {
        self.view_args.get(name)
    }

    /// The session handle for this request.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    // Dispatcher-side setters.

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = Some(endpoint.into());
    }

    pub fn set_view_args(&mut self, args: PathArgs) {
        self.view_args = args;
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }
}
