//! Basic CORS response headers for matched routes.

use http::Method;
use thiserror::Error;

use crate::response::Response;

/// Raised when a CORS field is set to an empty value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("CORS {0} cannot be empty")]
pub struct EmptyCorsValue(pub &'static str);

/// A CORS policy attached to a route and applied to its responses.
///
/// Defaults allow every origin, the five common verbs, and the
/// `Content-Type` / `Authorization` request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cors {
    origin: String,
    methods: Vec<Method>,
    headers: Vec<String>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origin: "*".to_owned(),
            methods: vec![
                Method::POST,
                Method::GET,
                Method::DELETE,
                Method::PUT,
                Method::PATCH,
            ],
            headers: vec!["Content-Type".to_owned(), "Authorization".to_owned()],
        }
    }
}

impl Cors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the allowed origin.
    pub fn origin(mut self, origin: impl Into<String>) -> Result<Self, EmptyCorsValue> {
        let origin = origin.into();
        if origin.is_empty() {
            return Err(EmptyCorsValue("origin"));
        }
        self.origin = origin;
        Ok(self)
    }

    /// Replace the allowed methods.
    pub fn methods(mut self, methods: Vec<Method>) -> Result<Self, EmptyCorsValue> {
        if methods.is_empty() {
            return Err(EmptyCorsValue("methods"));
        }
        self.methods = methods;
        Ok(self)
    }

    /// Replace the allowed request headers.
    pub fn headers(mut self, headers: Vec<String>) -> Result<Self, EmptyCorsValue> {
        if headers.is_empty() {
            return Err(EmptyCorsValue("headers"));
        }
        self.headers = headers;
        Ok(self)
    }

    /// Write the `Access-Control-Allow-*` headers onto a response.
    pub fn apply(&self, response: &mut Response) {
        response.insert_header("Access-Control-Allow-Origin", &self.origin);
        response.insert_header(
            "Access-Control-Allow-Methods",
            &self
                .methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(","),
        );
        response.insert_header("Access-Control-Allow-Headers", &self.headers.join(","));
    }
}
