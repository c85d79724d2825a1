//! The response wrapper and helpers for building common responses.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode, header};
use serde_json::Value;

/// Cookie attributes for [`Response::set_cookie`].
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    pub expires: Option<DateTime<Utc>>,
    /// Max-Age in seconds.
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    /// `Strict`, `Lax` or `None`.
    pub same_site: Option<String>,
}

/// An outgoing HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::empty()
    }
}

impl Response {
    /// A 200 response with a raw body and no content type.
    #[must_use]
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// An empty 200 response.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// A 200 response with an html body.
    #[must_use]
    pub fn html(body: impl Into<Bytes>) -> Self {
        let mut response = Self::new(body);
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html;charset=utf-8"),
        );
        response
    }

    /// A 200 response with a JSON body.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        let mut response = Self::new(value.to_string());
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }

    /// A minimal error page in the shape browsers expect.
    #[must_use]
    pub fn error_page(status: StatusCode, description: Option<&str>) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown Error");
        let description = match description {
            Some(text) => text.to_owned(),
            None => default_description(status).to_owned(),
        };
        let body = format!(
            "<!doctype html>\n<html lang=en>\n<title>{code} {reason}</title>\n\
             <h1>{reason}</h1>\n<p>{description}</p>\n",
            code = status.as_u16(),
        );
        Self::html(body).with_status(status)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, when present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Set a header, replacing existing values. Invalid names or
    /// values are logged and dropped rather than panicking mid-response.
    pub fn insert_header(&mut self, name: &str, value: &str) {
        match (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!("dropping invalid header {name}: {value}"),
        }
    }

    /// Append a header, keeping existing values.
    pub fn append_header(&mut self, name: &str, value: &str) {
        match (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!("dropping invalid header {name}: {value}"),
        }
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decompose into status, headers and body.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Add a value to the `Vary` header, skipping duplicates.
    pub fn add_vary(&mut self, value: &str) {
        let current = self.header(header::VARY.as_str()).unwrap_or("");
        if current
            .split(',')
            .any(|existing| existing.trim().eq_ignore_ascii_case(value))
        {
            return;
        }
        let combined = if current.is_empty() {
            value.to_owned()
        } else {
            format!("{current}, {value}")
        };
        self.insert_header(header::VARY.as_str(), &combined);
    }

    /// Append a `Set-Cookie` header.
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let mut cookie = format!("{name}={value}");
        if let Some(expires) = options.expires {
            cookie.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = options.max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(domain) = &options.domain {
            cookie.push_str(&format!("; Domain={domain}"));
        }
        if let Some(path) = &options.path {
            cookie.push_str(&format!("; Path={path}"));
        }
        if let Some(same_site) = &options.same_site {
            cookie.push_str(&format!("; SameSite={same_site}"));
        }
        if options.secure {
            cookie.push_str("; Secure");
        }
        if options.http_only {
            cookie.push_str("; HttpOnly");
        }
        self.append_header(header::SET_COOKIE.as_str(), &cookie);
    }

    /// Expire a cookie on the client.
    pub fn delete_cookie(&mut self, name: &str, options: &CookieOptions) {
        let options = CookieOptions {
            expires: Some(DateTime::UNIX_EPOCH),
            max_age: Some(0),
            ..options.clone()
        };
        self.set_cookie(name, "", &options);
    }
}

/// A redirect response with the classic explanatory HTML body.
#[must_use]
pub fn redirect(location: &str, code: u16) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::FOUND);
    let body = format!(
        "<!doctype html>\n<html lang=en>\n<title>Redirecting...</title>\n\
         <h1>Redirecting...</h1>\n<p>You should be redirected automatically \
         to the target URL: <a href=\"{location}\">{location}</a>. \
         If not, click the link.\n",
    );
    let mut response = Response::html(body).with_status(status);
    response.insert_header(header::LOCATION.as_str(), location);
    response
}

fn default_description(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => {
            "The browser (or proxy) sent a request that this server could not understand."
        }
        StatusCode::UNAUTHORIZED => {
            "The server could not verify that you are authorized to access the URL requested."
        }
        StatusCode::FORBIDDEN => {
            "You don't have the permission to access the requested resource."
        }
        StatusCode::NOT_FOUND => "The requested URL was not found on the server.",
        StatusCode::METHOD_NOT_ALLOWED => "The method is not allowed for the requested URL.",
        StatusCode::INTERNAL_SERVER_ERROR => {
            "The server encountered an internal error and was unable to complete your request."
        }
        _ => "",
    }
}
