//! In-process test client with a cookie jar.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Uri};
use serde_json::Value;
use simplerr_core::{Method, Request, Response};

use crate::app::App;

/// Drives an [`App`] without a socket, carrying cookies between
/// requests the way a browser would.
pub struct TestClient {
    app: Arc<App>,
    cookies: HashMap<String, String>,
}

impl TestClient {
    #[must_use]
    pub fn new(app: App) -> Self {
        Self {
            app: Arc::new(app),
            cookies: HashMap::new(),
        }
    }

    pub async fn get(&mut self, path: &str) -> Response {
        self.request(Method::GET, path, HeaderMap::new(), Bytes::new())
            .await
    }

    pub async fn post(&mut self, path: &str, body: impl Into<Bytes>) -> Response {
        self.request(Method::POST, path, HeaderMap::new(), body.into())
            .await
    }

    /// POST a JSON body with the matching content type.
    pub async fn post_json(&mut self, path: &str, value: &Value) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.request(Method::POST, path, headers, Bytes::from(value.to_string()))
            .await
    }

    pub async fn put(&mut self, path: &str, body: impl Into<Bytes>) -> Response {
        self.request(Method::PUT, path, HeaderMap::new(), body.into())
            .await
    }

    pub async fn delete(&mut self, path: &str) -> Response {
        self.request(Method::DELETE, path, HeaderMap::new(), Bytes::new())
            .await
    }

    pub async fn options(&mut self, path: &str) -> Response {
        self.request(Method::OPTIONS, path, HeaderMap::new(), Bytes::new())
            .await
    }

    pub async fn head(&mut self, path: &str) -> Response {
        self.request(Method::HEAD, path, HeaderMap::new(), Bytes::new())
            .await
    }

    /// Issue a request with full control over headers and body.
    pub async fn request(
        &mut self,
        method: Method,
        path: &str,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let uri: Uri = path.parse().expect("invalid test uri");

        headers
            .entry(http::header::USER_AGENT)
            .or_insert(HeaderValue::from_static("simplerr-test"));

        if !self.cookies.is_empty() {
            let jar = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            if let Ok(value) = HeaderValue::from_str(&jar) {
                headers.insert(COOKIE, value);
            }
        }

        let request = Request::new(method, uri, headers, body)
            .with_remote_addr(SocketAddr::from(([127, 0, 0, 1], 0)));
        let response = self.app.handle(request).await;
        self.store_cookies(&response);
        response
    }

    /// Current value of a stored cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn store_cookies(&mut self, response: &Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or(raw);
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            if raw.contains("Max-Age=0") || value.is_empty() {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_owned(), value.to_owned());
            }
        }
    }
}
