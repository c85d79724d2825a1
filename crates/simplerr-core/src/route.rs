//! Route definitions binding URL patterns to handlers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Method;

use crate::cors::Cors;
use crate::error::HttpError;
use crate::request::Request;
use crate::view::View;

/// The boxed future a handler resolves to.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<View, HttpError>> + Send>>;

/// An async request handler.
///
/// Implemented for any `async fn(Request) -> Result<View, HttpError>`
/// through the blanket impl, so plain functions and closures both work.
pub trait Handler: Send + Sync {
    fn call(&self, request: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<View, HttpError>> + Send + 'static,
{
    fn call(&self, request: Request) -> HandlerFuture {
        Box::pin(self(request))
    }
}

/// A URL pattern, its handler, and how the result is turned into a
/// response.
#[derive(Clone)]
pub struct Route {
    pattern: String,
    endpoint: String,
    template: Option<String>,
    methods: Option<Vec<Method>>,
    file: bool,
    cors: Option<Cors>,
    mimetype: Option<String>,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// A route answering any method, returning its view directly.
    #[must_use]
    pub fn new(pattern: impl Into<String>, handler: impl Handler + 'static) -> Self {
        let pattern = pattern.into();
        Self {
            endpoint: pattern.clone(),
            pattern,
            template: None,
            methods: None,
            file: false,
            cors: None,
            mimetype: None,
            handler: Arc::new(handler),
        }
    }

    /// Render the view through a template relative to the site root.
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Restrict the accepted methods. `GET` routes also answer `HEAD`.
    #[must_use]
    pub fn methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = Some(methods);
        self
    }

    /// Serve the returned text as a file path under the site root.
    #[must_use]
    pub fn file(mut self, file: bool) -> Self {
        self.file = file;
        self
    }

    /// Attach a CORS policy applied to every response from this route.
    #[must_use]
    pub fn cors(mut self, cors: Cors) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Force the response content type.
    #[must_use]
    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Override the endpoint name (defaults to the pattern).
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    #[must_use]
    pub fn method_list(&self) -> Option<&[Method]> {
        self.methods.as_deref()
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file
    }

    #[must_use]
    pub fn cors_policy(&self) -> Option<&Cors> {
        self.cors.as_ref()
    }

    #[must_use]
    pub fn mimetype_override(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    /// Invoke the handler.
    pub fn handle(&self, request: Request) -> HandlerFuture {
        self.handler.call(request)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("endpoint", &self.endpoint)
            .field("template", &self.template)
            .field("methods", &self.methods)
            .field("file", &self.file)
            .field("mimetype", &self.mimetype)
            .finish_non_exhaustive()
    }
}
