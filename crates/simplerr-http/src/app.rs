//! The application object and the request dispatch pipeline.

use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value, json};
use simplerr_core::routing::{MatchError, RoutingError};
use simplerr_core::{
    Config, Events, HttpError, Method, Request, Response, Route, Rule, RuleMap, Session,
    SessionInterface, TemplateEngine, View,
};

/// Cache policy stamped onto every file route response.
pub const FILE_CACHE_CONTROL: &str = "public, max-age=10800";

/// A simplerr application: routes, configuration, lifecycle hooks and
/// the template engine, rooted at a site directory.
///
/// Registration happens on a mutable app; serving takes it behind an
/// `Arc` and only needs `&self`.
#[derive(Debug)]
pub struct App {
    config: Config,
    site_root: PathBuf,
    routes: Vec<Route>,
    rules: RuleMap,
    events: Events,
    sessions: SessionInterface,
    templates: TemplateEngine,
}

impl App {
    /// Create an application rooted at a site directory. Templates and
    /// file routes resolve relative to it.
    #[must_use]
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        let site_root = site_root.into();
        Self {
            config: Config::default(),
            templates: TemplateEngine::new(&site_root),
            site_root,
            routes: Vec::new(),
            rules: RuleMap::default(),
            events: Events::default(),
            sessions: SessionInterface,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    #[must_use]
    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// Lifecycle hook registration.
    pub fn events_mut(&mut self) -> &mut Events {
        &mut self.events
    }

    /// Runs before routing; the first hook returning a response wins.
    pub fn on_pre_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.events.on_pre_request(hook);
        self
    }

    /// Runs after the view, newest registration first.
    pub fn on_post_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Request, Response) -> Response + Send + Sync + 'static,
    {
        self.events.on_post_request(hook);
        self
    }

    /// Runs last, whether or not the request failed.
    pub fn on_teardown<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Request, Option<&HttpError>) + Send + Sync + 'static,
    {
        self.events.on_teardown(hook);
        self
    }

    /// The template engine.
    #[must_use]
    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    /// Register a template filter, usable as `{{name value}}`.
    pub fn filter<F>(&mut self, name: &str, filter: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.templates.filter(name, filter);
        self
    }

    /// Register a route. Routes match in registration order.
    pub fn route(&mut self, route: Route) -> Result<&mut Self, RoutingError> {
        let rule = Rule::parse(route.pattern())?;
        self.rules.add(rule, route.method_list().map(<[Method]>::to_vec));
        self.routes.push(route);
        Ok(self)
    }

    /// Run a request through the full pipeline and produce a response.
    pub async fn handle(&self, mut request: Request) -> Response {
        let session = self.sessions.open_session(&self.config, &request);
        request.set_session(session.clone());

        if let Some(response) = self.events.fire_pre_request(&mut request) {
            return self.finalize(&request, &session, response, None);
        }

        match self.dispatch(&mut request).await {
            Ok(response) => self.finalize(&request, &session, response, None),
            Err(error) => {
                let response = self.error_response(&request, &error);
                self.finalize(&request, &session, response, Some(&error))
            }
        }
    }

    async fn dispatch(&self, request: &mut Request) -> Result<Response, HttpError> {
        let path = request.path().to_owned();
        match self.rules.match_path(&path, request.method()) {
            Ok((index, args)) => {
                let route = &self.routes[index];
                request.set_endpoint(route.endpoint_name());
                request.set_view_args(args);

                let view = route.handle(request.clone()).await?;
                let mut response = self.view_to_response(route, request, view).await?;
                if let Some(mimetype) = route.mimetype_override() {
                    response.insert_header("content-type", mimetype);
                }
                if let Some(cors) = route.cors_policy() {
                    cors.apply(&mut response);
                }
                Ok(response)
            }
            Err(MatchError::NotFound) => Err(HttpError::NotFound(path)),
            Err(MatchError::MethodNotAllowed { allowed }) => {
                if request.method() == Method::OPTIONS {
                    Ok(self.options_response(&path, &allowed))
                } else {
                    Err(HttpError::MethodNotAllowed { allowed })
                }
            }
        }
    }

    /// Automatic response for `OPTIONS` on a path no rule explicitly
    /// accepts it for, carrying the `Allow` union and the CORS policy
    /// of the first route matching the path.
    fn options_response(&self, path: &str, allowed: &[Method]) -> Response {
        let mut response = Response::empty();
        response.insert_header("allow", &allow_header(allowed));
        if let Some(index) = self.rules.first_path_match(path) {
            if let Some(cors) = self.routes[index].cors_policy() {
                cors.apply(&mut response);
            }
        }
        response
    }

    async fn view_to_response(
        &self,
        route: &Route,
        request: &Request,
        view: View,
    ) -> Result<Response, HttpError> {
        if let View::Response(response) = view {
            return Ok(response);
        }

        if route.is_file() {
            let View::Text(relative) = view else {
                return Err(HttpError::Internal(format!(
                    "file route {} returned a non-path view",
                    route.pattern()
                )));
            };
            return self.serve_file(route, request, &relative).await;
        }

        if let Some(template) = route.template_name() {
            let context = template_context(request, view);
            let html = self.templates.render(template, &context)?;
            return Ok(Response::html(html));
        }

        match view {
            View::None => Err(HttpError::Internal(format!(
                "view for {} returned no data",
                route.pattern()
            ))),
            View::Text(text) => Ok(Response::html(text)),
            View::Json(value) => Ok(Response::json(&value)),
            View::Response(_) => unreachable!("handled above"),
        }
    }

    async fn serve_file(
        &self,
        route: &Route,
        request: &Request,
        relative: &str,
    ) -> Result<Response, HttpError> {
        let Some(path) = safe_join(&self.site_root, relative) else {
            tracing::warn!("rejecting unsafe file path {relative:?}");
            return Err(HttpError::NotFound(request.path().to_owned()));
        };

        let body = tokio::fs::read(&path)
            .await
            .map_err(|_| HttpError::NotFound(request.path().to_owned()))?;

        let mimetype = route
            .mimetype_override()
            .map(str::to_owned)
            .or_else(|| guess_mime(&path))
            .or_else(|| guess_mime(Path::new(request.path())))
            .unwrap_or_else(|| "application/octet-stream".to_owned());

        let mut response = Response::new(body);
        response.insert_header("content-type", &mimetype);
        response.insert_header("cache-control", FILE_CACHE_CONTROL);
        Ok(response)
    }

    fn error_response(&self, request: &Request, error: &HttpError) -> Response {
        let status = error.status();
        if status.is_server_error() {
            tracing::error!(
                "Exception on {} [{}]: {error}",
                request.path(),
                request.method()
            );
        }

        let description = self.config.debug.then(|| error.to_string());
        let mut response = Response::error_page(status, description.as_deref());
        if let HttpError::MethodNotAllowed { allowed } = error {
            response.insert_header("allow", &allow_header(allowed));
        }
        response
    }

    /// Post-request hooks, session persistence, then teardown hooks.
    fn finalize(
        &self,
        request: &Request,
        session: &Session,
        response: Response,
        error: Option<&HttpError>,
    ) -> Response {
        let mut response = self.events.fire_post_request(request, response);
        self.sessions.save_session(&self.config, session, &mut response);
        self.events.fire_teardown(request, error);
        response
    }
}

/// Methods for an `Allow` header: the accepted set plus the implicit
/// `HEAD` (on `GET`) and `OPTIONS`.
fn allow_header(allowed: &[Method]) -> String {
    let mut methods: Vec<&str> = allowed.iter().map(Method::as_str).collect();
    if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
        methods.push(Method::HEAD.as_str());
    }
    if !allowed.contains(&Method::OPTIONS) {
        methods.push(Method::OPTIONS.as_str());
    }
    methods.sort_unstable();
    methods.join(", ")
}

/// Template context: the view data plus a `request` object with the
/// path, method and endpoint.
fn template_context(request: &Request, view: View) -> Value {
    let mut context = match view {
        View::Json(Value::Object(map)) => map,
        View::Json(other) => {
            let mut map = Map::new();
            map.insert("data".to_owned(), other);
            map
        }
        View::Text(text) => {
            let mut map = Map::new();
            map.insert("data".to_owned(), Value::String(text));
            map
        }
        View::None | View::Response(_) => Map::new(),
    };
    context.insert(
        "request".to_owned(),
        json!({
            "path": request.path(),
            "method": request.method().as_str(),
            "endpoint": request.endpoint(),
        }),
    );
    Value::Object(context)
}

/// Join a client-supplied relative path onto the site root, refusing
/// anything that could escape it.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(joined)
}

fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first_raw().map(str::to_owned)
}
