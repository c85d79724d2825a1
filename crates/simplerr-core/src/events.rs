//! Request lifecycle hooks.

use std::fmt;

use crate::error::HttpError;
use crate::request::Request;
use crate::response::Response;

/// Runs before routing; returning a response short-circuits the request.
pub type PreRequestHook = Box<dyn Fn(&mut Request) -> Option<Response> + Send + Sync>;
/// Runs after the view, and may replace the response.
pub type PostRequestHook = Box<dyn Fn(&Request, Response) -> Response + Send + Sync>;
/// Runs last, whether or not the request failed.
pub type TeardownHook = Box<dyn Fn(&Request, Option<&HttpError>) + Send + Sync>;

/// Registered lifecycle hooks for an application.
#[derive(Default)]
pub struct Events {
    pre_request: Vec<PreRequestHook>,
    post_request: Vec<PostRequestHook>,
    teardown: Vec<TeardownHook>,
}

impl Events {
    pub fn on_pre_request<F>(&mut self, hook: F)
    where
        F: Fn(&mut Request) -> Option<Response> + Send + Sync + 'static,
    {
        self.pre_request.push(Box::new(hook));
    }

    pub fn on_post_request<F>(&mut self, hook: F)
    where
        F: Fn(&Request, Response) -> Response + Send + Sync + 'static,
    {
        self.post_request.push(Box::new(hook));
    }

    pub fn on_teardown<F>(&mut self, hook: F)
    where
        F: Fn(&Request, Option<&HttpError>) + Send + Sync + 'static,
    {
        self.teardown.push(Box::new(hook));
    }

    /// Run pre-request hooks in registration order. The first hook to
    /// return a response wins and the view is skipped.
    #[must_use]
    pub fn fire_pre_request(&self, request: &mut Request) -> Option<Response> {
        self.pre_request.iter().find_map(|hook| hook(request))
    }

    /// Thread the response through the post-request hooks, newest
    /// registration first.
    #[must_use]
    pub fn fire_post_request(&self, request: &Request, response: Response) -> Response {
        self.post_request
            .iter()
            .rev()
            .fold(response, |response, hook| hook(request, response))
    }

    /// Run teardown hooks, newest registration first.
    pub fn fire_teardown(&self, request: &Request, error: Option<&HttpError>) {
        for hook in self.teardown.iter().rev() {
            hook(request, error);
        }
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("pre_request", &self.pre_request.len())
            .field("post_request", &self.post_request.len())
            .field("teardown", &self.teardown.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> Request {
        Request::new(
            Method::GET,
            "/".parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[test]
    fn pre_request_short_circuits_on_first_response() {
        let mut events = Events::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&calls);
        events.on_pre_request(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            None
        });
        events.on_pre_request(|_| Some(Response::empty().with_status(StatusCode::FORBIDDEN)));
        events.on_pre_request(|_| Some(Response::empty().with_status(StatusCode::IM_A_TEAPOT)));

        let response = events.fire_pre_request(&mut request()).unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn post_request_runs_in_reverse_order() {
        let mut events = Events::default();
        events.on_post_request(|_, mut response| {
            response.insert_header("x-order", "first-registered");
            response
        });
        events.on_post_request(|_, mut response| {
            response.insert_header("x-order", "second-registered");
            response
        });

        let response = events.fire_post_request(&request(), Response::empty());
        // The last registered hook ran first, so the first registered
        // hook had the final say.
        assert_eq!(response.header("x-order"), Some("first-registered"));
    }

    #[test]
    fn teardown_sees_the_error() {
        let mut events = Events::default();
        let errors = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&errors);
        events.on_teardown(move |_, error| {
            if error.is_some() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        events.fire_teardown(&request(), None);
        events.fire_teardown(&request(), Some(&HttpError::NotFound("/gone".to_owned())));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
