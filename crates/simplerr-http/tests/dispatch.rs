//! End-to-end dispatch behavior through the test client.

use serde_json::json;
use simplerr_http::{
    App, Cors, HttpError, Method, Request, Response, Route, StatusCode, TestClient, View, abort,
    redirect,
};

async fn hello(_: Request) -> Result<View, HttpError> {
    Ok(View::from("Hello World"))
}

async fn user(request: Request) -> Result<View, HttpError> {
    let id = request
        .view_arg("id")
        .and_then(simplerr_core::PathArg::as_int)
        .ok_or_else(|| HttpError::BadRequest("missing id".to_owned()))?;
    Ok(View::from(json!({"id": id})))
}

fn app() -> App {
    let mut app = App::new(".");
    app.route(Route::new("/hello", hello)).unwrap();
    app.route(Route::new("/api/user/<int:id>", user).methods(vec![Method::GET]))
        .unwrap();
    app
}

#[tokio::test]
async fn text_view_renders_as_html() {
    let mut client = TestClient::new(app());
    let response = client.get("/hello").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.header("content-type"),
        Some("text/html;charset=utf-8")
    );
    assert_eq!(response.text(), "Hello World");
}

#[tokio::test]
async fn json_view_with_converted_path_arg() {
    let mut client = TestClient::new(app());
    let response = client.get("/api/user/42").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.text(), r#"{"id":42}"#);
}

#[tokio::test]
async fn unknown_path_is_a_404_page() {
    let mut client = TestClient::new(app());
    let response = client.get("/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("404 Not Found"));
}

#[tokio::test]
async fn wrong_method_is_405_with_allow() {
    let mut client = TestClient::new(app());
    let response = client.post("/api/user/42", "").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, HEAD, OPTIONS"));
}

#[tokio::test]
async fn head_is_served_by_get_routes() {
    let mut client = TestClient::new(app());
    let response = client.head("/api/user/7").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn automatic_options_carries_allow_and_cors() {
    let mut app = App::new(".");
    app.route(
        Route::new("/api/data", hello)
            .methods(vec![Method::GET, Method::POST])
            .cors(Cors::new()),
    )
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.options("/api/data").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("allow"), Some("GET, HEAD, OPTIONS, POST"));
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn cors_headers_apply_to_route_responses() {
    let mut app = App::new(".");
    app.route(
        Route::new("/api/open", hello)
            .cors(Cors::new().origin("https://example.com").unwrap()),
    )
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/api/open").await;
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://example.com")
    );
    assert_eq!(
        response.header("access-control-allow-methods"),
        Some("POST,GET,DELETE,PUT,PATCH")
    );
}

#[tokio::test]
async fn mimetype_override_wins() {
    let mut app = App::new(".");
    app.route(Route::new("/plain", hello).mimetype("text/plain")).unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/plain").await;
    assert_eq!(response.header("content-type"), Some("text/plain"));
}

#[tokio::test]
async fn views_can_redirect() {
    let mut app = App::new(".");
    app.route(Route::new("/old", |_: Request| async {
        Ok::<View, HttpError>(View::from(redirect("/new", 302)))
    }))
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/old").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/new"));
}

#[tokio::test]
async fn views_can_abort() {
    let mut authed = App::new(".");
    authed
        .route(Route::new("/private", |_: Request| async {
            Err::<View, HttpError>(abort(401))
        }))
        .unwrap();

    let mut client = TestClient::new(authed);
    let response = client.get("/private").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn none_view_outside_a_template_is_a_server_error() {
    let mut app = App::new(".");
    app.route(Route::new("/void", |_: Request| async {
        Ok::<View, HttpError>(View::None)
    }))
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/void").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn debug_mode_exposes_error_detail() {
    let mut app = App::new(".");
    app.config_mut().debug = true;
    app.route(Route::new("/boom", |_: Request| async {
        Err::<View, HttpError>(HttpError::Internal("kaboom".to_owned()))
    }))
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/boom").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("kaboom"));
}

#[tokio::test]
async fn pre_request_hook_short_circuits() {
    let mut app = app();
    app.on_pre_request(|request| {
        (request.header("x-api-key") != Some("letmein"))
            .then(|| Response::empty().with_status(StatusCode::FORBIDDEN))
    });

    let mut client = TestClient::new(app);
    let response = client.get("/hello").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_request_hook_decorates_responses() {
    let mut app = app();
    app.on_post_request(|_, mut response| {
        response.insert_header("x-powered-by", "simplerr");
        response
    });

    let mut client = TestClient::new(app);
    let response = client.get("/hello").await;
    assert_eq!(response.header("x-powered-by"), Some("simplerr"));
}

#[tokio::test]
async fn teardown_hook_runs_on_errors_too() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let failures = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&failures);

    let mut app = app();
    app.on_teardown(move |_, error| {
        if error.is_some() {
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    let mut client = TestClient::new(app);
    client.get("/hello").await;
    client.get("/missing").await;
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn form_and_json_bodies_reach_the_view() {
    let mut app = App::new(".");
    app.route(Route::new("/echo", |request: Request| async move {
        let name = request
            .json()
            .and_then(|body| body.get("name").cloned())
            .or_else(|| request.form().get("name").map(|name| json!(name)))
            .unwrap_or(json!(null));
        Ok::<View, HttpError>(View::from(json!({ "name": name })))
    }))
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.post_json("/echo", &json!({"name": "jane"})).await;
    assert_eq!(response.text(), r#"{"name":"jane"}"#);

    let response = client.post("/echo", "name=joe").await;
    assert_eq!(response.text(), r#"{"name":"joe"}"#);
}
