//! Template rendering and static file serving out of a site directory.

use std::fs;

use serde_json::json;
use simplerr_http::{
    App, FILE_CACHE_CONTROL, HttpError, Method, Request, Route, StatusCode, TestClient, View,
};

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "Hello World").unwrap();
    fs::write(dir.path().join("echo.html"), "You said {{msg}}").unwrap();
    fs::write(
        dir.path().join("profile.html"),
        "{{user}} at {{request.path}}",
    )
    .unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css/site.css"), "body { margin: 0 }").unwrap();
    dir
}

async fn empty(_: Request) -> Result<View, HttpError> {
    Ok(View::None)
}

#[tokio::test]
async fn template_route_renders_html() {
    let site = site();
    let mut app = App::new(site.path());
    app.route(Route::new("/", empty).template("index.html"))
        .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.header("content-type"),
        Some("text/html;charset=utf-8")
    );
    assert_eq!(response.text(), "Hello World");
}

#[tokio::test]
async fn json_view_becomes_template_context() {
    let site = site();
    let mut app = App::new(site.path());
    app.route(
        Route::new("/echo/<msg>", |request: Request| async move {
            let msg = request
                .view_arg("msg")
                .map(ToString::to_string)
                .unwrap_or_default();
            Ok::<View, HttpError>(View::from(json!({ "msg": msg })))
        })
        .template("echo.html"),
    )
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/echo/hello").await;
    assert_eq!(response.text(), "You said hello");
}

#[tokio::test]
async fn templates_see_the_request_object() {
    let site = site();
    let mut app = App::new(site.path());
    app.route(
        Route::new("/profile", |_: Request| async {
            Ok::<View, HttpError>(View::from(json!({"user": "jane"})))
        })
        .template("profile.html"),
    )
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/profile").await;
    assert_eq!(response.text(), "jane at /profile");
}

#[tokio::test]
async fn filters_apply_in_templates() {
    let site = site();
    fs::write(site.path().join("shout.html"), "{{upper msg}}").unwrap();

    let mut app = App::new(site.path());
    app.filter("upper", |text| text.to_uppercase());
    app.route(
        Route::new("/shout", |_: Request| async {
            Ok::<View, HttpError>(View::from(json!({"msg": "quiet"})))
        })
        .template("shout.html"),
    )
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/shout").await;
    assert_eq!(response.text(), "QUIET");
}

#[tokio::test]
async fn missing_template_is_a_server_error() {
    let site = site();
    let mut app = App::new(site.path());
    app.route(Route::new("/broken", empty).template("missing.html"))
        .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/broken").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

fn file_app(site: &tempfile::TempDir) -> App {
    let mut app = App::new(site.path());
    app.route(
        Route::new("/static/<path:filename>", |request: Request| async move {
            let filename = request
                .view_arg("filename")
                .map(ToString::to_string)
                .unwrap_or_default();
            Ok::<View, HttpError>(View::from(filename))
        })
        .file(true)
        .methods(vec![Method::GET]),
    )
    .unwrap();
    app
}

#[tokio::test]
async fn file_route_serves_with_mime_and_cache_headers() {
    let site = site();
    let mut client = TestClient::new(file_app(&site));

    let response = client.get("/static/css/site.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("text/css"));
    assert_eq!(response.header("cache-control"), Some(FILE_CACHE_CONTROL));
    assert_eq!(response.text(), "body { margin: 0 }");
}

#[tokio::test]
async fn missing_file_is_404() {
    let site = site();
    let mut client = TestClient::new(file_app(&site));
    let response = client.get("/static/missing.css").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_outside_the_site_is_refused() {
    let site = site();
    let mut app = App::new(site.path());
    // Worst case: a view that trusts its input completely.
    app.route(
        Route::new("/raw", |_: Request| async {
            Ok::<View, HttpError>(View::from("../../etc/passwd"))
        })
        .file(true),
    )
    .unwrap();

    let mut client = TestClient::new(app);
    let response = client.get("/raw").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
