//! Session behavior across requests, driven through the cookie jar.

use serde_json::json;
use simplerr_http::{App, Config, HttpError, Request, Route, StatusCode, TestClient, View};

async fn login(request: Request) -> Result<View, HttpError> {
    let name = request
        .form()
        .get("user")
        .cloned()
        .ok_or_else(|| HttpError::BadRequest("missing user".to_owned()))?;
    request.session().insert("user", name);
    Ok(View::from("welcome"))
}

async fn whoami(request: Request) -> Result<View, HttpError> {
    let user = request.session().get("user").unwrap_or(json!(null));
    Ok(View::from(json!({ "user": user })))
}

async fn logout(request: Request) -> Result<View, HttpError> {
    request.session().clear();
    Ok(View::from("bye"))
}

fn app() -> App {
    let mut app = App::new(".").with_config(Config::default().with_secret_key("test-secret"));
    app.route(Route::new("/login", login)).unwrap();
    app.route(Route::new("/whoami", whoami)).unwrap();
    app.route(Route::new("/logout", logout)).unwrap();
    app
}

#[tokio::test]
async fn session_persists_between_requests() {
    let mut client = TestClient::new(app());

    let response = client.post("/login", "user=jane").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(client.cookie("session").is_some());

    let response = client.get("/whoami").await;
    assert_eq!(response.text(), r#"{"user":"jane"}"#);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let mut client = TestClient::new(app());

    client.post("/login", "user=jane").await;
    let response = client.get("/logout").await;
    let cookie = response.header("set-cookie").unwrap();
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(client.cookie("session"), None);

    let response = client.get("/whoami").await;
    assert_eq!(response.text(), r#"{"user":null}"#);
}

#[tokio::test]
async fn session_responses_vary_on_cookie() {
    let mut client = TestClient::new(app());
    let response = client.get("/whoami").await;
    assert_eq!(response.header("vary"), Some("Cookie"));
}

#[tokio::test]
async fn tampered_cookie_starts_fresh() {
    let mut client = TestClient::new(app());
    client.post("/login", "user=jane").await;

    // Hand-craft a forged cookie via a raw request.
    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::COOKIE,
        http::HeaderValue::from_static("session=forged.token.value"),
    );
    let mut fresh = TestClient::new(app());
    let response = fresh
        .request(
            simplerr_http::Method::GET,
            "/whoami",
            headers,
            bytes::Bytes::new(),
        )
        .await;
    assert_eq!(response.text(), r#"{"user":null}"#);
}

#[tokio::test]
async fn no_secret_key_means_no_cookie() {
    let mut app = App::new(".");
    app.route(Route::new("/login", login)).unwrap();

    let mut client = TestClient::new(app);
    let response = client.post("/login", "user=jane").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("set-cookie"), None);
}
