//! Router-level tests
//!
//! Exercises the axum surface end to end: form parsing, the session cookie,
//! redirect rendering, method restrictions, and JSON bodies.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use gatehouse::{GrantType, JwtTokenizer, TokenRole, Tokenizer};
use http_body_util::BodyExt;
use tower::ServiceExt;

#[tokio::test]
async fn authorize_get_issues_a_code_over_http() {
    let (provider, store) = test_provider();
    let client = register_client(&store, GrantType::AuthorizationCode, "openid,email").await;
    store_consent(&store, &client, "testuser", "openid,email").await;
    let session = mint_session("testuser", &client);

    let query = serde_urlencoded::to_string([
        ("response_type", "code"),
        ("client_id", client.id.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("scope", "openid,email"),
        ("state", "S"),
    ])
    .unwrap();

    let request = Request::builder()
        .method("GET")
        .uri(format!("/authorize?{query}"))
        .header(header::COOKIE, format!("sid={session}"))
        .body(Body::empty())
        .unwrap();

    let response = provider.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();
    let code = query_value(&location, "code").expect("code param");
    let claims = JwtTokenizer::hs256().parse(&code, CLIENT_KEY).unwrap();
    assert_eq!(claims.role, TokenRole::Code);
    assert_eq!(claims.subject, "testuser");
}

#[tokio::test]
async fn authorize_with_garbage_form_is_a_400() {
    let (provider, _store) = test_provider();

    let request = Request::builder()
        .method("GET")
        .uri("/authorize?client_id=a&client_id=b")
        .body(Body::empty())
        .unwrap();

    let response = provider.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_endpoint_is_post_only() {
    let (provider, _store) = test_provider();

    let request = Request::builder()
        .method("GET")
        .uri("/token")
        .body(Body::empty())
        .unwrap();

    let response = provider.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn token_endpoint_speaks_json_over_http() {
    let (provider, store) = test_provider();
    let client = register_client(&store, GrantType::ClientCredentials, "reports").await;

    let body = serde_urlencoded::to_string([
        ("grant_type", "client_credentials"),
        ("client_id", client.id.as_str()),
        ("client_secret", client.secret.as_str()),
        ("scope", "reports"),
    ])
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = provider.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["token_type"], "bearer");
    assert!(json["access_token"].as_str().is_some());
    assert!(json.get("refresh_token").is_none());
}

#[tokio::test]
async fn token_endpoint_renders_errors_as_json() {
    let (provider, store) = test_provider();
    let client = register_client(&store, GrantType::ClientCredentials, "reports").await;

    let body = serde_urlencoded::to_string([
        ("grant_type", "client_credentials"),
        ("client_id", client.id.as_str()),
        ("client_secret", "wrong"),
    ])
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = provider.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"], "access_denied");
}

#[tokio::test]
async fn authorize_post_confirms_consent_over_http() {
    let (provider, store) = test_provider();
    let client = register_client(&store, GrantType::AuthorizationCode, "openid").await;
    let session = mint_session("testuser", &client);

    let body = serde_urlencoded::to_string([
        ("response_type", "code"),
        ("client_id", client.id.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("scope", "openid"),
        ("state", "S"),
    ])
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/authorize")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, format!("sid={session}"))
        .body(Body::from(body))
        .unwrap();

    let response = provider.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();
    assert!(query_value(&location, "code").is_some());

    use gatehouse::Store;
    assert!(store
        .fetch_authorization(&client.id, "testuser")
        .await
        .unwrap()
        .is_some());
}
