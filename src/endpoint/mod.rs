//! Endpoint engines and their HTTP adapters
//!
//! The engines ([`authorize`], [`token`]) are pure async functions from
//! typed request records to typed outcomes; the axum handlers in this module
//! only parse forms, pull the session cookie, and render outcomes. Keeping
//! the transport this thin is what makes the validation pipelines testable
//! without a socket.

pub mod authorize;
pub mod token;

pub use authorize::{authorize, AuthorizeRequest, AuthorizeResponse};
pub use token::{token, TokenReply, TokenResponse};

use axum::extract::{RawForm, RawQuery, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use http::HeaderMap;
use serde::Deserialize;

use crate::authenticator::session_cookie;
use crate::error::ProtocolError;
use crate::provider::Provider;

/// Form/query parameters of the authorization endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Form parameters of the token endpoint, across all grants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// GET or POST `/authorize`. POST means the user confirmed at the dialog.
pub(crate) async fn authorize_handler(
    State(provider): State<Provider>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let prompted = method == Method::POST;
    let raw = if prompted {
        body
    } else {
        query.unwrap_or_default()
    };

    let params: AuthorizeParams = match serde_urlencoded::from_str(&raw) {
        Ok(params) => params,
        Err(_) => return (StatusCode::BAD_REQUEST, "bad request").into_response(),
    };

    let request = AuthorizeRequest {
        params,
        raw_query: raw,
        prompted,
        session: session_cookie(&headers),
    };
    authorize(&provider, request).await.into_response()
}

/// POST `/token`. The method router answers 405 for anything else.
pub(crate) async fn token_handler(
    State(provider): State<Provider>,
    RawForm(body): RawForm,
) -> Response {
    let params: TokenParams = match serde_urlencoded::from_bytes(&body) {
        Ok(params) => params,
        Err(_) => {
            let err = ProtocolError::new(crate::error::ErrorCode::InvalidRequest, "malformed form body");
            return (StatusCode::BAD_REQUEST, axum::Json(err)).into_response();
        }
    };
    token(&provider, params).await.into_response()
}
