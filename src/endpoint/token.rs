//! Token endpoint engine
//!
//! POST only. A shared prelude resolves the grant handler, authenticates the
//! client (constant-time secret comparison), then dispatches on the grant:
//!
//! - `authorization_code`: validate and redeem a code, exactly once.
//! - `password`: check resource owner credentials via the authenticator.
//! - `client_credentials`: the client acts as itself; no refresh token.
//! - `refresh_token`: rotate an access/refresh pair.
//!
//! Protocol failures come back as JSON `{error, error_description}` with a
//! 400/403 status; infrastructure failures surface as a generic 500
//! `server_error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use crate::claims::{TokenClaims, TokenRole};
use crate::client::Client;
use crate::endpoint::TokenParams;
use crate::error::{ProtocolError, Result};
use crate::grant::GrantType;
use crate::provider::Provider;
use crate::scope::Scope;
use crate::url::StrictUrl;

const TOKEN_TYPE: &str = "bearer";

/// Successful token endpoint body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Outcome of a token request.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenReply {
    Issued(TokenResponse),
    Failed(StatusCode, ProtocolError),
}

impl TokenReply {
    fn failed(status: StatusCode, err: ProtocolError) -> Result<Self> {
        Ok(TokenReply::Failed(status, err))
    }
}

impl IntoResponse for TokenReply {
    fn into_response(self) -> Response {
        match self {
            TokenReply::Issued(body) => (StatusCode::OK, Json(body)).into_response(),
            TokenReply::Failed(status, err) => (status, Json(err)).into_response(),
        }
    }
}

/// Process a token request end to end.
pub async fn token(provider: &Provider, params: TokenParams) -> TokenReply {
    match run(provider, &params).await {
        Ok(reply) => reply,
        Err(err) => {
            error!(error = %err, "token request failed");
            TokenReply::Failed(
                StatusCode::INTERNAL_SERVER_ERROR,
                ProtocolError::unexpected(),
            )
        }
    }
}

async fn run(provider: &Provider, params: &TokenParams) -> Result<TokenReply> {
    // The implicit grant has no token-endpoint handler, so it resolves like
    // any unknown grant type.
    let grant = params
        .grant_type
        .as_deref()
        .and_then(GrantType::from_param)
        .filter(|grant| *grant != GrantType::Implicit);
    let Some(grant) = grant else {
        return TokenReply::failed(StatusCode::BAD_REQUEST, ProtocolError::invalid_grant());
    };

    let client_id = params.client_id.as_deref().unwrap_or_default();
    let client = match provider.store().fetch_client(client_id).await? {
        Some(client) if client.is_active() => client,
        _ => {
            debug!(client_id, "token request for unknown or inactive client");
            return TokenReply::failed(StatusCode::BAD_REQUEST, ProtocolError::client_not_found());
        }
    };

    // A refresh request is legal for any client; every other grant must be
    // the one the client registered for.
    if grant != GrantType::RefreshToken && grant != client.grant_type {
        return TokenReply::failed(StatusCode::BAD_REQUEST, ProtocolError::invalid_grant());
    }

    if !client.verify_secret(params.client_secret.as_deref().unwrap_or_default()) {
        debug!(client_id = %client.id, "client secret mismatch");
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::access_denied());
    }

    match grant {
        GrantType::AuthorizationCode => grant_with_code(provider, &client, params).await,
        GrantType::Password => grant_with_password(provider, &client, params).await,
        GrantType::ClientCredentials => grant_with_client(provider, &client, params).await,
        GrantType::RefreshToken => grant_with_refresh(provider, &client, params).await,
        // Filtered out at resolution.
        GrantType::Implicit => {
            TokenReply::failed(StatusCode::BAD_REQUEST, ProtocolError::invalid_grant())
        }
    }
}

/// Mint an access token and a refresh token pointing at it, sign both, and
/// record the access-token claims for later refresh lookups.
async fn mint_pair(
    provider: &Provider,
    client: &Client,
    subject: String,
    scope: Scope,
    grant: GrantType,
) -> Result<TokenResponse> {
    let now = provider.now();
    let issuer = provider.issuer();

    let mut access = TokenClaims::new(
        TokenRole::AccessToken,
        now,
        now + issuer.expiry_for_token(client.grant_type),
    );
    access.audience = client.id.clone();
    access.subject = subject;
    access.issuer = provider.url().to_string();
    access.scope = Some(scope);
    access.grant = Some(grant);

    let mut refresh = TokenClaims::new(
        TokenRole::RefreshToken,
        now,
        now + issuer.expiry_for_token(GrantType::RefreshToken),
    );
    refresh.subject = access.id.clone();
    refresh.issuer = provider.url().to_string();
    refresh.grant = Some(grant);

    let signed_access = provider.tokenizer().tokenize(&access, &client.keys.sign)?;
    let signed_refresh = provider.tokenizer().tokenize(&refresh, &client.keys.sign)?;
    let expires_in = access.expires - now.timestamp();

    provider.store().record_token(access).await?;

    Ok(TokenResponse {
        access_token: signed_access,
        token_type: TOKEN_TYPE.to_owned(),
        expires_in,
        refresh_token: Some(signed_refresh),
    })
}

async fn grant_with_code(
    provider: &Provider,
    client: &Client,
    params: &TokenParams,
) -> Result<TokenReply> {
    let redirect = StrictUrl::parse(params.redirect_uri.as_deref().unwrap_or_default());
    let Ok(redirect) = redirect else {
        return TokenReply::failed(StatusCode::BAD_REQUEST, ProtocolError::bad_redirect());
    };
    if client.redirect_uri != redirect {
        return TokenReply::failed(StatusCode::BAD_REQUEST, ProtocolError::bad_redirect());
    }

    let raw_code = params.code.as_deref().unwrap_or_default();
    let code = provider.tokenizer().parse(raw_code, &client.keys.verify)?;

    let authorization = provider
        .store()
        .fetch_authorization(&client.id, &code.subject)
        .await?;
    if authorization.is_none() {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::unauthorized());
    }

    if provider.store().token_blacklisted(&code.id).await? {
        debug!(client_id = %client.id, "replayed authorization code");
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::code_used());
    }

    let scope = code.scope.clone().unwrap_or_default();
    let scope_ok = client.scope.contains(&scope)
        && provider.issuer().scope_permitted(&scope, client.grant_type);
    if !scope_ok {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::scope_not_allowed());
    }

    let now = provider.now();
    let valid = code.role == TokenRole::Code
        && code.audience == client.id
        && code.issuer == provider.url().to_string()
        && !code.expired_at(now)
        && code.grant == Some(GrantType::AuthorizationCode);
    if !valid {
        debug!(client_id = %client.id, "authorization code failed claim validation");
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::access_denied());
    }

    let response = mint_pair(
        provider,
        client,
        code.subject.clone(),
        scope,
        GrantType::AuthorizationCode,
    )
    .await?;

    // Single use: exactly one concurrent redemption may pass this gate.
    if !provider.store().consume_token(&code.id).await? {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::code_used());
    }

    debug!(client_id = %client.id, subject = %code.subject, "code exchanged for tokens");
    Ok(TokenReply::Issued(response))
}

async fn grant_with_password(
    provider: &Provider,
    client: &Client,
    params: &TokenParams,
) -> Result<TokenReply> {
    let username = params.username.as_deref().unwrap_or_default();
    let password = params.password.as_deref().unwrap_or_default();
    let identity = provider
        .authenticator()
        .authenticate(username, password, client)
        .await?;
    let Some(identity) = identity else {
        debug!(client_id = %client.id, "password grant rejected by authenticator");
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::access_denied());
    };

    let scope = Scope::parse(params.scope.as_deref().unwrap_or_default());
    let scope_ok = client.scope.contains(&scope)
        && provider.issuer().scope_permitted(&scope, GrantType::Password);
    if !scope_ok {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::scope_not_allowed());
    }

    let response = mint_pair(
        provider,
        client,
        identity.subject.clone(),
        scope,
        GrantType::Password,
    )
    .await?;

    debug!(client_id = %client.id, subject = %identity.subject, "password grant issued");
    Ok(TokenReply::Issued(response))
}

async fn grant_with_client(
    provider: &Provider,
    client: &Client,
    params: &TokenParams,
) -> Result<TokenReply> {
    let scope = Scope::parse(params.scope.as_deref().unwrap_or_default());
    let scope_ok = client.scope.contains(&scope)
        && provider
            .issuer()
            .scope_permitted(&scope, GrantType::ClientCredentials);
    if !scope_ok {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::scope_not_allowed());
    }

    let now = provider.now();
    let expiry = provider.issuer().expiry_for_token(client.grant_type);
    let mut access = TokenClaims::new(TokenRole::AccessToken, now, now + expiry);
    access.audience = client.id.clone();
    access.subject = client.id.clone();
    access.issuer = provider.url().to_string();
    access.scope = Some(scope);
    access.grant = Some(GrantType::ClientCredentials);

    let signed_access = provider.tokenizer().tokenize(&access, &client.keys.sign)?;
    let expires_in = access.expires - now.timestamp();

    debug!(client_id = %client.id, "client credentials grant issued");
    Ok(TokenReply::Issued(TokenResponse {
        access_token: signed_access,
        token_type: TOKEN_TYPE.to_owned(),
        expires_in,
        refresh_token: None,
    }))
}

async fn grant_with_refresh(
    provider: &Provider,
    client: &Client,
    params: &TokenParams,
) -> Result<TokenReply> {
    let raw = params.refresh_token.as_deref().unwrap_or_default();
    let refresh = provider.tokenizer().parse(raw, &client.keys.verify)?;

    let now = provider.now();
    let valid = refresh.role == TokenRole::RefreshToken
        && refresh.issuer == provider.url().to_string()
        && !refresh.expired_at(now);
    if !valid {
        debug!(client_id = %client.id, "refresh token failed claim validation");
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::access_denied());
    }

    if provider.store().token_blacklisted(&refresh.id).await? {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::refresh_used());
    }

    // The refresh token's subject is the id of the access token it renews.
    let original = provider.store().fetch_token(&refresh.subject).await?;
    let Some(original) = original else {
        debug!(client_id = %client.id, "refresh token names an unknown access token");
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::access_denied());
    };
    if original.audience != client.id {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::access_denied());
    }

    let scope = original.scope.clone().unwrap_or_default();
    let scope_ok = client.scope.contains(&scope)
        && provider
            .issuer()
            .scope_permitted(&scope, GrantType::RefreshToken);
    if !scope_ok {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::scope_not_allowed());
    }

    let response = mint_pair(
        provider,
        client,
        original.subject.clone(),
        scope,
        original.grant.unwrap_or(client.grant_type),
    )
    .await?;

    // Rotation: the renewed access token dies, and the refresh token is
    // single-use like a code.
    provider.store().blacklist_token(&original.id).await?;
    if !provider.store().consume_token(&refresh.id).await? {
        return TokenReply::failed(StatusCode::FORBIDDEN, ProtocolError::refresh_used());
    }

    debug!(client_id = %client.id, subject = %original.subject, "refresh token rotated");
    Ok(TokenReply::Issued(response))
}
