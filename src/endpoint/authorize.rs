//! Authorization endpoint engine
//!
//! Validation runs as a pipeline that stops at the first failure. Protocol
//! failures are *presented*: the browser is redirected back to the
//! request's `redirect_uri` with `error`/`error_description`/`state` in the
//! query - even before the client is known, since the user is standing at
//! their own redirect target. Only an unparseable `redirect_uri` gets a
//! plain 400, because there is nowhere safe to send the browser.
//!
//! Consent: a GET without a matching stored authorization hands off to the
//! provider's dialog with the query preserved; the dialog POSTs back after
//! the user confirms, which overwrites the stored consent and issues.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::claims::{TokenClaims, TokenRole};
use crate::client::{Authorization, Client};
use crate::endpoint::AuthorizeParams;
use crate::error::{ProtocolError, Result};
use crate::grant::{GrantType, ResponseType};
use crate::provider::Provider;
use crate::scope::Scope;
use crate::url::StrictUrl;

/// A parsed authorization request, transport already stripped away.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRequest {
    pub params: AuthorizeParams,
    /// The encoded parameters as received; preserved on dialog handoff.
    pub raw_query: String,
    /// True when the user confirmed at the consent dialog (POST).
    pub prompted: bool,
    /// The `sid` cookie value, if the request carried one.
    pub session: Option<String>,
}

/// Outcome of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeResponse {
    /// 302 to the given location: success, consent handoff, or error
    /// presentation.
    Redirect(String),
    /// 400 with a plain-text body; the redirect target itself was unusable.
    BadRequest(&'static str),
}

impl IntoResponse for AuthorizeResponse {
    fn into_response(self) -> Response {
        match self {
            AuthorizeResponse::Redirect(location) => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            AuthorizeResponse::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
        }
    }
}

fn fail(redirect: &StrictUrl, err: ProtocolError, state: &str) -> AuthorizeResponse {
    AuthorizeResponse::Redirect(redirect.with_params(&err.with_state(state).params()))
}

/// Process an authorization request end to end.
pub async fn authorize(provider: &Provider, request: AuthorizeRequest) -> AuthorizeResponse {
    let state = request.params.state.clone().unwrap_or_default();
    let redirect =
        match StrictUrl::parse(request.params.redirect_uri.as_deref().unwrap_or_default()) {
            Ok(url) => url,
            Err(_) => {
                debug!("authorization request with unusable redirect uri");
                return AuthorizeResponse::BadRequest("bad redirect uri");
            }
        };

    match run(provider, &request, &redirect, &state).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "authorization request failed");
            fail(&redirect, ProtocolError::unexpected(), &state)
        }
    }
}

async fn run(
    provider: &Provider,
    request: &AuthorizeRequest,
    redirect: &StrictUrl,
    state: &str,
) -> Result<AuthorizeResponse> {
    let params = &request.params;

    let response_type = params
        .response_type
        .as_deref()
        .and_then(ResponseType::from_param);
    let Some(response_type) = response_type else {
        return Ok(fail(redirect, ProtocolError::unsupported_response_type(), state));
    };

    let client_id = params.client_id.as_deref().unwrap_or_default();
    let client = match provider.store().fetch_client(client_id).await? {
        Some(client) if client.is_active() => client,
        _ => {
            debug!(client_id, "authorization for unknown or inactive client");
            return Ok(fail(redirect, ProtocolError::client_not_found(), state));
        }
    };

    if client.redirect_uri != *redirect {
        return Ok(fail(redirect, ProtocolError::bad_redirect(), state));
    }

    let scope = Scope::parse(params.scope.as_deref().unwrap_or_default());
    if !client.scope.contains(&scope) {
        return Ok(fail(redirect, ProtocolError::scope_not_allowed(), state));
    }

    let session = match &request.session {
        Some(sid) => provider.authenticator().verify(sid, &client).await?,
        None => None,
    };
    let Some(session) = session else {
        debug!(client_id = %client.id, "no session; handing off to the dialog");
        return Ok(dialog(provider, request));
    };

    match response_type {
        ResponseType::Code => {
            issue_code(provider, request, &client, &session, redirect, scope, state).await
        }
        ResponseType::Token => {
            issue_implicit(provider, request, &client, &session, redirect, scope, state).await
        }
    }
}

fn dialog(provider: &Provider, request: &AuthorizeRequest) -> AuthorizeResponse {
    AuthorizeResponse::Redirect(provider.dialog_url(&request.raw_query))
}

/// Consent gate shared by both flows.
///
/// Returns `false` when the user must be prompted first. A prompted request
/// records fresh consent for the `(client, user)` pair, replacing whatever
/// was stored - including a narrower scope.
async fn consent(
    provider: &Provider,
    request: &AuthorizeRequest,
    client: &Client,
    session: &TokenClaims,
    scope: &Scope,
) -> Result<bool> {
    let existing = provider
        .store()
        .fetch_authorization(&client.id, &session.subject)
        .await?;
    let authorized = existing.is_some_and(|a| a.active && a.scope == *scope);

    if !authorized && !request.prompted {
        return Ok(false);
    }
    if request.prompted {
        provider
            .store()
            .store_authorization(Authorization::new(
                client.id.clone(),
                session.subject.clone(),
                scope.clone(),
            ))
            .await?;
    }
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
async fn issue_code(
    provider: &Provider,
    request: &AuthorizeRequest,
    client: &Client,
    session: &TokenClaims,
    redirect: &StrictUrl,
    scope: Scope,
    state: &str,
) -> Result<AuthorizeResponse> {
    if client.grant_type != GrantType::AuthorizationCode {
        return Ok(fail(redirect, ProtocolError::wrong_grant(), state));
    }

    if !consent(provider, request, client, session, &scope).await? {
        return Ok(dialog(provider, request));
    }

    let now = provider.now();
    let mut claims = TokenClaims::new(TokenRole::Code, now, now + provider.issuer().expiry_for_code());
    claims.audience = client.id.clone();
    claims.subject = session.subject.clone();
    claims.issuer = provider.url().to_string();
    claims.scope = Some(scope);
    claims.grant = Some(GrantType::AuthorizationCode);

    let code = provider.tokenizer().tokenize(&claims, &client.keys.sign)?;
    debug!(client_id = %client.id, subject = %claims.subject, "authorization code issued");

    Ok(AuthorizeResponse::Redirect(redirect.with_params(&[
        ("code", code),
        ("state", state.to_owned()),
    ])))
}

#[allow(clippy::too_many_arguments)]
async fn issue_implicit(
    provider: &Provider,
    request: &AuthorizeRequest,
    client: &Client,
    session: &TokenClaims,
    redirect: &StrictUrl,
    scope: Scope,
    state: &str,
) -> Result<AuthorizeResponse> {
    if client.grant_type != GrantType::Implicit {
        return Ok(fail(redirect, ProtocolError::wrong_grant(), state));
    }
    if !provider.issuer().scope_permitted(&scope, GrantType::Implicit) {
        return Ok(fail(redirect, ProtocolError::scope_not_allowed(), state));
    }

    if !consent(provider, request, client, session, &scope).await? {
        return Ok(dialog(provider, request));
    }

    let now = provider.now();
    let expiry = provider.issuer().expiry_for_token(GrantType::Implicit);
    let mut claims = TokenClaims::new(TokenRole::AccessToken, now, now + expiry);
    claims.audience = client.id.clone();
    claims.subject = session.subject.clone();
    claims.issuer = provider.url().to_string();
    claims.scope = Some(scope);
    claims.grant = Some(GrantType::Implicit);

    let access_token = provider.tokenizer().tokenize(&claims, &client.keys.sign)?;
    let expires_in = claims.expires - now.timestamp();
    debug!(client_id = %client.id, subject = %claims.subject, "implicit token issued");

    Ok(AuthorizeResponse::Redirect(redirect.with_fragment(&[
        ("access_token", access_token),
        ("expires_in", expires_in.to_string()),
        ("state", state.to_owned()),
    ])))
}
