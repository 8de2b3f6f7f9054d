//! Login callback and logout.
//!
//! The callback finishes the OAuth code flow: it exchanges the code at the
//! provider, upserts the user's profile, opens a session row and sets the
//! session cookie. A cookie that fails to parse is treated as stale state
//! from an earlier deployment and cleared on both the bare and parent
//! domains before sending the user back to retry.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;
use engine::{Profile, SessionUser};
use serde::Deserialize;
use uuid::Uuid;

use crate::server::{SESSION_COOKIE, ServerState};

/// Cookie names cleared on corruption. Older deployments chunked the token
/// into `.0`/`.1` suffixed pieces.
const STALE_COOKIE_NAMES: [&str; 3] = [SESSION_COOKIE, "cb-auth-token.0", "cb-auth-token.1"];

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    expires_in: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

fn token_looks_corrupted(value: &str) -> bool {
    value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// An expired cookie that overwrites (and thereby deletes) `name` on the
/// client. Built by hand because `CookieJar::remove` only emits a removal
/// for cookies that arrived with the request, and these jars start empty.
fn removal_cookie(name: &'static str, domain: Option<&str>) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    if let Some(domain) = domain {
        cookie.set_domain(domain.to_string());
    }
    cookie.make_removal();
    cookie
}

/// Removal cookies for every stale name, on the bare host and, when
/// configured, the shared parent domain. Two jars, because a jar keys
/// cookies by name and would collapse the bare and parented removals.
fn clear_stale_cookies(cookie_domain: Option<&str>) -> (CookieJar, CookieJar) {
    let mut bare_jar = CookieJar::new();
    for name in STALE_COOKIE_NAMES {
        bare_jar = bare_jar.add(removal_cookie(name, None));
    }

    let mut parented_jar = CookieJar::new();
    if let Some(domain) = cookie_domain {
        for name in STALE_COOKIE_NAMES {
            parented_jar = parented_jar.add(removal_cookie(name, Some(domain)));
        }
    }

    (bare_jar, parented_jar)
}

fn session_cookie(token: String, state: &ServerState) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    if let Some(domain) = &state.auth.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

async fn exchange_code(state: &ServerState, code: &str) -> Result<TokenResponse, reqwest::Error> {
    state
        .http
        .post(&state.auth.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &state.auth.client_id),
            ("client_secret", &state.auth.client_secret),
        ])
        .send()
        .await?
        .error_for_status()?
        .json::<TokenResponse>()
        .await
}

pub async fn callback(
    State(state): State<ServerState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // A cookie header that is not valid UTF-8, or a session token with
    // characters no token of ours ever contains, means stale client state
    // that would wedge every subsequent request.
    let header_unreadable = headers
        .get(header::COOKIE)
        .is_some_and(|raw| raw.to_str().is_err());
    let token_corrupted = jar
        .get(SESSION_COOKIE)
        .is_some_and(|cookie| token_looks_corrupted(cookie.value()));
    if header_unreadable || token_corrupted {
        let (bare, parented) = clear_stale_cookies(state.auth.cookie_domain.as_deref());
        return (bare, parented, Redirect::to("/?error=corrupted_session")).into_response();
    }

    let next = query.next.unwrap_or_else(|| "/".to_string());
    let Some(code) = query.code else {
        return Redirect::to(&next).into_response();
    };

    let token_response = match exchange_code(&state, &code).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!("code exchange failed: {err}");
            return Redirect::to("/?error=auth_error").into_response();
        }
    };

    let ttl = Duration::seconds(
        token_response
            .expires_in
            .unwrap_or(state.auth.session_ttl_hours * 3600),
    );
    let token = Uuid::new_v4().to_string();
    let user = SessionUser {
        id: token_response.user.id,
        email: token_response.user.email,
        name: token_response.user.name,
    };

    if let Err(err) = state.engine.open_session(user, &token, ttl).await {
        tracing::error!("failed to open session: {err}");
        return Redirect::to("/?error=auth_error").into_response();
    }

    (jar.add(session_cookie(token, &state)), Redirect::to(&next)).into_response()
}

pub async fn logout(
    axum::Extension(_profile): axum::Extension<Profile>,
    State(state): State<ServerState>,
    jar: CookieJar,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.engine.close_session(cookie.value()).await
    {
        tracing::error!("failed to close session: {err}");
    }

    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), Redirect::to("/")).into_response()
}
