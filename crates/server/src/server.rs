use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{advance, auth, egress, files, ingress, storage::Storage, summary};
use api_types::advance::AdvanceRejection;
use engine::Engine;

/// Name of the session cookie set by the auth callback.
pub const SESSION_COOKIE: &str = "cb-auth-token";

/// OAuth-provider coordinates used by the callback's code exchange.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Parent domain the session cookie (and stale cookie clears) apply to.
    pub cookie_domain: Option<String>,
    pub session_ttl_hours: i64,
}

/// Everything the server needs beyond the engine itself.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub storage_root: PathBuf,
    pub storage_secret: String,
    /// Blank advance form the PDF endpoint stamps onto.
    pub template_path: PathBuf,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub storage: Arc<Storage>,
    pub template_path: Arc<PathBuf>,
    pub auth: Arc<AuthConfig>,
    pub http: reqwest::Client,
}

async fn session_auth(
    jar: CookieJar,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(AdvanceRejection {
                message: "please log in first".to_string(),
            }),
        )
            .into_response()
    };

    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return unauthorized();
    };

    let profile = match state.engine.session_profile(cookie.value()).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::error!("session lookup failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdvanceRejection {
                    message: "internal server error".to_string(),
                }),
            )
                .into_response();
        }
    };
    let Some(profile) = profile else {
        return unauthorized();
    };

    request.extensions_mut().insert(profile);
    next.run(request).await
}

fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/egress", get(egress::list).post(egress::create))
        .route("/egress/{id}", patch(egress::update))
        .route("/ingress", get(ingress::list).post(ingress::create))
        .route("/ingress/{id}", patch(ingress::update))
        .route("/summary", get(summary::get))
        .route("/files/{bucket}/{*path}", post(files::upload))
        .route("/files/signed", get(files::signed_url))
        .route("/auth/logout", post(auth::logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), session_auth));

    // The callback runs before any session exists, signed fetches carry
    // their own token, and the advance route validates its body before the
    // session check, so all three stay outside the session layer.
    Router::new()
        .route("/auth/callback", get(auth::callback))
        .route("/files/raw/{bucket}/{*path}", get(files::fetch_signed))
        .route("/reimburse/advance", post(advance::generate))
        .merge(protected)
        .with_state(state)
}

/// Build the full application router. Split out from the run functions so
/// tests can drive it with `tower::ServiceExt::oneshot`.
pub fn app(engine: Engine, config: ServerConfig) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
        storage: Arc::new(Storage::new(config.storage_root, &config.storage_secret)),
        template_path: Arc::new(config.template_path),
        auth: Arc::new(config.auth),
        http: reqwest::Client::new(),
    };

    router(state)
}

pub async fn run(engine: Engine, config: ServerConfig) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, config, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, config)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, config, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
