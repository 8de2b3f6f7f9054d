//! File store API endpoints: uploads, signed-URL issuance, signed fetches.

use api_types::files::{SignedUrl, SignedUrlRequest, Uploaded};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use engine::Profile;
use serde::Deserialize;

use crate::{ServerError, server::ServerState, storage::Bucket};

/// Signed URLs are short-lived; the browser fetches immediately after asking.
const SIGNED_URL_TTL_SECS: i64 = 300;

fn parse_bucket(name: &str) -> Result<Bucket, ServerError> {
    Bucket::parse(name).ok_or_else(|| ServerError::Generic(format!("unknown bucket: {name}")))
}

pub async fn upload(
    Extension(_profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path((bucket, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Uploaded>, ServerError> {
    let bucket = parse_bucket(&bucket)?;
    state.storage.upload(bucket, &path, &body, true).await?;
    Ok(Json(Uploaded { path }))
}

pub async fn signed_url(
    Extension(_profile): Extension<Profile>,
    State(state): State<ServerState>,
    Query(request): Query<SignedUrlRequest>,
) -> Result<Json<SignedUrl>, ServerError> {
    let bucket = parse_bucket(&request.bucket)?;
    if !state.storage.exists(bucket, &request.path).await? {
        return Err(ServerError::Storage(crate::StorageError::NotFound(
            request.path,
        )));
    }

    let expires = chrono::Utc::now().timestamp() + SIGNED_URL_TTL_SECS;
    let url = state.storage.signed_url(bucket, &request.path, expires);
    Ok(Json(SignedUrl { url }))
}

#[derive(Deserialize)]
pub struct SignedFetchQuery {
    expires: i64,
    token: String,
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Unauthenticated fetch, gated by the URL's own MAC and expiry.
pub async fn fetch_signed(
    State(state): State<ServerState>,
    Path((bucket, path)): Path<(String, String)>,
    Query(query): Query<SignedFetchQuery>,
) -> Response {
    let Some(bucket) = Bucket::parse(&bucket) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !state.storage.verify(bucket, &path, query.expires, &query.token) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match state.storage.download(bucket, &path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for(&path))],
            bytes,
        )
            .into_response(),
        Err(crate::StorageError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::error!("signed fetch failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a/b.pdf"), "application/pdf");
        assert_eq!(content_type_for("sig.PNG"), "application/octet-stream");
        assert_eq!(content_type_for("sig.png"), "image/png");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
