//! Ingress (income entry) API endpoints

use api_types::action::ActionResult;
use api_types::ingress::{IngressNew, IngressUpdate, IngressView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::Profile;

use crate::{ServerError, message_for_engine_error, server::ServerState};

pub(crate) fn view(ingress: engine::Ingress) -> IngressView {
    IngressView {
        id: ingress.id,
        ingress_date: ingress.ingress_date,
        ingress_amount_minor: ingress.ingress_amount_minor,
        ingress_comment: ingress.ingress_comment,
        ingress_files: ingress.ingress_files,
        user_id: ingress.user_id,
    }
}

pub async fn list(
    Extension(_profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<IngressView>>, ServerError> {
    let rows = state.engine.list_ingress().await?;
    Ok(Json(rows.into_iter().map(view).collect()))
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<IngressNew>,
) -> Json<ActionResult> {
    let cmd = engine::IngressNewCmd {
        ingress_date: payload.ingress_date,
        ingress_amount_minor: payload.ingress_amount_minor,
        ingress_comment: payload.ingress_comment,
        ingress_files: payload.ingress_files,
    };

    match state.engine.create_ingress(cmd, &profile.id).await {
        Ok(_) => Json(ActionResult::ok()),
        Err(err) => Json(ActionResult::failed(message_for_engine_error(err))),
    }
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<IngressUpdate>,
) -> Json<ActionResult> {
    let patch = engine::IngressPatch {
        ingress_date: payload.ingress_date,
        ingress_amount_minor: payload.ingress_amount_minor,
        ingress_comment: payload.ingress_comment,
        ingress_files: payload.ingress_files,
    };

    match state.engine.update_ingress(&id, patch, &profile.id).await {
        Ok(_) => Json(ActionResult::ok()),
        Err(err) => Json(ActionResult::failed(message_for_engine_error(err))),
    }
}
