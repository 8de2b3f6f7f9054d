//! Egress (expense claim) API endpoints

use api_types::EgressStatus as ApiStatus;
use api_types::action::ActionResult;
use api_types::egress::{EgressNew, EgressUpdate, EgressView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::Profile;

use crate::{ServerError, message_for_engine_error, server::ServerState};

fn map_status(status: engine::EgressStatus) -> ApiStatus {
    match status {
        engine::EgressStatus::Pending => ApiStatus::Pending,
        engine::EgressStatus::Approved => ApiStatus::Approved,
        engine::EgressStatus::Rejected => ApiStatus::Rejected,
    }
}

fn map_status_in(status: ApiStatus) -> engine::EgressStatus {
    match status {
        ApiStatus::Pending => engine::EgressStatus::Pending,
        ApiStatus::Approved => engine::EgressStatus::Approved,
        ApiStatus::Rejected => engine::EgressStatus::Rejected,
    }
}

pub(crate) fn view(egress: engine::Egress) -> EgressView {
    EgressView {
        id: egress.id,
        applicant_name: egress.applicant_name,
        item_name: egress.item_name,
        item_amount_minor: egress.item_amount_minor,
        item_comment: egress.item_comment,
        invoice_date: egress.invoice_date,
        invoice_files: egress.invoice_files,
        transfer_date: egress.transfer_date,
        transfer_fee_minor: egress.transfer_fee_minor,
        transfer_files: egress.transfer_files,
        status: map_status(egress.status),
        user_id: egress.user_id,
    }
}

pub async fn list(
    Extension(_profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<EgressView>>, ServerError> {
    let rows = state.engine.list_egress().await?;
    Ok(Json(rows.into_iter().map(view).collect()))
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<EgressNew>,
) -> Json<ActionResult> {
    let cmd = engine::EgressNewCmd {
        applicant_name: payload.applicant_name,
        item_name: payload.item_name,
        item_amount_minor: payload.item_amount_minor,
        item_comment: payload.item_comment,
        invoice_date: payload.invoice_date,
        invoice_files: payload.invoice_files,
        transfer_date: payload.transfer_date,
        transfer_fee_minor: payload.transfer_fee_minor,
        transfer_files: payload.transfer_files,
        status: payload.status.map(map_status_in),
    };

    match state.engine.create_egress(cmd, &profile.id).await {
        Ok(_) => Json(ActionResult::ok()),
        Err(err) => Json(ActionResult::failed(message_for_engine_error(err))),
    }
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<EgressUpdate>,
) -> Json<ActionResult> {
    let patch = engine::EgressPatch {
        applicant_name: payload.applicant_name,
        item_name: payload.item_name,
        item_amount_minor: payload.item_amount_minor,
        item_comment: payload.item_comment,
        invoice_date: payload.invoice_date,
        invoice_files: payload.invoice_files,
        transfer_date: payload.transfer_date,
        transfer_fee_minor: payload.transfer_fee_minor,
        transfer_files: payload.transfer_files,
        status: payload.status.map(map_status_in),
    };

    match state.engine.update_egress(&id, patch, &profile.id).await {
        Ok(_) => Json(ActionResult::ok()),
        Err(err) => Json(ActionResult::failed(message_for_engine_error(err))),
    }
}
