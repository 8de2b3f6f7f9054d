//! Summary API endpoint: totals, balance, unified feed, weekly chart series.

use api_types::summary::{SummaryResponse, TransactionView, WeekPoint};
use axum::{Extension, Json, extract::State};
use engine::{LedgerEntry, Profile};

use crate::{ServerError, egress, ingress, server::ServerState};

fn map_entry(entry: LedgerEntry) -> TransactionView {
    match entry {
        LedgerEntry::Egress(claim) => TransactionView::Egress(egress::view(claim)),
        LedgerEntry::Ingress(income) => TransactionView::Ingress(ingress::view(income)),
    }
}

pub async fn get(
    Extension(_profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<Json<SummaryResponse>, ServerError> {
    let summary = state.engine.summary().await?;

    Ok(Json(SummaryResponse {
        total_ingress_minor: summary.total_ingress_minor,
        total_egress_minor: summary.total_egress_minor,
        balance_minor: summary.balance_minor,
        transactions: summary.transactions.into_iter().map(map_entry).collect(),
        weekly: summary
            .weekly
            .into_iter()
            .map(|bucket| WeekPoint {
                week: bucket.week,
                ingress_minor: bucket.ingress_minor,
                egress_minor: bucket.egress_minor,
            })
            .collect(),
    }))
}
