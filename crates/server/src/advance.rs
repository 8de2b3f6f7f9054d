//! Advance-PDF endpoint: validate the request, fetch the inputs, compose
//! the document, store it, answer with the storage path.
//!
//! Unlike the ledger writes this endpoint reports failures with real HTTP
//! status codes; the client treats anything but 200 as "show the message".
//! Field validation runs before the session check, so the route does its own
//! session lookup instead of sitting behind the session middleware.

use api_types::advance::{AdvanceCreated, AdvanceRejection, AdvanceRequest};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Local;
use engine::Profile;

use crate::pdf::{self, AdvanceFields};
use crate::server::{SESSION_COOKIE, ServerState};
use crate::storage::Bucket;

const MSG_MISSING_FIELDS: &str = "missing required fields, please check and retry";
const MSG_LOGIN_REQUIRED: &str = "please log in first";
const MSG_INVOICE_FETCH: &str = "failed to fetch the invoice file";
const MSG_SIGNATURE_FETCH: &str = "failed to fetch the signature file";
const MSG_UPLOAD_FAILED: &str = "failed to store the generated pdf";
const MSG_GENERATE_FAILED: &str = "failed to generate the advance pdf, please retry later";

type Rejection = (StatusCode, Json<AdvanceRejection>);

fn reject(status: StatusCode, message: &str) -> Rejection {
    (
        status,
        Json(AdvanceRejection {
            message: message.to_string(),
        }),
    )
}

/// Amounts arrive as JSON numbers; whole amounts print without a trailing
/// `.0`.
fn amount_text(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        amount.to_string()
    }
}

/// `YYYYMMDD` from a dashed date, falling back to today when the input does
/// not reduce to eight digits.
fn compact_date(date: &str) -> String {
    let cleaned: String = date.chars().filter(|c| *c != '-').collect();
    if cleaned.len() == 8 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        cleaned
    } else {
        Local::now().format("%Y%m%d").to_string()
    }
}

/// Applicant name as it may appear in a file name: ASCII word characters
/// and CJK ideographs survive, everything else is dropped.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || *c == '_'
                || *c == '-'
                || ('\u{4e00}'..='\u{9fa5}').contains(c)
        })
        .collect()
}

fn output_path(user_id: &str, applicant_name: &str, invoice_date: &str) -> String {
    let name = sanitize_name(applicant_name);
    let name = if name.is_empty() { "user" } else { &name };
    format!(
        "{user_id}/advance_{name}_{date}.pdf",
        date = compact_date(invoice_date)
    )
}

async fn session_profile(state: &ServerState, jar: &CookieJar) -> Result<Profile, Rejection> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Err(reject(StatusCode::UNAUTHORIZED, MSG_LOGIN_REQUIRED));
    };
    match state.engine.session_profile(cookie.value()).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err(reject(StatusCode::UNAUTHORIZED, MSG_LOGIN_REQUIRED)),
        Err(err) => {
            tracing::error!("session lookup failed: {err}");
            Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ))
        }
    }
}

pub async fn generate(
    State(state): State<ServerState>,
    jar: CookieJar,
    payload: Result<Json<AdvanceRequest>, JsonRejection>,
) -> Result<Json<AdvanceCreated>, Rejection> {
    // All field checks come before the session check and any file I/O. A
    // body that does not even deserialize (e.g. a string amount) counts as
    // missing fields.
    let Ok(Json(payload)) = payload else {
        return Err(reject(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS));
    };
    let Some(amount) = payload.item_amount.filter(|a| a.is_finite()) else {
        return Err(reject(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS));
    };
    let required = [
        payload.applicant_name.trim(),
        payload.item_name.trim(),
        payload.invoice_date.trim(),
        payload.invoice_path.trim(),
        payload.signature_path.trim(),
    ];
    if required.iter().any(|field| field.is_empty()) {
        return Err(reject(StatusCode::BAD_REQUEST, MSG_MISSING_FIELDS));
    }

    let profile = session_profile(&state, &jar).await?;

    let template = match tokio::fs::read(state.template_path.as_path()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("failed to read advance template: {err}");
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_GENERATE_FAILED,
            ));
        }
    };

    let invoice = match state
        .storage
        .download(Bucket::Invoices, &payload.invoice_path)
        .await
    {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("invoice fetch failed: {err}");
            return Err(reject(StatusCode::BAD_REQUEST, MSG_INVOICE_FETCH));
        }
    };

    let signature = match state
        .storage
        .download(Bucket::Signatures, &payload.signature_path)
        .await
    {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("signature fetch failed: {err}");
            return Err(reject(StatusCode::BAD_REQUEST, MSG_SIGNATURE_FETCH));
        }
    };

    let amount_text = amount_text(amount);
    let fields = AdvanceFields {
        applicant_name: &payload.applicant_name,
        item_name: &payload.item_name,
        amount_text: &amount_text,
        item_comment: payload.item_comment.as_deref(),
        invoice_date: &payload.invoice_date,
    };

    let document = match pdf::compose_advance(&template, &invoice, signature, &fields) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("pdf composition failed: {err}");
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_GENERATE_FAILED,
            ));
        }
    };

    let path = output_path(&profile.id, &payload.applicant_name, &payload.invoice_date);
    if let Err(err) = state
        .storage
        .upload(Bucket::Advances, &path, &document, true)
        .await
    {
        tracing::error!("failed to store advance pdf: {err}");
        return Err(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            MSG_UPLOAD_FAILED,
        ));
    }

    Ok(Json(AdvanceCreated { path }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_text_trims_whole_numbers() {
        assert_eq!(amount_text(1234.0), "1234");
        assert_eq!(amount_text(12.5), "12.5");
        assert_eq!(amount_text(0.0), "0");
    }

    #[test]
    fn compact_date_strips_dashes() {
        assert_eq!(compact_date("2025-01-06"), "20250106");
        assert_eq!(compact_date("20250106"), "20250106");
    }

    #[test]
    fn compact_date_falls_back_to_today() {
        let today = Local::now().format("%Y%m%d").to_string();
        assert_eq!(compact_date("06/01/2025"), today);
        assert_eq!(compact_date("not a date"), today);
        assert_eq!(compact_date(""), today);
    }

    #[test]
    fn sanitize_name_keeps_cjk_and_word_chars() {
        assert_eq!(sanitize_name("Alice Chen"), "AliceChen");
        assert_eq!(sanitize_name("\u{738b}\u{5c0f}\u{660e}"), "\u{738b}\u{5c0f}\u{660e}");
        assert_eq!(sanitize_name("a/b\\c:d"), "abcd");
        assert_eq!(sanitize_name("under_score-dash"), "under_score-dash");
    }

    #[test]
    fn output_path_defaults_empty_names_to_user() {
        assert_eq!(
            output_path("u1", "!!!", "2025-01-06"),
            "u1/advance_user_20250106.pdf"
        );
        assert_eq!(
            output_path("u1", "Alice", "2025-01-06"),
            "u1/advance_Alice_20250106.pdf"
        );
    }
}
