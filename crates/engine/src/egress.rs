//! The module contains the `Egress` type representing an expense claim.
//!
//! Rows live in the `egress` table; dates are stored as `YYYY-MM-DD` strings
//! and file-reference lists as JSON text, so the domain type owns the
//! decoding.

use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine};

/// Review state of an expense claim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Status {
    /// Returns the canonical status string used by the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for Status {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidField(format!(
                "invalid egress status: {other}"
            ))),
        }
    }
}

/// An expense claim (outflow) of the shared fund.
#[derive(Clone, Debug, PartialEq)]
pub struct Egress {
    pub id: String,
    pub applicant_name: String,
    pub item_name: String,
    /// Integer minor units, always >= 0.
    pub item_amount_minor: i64,
    pub item_comment: Option<String>,
    pub invoice_date: String,
    pub invoice_files: Vec<String>,
    pub transfer_date: Option<String>,
    pub transfer_fee_minor: Option<i64>,
    pub transfer_files: Option<Vec<String>>,
    pub status: Status,
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "egress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub applicant_name: String,
    pub item_name: String,
    pub item_amount_minor: i64,
    pub item_comment: Option<String>,
    pub invoice_date: String,
    /// JSON array of storage paths.
    pub invoice_files: String,
    pub transfer_date: Option<String>,
    pub transfer_fee_minor: Option<i64>,
    pub transfer_files: Option<String>,
    pub status: String,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Encode a file-reference list into its JSON text column form.
pub(crate) fn encode_files(files: &[String]) -> String {
    serde_json::to_string(files).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON text column into a file-reference list.
pub(crate) fn decode_files(raw: &str, label: &str) -> ResultEngine<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|_| EngineError::InvalidField(format!("malformed {label} list")))
}

impl TryFrom<Model> for Egress {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = Status::try_from(model.status.as_str())?;
        let invoice_files = decode_files(&model.invoice_files, "invoice_files")?;
        let transfer_files = model
            .transfer_files
            .as_deref()
            .map(|raw| decode_files(raw, "transfer_files"))
            .transpose()?;
        Ok(Self {
            id: model.id,
            applicant_name: model.applicant_name,
            item_name: model.item_name,
            item_amount_minor: model.item_amount_minor,
            item_comment: model.item_comment,
            invoice_date: model.invoice_date,
            invoice_files,
            transfer_date: model.transfer_date,
            transfer_fee_minor: model.transfer_fee_minor,
            transfer_files,
            status,
            user_id: model.user_id,
        })
    }
}
