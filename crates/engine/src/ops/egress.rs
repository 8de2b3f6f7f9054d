//! Egress (expense claim) operations.
//!
//! Create and update are gated on the reimburse admin role and run inside a
//! DB transaction. Updates are full-row last-writer-wins: there is no version
//! column, by documented choice. `delete_egress` is a library function only;
//! no route exposes it.

use chrono::Utc;
use sea_orm::{ActiveValue, IntoActiveModel, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    egress::{self, Egress, Status, encode_files},
};

use super::{Engine, normalize_optional_text, normalize_required_name, require_non_negative, with_tx};

/// Fields of a new expense claim. The owner id comes from the session, not
/// from the payload.
#[derive(Clone, Debug)]
pub struct EgressNewCmd {
    pub applicant_name: String,
    pub item_name: String,
    pub item_amount_minor: i64,
    pub item_comment: Option<String>,
    pub invoice_date: String,
    pub invoice_files: Vec<String>,
    pub transfer_date: Option<String>,
    pub transfer_fee_minor: Option<i64>,
    pub transfer_files: Option<Vec<String>>,
    pub status: Option<Status>,
}

/// Partial update. `None` keeps the stored value; the nested options carry an
/// explicit "set to null".
#[derive(Clone, Debug, Default)]
pub struct EgressPatch {
    pub applicant_name: Option<String>,
    pub item_name: Option<String>,
    pub item_amount_minor: Option<i64>,
    pub item_comment: Option<Option<String>>,
    pub invoice_date: Option<String>,
    pub invoice_files: Option<Vec<String>>,
    pub transfer_date: Option<Option<String>>,
    pub transfer_fee_minor: Option<Option<i64>>,
    pub transfer_files: Option<Option<Vec<String>>>,
    pub status: Option<Status>,
}

impl Engine {
    /// All expense claims, newest invoice date first.
    pub async fn list_egress(&self) -> ResultEngine<Vec<Egress>> {
        let models = egress::Entity::find()
            .order_by_desc(egress::Column::InvoiceDate)
            .all(self.db())
            .await?;
        models.into_iter().map(Egress::try_from).collect()
    }

    pub async fn egress_by_id(&self, id: &str) -> ResultEngine<Egress> {
        let model = egress::Entity::find_by_id(id.to_string())
            .one(self.db())
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("egress not exists".to_string()))?;
        Egress::try_from(model)
    }

    pub async fn create_egress(&self, cmd: EgressNewCmd, user_id: &str) -> ResultEngine<Egress> {
        let applicant_name = normalize_required_name(&cmd.applicant_name, "applicant name")?;
        let item_name = normalize_required_name(&cmd.item_name, "item name")?;
        let item_amount_minor = require_non_negative(cmd.item_amount_minor, "item amount")?;
        let transfer_fee_minor = cmd
            .transfer_fee_minor
            .map(|fee| require_non_negative(fee, "transfer fee"))
            .transpose()?;

        let model: ResultEngine<egress::Model> = with_tx!(self, |tx| {
            async {
                self.require_reimburse_admin(&tx, user_id).await?;

                let now = Utc::now().to_rfc3339();
                let model = egress::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    applicant_name: ActiveValue::Set(applicant_name),
                    item_name: ActiveValue::Set(item_name),
                    item_amount_minor: ActiveValue::Set(item_amount_minor),
                    item_comment: ActiveValue::Set(normalize_optional_text(
                        cmd.item_comment.as_deref(),
                    )),
                    invoice_date: ActiveValue::Set(cmd.invoice_date.clone()),
                    invoice_files: ActiveValue::Set(encode_files(&cmd.invoice_files)),
                    transfer_date: ActiveValue::Set(cmd.transfer_date.clone()),
                    transfer_fee_minor: ActiveValue::Set(transfer_fee_minor),
                    transfer_files: ActiveValue::Set(
                        cmd.transfer_files.as_deref().map(encode_files),
                    ),
                    status: ActiveValue::Set(cmd.status.unwrap_or_default().as_str().to_string()),
                    user_id: ActiveValue::Set(Some(user_id.to_string())),
                    created_at: ActiveValue::Set(now.clone()),
                    updated_at: ActiveValue::Set(now),
                }
                .insert(&tx)
                .await?;
                Ok(model)
            }
            .await
        });

        Egress::try_from(model?)
    }

    pub async fn update_egress(
        &self,
        id: &str,
        patch: EgressPatch,
        user_id: &str,
    ) -> ResultEngine<Egress> {
        let model: ResultEngine<egress::Model> = with_tx!(self, |tx| {
            async {
                self.require_reimburse_admin(&tx, user_id).await?;

                let model = egress::Entity::find_by_id(id.to_string())
                    .one(&tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("egress not exists".to_string()))?;
                let mut active = model.into_active_model();

                if let Some(applicant_name) = patch.applicant_name {
                    active.applicant_name =
                        ActiveValue::Set(normalize_required_name(&applicant_name, "applicant name")?);
                }
                if let Some(item_name) = patch.item_name {
                    active.item_name =
                        ActiveValue::Set(normalize_required_name(&item_name, "item name")?);
                }
                if let Some(amount) = patch.item_amount_minor {
                    active.item_amount_minor =
                        ActiveValue::Set(require_non_negative(amount, "item amount")?);
                }
                if let Some(comment) = patch.item_comment {
                    active.item_comment =
                        ActiveValue::Set(normalize_optional_text(comment.as_deref()));
                }
                if let Some(invoice_date) = patch.invoice_date {
                    active.invoice_date = ActiveValue::Set(invoice_date);
                }
                if let Some(files) = patch.invoice_files {
                    active.invoice_files = ActiveValue::Set(encode_files(&files));
                }
                if let Some(transfer_date) = patch.transfer_date {
                    active.transfer_date = ActiveValue::Set(transfer_date);
                }
                if let Some(fee) = patch.transfer_fee_minor {
                    let fee = fee
                        .map(|fee| require_non_negative(fee, "transfer fee"))
                        .transpose()?;
                    active.transfer_fee_minor = ActiveValue::Set(fee);
                }
                if let Some(files) = patch.transfer_files {
                    active.transfer_files =
                        ActiveValue::Set(files.as_deref().map(encode_files));
                }
                if let Some(status) = patch.status {
                    active.status = ActiveValue::Set(status.as_str().to_string());
                }
                active.updated_at = ActiveValue::Set(Utc::now().to_rfc3339());

                let model = active.update(&tx).await?;
                Ok(model)
            }
            .await
        });

        Egress::try_from(model?)
    }

    /// Removes a claim. Kept as an engine-level function for maintenance
    /// tooling; the HTTP surface deliberately does not route it.
    pub async fn delete_egress(&self, id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |tx| {
            async {
                self.require_reimburse_admin(&tx, user_id).await?;
                let result = egress::Entity::delete_by_id(id.to_string()).exec(&tx).await?;
                if result.rows_affected == 0 {
                    return Err(EngineError::KeyNotFound("egress not exists".to_string()));
                }
                Ok(())
            }
            .await
        })
    }
}
