//! Ingress (income entry) operations. Same gate and shape as egress.

use chrono::Utc;
use sea_orm::{ActiveValue, IntoActiveModel, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    egress::encode_files,
    ingress::{self, Ingress},
};

use super::{Engine, normalize_optional_text, require_non_negative, with_tx};

#[derive(Clone, Debug)]
pub struct IngressNewCmd {
    pub ingress_date: String,
    pub ingress_amount_minor: i64,
    pub ingress_comment: Option<String>,
    pub ingress_files: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct IngressPatch {
    pub ingress_date: Option<String>,
    pub ingress_amount_minor: Option<i64>,
    pub ingress_comment: Option<Option<String>>,
    pub ingress_files: Option<Vec<String>>,
}

impl Engine {
    /// All income entries, newest first.
    pub async fn list_ingress(&self) -> ResultEngine<Vec<Ingress>> {
        let models = ingress::Entity::find()
            .order_by_desc(ingress::Column::IngressDate)
            .all(self.db())
            .await?;
        models.into_iter().map(Ingress::try_from).collect()
    }

    pub async fn ingress_by_id(&self, id: &str) -> ResultEngine<Ingress> {
        let model = ingress::Entity::find_by_id(id.to_string())
            .one(self.db())
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("ingress not exists".to_string()))?;
        Ingress::try_from(model)
    }

    pub async fn create_ingress(&self, cmd: IngressNewCmd, user_id: &str) -> ResultEngine<Ingress> {
        let ingress_amount_minor =
            require_non_negative(cmd.ingress_amount_minor, "ingress amount")?;

        let model: ResultEngine<ingress::Model> = with_tx!(self, |tx| {
            async {
                self.require_reimburse_admin(&tx, user_id).await?;

                let now = Utc::now().to_rfc3339();
                let model = ingress::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    ingress_date: ActiveValue::Set(cmd.ingress_date.clone()),
                    ingress_amount_minor: ActiveValue::Set(ingress_amount_minor),
                    ingress_comment: ActiveValue::Set(normalize_optional_text(
                        cmd.ingress_comment.as_deref(),
                    )),
                    ingress_files: ActiveValue::Set(encode_files(&cmd.ingress_files)),
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

        Ingress::try_from(model?)
    }

    pub async fn update_ingress(
        &self,
        id: &str,
        patch: IngressPatch,
        user_id: &str,
    ) -> ResultEngine<Ingress> {
        let model: ResultEngine<ingress::Model> = with_tx!(self, |tx| {
            async {
                self.require_reimburse_admin(&tx, user_id).await?;

                let model = ingress::Entity::find_by_id(id.to_string())
                    .one(&tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("ingress not exists".to_string()))?;
                let mut active = model.into_active_model();

                if let Some(ingress_date) = patch.ingress_date {
                    active.ingress_date = ActiveValue::Set(ingress_date);
                }
                if let Some(amount) = patch.ingress_amount_minor {
                    active.ingress_amount_minor =
                        ActiveValue::Set(require_non_negative(amount, "ingress amount")?);
                }
                if let Some(comment) = patch.ingress_comment {
                    active.ingress_comment =
                        ActiveValue::Set(normalize_optional_text(comment.as_deref()));
                }
                if let Some(files) = patch.ingress_files {
                    active.ingress_files = ActiveValue::Set(encode_files(&files));
                }
                active.updated_at = ActiveValue::Set(Utc::now().to_rfc3339());

                let model = active.update(&tx).await?;
                Ok(model)
            }
            .await
        });

        Ingress::try_from(model?)
    }

    /// Engine-level removal; not routed, see `delete_egress`.
    pub async fn delete_ingress(&self, id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |tx| {
            async {
                self.require_reimburse_admin(&tx, user_id).await?;
                let result = ingress::Entity::delete_by_id(id.to_string())
                    .exec(&tx)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(EngineError::KeyNotFound("ingress not exists".to_string()));
                }
                Ok(())
            }
            .await
        })
    }
}
