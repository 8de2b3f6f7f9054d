//! The module contains the `Ingress` type representing an income entry.

use sea_orm::entity::prelude::*;

use crate::{EngineError, egress::decode_files};

/// An income entry (inflow) of the shared fund.
#[derive(Clone, Debug, PartialEq)]
pub struct Ingress {
    pub id: String,
    pub ingress_date: String,
    /// Integer minor units, always >= 0.
    pub ingress_amount_minor: i64,
    pub ingress_comment: Option<String>,
    pub ingress_files: Vec<String>,
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ingress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ingress_date: String,
    pub ingress_amount_minor: i64,
    pub ingress_comment: Option<String>,
    /// JSON array of storage paths.
    pub ingress_files: String,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Ingress {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let ingress_files = decode_files(&model.ingress_files, "ingress_files")?;
        Ok(Self {
            id: model.id,
            ingress_date: model.ingress_date,
            ingress_amount_minor: model.ingress_amount_minor,
            ingress_comment: model.ingress_comment,
            ingress_files,
            user_id: model.user_id,
        })
    }
}
