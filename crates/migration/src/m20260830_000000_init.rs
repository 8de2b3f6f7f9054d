//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Cashbook:
//!
//! - `user_profiles`: identity plus the multi-system role map
//! - `sessions`: cookie-carried login sessions
//! - `egress`: expense claims (outflows)
//! - `ingress`: income entries (inflows)
//!
//! Dates are stored as `YYYY-MM-DD` text and file-reference lists as JSON
//! text; amounts are big-integer minor units.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum UserProfiles {
    Table,
    Id,
    Email,
    Name,
    IsAdmin,
    Roles,
    CreatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Token,
    UserId,
    CreatedAt,
    ExpiresAt,
}

#[derive(Iden)]
enum Egress {
    Table,
    Id,
    ApplicantName,
    ItemName,
    ItemAmountMinor,
    ItemComment,
    InvoiceDate,
    InvoiceFiles,
    TransferDate,
    TransferFeeMinor,
    TransferFiles,
    Status,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Ingress {
    Table,
    Id,
    IngressDate,
    IngressAmountMinor,
    IngressComment,
    IngressFiles,
    UserId,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. User profiles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserProfiles::Email).string())
                    .col(ColumnDef::new(UserProfiles::Name).string())
                    .col(
                        ColumnDef::new(UserProfiles::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(UserProfiles::Roles).text())
                    .col(ColumnDef::new(UserProfiles::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Sessions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Token)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::UserId).string().not_null())
                    .col(ColumnDef::new(Sessions::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Sessions::ExpiresAt).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sessions-user_id")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(UserProfiles::Table, UserProfiles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Egress (expense claims)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Egress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Egress::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Egress::ApplicantName).string().not_null())
                    .col(ColumnDef::new(Egress::ItemName).string().not_null())
                    .col(
                        ColumnDef::new(Egress::ItemAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Egress::ItemComment).string())
                    .col(ColumnDef::new(Egress::InvoiceDate).string().not_null())
                    .col(ColumnDef::new(Egress::InvoiceFiles).text().not_null())
                    .col(ColumnDef::new(Egress::TransferDate).string())
                    .col(ColumnDef::new(Egress::TransferFeeMinor).big_integer())
                    .col(ColumnDef::new(Egress::TransferFiles).text())
                    .col(
                        ColumnDef::new(Egress::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Egress::UserId).string())
                    .col(ColumnDef::new(Egress::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Egress::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-egress-invoice_date")
                    .table(Egress::Table)
                    .col(Egress::InvoiceDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Ingress (income entries)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Ingress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ingress::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ingress::IngressDate).string().not_null())
                    .col(
                        ColumnDef::new(Ingress::IngressAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Ingress::IngressComment).string())
                    .col(ColumnDef::new(Ingress::IngressFiles).text().not_null())
                    .col(ColumnDef::new(Ingress::UserId).string())
                    .col(ColumnDef::new(Ingress::CreatedAt).string().not_null())
                    .col(ColumnDef::new(Ingress::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ingress-ingress_date")
                    .table(Ingress::Table)
                    .col(Ingress::IngressDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ingress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Egress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await?;
        Ok(())
    }
}
