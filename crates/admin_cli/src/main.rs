use std::error::Error;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use engine::MoneyCents;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use uuid::Uuid;

mod profiles {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "user_profiles")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub email: Option<String>,
        pub name: Option<String>,
        pub is_admin: bool,
        pub roles: Option<String>,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "cashbook_admin")]
#[command(about = "Admin utilities for Cashbook (bootstrap profiles, seed the ledger)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./cashbook.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Profile(Profile),
    /// Import ledger rows from a JSON file.
    Seed(SeedArgs),
    /// Write a blank advance form template PDF.
    Template(TemplateArgs),
}

#[derive(Args, Debug)]
struct Profile {
    #[command(subcommand)]
    command: ProfileCommand,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    Create(ProfileCreateArgs),
}

#[derive(Args, Debug)]
struct ProfileCreateArgs {
    /// Provider-issued user id.
    #[arg(long)]
    id: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// Set the legacy global admin flag.
    #[arg(long)]
    admin: bool,
    /// Role granted under the `reimburse` system (e.g. `admin` or `user`).
    #[arg(long)]
    reimburse_role: Option<String>,
}

#[derive(Args, Debug)]
struct SeedArgs {
    /// JSON file with optional `egress` and `ingress` arrays.
    file: PathBuf,
    /// Profile id recorded as the owner of every seeded row.
    #[arg(long)]
    user: Option<String>,
}

#[derive(Args, Debug)]
struct TemplateArgs {
    /// Output path.
    #[arg(long, default_value = "advance-template.pdf")]
    out: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    egress: Vec<SeedEgress>,
    #[serde(default)]
    ingress: Vec<SeedIngress>,
}

#[derive(Debug, Deserialize)]
struct SeedEgress {
    applicant_name: String,
    item_name: String,
    item_amount_minor: i64,
    item_comment: Option<String>,
    invoice_date: String,
    #[serde(default)]
    invoice_files: Vec<String>,
    transfer_date: Option<String>,
    transfer_fee_minor: Option<i64>,
    #[serde(default)]
    transfer_files: Option<Vec<String>>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedIngress {
    ingress_date: String,
    ingress_amount_minor: i64,
    ingress_comment: Option<String>,
    #[serde(default)]
    ingress_files: Vec<String>,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

struct SeedReport {
    egress_count: usize,
    ingress_count: usize,
    /// Claim amounts including transfer fees.
    egress_total: MoneyCents,
    ingress_total: MoneyCents,
}

/// Seeding writes rows directly; the role gate only applies to the HTTP
/// surface.
async fn seed(
    db: &DatabaseConnection,
    seed_file: SeedFile,
    user: Option<String>,
) -> Result<SeedReport, Box<dyn Error + Send + Sync>> {
    let now = Utc::now().to_rfc3339();
    let mut report = SeedReport {
        egress_count: seed_file.egress.len(),
        ingress_count: seed_file.ingress.len(),
        egress_total: MoneyCents::ZERO,
        ingress_total: MoneyCents::ZERO,
    };

    for row in seed_file.egress {
        report.egress_total +=
            MoneyCents::new(row.item_amount_minor + row.transfer_fee_minor.unwrap_or(0));
        let model = engine::egress::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            applicant_name: Set(row.applicant_name),
            item_name: Set(row.item_name),
            item_amount_minor: Set(row.item_amount_minor),
            item_comment: Set(row.item_comment),
            invoice_date: Set(row.invoice_date),
            invoice_files: Set(serde_json::to_string(&row.invoice_files)?),
            transfer_date: Set(row.transfer_date),
            transfer_fee_minor: Set(row.transfer_fee_minor),
            transfer_files: Set(row
                .transfer_files
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?),
            status: Set(row.status.unwrap_or_else(|| "pending".to_string())),
            user_id: Set(user.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        };
        engine::egress::Entity::insert(model).exec(db).await?;
    }

    for row in seed_file.ingress {
        report.ingress_total += MoneyCents::new(row.ingress_amount_minor);
        let model = engine::ingress::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            ingress_date: Set(row.ingress_date),
            ingress_amount_minor: Set(row.ingress_amount_minor),
            ingress_comment: Set(row.ingress_comment),
            ingress_files: Set(serde_json::to_string(&row.ingress_files)?),
            user_id: Set(user.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        };
        engine::ingress::Entity::insert(model).exec(db).await?;
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Profile(Profile {
            command: ProfileCommand::Create(args),
        }) => {
            let db = connect_db(&cli.database_url).await?;

            if profiles::Entity::find_by_id(args.id.clone())
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("profile already exists: {}", args.id);
                std::process::exit(1);
            }

            let roles = args
                .reimburse_role
                .map(|role| serde_json::json!({ "reimburse": [role] }).to_string());
            let profile = profiles::ActiveModel {
                id: Set(args.id.clone()),
                email: Set(args.email),
                name: Set(args.name),
                is_admin: Set(args.admin),
                roles: Set(roles),
                created_at: Set(Utc::now().to_rfc3339()),
            };
            profiles::Entity::insert(profile).exec(&db).await?;

            println!("created profile: {}", args.id);
        }
        Command::Seed(args) => {
            let db = connect_db(&cli.database_url).await?;

            let raw = std::fs::read_to_string(&args.file)?;
            let seed_file: SeedFile = serde_json::from_str(&raw)?;
            let report = seed(&db, seed_file, args.user).await?;

            println!(
                "seeded {} egress rows ({}) and {} ingress rows ({})",
                report.egress_count, report.egress_total, report.ingress_count, report.ingress_total
            );
        }
        Command::Template(args) => {
            let bytes = server::pdf::blank_template()?;
            std::fs::write(&args.out, bytes)?;
            println!("wrote template: {}", args.out.display());
        }
    }

    Ok(())
}
