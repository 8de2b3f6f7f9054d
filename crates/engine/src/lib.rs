//! Ledger core for the shared-fund tracker.
//!
//! The [`Engine`] owns the database connection and exposes every operation
//! the HTTP layer needs: the reimburse-admin role gate, egress/ingress CRUD,
//! sessions, and the summary aggregation (balance, unified feed, weekly
//! buckets). All amounts are integer minor units ([`MoneyCents`]).

pub use egress::{Egress, Status as EgressStatus};
pub use error::EngineError;
pub use ingress::Ingress;
pub use money::MoneyCents;
pub use ops::egress::{EgressNewCmd, EgressPatch};
pub use ops::ingress::{IngressNewCmd, IngressPatch};
pub use ops::summary::{LedgerEntry, Summary, WeekBucket, week_key};
pub use ops::{Engine, EngineBuilder, SessionUser};
pub use profiles::{Profile, RoleMap, SystemName};

pub mod egress;
mod error;
pub mod ingress;
mod money;
mod ops;
pub mod profiles;
pub mod sessions;

type ResultEngine<T> = Result<T, EngineError>;
