//! Aggregation over the full ledger: totals, balance, the unified
//! date-sorted feed, and per-week chart buckets.
//!
//! Everything here is computed from the two collections fetched whole; there
//! is no pagination and no cached intermediate state.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::{Egress, Ingress, MoneyCents, ResultEngine};

use super::Engine;

/// One record of the unified feed. A sum type, so kind-specific fields stay
/// on their variant instead of being flattened into one merged object.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEntry {
    Egress(Egress),
    Ingress(Ingress),
}

impl LedgerEntry {
    /// The date the feed sorts and buckets by: invoice date for claims,
    /// ingress date for income.
    pub fn relevant_date(&self) -> &str {
        match self {
            Self::Egress(egress) => &egress.invoice_date,
            Self::Ingress(ingress) => &ingress.ingress_date,
        }
    }

    fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.relevant_date(), "%Y-%m-%d").ok()
    }

    /// Full cost of the entry: for claims this includes the transfer fee.
    fn total_minor(&self) -> MoneyCents {
        match self {
            Self::Egress(egress) => MoneyCents::new(
                egress.item_amount_minor + egress.transfer_fee_minor.unwrap_or(0),
            ),
            Self::Ingress(ingress) => MoneyCents::new(ingress.ingress_amount_minor),
        }
    }
}

/// One week of the chart series, keyed `YYYY-Www`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekBucket {
    pub week: String,
    pub ingress_minor: i64,
    pub egress_minor: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total_ingress_minor: i64,
    pub total_egress_minor: i64,
    pub balance_minor: i64,
    pub transactions: Vec<LedgerEntry>,
    pub weekly: Vec<WeekBucket>,
}

/// Week key for a date, Monday-start convention.
///
/// Ported verbatim from the chart the original UI draws: take the Monday of
/// the date's week, count days from that Monday's year's January 1st, add
/// January 1st's Sunday-based weekday index, divide by seven, one-based.
/// Week numbers are zero-padded so the keys sort lexicographically.
pub fn week_key(date: NaiveDate) -> String {
    let day = date.weekday().num_days_from_sunday() as i64;
    let to_monday = if day == 0 { 6 } else { day - 1 };
    let monday = date - Duration::days(to_monday);

    let year = monday.year();
    let Some(jan_first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return format!("{year}-W00");
    };

    let days_from_jan = i64::from(monday.ordinal0());
    let jan_weekday = i64::from(jan_first.weekday().num_days_from_sunday());
    let week = (days_from_jan + jan_weekday) / 7 + 1;

    format!("{year}-W{week:02}")
}

/// Pure aggregation; the engine method only supplies the collections.
pub(crate) fn compute_summary(egress: Vec<Egress>, ingress: Vec<Ingress>) -> Summary {
    let total_ingress = ingress
        .iter()
        .map(|entry| MoneyCents::new(entry.ingress_amount_minor))
        .fold(MoneyCents::ZERO, |acc, amount| acc + amount);
    let total_egress = egress
        .iter()
        .map(|claim| {
            MoneyCents::new(claim.item_amount_minor + claim.transfer_fee_minor.unwrap_or(0))
        })
        .fold(MoneyCents::ZERO, |acc, amount| acc + amount);
    let balance = total_ingress - total_egress;

    let mut transactions: Vec<LedgerEntry> = egress
        .into_iter()
        .map(LedgerEntry::Egress)
        .chain(ingress.into_iter().map(LedgerEntry::Ingress))
        .collect();
    // Descending by date; unparsable dates sink to the end. The sort is
    // stable, so ties keep input order.
    transactions.sort_by(|a, b| match (a.parsed_date(), b.parsed_date()) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let mut buckets: BTreeMap<String, (MoneyCents, MoneyCents)> = BTreeMap::new();
    for entry in &transactions {
        let Some(date) = entry.parsed_date() else {
            // Unparsable dates stay visible in the feed but cannot be
            // assigned a week.
            continue;
        };
        let slot = buckets.entry(week_key(date)).or_default();
        match entry {
            LedgerEntry::Ingress(_) => slot.0 += entry.total_minor(),
            LedgerEntry::Egress(_) => slot.1 += entry.total_minor(),
        }
    }

    let weekly = buckets
        .into_iter()
        .map(|(week, (ingress_minor, egress_minor))| WeekBucket {
            week,
            ingress_minor: ingress_minor.cents(),
            egress_minor: egress_minor.cents(),
        })
        .collect();

    Summary {
        total_ingress_minor: total_ingress.cents(),
        total_egress_minor: total_egress.cents(),
        balance_minor: balance.cents(),
        transactions,
        weekly,
    }
}

impl Engine {
    /// Totals, balance, unified feed and weekly buckets over the whole
    /// ledger.
    pub async fn summary(&self) -> ResultEngine<Summary> {
        let egress = self.list_egress().await?;
        let ingress = self.list_ingress().await?;
        Ok(compute_summary(egress, ingress))
    }
}
