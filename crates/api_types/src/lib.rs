use serde::{Deserialize, Serialize};

/// Deserializer for patch fields that must tell "absent" (`None`) apart from
/// "present and null" (`Some(None)`). Pair with `#[serde(default)]` so an
/// absent field stays `None`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Review state of an expense claim.
///
/// Transitions are unconstrained: any admin edit may set any status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EgressStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EgressStatus {
    /// Returns the canonical status string used by the engine/database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

pub mod action {
    use super::*;

    /// Envelope returned by every ledger write action.
    ///
    /// Write handlers never propagate errors past their own boundary; a
    /// failure becomes `{ "success": false, "error": "..." }` with HTTP 200.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ActionResult {
        pub success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
    }

    impl ActionResult {
        pub fn ok() -> Self {
            Self {
                success: true,
                error: None,
            }
        }

        pub fn failed(error: impl Into<String>) -> Self {
            Self {
                success: false,
                error: Some(error.into()),
            }
        }
    }
}

pub mod egress {
    use super::*;

    /// Expense claim as shown to clients (camelCase view model).
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EgressView {
        pub id: String,
        pub applicant_name: String,
        pub item_name: String,
        /// Integer minor units (cents).
        pub item_amount_minor: i64,
        pub item_comment: Option<String>,
        /// `YYYY-MM-DD`.
        pub invoice_date: String,
        pub invoice_files: Vec<String>,
        pub transfer_date: Option<String>,
        pub transfer_fee_minor: Option<i64>,
        pub transfer_files: Option<Vec<String>>,
        pub status: EgressStatus,
        pub user_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EgressNew {
        pub applicant_name: String,
        pub item_name: String,
        pub item_amount_minor: i64,
        pub item_comment: Option<String>,
        pub invoice_date: String,
        #[serde(default)]
        pub invoice_files: Vec<String>,
        pub transfer_date: Option<String>,
        pub transfer_fee_minor: Option<i64>,
        pub transfer_files: Option<Vec<String>>,
        pub status: Option<EgressStatus>,
    }

    /// Partial update: absent fields keep their stored value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EgressUpdate {
        pub applicant_name: Option<String>,
        pub item_name: Option<String>,
        pub item_amount_minor: Option<i64>,
        #[serde(default, deserialize_with = "crate::double_option")]
        pub item_comment: Option<Option<String>>,
        pub invoice_date: Option<String>,
        pub invoice_files: Option<Vec<String>>,
        #[serde(default, deserialize_with = "crate::double_option")]
        pub transfer_date: Option<Option<String>>,
        #[serde(default, deserialize_with = "crate::double_option")]
        pub transfer_fee_minor: Option<Option<i64>>,
        #[serde(default, deserialize_with = "crate::double_option")]
        pub transfer_files: Option<Option<Vec<String>>>,
        pub status: Option<EgressStatus>,
    }
}

pub mod ingress {
    use super::*;

    /// Income entry as shown to clients.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IngressView {
        pub id: String,
        /// `YYYY-MM-DD`.
        pub ingress_date: String,
        pub ingress_amount_minor: i64,
        pub ingress_comment: Option<String>,
        pub ingress_files: Vec<String>,
        pub user_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IngressNew {
        pub ingress_date: String,
        pub ingress_amount_minor: i64,
        pub ingress_comment: Option<String>,
        #[serde(default)]
        pub ingress_files: Vec<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IngressUpdate {
        pub ingress_date: Option<String>,
        pub ingress_amount_minor: Option<i64>,
        #[serde(default, deserialize_with = "crate::double_option")]
        pub ingress_comment: Option<Option<String>>,
        pub ingress_files: Option<Vec<String>>,
    }
}

pub mod summary {
    use super::*;
    use crate::egress::EgressView;
    use crate::ingress::IngressView;

    /// One record of the unified, date-sorted transaction feed.
    ///
    /// Modeled as a tagged union so kind-specific fields (status, transfer
    /// fee) stay on their own variant.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    pub enum TransactionView {
        Egress(EgressView),
        Ingress(IngressView),
    }

    /// One point of the weekly chart series, keyed `YYYY-Www`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WeekPoint {
        pub week: String,
        pub ingress_minor: i64,
        pub egress_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SummaryResponse {
        pub total_ingress_minor: i64,
        pub total_egress_minor: i64,
        pub balance_minor: i64,
        pub transactions: Vec<TransactionView>,
        pub weekly: Vec<WeekPoint>,
    }
}

pub mod advance {
    use super::*;

    /// Request body of the advance-PDF endpoint.
    ///
    /// This is the one snake_case body in the API; the endpoint is specified
    /// at the HTTP boundary with these exact keys.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdvanceRequest {
        pub applicant_name: String,
        pub item_name: String,
        /// Plain JSON number; drawn on the cover sheet as text.
        pub item_amount: Option<f64>,
        pub item_comment: Option<String>,
        pub invoice_date: String,
        pub invoice_path: String,
        pub signature_path: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdvanceCreated {
        pub path: String,
    }

    /// Error body shared by the advance endpoint's rejection responses.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdvanceRejection {
        pub message: String,
    }
}

pub mod files {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignedUrlRequest {
        pub bucket: String,
        pub path: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SignedUrl {
        pub url: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Uploaded {
        pub path: String,
    }
}
