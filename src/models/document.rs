use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Document types that must each have at least one VERIFIED document before a
/// customer can be approved.
pub const REQUIRED_DOCUMENT_TYPES: [&str; 3] = ["AADHAR", "PAN", "PHOTO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Rejected => "REJECTED",
        }
    }

    /// Terminal documents are immutable to delete; only a review may touch them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(VerificationStatus::Pending),
            "VERIFIED" => Ok(VerificationStatus::Verified),
            "REJECTED" => Ok(VerificationStatus::Rejected),
            other => Err(AppError::InternalError(format!(
                "Unknown verification status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A KYC document owned by an external customer aggregate.
///
/// `customer_id` references the Customer service's aggregate root; this
/// service never owns customer records, only their documents.
#[derive(Debug, Clone)]
pub struct KycDocument {
    pub document_id: i64,
    pub customer_id: i64,
    pub document_name: String,
    pub document_type: String,
    /// MIME type captured at upload, replayed on download.
    pub content_type: String,
    pub content: Vec<u8>,
    pub status: VerificationStatus,
    pub message: String,
    pub reviewed_by: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Verified,
    Rejected,
}

impl ReviewDecision {
    pub fn status(&self) -> VerificationStatus {
        match self {
            ReviewDecision::Verified => VerificationStatus::Verified,
            ReviewDecision::Rejected => VerificationStatus::Rejected,
        }
    }
}

/// Global document counts for the operational dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycStats {
    pub total: i64,
    pub pending: i64,
    pub verified: i64,
    pub rejected: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ] {
            let parsed: VerificationStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("garbage".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!VerificationStatus::Pending.is_terminal());
        assert!(VerificationStatus::Verified.is_terminal());
        assert!(VerificationStatus::Rejected.is_terminal());
    }
}
