use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::document::{KycDocument, VerificationStatus};
use crate::models::user::Role;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminLoginResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Document summary returned to clients. Never carries the blob itself;
/// content goes through the download endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct KycDocumentResponse {
    pub document_id: i64,
    pub customer_id: i64,
    pub document_name: String,
    pub document_type: String,
    pub status: VerificationStatus,
    pub message: String,
    pub reviewed_by: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<KycDocument> for KycDocumentResponse {
    fn from(doc: KycDocument) -> Self {
        Self {
            document_id: doc.document_id,
            customer_id: doc.customer_id,
            document_name: doc.document_name,
            document_type: doc.document_type,
            status: doc.status,
            message: doc.message,
            reviewed_by: doc.reviewed_by,
            uploaded_at: doc.uploaded_at,
            reviewed_at: doc.reviewed_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReviewQuery {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListQuery {
    pub search: Option<String>,
    pub kyc_status: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}
