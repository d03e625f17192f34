use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::document::{
    KycDocument, KycStats, ReviewDecision, VerificationStatus, REQUIRED_DOCUMENT_TYPES,
};

/// Owns the KYC document aggregate and its state machine:
/// PENDING -> VERIFIED | REJECTED, with both review outcomes terminal.
pub struct KycService {
    database: Arc<SqliteDatabase>,
}

impl KycService {
    pub fn new(database: Arc<SqliteDatabase>) -> Self {
        Self { database }
    }

    pub async fn upload(
        &self,
        customer_id: i64,
        name: &str,
        document_type: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<KycDocument> {
        info!(action = "document_upload", customer_id, name, document_type);

        let document_id = self
            .database
            .insert_document(customer_id, name, document_type, content_type, &content, Utc::now())
            .await?;

        let doc = self.get(document_id).await?;
        info!(action = "document_uploaded", document_id, customer_id);
        Ok(doc)
    }

    pub async fn get(&self, document_id: i64) -> Result<KycDocument> {
        self.database
            .get_document(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))
    }

    /// Owner lookup that skips the content column, for ownership checks that
    /// must run before any blob is read.
    pub async fn owner_of(&self, document_id: i64) -> Result<i64> {
        self.database
            .get_document_owner(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))
    }

    pub async fn documents_by_customer(&self, customer_id: i64) -> Result<Vec<KycDocument>> {
        self.database.documents_by_customer(customer_id).await
    }

    pub async fn pending_verifications(&self) -> Result<Vec<KycDocument>> {
        self.database
            .documents_by_status(VerificationStatus::Pending)
            .await
    }

    /// Applies a review decision. A rejection requires a non-blank message;
    /// a verification without one gets a default. Re-reviewing an already
    /// terminal document overwrites the previous decision.
    pub async fn review(
        &self,
        document_id: i64,
        decision: ReviewDecision,
        message: &str,
        reviewed_by: &str,
    ) -> Result<KycDocument> {
        let doc = self.get(document_id).await?;

        let message = match decision {
            ReviewDecision::Rejected => {
                if message.trim().is_empty() {
                    return Err(AppError::MissingReason);
                }
                message.trim().to_string()
            }
            ReviewDecision::Verified => {
                if message.trim().is_empty() {
                    "Document verified successfully".to_string()
                } else {
                    message.trim().to_string()
                }
            }
        };

        let status = decision.status();
        self.database
            .update_review(doc.document_id, status, &message, reviewed_by, Utc::now())
            .await?;

        info!(
            action = "document_reviewed",
            document_id,
            status = %status,
            reviewed_by
        );
        self.get(document_id).await
    }

    /// Deletes a document while it is still pending. Terminal documents are
    /// kept for audit integrity.
    pub async fn delete(&self, document_id: i64, acting_username: &str) -> Result<()> {
        let doc = self.get(document_id).await?;

        if doc.status.is_terminal() {
            return Err(AppError::InvalidTransition(
                "Cannot delete document once it is verified or rejected".to_string(),
            ));
        }

        self.database.delete_document(document_id).await?;
        info!(action = "document_deleted", document_id, by = acting_username);
        Ok(())
    }

    pub async fn download(&self, document_id: i64) -> Result<KycDocument> {
        self.get(document_id).await
    }

    /// True iff every required document type has at least one VERIFIED
    /// document for this customer. Extra documents in any state never hurt;
    /// only category-level verified presence counts.
    pub async fn is_aggregate_complete(&self, customer_id: i64) -> Result<bool> {
        let documents = self.documents_by_customer(customer_id).await?;

        let verified_types: HashSet<String> = documents
            .iter()
            .filter(|d| d.status == VerificationStatus::Verified)
            .map(|d| d.document_type.to_uppercase())
            .collect();

        let complete = REQUIRED_DOCUMENT_TYPES
            .iter()
            .all(|required| verified_types.contains(*required));

        info!(action = "aggregate_completeness_checked", customer_id, complete);
        Ok(complete)
    }

    pub async fn statistics(&self) -> Result<KycStats> {
        Ok(KycStats {
            total: self.database.count_documents().await?,
            pending: self
                .database
                .count_documents_by_status(VerificationStatus::Pending)
                .await?,
            verified: self
                .database
                .count_documents_by_status(VerificationStatus::Verified)
                .await?,
            rejected: self
                .database
                .count_documents_by_status(VerificationStatus::Rejected)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> KycService {
        KycService::new(Arc::new(SqliteDatabase::in_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn upload_always_starts_pending_with_clear_review_fields() {
        let svc = service().await;
        for doc_type in ["AADHAR", "pan", "Selfie"] {
            let doc = svc
                .upload(42, "scan.png", doc_type, "image/png", b"bytes".to_vec())
                .await
                .unwrap();
            assert_eq!(doc.status, VerificationStatus::Pending);
            assert_eq!(doc.message, "");
            assert!(doc.reviewed_by.is_none());
            assert!(doc.reviewed_at.is_none());
        }
    }

    #[tokio::test]
    async fn rejection_requires_a_message() {
        let svc = service().await;
        let doc = svc.upload(1, "a", "PAN", "image/png", b"x".to_vec()).await.unwrap();

        let err = svc
            .review(doc.document_id, ReviewDecision::Rejected, "  ", "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingReason));

        let rejected = svc
            .review(doc.document_id, ReviewDecision::Rejected, "blurry scan", "admin")
            .await
            .unwrap();
        assert_eq!(rejected.status, VerificationStatus::Rejected);
        assert_eq!(rejected.message, "blurry scan");
        assert_eq!(rejected.reviewed_by.as_deref(), Some("admin"));
        assert!(rejected.reviewed_at.is_some());
    }

    #[tokio::test]
    async fn verification_defaults_its_message() {
        let svc = service().await;
        let doc = svc.upload(1, "a", "PAN", "image/png", b"x".to_vec()).await.unwrap();

        let verified = svc
            .review(doc.document_id, ReviewDecision::Verified, "", "admin")
            .await
            .unwrap();
        assert_eq!(verified.status, VerificationStatus::Verified);
        assert_eq!(verified.message, "Document verified successfully");
    }

    #[tokio::test]
    async fn owner_lookup_matches_upload_and_misses_cleanly() {
        let svc = service().await;
        let doc = svc.upload(42, "a", "PAN", "image/png", b"x".to_vec()).await.unwrap();

        assert_eq!(svc.owner_of(doc.document_id).await.unwrap(), 42);
        let err = svc.owner_of(999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn review_of_missing_document_is_not_found() {
        let svc = service().await;
        let err = svc
            .review(999, ReviewDecision::Verified, "", "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_only_while_pending() {
        let svc = service().await;
        let pending = svc.upload(1, "a", "PAN", "image/png", b"x".to_vec()).await.unwrap();
        let terminal = svc
            .upload(1, "b", "PHOTO", "image/png", b"y".to_vec())
            .await
            .unwrap();
        svc.review(terminal.document_id, ReviewDecision::Verified, "", "admin")
            .await
            .unwrap();

        svc.delete(pending.document_id, "admin").await.unwrap();
        let err = svc.delete(terminal.document_id, "admin").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let err = svc.delete(pending.document_id, "admin").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn aggregate_complete_needs_every_required_type_verified() {
        let svc = service().await;
        let customer = 42;

        let mut ids = Vec::new();
        for (name, doc_type) in [("pan", "PAN"), ("aadhar", "AADHAR"), ("photo", "PHOTO")] {
            let doc = svc
                .upload(customer, name, doc_type, "image/png", b"x".to_vec())
                .await
                .unwrap();
            ids.push(doc.document_id);
        }
        assert!(!svc.is_aggregate_complete(customer).await.unwrap());

        // Two of three verified is still incomplete, no matter how many
        // pending or rejected documents exist in the missing category.
        svc.review(ids[0], ReviewDecision::Verified, "", "admin")
            .await
            .unwrap();
        svc.review(ids[1], ReviewDecision::Verified, "", "admin")
            .await
            .unwrap();
        assert!(!svc.is_aggregate_complete(customer).await.unwrap());

        svc.review(ids[2], ReviewDecision::Verified, "", "admin")
            .await
            .unwrap();
        assert!(svc.is_aggregate_complete(customer).await.unwrap());
    }

    #[tokio::test]
    async fn aggregate_ignores_rejected_documents_in_required_types() {
        let svc = service().await;
        let customer = 7;

        for doc_type in ["PAN", "AADHAR", "PHOTO"] {
            let doc = svc
                .upload(customer, "d", doc_type, "image/png", b"x".to_vec())
                .await
                .unwrap();
            svc.review(doc.document_id, ReviewDecision::Rejected, "bad", "admin")
                .await
                .unwrap();
        }
        assert!(!svc.is_aggregate_complete(customer).await.unwrap());
    }

    #[tokio::test]
    async fn completeness_is_case_insensitive_on_document_type() {
        let svc = service().await;
        let customer = 3;

        for doc_type in ["pan", "Aadhar", "photo"] {
            let doc = svc
                .upload(customer, "d", doc_type, "image/png", b"x".to_vec())
                .await
                .unwrap();
            svc.review(doc.document_id, ReviewDecision::Verified, "", "admin")
                .await
                .unwrap();
        }
        assert!(svc.is_aggregate_complete(customer).await.unwrap());
    }

    #[tokio::test]
    async fn statistics_count_every_state() {
        let svc = service().await;
        let a = svc.upload(1, "a", "PAN", "image/png", b"x".to_vec()).await.unwrap();
        let b = svc.upload(1, "b", "PHOTO", "image/png", b"x".to_vec()).await.unwrap();
        svc.upload(2, "c", "AADHAR", "image/png", b"x".to_vec()).await.unwrap();

        svc.review(a.document_id, ReviewDecision::Verified, "", "admin")
            .await
            .unwrap();
        svc.review(b.document_id, ReviewDecision::Rejected, "bad", "admin")
            .await
            .unwrap();

        let stats = svc.statistics().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.verified, 1);
        assert_eq!(stats.rejected, 1);
    }
}
