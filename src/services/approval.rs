use std::sync::Arc;

use tracing::info;

use crate::errors::{AppError, Result};
use crate::services::customer_client::CustomerGateway;
use crate::services::kyc::KycService;

/// Customer-level approval: checks the local document aggregate first, and
/// only then pushes the status change to the Customer service. A remote
/// failure leaves no local state behind, so the operation is safe to retry.
pub struct ApprovalService {
    kyc: Arc<KycService>,
    customers: Arc<dyn CustomerGateway>,
}

impl ApprovalService {
    pub fn new(kyc: Arc<KycService>, customers: Arc<dyn CustomerGateway>) -> Self {
        Self { kyc, customers }
    }

    pub async fn approve_customer(&self, customer_id: i64, bearer: &str) -> Result<()> {
        if !self.kyc.is_aggregate_complete(customer_id).await? {
            info!(action = "approval_blocked_incomplete", customer_id);
            return Err(AppError::AggregateIncomplete);
        }

        self.customers
            .update_kyc_status(customer_id, "VERIFIED", bearer)
            .await?;

        info!(action = "customer_approved", customer_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::SqliteDatabase;
    use crate::models::document::ReviewDecision;
    use crate::services::customer_client::test_support::StubCustomerGateway;

    async fn setup() -> (Arc<KycService>, Arc<StubCustomerGateway>, ApprovalService) {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let kyc = Arc::new(KycService::new(db));
        let gateway = Arc::new(StubCustomerGateway::resolving_to(42));
        let svc = ApprovalService::new(kyc.clone(), gateway.clone());
        (kyc, gateway, svc)
    }

    async fn upload_required(kyc: &KycService, customer_id: i64) -> Vec<i64> {
        let mut ids = Vec::new();
        for doc_type in ["PAN", "AADHAR", "PHOTO"] {
            let doc = kyc
                .upload(customer_id, "doc", doc_type, "image/png", b"x".to_vec())
                .await
                .unwrap();
            ids.push(doc.document_id);
        }
        ids
    }

    #[tokio::test]
    async fn incomplete_aggregate_never_reaches_the_remote() {
        let (kyc, gateway, svc) = setup().await;
        upload_required(&kyc, 42).await;

        let err = svc.approve_customer(42, "token").await.unwrap_err();
        assert!(matches!(err, AppError::AggregateIncomplete));
        assert!(gateway.status_updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_aggregate_pushes_exactly_one_verified_update() {
        let (kyc, gateway, svc) = setup().await;
        let ids = upload_required(&kyc, 42).await;
        for id in ids {
            kyc.review(id, ReviewDecision::Verified, "", "admin")
                .await
                .unwrap();
        }

        svc.approve_customer(42, "token").await.unwrap();

        let updates = gateway.status_updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[(42, "VERIFIED".to_string())]);
    }

    #[tokio::test]
    async fn remote_failure_surfaces_and_changes_nothing_locally() {
        let db = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let kyc = Arc::new(KycService::new(db));
        let mut gateway = StubCustomerGateway::resolving_to(42);
        gateway.fail_update = true;
        let gateway = Arc::new(gateway);
        let svc = ApprovalService::new(kyc.clone(), gateway.clone());

        let ids = upload_required(&kyc, 42).await;
        for id in ids {
            kyc.review(id, ReviewDecision::Verified, "", "admin")
                .await
                .unwrap();
        }

        let err = svc.approve_customer(42, "token").await.unwrap_err();
        assert!(matches!(err, AppError::RemoteCallFailure(_)));
        // Aggregate is untouched, so a manual retry can succeed later.
        assert!(kyc.is_aggregate_complete(42).await.unwrap());
    }
}
