use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::{AppError, Result};
use crate::models::customer::{CustomerDto, CustomerPage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerIdResponse {
    customer_id: i64,
}

/// Boundary to the external Customer service. The reqwest client below is
/// the production implementation; tests substitute a stub.
#[async_trait]
pub trait CustomerGateway: Send + Sync {
    /// Maps a local user id to the external customer id. Any non-success
    /// response or transport error surfaces as NotFound; there is no local
    /// retry.
    async fn resolve_customer_id(&self, user_id: i64, bearer: &str) -> Result<i64>;

    async fn fetch_customer(&self, customer_id: i64, bearer: &str) -> Result<CustomerDto>;

    async fn list_customers(
        &self,
        search: Option<&str>,
        kyc_status: Option<&str>,
        page: u32,
        size: u32,
        bearer: &str,
    ) -> Result<CustomerPage>;

    /// Writes the customer's kycStatus field. Only the approval flow calls
    /// this.
    async fn update_kyc_status(&self, customer_id: i64, status: &str, bearer: &str) -> Result<()>;

    /// Ownership is never assumed: any resolution failure yields false.
    async fn verify_ownership(
        &self,
        document_customer_id: i64,
        user_id: i64,
        bearer: &str,
    ) -> bool {
        match self.resolve_customer_id(user_id, bearer).await {
            Ok(customer_id) => customer_id == document_customer_id,
            Err(e) => {
                warn!(action = "ownership_resolution_failed", user_id, error = %e);
                false
            }
        }
    }
}

pub struct CustomerClient {
    base_url: String,
    client: Client,
}

impl CustomerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CustomerGateway for CustomerClient {
    async fn resolve_customer_id(&self, user_id: i64, bearer: &str) -> Result<i64> {
        let url = format!("{}/api/customers/user/{}/customer-id", self.base_url, user_id);
        debug!(action = "customer_id_lookup", %url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| {
                warn!(action = "customer_id_lookup_failed", user_id, error = %e);
                AppError::NotFound(format!("Customer record not found for user: {}", user_id))
            })?;

        if !response.status().is_success() {
            warn!(action = "customer_id_lookup_rejected", user_id, status = %response.status());
            return Err(AppError::NotFound(format!(
                "Customer record not found for user: {}",
                user_id
            )));
        }

        let body: CustomerIdResponse = response.json().await.map_err(|e| {
            AppError::NotFound(format!(
                "Customer record not found for user {}: {}",
                user_id, e
            ))
        })?;

        info!(action = "customer_id_resolved", user_id, customer_id = body.customer_id);
        Ok(body.customer_id)
    }

    async fn fetch_customer(&self, customer_id: i64, bearer: &str) -> Result<CustomerDto> {
        let url = format!("{}/api/customers/{}", self.base_url, customer_id);
        debug!(action = "customer_fetch", %url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| {
                warn!(action = "customer_fetch_failed", customer_id, error = %e);
                AppError::NotFound(format!("Customer {} not found", customer_id))
            })?;
        if !response.status().is_success() {
            return Err(AppError::NotFound(format!(
                "Customer {} not found",
                customer_id
            )));
        }

        let customer: CustomerDto = response
            .json()
            .await
            .map_err(|e| AppError::RemoteCallFailure(format!("Malformed customer response: {}", e)))?;
        Ok(customer)
    }

    async fn list_customers(
        &self,
        search: Option<&str>,
        kyc_status: Option<&str>,
        page: u32,
        size: u32,
        bearer: &str,
    ) -> Result<CustomerPage> {
        let url = format!("{}/api/customers/admin/all", self.base_url);

        let mut params: Vec<(&str, String)> =
            vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(status) = kyc_status.filter(|s| !s.trim().is_empty()) {
            params.push(("kycStatus", status.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .bearer_auth(bearer)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::RemoteCallFailure(format!(
                "Customer listing failed with status {}",
                response.status()
            )));
        }

        let items: Vec<CustomerDto> = response
            .json()
            .await
            .map_err(|e| AppError::RemoteCallFailure(format!("Malformed customer list: {}", e)))?;

        // The upstream admin endpoint returns no total count header, so the
        // page total is the item count. Approximate, not authoritative.
        let total_items = items.len();
        Ok(CustomerPage {
            items,
            page,
            size,
            total_items,
        })
    }

    async fn update_kyc_status(&self, customer_id: i64, status: &str, bearer: &str) -> Result<()> {
        let url = format!(
            "{}/api/customers/admin/{}/kyc-status",
            self.base_url, customer_id
        );
        info!(action = "customer_kyc_status_update", customer_id, status);

        let response = self
            .client
            .put(&url)
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "kycStatus": status }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::RemoteCallFailure(format!(
                "KYC status update for customer {} failed with status {}",
                customer_id,
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Stub gateway recording status pushes, for coordinator and route tests.
    pub struct StubCustomerGateway {
        pub customer_id: Option<i64>,
        pub fail_update: bool,
        pub status_updates: Mutex<Vec<(i64, String)>>,
    }

    impl StubCustomerGateway {
        pub fn resolving_to(customer_id: i64) -> Self {
            Self {
                customer_id: Some(customer_id),
                fail_update: false,
                status_updates: Mutex::new(Vec::new()),
            }
        }

        pub fn unresolvable() -> Self {
            Self {
                customer_id: None,
                fail_update: false,
                status_updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CustomerGateway for StubCustomerGateway {
        async fn resolve_customer_id(&self, user_id: i64, _bearer: &str) -> Result<i64> {
            self.customer_id.ok_or_else(|| {
                AppError::NotFound(format!("Customer record not found for user: {}", user_id))
            })
        }

        async fn fetch_customer(&self, customer_id: i64, _bearer: &str) -> Result<CustomerDto> {
            Ok(CustomerDto {
                customer_id,
                full_name: Some("Test Customer".to_string()),
                email: None,
                phone: None,
                address: None,
                pan: None,
                aadhaar: None,
                kyc_status: Some("PENDING".to_string()),
            })
        }

        async fn list_customers(
            &self,
            _search: Option<&str>,
            _kyc_status: Option<&str>,
            page: u32,
            size: u32,
            _bearer: &str,
        ) -> Result<CustomerPage> {
            Ok(CustomerPage {
                items: Vec::new(),
                page,
                size,
                total_items: 0,
            })
        }

        async fn update_kyc_status(
            &self,
            customer_id: i64,
            status: &str,
            _bearer: &str,
        ) -> Result<()> {
            if self.fail_update {
                return Err(AppError::RemoteCallFailure(
                    "customer service unavailable".to_string(),
                ));
            }
            self.status_updates
                .lock()
                .unwrap()
                .push((customer_id, status.to_string()));
            Ok(())
        }
    }
}
