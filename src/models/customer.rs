use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer profile as returned by the external Customer service.
/// Referenced, never owned; this service only ever writes `kyc_status`,
/// and only through the approval flow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub customer_id: i64,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub pan: Option<String>,
    pub aadhaar: Option<String>,
    pub kyc_status: Option<String>,
}

/// One page of customers from the admin listing.
///
/// The Customer service does not report an authoritative total for filtered
/// queries, so `total_items` is the returned page's item count. Treat it as
/// an approximation, not an exact total.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerPage {
    pub items: Vec<CustomerDto>,
    pub page: u32,
    pub size: u32,
    pub total_items: usize,
}
