pub mod approval;
pub mod auth;
pub mod customer_client;
pub mod jwt;
pub mod kyc;
