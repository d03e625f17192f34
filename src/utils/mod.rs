pub mod crypto;
pub mod middleware;
