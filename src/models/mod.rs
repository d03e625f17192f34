pub mod customer;
pub mod document;
pub mod user;
