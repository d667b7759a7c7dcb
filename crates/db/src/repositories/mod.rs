//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod business_card_repo;
pub mod contact_request_repo;

pub use business_card_repo::BusinessCardRepo;
pub use contact_request_repo::ContactRequestRepo;
