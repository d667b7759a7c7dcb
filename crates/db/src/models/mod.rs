//! Row models and write DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus the field sets its repository writes.

pub mod business_card;
pub mod contact_request;
