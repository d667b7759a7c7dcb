//! Domain logic for the business-card contact funnel.
//!
//! Pure functions only: the step state model and transition guard, phone
//! normalisation, per-step form validation, and vCard ingestion. Nothing
//! in this crate performs I/O.

pub mod contact_form;
pub mod error;
pub mod funnel;
pub mod phone;
pub mod types;
pub mod vcard;
