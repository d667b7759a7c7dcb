//! Outbound CRM synchronisation.
//!
//! Every funnel step is reshaped into the provider's contact schema
//! ([`payload::CrmContact`]) and pushed through a [`client::CrmClient`].
//! A sync is a single synchronous attempt; retrying is left to the client
//! resubmitting the step.

pub mod client;
pub mod config;
pub mod payload;

pub use client::{CrmClient, CrmError, HttpCrmClient};
pub use config::CrmConfig;
pub use payload::{CrmComment, CrmContact};
