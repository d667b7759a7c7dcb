//! Request extractors.
//!
//! - [`auth::OptionalRequestor`] -- The requestor behind a JWT Bearer token, if any.

pub mod auth;
