//! Requestor identity.
//!
//! - [`jwt`] -- JWT access-token validation.

pub mod jwt;
