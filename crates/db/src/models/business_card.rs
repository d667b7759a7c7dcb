//! The business card being contacted (read-only here).

use bizcard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `business_cards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BusinessCard {
    pub id: DbId,
    pub lead_id: DbId,
    pub name_and_surname: String,
    pub company: Option<String>,
    /// The card owner's own number. Never exposed to requestors.
    #[serde(skip_serializing)]
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    pub user_photo_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
