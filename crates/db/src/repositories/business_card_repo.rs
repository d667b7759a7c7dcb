//! Repository for the `business_cards` table.

use bizcard_core::types::DbId;
use sqlx::PgPool;

use crate::models::business_card::BusinessCard;

const COLUMNS: &str = "\
    id, lead_id, name_and_surname, company, phone_number, email, \
    user_photo_url, created_at, updated_at";

/// Read access to business cards. Cards are created elsewhere.
pub struct BusinessCardRepo;

impl BusinessCardRepo {
    /// Find a card by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BusinessCard>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM business_cards WHERE id = $1");
        sqlx::query_as::<_, BusinessCard>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
