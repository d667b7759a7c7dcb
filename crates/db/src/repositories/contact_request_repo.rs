//! Repository for the `contact_requests` table.
//!
//! Step writes are compare-and-swap updates on `form_step`: a write only
//! lands if the row is still at the step the caller read, and it sets the
//! step's fields and advances `form_step` by one in the same statement.

use bizcard_core::funnel::FunnelStep;
use bizcard_core::types::DbId;
use sqlx::PgPool;

use crate::models::contact_request::{
    ContactPrefsFields, ContactRequest, NewContactRequest, RequestorInfoFields,
};

const COLUMNS: &str = "\
    id, business_card_id, lead_id, requestor_id, phone_number, \
    name_and_surname, email, company_or_contact_place, contact_date, \
    contact_topic, form_step, created_at, updated_at";

/// The Contact Record Store.
pub struct ContactRequestRepo;

impl ContactRequestRepo {
    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Find a contact request by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ContactRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contact_requests WHERE id = $1");
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the in-flight contact request for a normalised phone number.
    pub async fn find_by_phone(
        pool: &PgPool,
        phone_number: &str,
    ) -> Result<Option<ContactRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contact_requests WHERE phone_number = $1");
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(phone_number)
            .fetch_optional(pool)
            .await
    }

    /// Count rows holding the given phone number (0 or 1).
    pub async fn count_by_phone(pool: &PgPool, phone_number: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contact_requests WHERE phone_number = $1")
            .bind(phone_number)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a record for a phone number whose capture has been synced.
    ///
    /// The row starts at the requestor-info step. Returns `None` if another
    /// request already holds this phone number.
    pub async fn create_captured(
        pool: &PgPool,
        input: &NewContactRequest,
    ) -> Result<Option<ContactRequest>, sqlx::Error> {
        let query = format!(
            "INSERT INTO contact_requests \
                (business_card_id, lead_id, requestor_id, phone_number, form_step) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT uq_contact_requests_phone_number DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(input.business_card_id)
            .bind(input.lead_id)
            .bind(input.requestor_id)
            .bind(&input.phone_number)
            .bind(FunnelStep::RequestorInfo.to_number())
            .fetch_optional(pool)
            .await
    }

    /// Store requestor info and advance one step, if still at `expected_step`.
    pub async fn save_requestor_info(
        pool: &PgPool,
        id: DbId,
        expected_step: i16,
        fields: &RequestorInfoFields,
    ) -> Result<Option<ContactRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE contact_requests SET \
                name_and_surname = $3, \
                email = $4, \
                company_or_contact_place = $5, \
                form_step = form_step + 1 \
             WHERE id = $1 AND form_step = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .bind(expected_step)
            .bind(&fields.name_and_surname)
            .bind(&fields.email)
            .bind(&fields.company_or_contact_place)
            .fetch_optional(pool)
            .await
    }

    /// Store contact preferences and advance one step, if still at
    /// `expected_step`.
    pub async fn save_contact_prefs(
        pool: &PgPool,
        id: DbId,
        expected_step: i16,
        fields: &ContactPrefsFields,
    ) -> Result<Option<ContactRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE contact_requests SET \
                contact_date = $3, \
                contact_topic = $4, \
                form_step = form_step + 1 \
             WHERE id = $1 AND form_step = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .bind(expected_step)
            .bind(fields.contact_date)
            .bind(&fields.contact_topic)
            .fetch_optional(pool)
            .await
    }

    /// Delete a record that has reached the terminal step.
    ///
    /// Returns `true` if a row was removed; a record at any other step is
    /// left untouched.
    pub async fn delete_completed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contact_requests WHERE id = $1 AND form_step = $2")
            .bind(id)
            .bind(FunnelStep::Completed.to_number())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
