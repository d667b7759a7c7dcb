//! Contact request row model and the per-step write sets.

use bizcard_core::contact_form::{ContactPrefs, RequestorInfo};
use bizcard_core::error::CoreError;
use bizcard_core::funnel::{self, FunnelStep};
use bizcard_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `contact_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactRequest {
    pub id: DbId,
    pub business_card_id: DbId,
    pub lead_id: DbId,
    pub requestor_id: Option<DbId>,
    pub phone_number: String,
    pub name_and_surname: Option<String>,
    pub email: Option<String>,
    pub company_or_contact_place: Option<String>,
    pub contact_date: Option<NaiveDate>,
    pub contact_topic: Option<String>,
    pub form_step: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContactRequest {
    /// The step this record currently belongs to.
    pub fn canonical_step(&self) -> Result<FunnelStep, CoreError> {
        funnel::canonical_step(self.form_step)
    }
}

// ---------------------------------------------------------------------------
// Write sets
// ---------------------------------------------------------------------------

/// Insert DTO for a freshly captured phone number.
#[derive(Debug, Clone)]
pub struct NewContactRequest {
    pub business_card_id: DbId,
    pub lead_id: DbId,
    pub requestor_id: Option<DbId>,
    /// Normalised `+48XXXXXXXXX` form.
    pub phone_number: String,
}

/// Fields written by the requestor-info step.
#[derive(Debug, Clone)]
pub struct RequestorInfoFields {
    pub name_and_surname: String,
    pub email: String,
    pub company_or_contact_place: String,
}

impl From<RequestorInfo> for RequestorInfoFields {
    fn from(info: RequestorInfo) -> Self {
        Self {
            name_and_surname: info.name_and_surname,
            email: info.email,
            company_or_contact_place: info.company_or_contact_place,
        }
    }
}

/// Fields written by the contact-preferences step. Both may be absent.
#[derive(Debug, Clone, Default)]
pub struct ContactPrefsFields {
    pub contact_date: Option<NaiveDate>,
    pub contact_topic: Option<String>,
}

impl From<ContactPrefs> for ContactPrefsFields {
    fn from(prefs: ContactPrefs) -> Self {
        Self {
            contact_date: prefs.contact_date,
            contact_topic: prefs.contact_topic,
        }
    }
}
