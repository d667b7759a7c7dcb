//! The CRM's contact schema and the per-step mappings into it.

use bizcard_core::contact_form::{ContactPrefs, RequestorInfo};
use bizcard_core::vcard::VcardLead;
use serde::Serialize;

/// A free-text note attached to a CRM contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrmComment {
    pub text: String,
}

impl CrmComment {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Contact payload in the CRM's field set. `phone` is the CRM's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrmContact {
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub comments: Vec<CrmComment>,
}

impl CrmContact {
    /// Step 1: the captured phone number alone.
    pub fn captured(phone: &str) -> Self {
        Self {
            phone: phone.to_string(),
            name: None,
            surname: None,
            email: None,
            comments: Vec::new(),
        }
    }

    /// Step 2: name, email, and the company folded into one comment.
    pub fn requestor_info(phone: &str, info: &RequestorInfo) -> Self {
        let (name, surname) = split_name(&info.name_and_surname);
        Self {
            phone: phone.to_string(),
            name: Some(name),
            surname,
            email: Some(info.email.clone()),
            comments: vec![CrmComment::new(format!(
                "Company or contact place: {}",
                info.company_or_contact_place
            ))],
        }
    }

    /// Step 3: date and topic, each folded into its own comment.
    pub fn contact_prefs(phone: &str, prefs: &ContactPrefs) -> Self {
        let date = prefs
            .contact_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "not specified".to_string());
        let topic = prefs.contact_topic.as_deref().unwrap_or("not specified");

        Self {
            phone: phone.to_string(),
            name: None,
            surname: None,
            email: None,
            comments: vec![
                CrmComment::new(format!("Contact date: {date}")),
                CrmComment::new(format!("Contact topic: {topic}")),
            ],
        }
    }

    /// The vCard path: everything recovered from the card in one payload.
    pub fn from_vcard(lead: &VcardLead) -> Self {
        Self {
            phone: lead.phone.clone(),
            name: lead.given_name.clone(),
            surname: lead.family_name.clone(),
            email: lead.email.clone(),
            comments: lead
                .company
                .iter()
                .map(|c| CrmComment::new(format!("Company: {c}")))
                .collect(),
        }
    }
}

/// Split a full name at the first whitespace into name and surname.
pub fn split_name(full: &str) -> (String, Option<String>) {
    let full = full.trim();
    match full.split_once(char::is_whitespace) {
        Some((name, surname)) => {
            let surname = surname.trim();
            (
                name.to_string(),
                (!surname.is_empty()).then(|| surname.to_string()),
            )
        }
        None => (full.to_string(), None),
    }
}
