//! vCard ingestion for the alternate capture path.
//!
//! Parsing is tolerant: an empty, non-UTF-8 or unparseable upload yields an
//! empty [`ParsedVcard`] instead of an error. Whether the recovered fields
//! are enough to sync is decided separately by [`validate_parsed_vcard`].

use ical::parser::vcard::component::VcardContact;
use ical::property::Property;
use serde::Serialize;

use crate::error::CoreError;
use crate::phone;

/// Fields recovered from an uploaded vCard. Each is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedVcard {
    pub phone: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
}

/// A vCard that carries everything the CRM needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcardLead {
    /// Normalised `+48XXXXXXXXX` phone.
    pub phone: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
}

/// Parse the first contact of a vCard payload.
pub fn parse_vcard(bytes: &[u8]) -> ParsedVcard {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = ical::VcardParser::new(text.as_bytes());

    match reader.next() {
        Some(Ok(contact)) => from_contact(&contact),
        _ => ParsedVcard::default(),
    }
}

fn from_contact(contact: &VcardContact) -> ParsedVcard {
    let (mut family_name, mut given_name) = match property(contact, "N") {
        Some(n) => {
            let mut parts = n.split(';');
            (
                parts.next().and_then(non_empty),
                parts.next().and_then(non_empty),
            )
        }
        None => (None, None),
    };

    // Fall back to the formatted name when the structured one is missing.
    if given_name.is_none() && family_name.is_none() {
        if let Some(full) = property(contact, "FN") {
            let mut parts = full.splitn(2, char::is_whitespace);
            given_name = parts.next().and_then(non_empty);
            family_name = parts.next().and_then(non_empty);
        }
    }

    ParsedVcard {
        phone: property(contact, "TEL").and_then(non_empty),
        given_name,
        family_name,
        email: property(contact, "EMAIL").and_then(non_empty),
        company: property(contact, "ORG")
            .and_then(|org| org.split(';').next())
            .and_then(non_empty),
    }
}

fn property<'a>(contact: &'a VcardContact, name: &str) -> Option<&'a str> {
    contact
        .properties
        .iter()
        .find(|p: &&Property| p.name.eq_ignore_ascii_case(name))
        .and_then(|p| p.value.as_deref())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Check that a parsed vCard can be sent to the CRM.
///
/// The phone is required, must carry the `+48` country code and must be an
/// assigned number. Every other field passes through as recovered.
pub fn validate_parsed_vcard(parsed: ParsedVcard) -> Result<VcardLead, CoreError> {
    let raw_phone = parsed.phone.ok_or_else(|| {
        CoreError::field("vcard_file", "vCard does not contain a phone number.")
    })?;
    let phone = phone::validate_international_phone(&raw_phone)
        .map_err(|e| CoreError::field("vcard_file", e.to_string()))?;

    Ok(VcardLead {
        phone,
        given_name: parsed.given_name,
        family_name: parsed.family_name,
        email: parsed.email,
        company: parsed.company,
    })
}
