//! Validation of the data submitted at each funnel step.
//!
//! Every validator either returns the normalised field set for its step or
//! a [`CoreError::InvalidFields`] listing each rejected field. Nothing is
//! partially applied: a step with any invalid field is rejected whole.

use std::borrow::Cow;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{CoreError, FieldError};
use crate::phone;

/// Default number of days ahead a contact date may be scheduled.
pub const DEFAULT_CONTACT_DATE_WINDOW_DAYS: i64 = 30;

/// Largest configurable contact-date window, in days.
pub const MAX_CONTACT_DATE_WINDOW_DAYS: i64 = 3650;

/// File extensions accepted for an uploaded vCard.
pub const VCARD_EXTENSIONS: &[&str] = &["vcf", "vcard"];

/// Field name used for errors that concern the form as a whole.
pub const FORM_FIELD: &str = "form";

// ---------------------------------------------------------------------------
// Step 1: capture
// ---------------------------------------------------------------------------

/// A file received in a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Browsers submit an empty, unnamed part when no file was chosen.
    fn is_blank(&self) -> bool {
        self.file_name.is_empty() && self.bytes.is_empty()
    }
}

/// Raw step-1 submission.
#[derive(Debug, Clone, Default)]
pub struct CaptureInput {
    pub phone_number: Option<String>,
    pub vcard_file: Option<UploadedFile>,
}

/// Which of the two mutually exclusive step-1 paths the client chose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// A phone number, normalised to `+48XXXXXXXXX`.
    Phone(String),
    /// An uploaded vCard, not yet parsed.
    Vcard(UploadedFile),
}

/// Validate the shape of a step-1 submission.
///
/// Exactly one of `phone_number` and `vcard_file` must be present. The
/// phone, when given, is normalised here so duplicate resolution can look
/// it up; the numbering-plan check happens in
/// [`validate_new_capture_phone`] once no existing record matched.
pub fn validate_capture(input: CaptureInput, max_vcard_bytes: usize) -> Result<CaptureSource, CoreError> {
    let phone = input
        .phone_number
        .filter(|p| !p.trim().is_empty());
    let vcard = input.vcard_file.filter(|f| !f.is_blank());

    match (phone, vcard) {
        (Some(_), Some(_)) | (None, None) => Err(CoreError::field(
            FORM_FIELD,
            "Provide exactly one of a phone number or a vCard file.",
        )),
        (Some(raw), None) => phone::normalize_phone(&raw)
            .map(CaptureSource::Phone)
            .map_err(|e| CoreError::field("phone_number", e.to_string())),
        (None, Some(file)) => {
            validate_vcard_upload(&file, max_vcard_bytes)?;
            Ok(CaptureSource::Vcard(file))
        }
    }
}

fn validate_vcard_upload(file: &UploadedFile, max_bytes: usize) -> Result<(), CoreError> {
    let extension = file
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let allowed = extension
        .as_deref()
        .is_some_and(|ext| VCARD_EXTENSIONS.contains(&ext));
    if !allowed {
        return Err(CoreError::field("vcard_file", "Invalid vcard extension."));
    }
    if file.bytes.len() > max_bytes {
        return Err(CoreError::field(
            "vcard_file",
            format!("vCard file is too big. Max size: {max_bytes} bytes."),
        ));
    }
    Ok(())
}

/// Checks applied to a phone number that is about to open a new funnel.
///
/// The number must be assigned in the numbering plan and must not be the
/// card owner's own number.
pub fn validate_new_capture_phone(phone: &str, lead_phone: Option<&str>) -> Result<(), CoreError> {
    phone::validate_phone(phone).map_err(|e| CoreError::field("phone_number", e.to_string()))?;

    let own = lead_phone
        .and_then(|p| phone::normalize_phone(p).ok())
        .is_some_and(|lead| lead == phone);
    if own {
        return Err(CoreError::field(
            "phone_number",
            "You cannot create contact request for your own card.",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Step 2: requestor info
// ---------------------------------------------------------------------------

/// Raw step-2 form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RequestorInfoForm {
    #[serde(default)]
    #[validate(
        length(
            min = 1,
            max = 60,
            message = "Name and surname must be between 1 and 60 characters."
        ),
        custom(function = "validate_name_and_surname")
    )]
    pub name_and_surname: String,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 320, message = "Email must be between 1 and 320 characters."),
        email(message = "Enter a valid email address.")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Company or contact place must be between 1 and 100 characters."
    ))]
    pub company_or_contact_place: String,
}

/// Validated step-2 fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestorInfo {
    pub name_and_surname: String,
    pub email: String,
    pub company_or_contact_place: String,
}

fn validate_name_and_surname(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    if !value.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(ValidationError::new("alphabetic_only").with_message(Cow::Borrowed(
            "Name and surname can only contain alphabetic characters.",
        )));
    }
    if !value.trim().contains(' ') {
        return Err(ValidationError::new("missing_separator").with_message(Cow::Borrowed(
            "Name and surname must be separated by a space.",
        )));
    }
    Ok(())
}

pub fn validate_requestor_info(form: RequestorInfoForm) -> Result<RequestorInfo, CoreError> {
    let form = RequestorInfoForm {
        name_and_surname: form.name_and_surname.trim().to_string(),
        email: form.email.trim().to_string(),
        company_or_contact_place: form.company_or_contact_place.trim().to_string(),
    };
    form.validate().map_err(invalid_fields)?;

    Ok(RequestorInfo {
        name_and_surname: form.name_and_surname,
        email: form.email,
        company_or_contact_place: form.company_or_contact_place,
    })
}

// ---------------------------------------------------------------------------
// Step 3: contact preferences
// ---------------------------------------------------------------------------

/// Raw step-3 form. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactPrefsForm {
    #[serde(default)]
    pub contact_date: Option<String>,

    #[serde(default)]
    #[validate(length(
        max = 200,
        message = "Contact topic must be at most 200 characters."
    ))]
    pub contact_topic: Option<String>,
}

/// Validated step-3 fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPrefs {
    pub contact_date: Option<NaiveDate>,
    pub contact_topic: Option<String>,
}

/// Validate step 3 relative to `today`.
///
/// A date, when given, must fall within `today..=today + window_days`.
pub fn validate_contact_prefs(
    form: ContactPrefsForm,
    today: NaiveDate,
    window_days: i64,
) -> Result<ContactPrefs, CoreError> {
    let form = ContactPrefsForm {
        contact_date: non_blank(form.contact_date),
        contact_topic: non_blank(form.contact_topic),
    };

    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e),
    };

    let contact_date = match form.contact_date.as_deref() {
        None => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => {
                if let Err(reason) = validate_contact_date(date, today, window_days) {
                    errors.push(FieldError::new("contact_date", reason));
                }
                Some(date)
            }
            Err(_) => {
                errors.push(FieldError::new("contact_date", "Enter a valid date."));
                None
            }
        },
    };

    if !errors.is_empty() {
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        return Err(CoreError::InvalidFields(errors));
    }

    Ok(ContactPrefs {
        contact_date,
        contact_topic: form.contact_topic,
    })
}

/// Check a contact date against the allowed window.
pub fn validate_contact_date(date: NaiveDate, today: NaiveDate, window_days: i64) -> Result<(), String> {
    if date < today {
        return Err("Date cannot be in the past.".to_string());
    }
    // A window past the calendar's range leaves the date unbounded above.
    let latest = Duration::try_days(window_days).and_then(|w| today.checked_add_signed(w));
    if latest.is_some_and(|latest| date > latest) {
        return Err(format!(
            "Date cannot be more than {window_days} days in the future."
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid_fields(errors: ValidationErrors) -> CoreError {
    CoreError::InvalidFields(field_errors(&errors))
}

/// Flatten `validator` errors into per-field reasons, ordered by field.
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs.iter() {
            let reason = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            out.push(FieldError::new(field.to_string(), reason));
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
