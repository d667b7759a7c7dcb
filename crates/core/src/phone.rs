//! Phone number normalisation for the Polish numbering plan.
//!
//! Every phone number the funnel stores or sends to the CRM is in the
//! form `+48` followed by nine national digits. Input is accepted with or
//! without the country prefix and with common separators.

use std::sync::LazyLock;

use regex::Regex;

/// Country calling code every accepted number must carry.
pub const COUNTRY_CODE: &str = "+48";

/// Number of digits in a Polish national significant number.
const NATIONAL_LEN: usize = 9;

/// Separators people type between digit groups.
static SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s().\-/]").expect("valid regex"));

/// Leading two digits of assigned national numbers: geographic area codes,
/// mobile ranges, and the nomadic/VoIP and government ranges.
const ASSIGNED_PREFIXES: &[&str] = &[
    // Geographic.
    "12", "13", "14", "15", "16", "17", "18", "22", "23", "24", "25", "29", "32", "33", "34",
    "41", "42", "43", "44", "46", "48", "52", "54", "55", "56", "58", "59", "61", "62", "63",
    "65", "67", "68", "71", "74", "75", "76", "77", "81", "82", "83", "84", "85", "86", "87",
    "89", "91", "94", "95",
    // Mobile.
    "45", "50", "51", "53", "57", "60", "66", "69", "72", "73", "78", "79", "88",
    // Nomadic, VoIP and government networks.
    "26", "39", "47", "64",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("Phone number is required.")]
    Empty,

    #[error("Enter a valid phone number.")]
    Malformed,

    #[error("Phone number must start with '+48'.")]
    ForeignCountry,

    #[error("Phone number is not an assigned Polish number.")]
    Unassigned,
}

/// Normalise a phone number to `+48XXXXXXXXX`.
///
/// Checks shape and country only; see [`validate_phone`] for the
/// numbering-plan check.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let compact = SEPARATORS_RE.replace_all(trimmed, "");
    let (has_plus, digits) = match compact.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, compact.as_ref()),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PhoneError::Malformed);
    }

    let national = if has_plus {
        digits
            .strip_prefix("48")
            .ok_or(PhoneError::ForeignCountry)?
    } else if let Some(rest) = digits.strip_prefix("0048") {
        rest
    } else if digits.len() == NATIONAL_LEN + 2 && digits.starts_with("48") {
        &digits[2..]
    } else {
        digits
    };

    if national.len() != NATIONAL_LEN {
        return Err(PhoneError::Malformed);
    }

    Ok(format!("{COUNTRY_CODE}{national}"))
}

/// Normalise a phone number and check that its national prefix is assigned.
pub fn validate_phone(raw: &str) -> Result<String, PhoneError> {
    let normalized = normalize_phone(raw)?;
    let prefix = &normalized[COUNTRY_CODE.len()..COUNTRY_CODE.len() + 2];
    if !ASSIGNED_PREFIXES.contains(&prefix) {
        return Err(PhoneError::Unassigned);
    }
    Ok(normalized)
}

/// Like [`validate_phone`], but the raw value must spell out the country
/// code as `+48` or `0048`. Used for numbers read from uploaded files,
/// where a bare national number cannot be told apart from a foreign one.
pub fn validate_international_phone(raw: &str) -> Result<String, PhoneError> {
    let compact = SEPARATORS_RE.replace_all(raw.trim(), "");
    if compact.is_empty() {
        return Err(PhoneError::Empty);
    }
    if !compact.starts_with(COUNTRY_CODE) && !compact.starts_with("0048") {
        return Err(PhoneError::ForeignCountry);
    }
    validate_phone(raw)
}

/// Mask all but the last three digits, for log output.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let visible = chars.len().saturating_sub(3);
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < visible && c.is_ascii_digit() { '*' } else { *c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_prefixed_number() {
        assert_eq!(normalize_phone("+48564738467").unwrap(), "+48564738467");
    }

    #[test]
    fn normalizes_separators_and_missing_prefix() {
        assert_eq!(normalize_phone("564 738 467").unwrap(), "+48564738467");
        assert_eq!(normalize_phone("+48-758-334-536").unwrap(), "+48758334536");
        assert_eq!(normalize_phone("(56) 473-84-67").unwrap(), "+48564738467");
        assert_eq!(normalize_phone("0048564738467").unwrap(), "+48564738467");
        assert_eq!(normalize_phone("48564738467").unwrap(), "+48564738467");
    }

    #[test]
    fn rejects_foreign_country_code() {
        assert_eq!(normalize_phone("+50736453647"), Err(PhoneError::ForeignCountry));
        assert_eq!(normalize_phone("+50-758-334-536"), Err(PhoneError::ForeignCountry));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(normalize_phone("   "), Err(PhoneError::Empty));
        assert_eq!(normalize_phone("+48 12 34"), Err(PhoneError::Malformed));
        assert_eq!(normalize_phone("call me"), Err(PhoneError::Malformed));
        assert_eq!(normalize_phone("+"), Err(PhoneError::Malformed));
        assert_eq!(normalize_phone("+485647384670"), Err(PhoneError::Malformed));
    }

    #[test]
    fn validate_rejects_unassigned_prefix() {
        assert_eq!(validate_phone("+48111111111"), Err(PhoneError::Unassigned));
        assert_eq!(validate_phone("+48001234567"), Err(PhoneError::Unassigned));
    }

    #[test]
    fn validate_accepts_mobile_and_geographic() {
        assert_eq!(validate_phone("+48507444365").unwrap(), "+48507444365");
        assert_eq!(validate_phone("+48 22 123 45 67").unwrap(), "+48221234567");
    }

    #[test]
    fn international_requires_spelled_out_country_code() {
        assert_eq!(
            validate_international_phone("564738467"),
            Err(PhoneError::ForeignCountry)
        );
        assert_eq!(
            validate_international_phone("48564738467"),
            Err(PhoneError::ForeignCountry)
        );
        assert_eq!(validate_international_phone(" "), Err(PhoneError::Empty));
        assert_eq!(
            validate_international_phone("+48 564 738 467").unwrap(),
            "+48564738467"
        );
        assert_eq!(
            validate_international_phone("0048564738467").unwrap(),
            "+48564738467"
        );
        assert_eq!(
            validate_international_phone("+48111111111"),
            Err(PhoneError::Unassigned)
        );
    }

    #[test]
    fn mask_keeps_prefix_symbol_and_last_digits() {
        assert_eq!(mask_phone("+48564738467"), "+********467");
        assert_eq!(mask_phone("12"), "12");
    }
}
