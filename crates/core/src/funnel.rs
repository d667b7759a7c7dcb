//! Contact funnel steps and the transition guard.
//!
//! A contact request's `form_step` column is the only state the funnel
//! keeps. [`FunnelStep`] names its four values, and [`guard`] decides
//! whether a request aimed at one step's URL may proceed or must be sent
//! to the record's canonical step instead.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Minimum `form_step` value (1-based).
pub const MIN_STEP: i16 = 1;

/// Maximum `form_step` value; reaching it completes the funnel.
pub const MAX_STEP: i16 = 4;

/// Query-string key carrying the record identifier between steps.
pub const CONTACT_REQUEST_ID_PARAM: &str = "contact_request_id";

// ---------------------------------------------------------------------------
// Funnel steps
// ---------------------------------------------------------------------------

/// The four steps of the contact funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStep {
    Capture,
    RequestorInfo,
    ContactPrefs,
    Completed,
}

impl FunnelStep {
    /// All steps in funnel order.
    pub const ALL: [FunnelStep; 4] = [
        Self::Capture,
        Self::RequestorInfo,
        Self::ContactPrefs,
        Self::Completed,
    ];

    /// Convert a stored `form_step` to a step.
    ///
    /// The database constrains `form_step` to `1..=4`, so anything else
    /// is reported as an internal error rather than a client mistake.
    pub fn from_number(n: i16) -> Result<Self, CoreError> {
        n.checked_sub(MIN_STEP)
            .and_then(|offset| usize::try_from(offset).ok())
            .and_then(|index| Self::ALL.get(index))
            .copied()
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "form_step {n} is out of range ({MIN_STEP}..{MAX_STEP})"
                ))
            })
    }

    /// Convert to the stored `form_step` value.
    pub fn to_number(self) -> i16 {
        match self {
            Self::Capture => 1,
            Self::RequestorInfo => 2,
            Self::ContactPrefs => 3,
            Self::Completed => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::RequestorInfo => "requestor_info",
            Self::ContactPrefs => "contact_prefs",
            Self::Completed => "completed",
        }
    }

    /// Last path segment of the step's URL under `/contact_request/{card_id}/`.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Capture => "phone_number",
            Self::RequestorInfo => "requestor_info",
            Self::ContactPrefs => "contact_prefs",
            Self::Completed => "finish",
        }
    }

    /// The step that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Capture => Some(Self::RequestorInfo),
            Self::RequestorInfo => Some(Self::ContactPrefs),
            Self::ContactPrefs => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Whether the step's URL carries a record identifier.
    ///
    /// The capture step runs before any record exists, so it never does.
    pub fn carries_identifier(self) -> bool {
        match self {
            Self::Capture => false,
            Self::RequestorInfo | Self::ContactPrefs | Self::Completed => true,
        }
    }
}

impl std::fmt::Display for FunnelStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// Build the URL of `step` for the given card.
///
/// The identifier is attached only for steps that carry one.
pub fn step_url(card_id: DbId, step: FunnelStep, contact_request_id: Option<DbId>) -> String {
    let base = format!("/contact_request/{card_id}/{}", step.path_segment());
    match contact_request_id {
        Some(id) if step.carries_identifier() => {
            format!("{base}?{CONTACT_REQUEST_ID_PARAM}={id}")
        }
        _ => base,
    }
}

/// URL that restarts the funnel for a card (unknown or expired identifier).
pub fn restart_url(card_id: DbId) -> String {
    step_url(card_id, FunnelStep::Capture, None)
}

// ---------------------------------------------------------------------------
// Transition guard
// ---------------------------------------------------------------------------

/// The single step a record with the given `form_step` belongs to.
pub fn canonical_step(form_step: i16) -> Result<FunnelStep, CoreError> {
    FunnelStep::from_number(form_step)
}

/// Outcome of comparing a requested step with a record's canonical step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The requested step is the record's current step.
    Proceed,
    /// The client must be sent to this URL instead.
    Redirect(String),
}

/// Decide whether a request for `requested` may be handled for a record
/// currently at `form_step`.
pub fn guard(
    requested: FunnelStep,
    form_step: i16,
    card_id: DbId,
    contact_request_id: DbId,
) -> Result<GuardDecision, CoreError> {
    let canonical = canonical_step(form_step)?;
    if canonical == requested {
        Ok(GuardDecision::Proceed)
    } else {
        Ok(GuardDecision::Redirect(step_url(
            card_id,
            canonical,
            Some(contact_request_id),
        )))
    }
}

/// The step a record at `form_step` moves to once its current step is
/// submitted. The completed step has no successor.
pub fn next_step(form_step: i16) -> Result<FunnelStep, CoreError> {
    let current = canonical_step(form_step)?;
    let next = current.next().ok_or_else(|| {
        CoreError::Validation(format!("Step {current} is the last step of the funnel"))
    })?;
    validate_step_transition(form_step, next.to_number())?;
    Ok(next)
}

/// Validate a `form_step` transition.
///
/// `form_step` only ever moves forward, exactly one step at a time.
pub fn validate_step_transition(current: i16, next: i16) -> Result<(), CoreError> {
    if !(MIN_STEP..=MAX_STEP).contains(&current) {
        return Err(CoreError::Validation(format!(
            "Current step {current} is out of range ({MIN_STEP}..{MAX_STEP})"
        )));
    }
    if !(MIN_STEP..=MAX_STEP).contains(&next) {
        return Err(CoreError::Validation(format!(
            "Next step {next} is out of range ({MIN_STEP}..{MAX_STEP})"
        )));
    }
    if next != current + 1 {
        return Err(CoreError::Validation(format!(
            "Cannot transition from step {current} to step {next}. \
             Must advance exactly one step."
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
