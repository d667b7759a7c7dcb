//! Handlers for the four-step contact funnel.
//!
//! Every step request is guard-checked against the record's canonical step
//! before anything else happens. Submissions then run validate, CRM sync,
//! and a compare-and-swap write, and answer with a `302` to the next step.
//! A failed sync leaves the record untouched so the same step can simply
//! be resubmitted.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use bizcard_core::contact_form::{
    self, CaptureInput, CaptureSource, ContactPrefsForm, RequestorInfoForm, UploadedFile,
};
use bizcard_core::error::CoreError;
use bizcard_core::funnel::{self, FunnelStep, GuardDecision};
use bizcard_core::phone::mask_phone;
use bizcard_core::types::DbId;
use bizcard_core::vcard;
use bizcard_crm::CrmContact;
use bizcard_db::models::business_card::BusinessCard;
use bizcard_db::models::contact_request::{
    ContactPrefsFields, ContactRequest, NewContactRequest, RequestorInfoFields,
};
use bizcard_db::repositories::{BusinessCardRepo, ContactRequestRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::OptionalRequestor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query string accepted by every step URL.
#[derive(Debug, Default, Deserialize)]
pub struct StepQuery {
    /// Kept as text so a malformed value is treated like an unknown one.
    pub contact_request_id: Option<String>,
}

/// Step-2 form body. The identifier may travel in the body instead of the
/// query string.
#[derive(Debug, Deserialize)]
pub struct RequestorInfoSubmission {
    pub contact_request_id: Option<String>,
    #[serde(flatten)]
    pub form: RequestorInfoForm,
}

/// Step-3 form body.
#[derive(Debug, Deserialize)]
pub struct ContactPrefsSubmission {
    pub contact_request_id: Option<String>,
    #[serde(flatten)]
    pub form: ContactPrefsForm,
}

/// The card owner as shown to the requestor.
#[derive(Debug, Serialize)]
pub struct CardView {
    pub id: DbId,
    pub lead_name: String,
    pub company: Option<String>,
    pub user_photo_url: Option<String>,
}

impl From<&BusinessCard> for CardView {
    fn from(card: &BusinessCard) -> Self {
        Self {
            id: card.id,
            lead_name: card.name_and_surname.clone(),
            company: card.company.clone(),
            user_photo_url: card.user_photo_url.clone(),
        }
    }
}

/// What a step renders.
#[derive(Debug, Serialize)]
pub struct StepView {
    pub step: &'static str,
    pub card: CardView,
    pub contact_request_id: Option<DbId>,
    pub completed: bool,
}

impl StepView {
    fn new(step: FunnelStep, card: &BusinessCard, contact_request_id: Option<DbId>) -> Self {
        Self {
            step: step.as_str(),
            card: CardView::from(card),
            contact_request_id,
            completed: step == FunnelStep::Completed,
        }
    }
}

fn render(step: FunnelStep, card: &BusinessCard, contact_request_id: Option<DbId>) -> Response {
    Json(DataResponse {
        data: StepView::new(step, card, contact_request_id),
    })
    .into_response()
}

/// `302 Found` to `url`.
fn found(url: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, url)]).into_response()
}

// ---------------------------------------------------------------------------
// Lookup and guard
// ---------------------------------------------------------------------------

async fn load_card(state: &AppState, card_id: DbId) -> AppResult<BusinessCard> {
    BusinessCardRepo::find_by_id(&state.pool, card_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BusinessCard",
            id: card_id,
        }))
}

/// Look up the record an identifier names, as seen from `card_id`'s funnel.
///
/// A malformed identifier, a missing row, and a row belonging to another
/// card all resolve to `None`.
async fn find_record(
    state: &AppState,
    card_id: DbId,
    raw_id: Option<&str>,
) -> AppResult<Option<ContactRequest>> {
    let Some(id) = raw_id.and_then(|raw| raw.trim().parse::<DbId>().ok()) else {
        return Ok(None);
    };
    let record = ContactRequestRepo::find_by_id(&state.pool, id).await?;
    Ok(record.filter(|r| r.business_card_id == card_id))
}

/// Result of checking a step request against the stored record.
enum Checked {
    Proceed(ContactRequest),
    Redirect(Response),
}

/// Resolve the record for a step that requires one and guard the step.
async fn check_step(
    state: &AppState,
    card_id: DbId,
    requested: FunnelStep,
    raw_id: Option<&str>,
) -> AppResult<Checked> {
    let Some(record) = find_record(state, card_id, raw_id).await? else {
        tracing::debug!(%card_id, step = %requested, "Unknown contact request, restarting funnel");
        return Ok(Checked::Redirect(found(funnel::restart_url(card_id))));
    };

    match funnel::guard(requested, record.form_step, card_id, record.id)? {
        GuardDecision::Proceed => Ok(Checked::Proceed(record)),
        GuardDecision::Redirect(url) => {
            tracing::debug!(
                contact_request_id = %record.id,
                form_step = record.form_step,
                step = %requested,
                "Step does not match record, redirecting"
            );
            Ok(Checked::Redirect(found(url)))
        }
    }
}

/// Redirect after a compare-and-swap write lost to a concurrent request.
async fn redirect_after_lost_write(
    state: &AppState,
    card_id: DbId,
    id: DbId,
) -> AppResult<Response> {
    let current = ContactRequestRepo::find_by_id(&state.pool, id).await?;
    let url = match current {
        Some(record) => funnel::step_url(card_id, record.canonical_step()?, Some(record.id)),
        None => funnel::restart_url(card_id),
    };
    tracing::debug!(contact_request_id = %id, "Concurrent step write detected, redirecting");
    Ok(found(url))
}

// ---------------------------------------------------------------------------
// Step 1: capture
// ---------------------------------------------------------------------------

/// GET /contact_request/{card_id}/phone_number
///
/// Render the capture form. An identifier of a known record is guarded
/// like any other step, so a returning visitor is sent to their current
/// step.
pub async fn show_capture(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;

    let raw_id = query.contact_request_id.as_deref();
    if let Some(redirect) = guard_capture(&state, card_id, raw_id).await? {
        return Ok(redirect);
    }

    Ok(render(FunnelStep::Capture, &card, None))
}

/// POST /contact_request/{card_id}/phone_number
///
/// Multipart body with exactly one of `phone_number` or `vcard_file`.
pub async fn submit_capture(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
    OptionalRequestor(requestor_id): OptionalRequestor,
    multipart: Multipart,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;

    let raw_id = query.contact_request_id.as_deref();
    if let Some(redirect) = guard_capture(&state, card_id, raw_id).await? {
        return Ok(redirect);
    }

    let input = read_capture_input(multipart).await?;
    match contact_form::validate_capture(input, state.config.max_vcard_bytes)? {
        CaptureSource::Phone(phone) => capture_phone(&state, &card, requestor_id, phone).await,
        CaptureSource::Vcard(file) => capture_vcard(&state, &card, &file).await,
    }
}

/// Guard the capture step when the client sent an identifier.
///
/// Unknown identifiers are ignored here since the capture step is where an
/// unknown identifier is sent anyway.
async fn guard_capture(
    state: &AppState,
    card_id: DbId,
    raw_id: Option<&str>,
) -> AppResult<Option<Response>> {
    let Some(record) = find_record(state, card_id, raw_id).await? else {
        return Ok(None);
    };
    match funnel::guard(FunnelStep::Capture, record.form_step, card_id, record.id)? {
        GuardDecision::Proceed => Ok(None),
        GuardDecision::Redirect(url) => Ok(Some(found(url))),
    }
}

async fn read_capture_input(mut multipart: Multipart) -> AppResult<CaptureInput> {
    let mut input = CaptureInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("phone_number") => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Invalid phone_number field: {e}"))
                })?;
                input.phone_number = Some(text);
            }
            Some("vcard_file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Invalid vcard_file field: {e}"))
                })?;
                input.vcard_file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(input)
}

async fn capture_phone(
    state: &AppState,
    card: &BusinessCard,
    requestor_id: Option<DbId>,
    phone: String,
) -> AppResult<Response> {
    // A number already on file resumes its funnel instead of starting another.
    if let Some(existing) = ContactRequestRepo::find_by_phone(&state.pool, &phone).await? {
        let step = existing.canonical_step()?;
        tracing::info!(
            contact_request_id = %existing.id,
            phone = %mask_phone(&phone),
            %step,
            "Phone number already on file, resuming"
        );
        return Ok(found(funnel::step_url(
            existing.business_card_id,
            step,
            Some(existing.id),
        )));
    }

    contact_form::validate_new_capture_phone(&phone, card.phone_number.as_deref())?;

    state.crm.sync(&CrmContact::captured(&phone)).await?;

    let new = NewContactRequest {
        business_card_id: card.id,
        lead_id: card.lead_id,
        requestor_id,
        phone_number: phone,
    };
    match ContactRequestRepo::create_captured(&state.pool, &new).await? {
        Some(created) => {
            tracing::info!(
                contact_request_id = %created.id,
                card_id = %card.id,
                phone = %mask_phone(&created.phone_number),
                form_step = created.form_step,
                "Contact request captured"
            );
            Ok(found(funnel::step_url(
                card.id,
                created.canonical_step()?,
                Some(created.id),
            )))
        }
        None => {
            // A concurrent capture of the same number won the insert.
            let winner = ContactRequestRepo::find_by_phone(&state.pool, &new.phone_number).await?;
            let url = match winner {
                Some(existing) => funnel::step_url(
                    existing.business_card_id,
                    existing.canonical_step()?,
                    Some(existing.id),
                ),
                None => funnel::restart_url(card.id),
            };
            Ok(found(url))
        }
    }
}

async fn capture_vcard(
    state: &AppState,
    card: &BusinessCard,
    file: &UploadedFile,
) -> AppResult<Response> {
    let lead = vcard::validate_parsed_vcard(vcard::parse_vcard(&file.bytes))?;

    state.crm.sync(&CrmContact::from_vcard(&lead)).await?;

    tracing::info!(
        card_id = %card.id,
        phone = %mask_phone(&lead.phone),
        "vCard contact synced"
    );
    Ok(render(FunnelStep::Completed, card, None))
}

// ---------------------------------------------------------------------------
// Step 2: requestor info
// ---------------------------------------------------------------------------

/// GET /contact_request/{card_id}/requestor_info?contact_request_id=…
pub async fn show_requestor_info(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;
    let raw_id = query.contact_request_id.as_deref();
    show_step(&state, &card, FunnelStep::RequestorInfo, raw_id).await
}

/// POST /contact_request/{card_id}/requestor_info?contact_request_id=…
pub async fn submit_requestor_info(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
    Form(body): Form<RequestorInfoSubmission>,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;
    let raw_id = query.contact_request_id.or(body.contact_request_id);

    let checked = check_step(&state, card_id, FunnelStep::RequestorInfo, raw_id.as_deref()).await?;
    let record = match checked {
        Checked::Proceed(record) => record,
        Checked::Redirect(response) => return Ok(response),
    };

    let info = contact_form::validate_requestor_info(body.form)?;
    let next = funnel::next_step(record.form_step)?;

    state
        .crm
        .sync(&CrmContact::requestor_info(&record.phone_number, &info))
        .await?;

    let fields = RequestorInfoFields::from(info);
    let Some(updated) =
        ContactRequestRepo::save_requestor_info(&state.pool, record.id, record.form_step, &fields)
            .await?
    else {
        return redirect_after_lost_write(&state, card.id, record.id).await;
    };

    Ok(advanced(card.id, &updated, next))
}

// ---------------------------------------------------------------------------
// Step 3: contact preferences
// ---------------------------------------------------------------------------

/// GET /contact_request/{card_id}/contact_prefs?contact_request_id=…
pub async fn show_contact_prefs(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;
    let raw_id = query.contact_request_id.as_deref();
    show_step(&state, &card, FunnelStep::ContactPrefs, raw_id).await
}

/// POST /contact_request/{card_id}/contact_prefs?contact_request_id=…
pub async fn submit_contact_prefs(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
    Form(body): Form<ContactPrefsSubmission>,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;
    let raw_id = query.contact_request_id.or(body.contact_request_id);

    let checked = check_step(&state, card_id, FunnelStep::ContactPrefs, raw_id.as_deref()).await?;
    let record = match checked {
        Checked::Proceed(record) => record,
        Checked::Redirect(response) => return Ok(response),
    };

    let today = chrono::Utc::now().date_naive();
    let window_days = state.config.contact_date_window_days;
    let prefs = contact_form::validate_contact_prefs(body.form, today, window_days)?;
    let next = funnel::next_step(record.form_step)?;

    state
        .crm
        .sync(&CrmContact::contact_prefs(&record.phone_number, &prefs))
        .await?;

    let fields = ContactPrefsFields::from(prefs);
    let Some(updated) =
        ContactRequestRepo::save_contact_prefs(&state.pool, record.id, record.form_step, &fields)
            .await?
    else {
        return redirect_after_lost_write(&state, card.id, record.id).await;
    };

    Ok(advanced(card.id, &updated, next))
}

// ---------------------------------------------------------------------------
// Step 4: finish
// ---------------------------------------------------------------------------

/// GET /contact_request/{card_id}/finish?contact_request_id=…
///
/// Deletes the completed record and renders the confirmation. A second
/// visit finds nothing and restarts the funnel.
pub async fn finish(
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    Query(query): Query<StepQuery>,
) -> AppResult<Response> {
    let card = load_card(&state, card_id).await?;

    let raw_id = query.contact_request_id.as_deref();
    let record = match check_step(&state, card_id, FunnelStep::Completed, raw_id).await? {
        Checked::Proceed(record) => record,
        Checked::Redirect(response) => return Ok(response),
    };

    if !ContactRequestRepo::delete_completed(&state.pool, record.id).await? {
        // Deleted by a concurrent visit.
        return Ok(found(funnel::restart_url(card_id)));
    }

    tracing::info!(
        contact_request_id = %record.id,
        %card_id,
        "Contact request completed and removed"
    );
    Ok(render(FunnelStep::Completed, &card, None))
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

async fn show_step(
    state: &AppState,
    card: &BusinessCard,
    step: FunnelStep,
    raw_id: Option<&str>,
) -> AppResult<Response> {
    match check_step(state, card.id, step, raw_id).await? {
        Checked::Proceed(record) => Ok(render(step, card, Some(record.id))),
        Checked::Redirect(response) => Ok(response),
    }
}

fn advanced(card_id: DbId, updated: &ContactRequest, next: FunnelStep) -> Response {
    tracing::info!(
        contact_request_id = %updated.id,
        %card_id,
        form_step = updated.form_step,
        step = %next,
        "Contact request advanced"
    );
    found(funnel::step_url(card_id, next, Some(updated.id)))
}
