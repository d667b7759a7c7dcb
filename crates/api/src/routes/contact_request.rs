//! Route definitions for the contact funnel.

use axum::routing::get;
use axum::Router;

use crate::handlers::contact_request;
use crate::state::AppState;

/// Routes mounted at `/contact_request`.
///
/// ```text
/// GET  /{card_id}/phone_number      -> show_capture
/// POST /{card_id}/phone_number      -> submit_capture        (multipart)
/// GET  /{card_id}/requestor_info    -> show_requestor_info   (?contact_request_id)
/// POST /{card_id}/requestor_info    -> submit_requestor_info (form)
/// GET  /{card_id}/contact_prefs     -> show_contact_prefs    (?contact_request_id)
/// POST /{card_id}/contact_prefs     -> submit_contact_prefs  (form)
/// GET  /{card_id}/finish            -> finish                (?contact_request_id)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{card_id}/phone_number",
            get(contact_request::show_capture).post(contact_request::submit_capture),
        )
        .route(
            "/{card_id}/requestor_info",
            get(contact_request::show_requestor_info).post(contact_request::submit_requestor_info),
        )
        .route(
            "/{card_id}/contact_prefs",
            get(contact_request::show_contact_prefs).post(contact_request::submit_contact_prefs),
        )
        .route("/{card_id}/finish", get(contact_request::finish))
}
