pub mod contact_request;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree (everything except `/health`).
///
/// Route hierarchy:
///
/// ```text
/// /contact_request/{card_id}/phone_number     step 1, capture
/// /contact_request/{card_id}/requestor_info   step 2
/// /contact_request/{card_id}/contact_prefs    step 3
/// /contact_request/{card_id}/finish           step 4, terminal
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new().nest("/contact_request", contact_request::router())
}
