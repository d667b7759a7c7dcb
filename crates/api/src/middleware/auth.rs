//! Optional JWT identity extractor for Axum handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use bizcard_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::state::AppState;

/// The requestor behind the request, if they are signed in.
///
/// The funnel is open to anonymous visitors, so this extractor never
/// rejects: a missing header yields `None`, and a malformed, expired, or
/// foreign token is logged and also yields `None`.
///
/// ```ignore
/// async fn my_handler(OptionalRequestor(requestor): OptionalRequestor) {
///     tracing::info!(requestor_id = ?requestor, "handling request");
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalRequestor(pub Option<DbId>);

impl FromRequestParts<AppState> for OptionalRequestor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "));
        let Some(token) = token else {
            tracing::debug!("Ignoring Authorization header without a Bearer token");
            return Ok(Self(None));
        };

        match validate_token(token, &state.config.jwt) {
            Ok(claims) => Ok(Self(Some(claims.sub))),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid requestor token");
                Ok(Self(None))
            }
        }
    }
}
