//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server or
//! database is needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use bizcard_api::error::AppError;
use bizcard_core::error::{CoreError, FieldError};
use bizcard_crm::{CrmClient, CrmConfig, CrmContact, CrmError, HttpCrmClient};
use http_body_util::BodyExt;
use uuid::Uuid;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let id = Uuid::nil();
    let err = AppError::Core(CoreError::NotFound {
        entity: "BusinessCard",
        id,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(
        json["error"],
        "BusinessCard with id 00000000-0000-0000-0000-000000000000 not found"
    );
}

#[tokio::test]
async fn invalid_fields_return_400_with_field_list() {
    let err = AppError::Core(CoreError::InvalidFields(vec![
        FieldError::new("contact_date", "Date cannot be in the past."),
        FieldError::new("contact_topic", "Contact topic must be at most 200 characters."),
    ]));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["fields"][0]["field"], "contact_date");
    assert_eq!(json["fields"][0]["reason"], "Date cannot be in the past.");
    assert_eq!(json["fields"][1]["field"], "contact_topic");
}

#[tokio::test]
async fn validation_error_returns_400_without_fields() {
    let err = AppError::Core(CoreError::Validation("Cannot transition".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Cannot transition");
    assert!(json.get("fields").is_none());
}

#[tokio::test]
async fn crm_error_returns_500_with_crm_message() {
    let err = AppError::Crm(CrmError::Rejected {
        status: 422,
        body: "phone missing".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "CRM_SYNC_ERROR");
    assert_eq!(json["error"], "CRM rejected the data (422): phone missing");
}

#[tokio::test]
async fn crm_timeout_is_a_sync_error() {
    let (status, json) = error_to_response(AppError::Crm(CrmError::Timeout(10))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "CRM_SYNC_ERROR");
}

#[tokio::test]
async fn unreachable_crm_error_does_not_expose_endpoint() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let crm_url = format!("http://{addr}/internal/contacts");
    let client = HttpCrmClient::new(CrmConfig {
        url: crm_url.clone(),
        api_key: None,
        timeout_secs: 5,
    })
    .unwrap();
    let err = client
        .sync(&CrmContact::captured("+48564738467"))
        .await
        .unwrap_err();

    let (status, json) = error_to_response(AppError::Crm(err)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "CRM_SYNC_ERROR");
    let body = json.to_string();
    assert!(!body.contains(&crm_url), "CRM endpoint leaked: {body}");
    assert!(!body.contains(&addr.to_string()), "CRM address leaked: {body}");
}

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("secret database credentials leaked".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(
        !json.to_string().contains("secret"),
        "Internal error response must not leak sensitive details"
    );
}

#[tokio::test]
async fn out_of_range_step_is_internal() {
    let err = AppError::Core(CoreError::Internal("form_step 9 out of range".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_maps_to_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
