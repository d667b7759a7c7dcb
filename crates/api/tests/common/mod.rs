#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Request, Response};
use axum::Router;
use bizcard_api::auth::jwt::{Claims, JwtConfig};
use bizcard_api::config::ServerConfig;
use bizcard_api::router::build_app_router;
use bizcard_api::state::AppState;
use bizcard_core::types::DbId;
use bizcard_crm::{CrmClient, CrmConfig, CrmContact, CrmError};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::PgPool;
use tower::ServiceExt;

/// Phone number printed on the test card.
pub const CARD_PHONE: &str = "+48601234567";

/// JWT secret shared by [`test_config`] and [`sign_requestor_token`].
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

const BOUNDARY: &str = "bizcard-test-boundary";

// ---------------------------------------------------------------------------
// CRM stub
// ---------------------------------------------------------------------------

/// In-memory CRM that records every payload and can be told to fail.
///
/// [`StubCrm::during_next_sync`] runs a statement while the next sync is in
/// flight, standing in for a concurrent request that changes the record
/// between the guard check and the write.
#[derive(Default)]
pub struct StubCrm {
    synced: Mutex<Vec<CrmContact>>,
    failing: Mutex<bool>,
    concurrent: Mutex<Option<(PgPool, String)>>,
}

impl StubCrm {
    pub fn failing() -> Self {
        Self {
            failing: Mutex::new(true),
            ..Self::default()
        }
    }

    /// Execute `sql` against `pool` during the next successful sync.
    pub fn during_next_sync(&self, pool: &PgPool, sql: impl Into<String>) {
        *self.concurrent.lock().unwrap() = Some((pool.clone(), sql.into()));
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn synced(&self) -> Vec<CrmContact> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrmClient for StubCrm {
    async fn sync(&self, contact: &CrmContact) -> Result<(), CrmError> {
        if *self.failing.lock().unwrap() {
            return Err(CrmError::Rejected {
                status: 503,
                body: "CRM is down".to_string(),
            });
        }
        let concurrent = self.concurrent.lock().unwrap().take();
        if let Some((pool, sql)) = concurrent {
            sqlx::query(&sql).execute(&pool).await.unwrap();
        }
        self.synced.lock().unwrap().push(contact.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        contact_date_window_days: 30,
        max_vcard_bytes: 64 * 1024,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        crm: CrmConfig {
            url: "http://crm.invalid/contacts".to_string(),
            api_key: None,
            timeout_secs: 1,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and CRM stub.
pub fn build_test_app(pool: PgPool, crm: Arc<StubCrm>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        crm,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a business card and return its id.
pub async fn insert_card(pool: &PgPool) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO business_cards \
            (lead_id, name_and_surname, company, phone_number, user_photo_url) \
         VALUES (gen_random_uuid(), 'Anna Nowak', 'Nowak Sp. z o.o.', $1, \
                 'https://cdn.example.com/anna.jpg') \
         RETURNING id",
    )
    .bind(CARD_PHONE)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Insert a contact request directly at an arbitrary step.
pub async fn insert_request(pool: &PgPool, card_id: DbId, phone: &str, form_step: i16) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO contact_requests (business_card_id, lead_id, phone_number, form_step) \
         SELECT id, lead_id, $2, $3 FROM business_cards WHERE id = $1 \
         RETURNING id",
    )
    .bind(card_id)
    .bind(phone)
    .bind(form_step)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Current `form_step` of a record, or `None` if it no longer exists.
pub async fn form_step(pool: &PgPool, id: DbId) -> Option<i16> {
    sqlx::query_scalar("SELECT form_step FROM contact_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .unwrap()
}

pub async fn count_requests(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM contact_requests")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Sign an access token for `requestor` the way the account service does.
pub fn sign_requestor_token(requestor: DbId) -> String {
    let claims = Claims {
        sub: requestor,
        exp: chrono::Utc::now().timestamp() + 15 * 60,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn step_uri(card_id: DbId, segment: &str, id: Option<DbId>) -> String {
    match id {
        Some(id) => format!("/contact_request/{card_id}/{segment}?contact_request_id={id}"),
        None => format!("/contact_request/{card_id}/{segment}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Send a GET request to the given URI.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a urlencoded form POST.
pub async fn post_form(app: Router, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

/// Send a multipart POST, optionally with a Bearer token.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    parts: &[Part<'_>],
    bearer: Option<&str>,
) -> Response<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{file_name}\"\r\nContent-Type: text/vcard\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// Submit a phone number to step 1.
pub async fn post_phone(app: Router, card_id: DbId, phone: &str) -> Response<Body> {
    post_multipart(
        app,
        &step_uri(card_id, "phone_number", None),
        &[Part::Text("phone_number", phone)],
        None,
    )
    .await
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `Location` header of a redirect.
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Extract the `contact_request_id` query value from a URL.
pub fn id_from_location(url: &str) -> DbId {
    let (_, id) = url
        .split_once("contact_request_id=")
        .expect("URL must carry contact_request_id");
    id.parse().unwrap()
}
