use bizcard_core::contact_form::{
    DEFAULT_CONTACT_DATE_WINDOW_DAYS, MAX_CONTACT_DATE_WINDOW_DAYS,
};
use bizcard_crm::CrmConfig;

use crate::auth::jwt::JwtConfig;

/// Default upper bound on an uploaded vCard, in bytes.
const DEFAULT_MAX_VCARD_BYTES: usize = 64 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets and the CRM endpoint have defaults
/// suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How many days ahead a requested contact date may be (at most
    /// `MAX_CONTACT_DATE_WINDOW_DAYS`).
    pub contact_date_window_days: i64,
    /// Largest accepted vCard upload.
    pub max_vcard_bytes: usize,
    /// JWT configuration used to read the requestor identity.
    pub jwt: JwtConfig,
    /// CRM endpoint and credentials.
    pub crm: CrmConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `3000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `CONTACT_DATE_WINDOW_DAYS` | `30`                       |
    /// | `MAX_VCARD_BYTES`          | `65536`                    |
    ///
    /// JWT and CRM settings are read by [`JwtConfig::from_env`] and
    /// [`CrmConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let contact_date_window_days: i64 = std::env::var("CONTACT_DATE_WINDOW_DAYS")
            .unwrap_or_else(|_| DEFAULT_CONTACT_DATE_WINDOW_DAYS.to_string())
            .parse()
            .expect("CONTACT_DATE_WINDOW_DAYS must be a valid i64");
        assert!(
            (0..=MAX_CONTACT_DATE_WINDOW_DAYS).contains(&contact_date_window_days),
            "CONTACT_DATE_WINDOW_DAYS must be between 0 and {MAX_CONTACT_DATE_WINDOW_DAYS}"
        );

        let max_vcard_bytes: usize = std::env::var("MAX_VCARD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_VCARD_BYTES.to_string())
            .parse()
            .expect("MAX_VCARD_BYTES must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            contact_date_window_days,
            max_vcard_bytes,
            jwt: JwtConfig::from_env(),
            crm: CrmConfig::from_env(),
        }
    }
}
