/// Default timeout for a single CRM call, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the CRM endpoint.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// Endpoint receiving contact payloads via `POST`.
    pub url: String,
    /// Optional bearer credential.
    pub api_key: Option<String>,
    /// Upper bound on one call, including connect and response.
    pub timeout_secs: u64,
}

impl CrmConfig {
    /// Load CRM configuration from environment variables.
    ///
    /// | Env Var            | Required | Default |
    /// |--------------------|----------|---------|
    /// | `CRM_URL`          | **yes**  | --      |
    /// | `CRM_API_KEY`      | no       | unset   |
    /// | `CRM_TIMEOUT_SECS` | no       | `10`    |
    ///
    /// # Panics
    ///
    /// Panics if `CRM_URL` is missing or `CRM_TIMEOUT_SECS` is not a number.
    pub fn from_env() -> Self {
        let url = std::env::var("CRM_URL").expect("CRM_URL must be set in the environment");
        assert!(!url.is_empty(), "CRM_URL must not be empty");

        let api_key = std::env::var("CRM_API_KEY").ok().filter(|k| !k.is_empty());

        let timeout_secs: u64 = std::env::var("CRM_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("CRM_TIMEOUT_SECS must be a valid u64");

        Self {
            url,
            api_key,
            timeout_secs,
        }
    }
}
