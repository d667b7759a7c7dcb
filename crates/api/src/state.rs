use std::sync::Arc;

use bizcard_crm::CrmClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: bizcard_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Outbound CRM sync.
    pub crm: Arc<dyn CrmClient>,
}
