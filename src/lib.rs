pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {crate::domain::permission::PermissionTable, std::sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub permissions: Arc<PermissionTable>,
}
