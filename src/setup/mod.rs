pub mod config;
mod database;
mod email_service;
mod logging;
mod maintenance;
mod router;

pub use config::{AppConfig, ConfigError};
pub use database::setup_database;
pub use email_service::setup_email_service;
pub use logging::init_tracing;
pub use maintenance::{purge_expired, spawn_purge_task};
pub use router::{build_router, setup_api_router, AppState};
