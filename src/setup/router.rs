use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    routes,
    services::{
        courses::CourseCatalog, credentials::CredentialStore, database::DatabaseLayer,
        email::EmailLayer, enrollment::EnrollmentLedger, exams::ExamEngine,
        password_reset::PasswordResetFlow, sessions::SessionManager,
    },
    setup::config::AppConfig,
    utils::clock::{Clock, SystemClock},
};

/// Everything a handler needs. Components are built per request from these handles.
#[derive(Clone)]
pub struct AppState {
    pub database: DatabaseLayer,
    pub email: EmailLayer,
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        database: DatabaseLayer,
        email: EmailLayer,
        config: AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            database,
            email,
            config: Arc::new(config),
            clock,
        }
    }

    pub fn with_system_clock(database: DatabaseLayer, email: EmailLayer, config: AppConfig) -> Self {
        Self::new(database, email, config, Arc::new(SystemClock))
    }

    /// Memory-backed state with email disabled.
    pub fn in_memory(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(DatabaseLayer::in_memory(), EmailLayer::disabled(), config, clock)
    }

    pub fn credentials(&self) -> CredentialStore<'_> {
        CredentialStore::new(self.database.store(), self.clock.as_ref(), &self.config.argon2)
    }

    pub fn sessions(&self) -> SessionManager<'_> {
        SessionManager::new(self.database.store(), self.clock.as_ref(), self.config.session_ttl)
    }

    pub fn password_reset(&self) -> PasswordResetFlow<'_> {
        PasswordResetFlow::new(
            self.database.store(),
            self.clock.as_ref(),
            &self.config.argon2,
            self.config.reset_token_ttl,
        )
    }

    pub fn courses(&self) -> CourseCatalog<'_> {
        CourseCatalog::new(self.database.store(), self.clock.as_ref())
    }

    pub fn enrollment(&self) -> EnrollmentLedger<'_> {
        EnrollmentLedger::new(self.database.store(), self.clock.as_ref())
    }

    pub fn exams(&self) -> ExamEngine<'_> {
        ExamEngine::new(self.database.store(), self.clock.as_ref())
    }
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!(frontend_url, "FRONTEND_URL is not a valid origin, cross-origin requests are disabled");
            cors
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_url);

    routes::main_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn setup_api_router(state: AppState) -> std::io::Result<(Router, TcpListener)> {
    let listener = TcpListener::bind(&state.config.bind_address).await?;
    let app = build_router(state);

    Ok((app, listener))
}
