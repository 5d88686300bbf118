use classroom_api::setup::{
    init_tracing, setup_api_router, setup_database, setup_email_service, spawn_purge_task,
    AppConfig, AppState,
};
use dotenv::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let database_layer = setup_database(&config.database).await?;
    let email_layer = setup_email_service(&config);

    let state = AppState::with_system_clock(database_layer, email_layer, config);

    let _purge_task = spawn_purge_task(state.clone());

    let (app, listener) = setup_api_router(state).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
