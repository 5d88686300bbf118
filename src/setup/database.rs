use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    services::database::{DatabaseLayer, SurrealStore},
    setup::config::DatabaseConfig,
    utils::schemas::ALL_SCHEMAS,
};

pub async fn setup_database(config: &DatabaseConfig) -> surrealdb::Result<DatabaseLayer> {
    if config.is_memory() {
        warn!("using the in-memory store, data will not survive a restart");
        return Ok(DatabaseLayer::in_memory());
    }

    let store = SurrealStore::connect(
        &config.username,
        &config.password,
        &config.url,
        &config.namespace,
        &config.name,
    )
    .await?;

    store.initialize_schemas(&ALL_SCHEMAS).await?;
    info!("database schemas initialized");

    Ok(DatabaseLayer::new(Arc::new(store)))
}
