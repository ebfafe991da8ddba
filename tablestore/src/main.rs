// Forbid unwrap() in production code to prevent panics from corrupt data.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use tablestore::config::StorageConfig;
use tablestore::storage::Schema;
use tablestore::{AttributeType, Record, StorageEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablestore=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match StorageConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: data_directory={}, database={}, sync_writes={}",
        config.data_directory.display(),
        config.database,
        config.sync_writes
    );

    let engine = StorageEngine::from_config(&config);
    if let Err(e) = engine.create_database(&config.database) {
        tracing::error!("Failed to create database: {e}");
        std::process::exit(1);
    }

    let schema = Schema::from([
        ("id".to_string(), "int".to_string()),
        ("name".to_string(), "string".to_string()),
        ("age".to_string(), "int".to_string()),
    ]);
    let users = engine
        .create_table(&config.database, "users", &schema)
        .unwrap_or_else(|e| {
            tracing::error!("Failed to create users table: {e}");
            std::process::exit(1);
        });

    let alice = Record::new()
        .with("id", AttributeType::Int, "1")
        .with("name", AttributeType::String, "Alice")
        .with("age", AttributeType::Int, "30");

    // A previous run may have left Alice behind.
    match users.exists(1) {
        Ok(true) => {
            if let Err(e) = users.delete(1) {
                tracing::error!("Failed to clear previous record: {e}");
                std::process::exit(1);
            }
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to read users table: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = users.insert(&alice) {
        tracing::error!("Insert failed: {e}");
        std::process::exit(1);
    }

    match users.get(1) {
        Ok(values) => tracing::info!("Fetched record 1: {values:?}"),
        Err(e) => {
            tracing::error!("Get failed: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = users.delete(1) {
        tracing::error!("Delete failed: {e}");
        std::process::exit(1);
    }

    match users.get(1) {
        Err(e) if e.is_not_found() => tracing::info!("Record 1 is gone: {e}"),
        Ok(values) => {
            tracing::error!("Record 1 still readable after delete: {values:?}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Get failed: {e}");
            std::process::exit(1);
        }
    }

    match users.metadata() {
        Ok(metadata) => tracing::info!("{metadata}"),
        Err(e) => tracing::warn!("Could not read table header: {e}"),
    }
}
