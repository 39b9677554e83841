//! CLI command implementations

pub mod pr;
pub mod team;
pub mod user;

pub use pr::PrArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

use std::sync::Arc;

use reviewer_core::store::Store;
use reviewer_core::{Config, Engine, InMemoryStore, StorageBackend};
use reviewer_db::Database;
use serde::Serialize;

/// Build an engine over the configured storage backend
pub async fn open_engine(config: &Config) -> anyhow::Result<Engine> {
    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Sqlite => {
            let db = Database::open(&config.storage).await?;
            Arc::new(db.store())
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; state is discarded on exit");
            Arc::new(InMemoryStore::new())
        }
    };

    Ok(Engine::new(store).with_config(&config.engine))
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
