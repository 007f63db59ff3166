//! Infrastructure wiring: store, event bus, read cache and the cache
//! invalidation worker.

use std::sync::Arc;

use anyhow::Context;

use tukangin_events::InMemoryEventBus;
use tukangin_infra::{
    AppConfig, BookingEnvelope, BookingService, BookingStore, InMemoryStore, PostgresStore, ReadCache,
    WorkerHandle, spawn_cache_invalidator,
};

pub type BookingServices = BookingService<dyn BookingStore, InMemoryEventBus<BookingEnvelope>>;

/// Everything handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub booking: BookingServices,
    // Held so the worker lives as long as the router.
    _invalidator: WorkerHandle,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn BookingStore> = match (config.use_persistent_stores, &config.database_url) {
        (true, Some(url)) => {
            let store = PostgresStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to apply migrations")?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        _ => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    services_for_store(store, config.cache_capacity)
}

pub fn services_for_store(store: Arc<dyn BookingStore>, cache_capacity: usize) -> anyhow::Result<AppServices> {
    let bus: Arc<InMemoryEventBus<BookingEnvelope>> = Arc::new(InMemoryEventBus::new());
    let cache = Arc::new(ReadCache::new(cache_capacity));

    let invalidator = spawn_cache_invalidator(bus.as_ref(), Arc::clone(&cache))
        .context("failed to spawn cache invalidator")?;

    Ok(AppServices {
        booking: BookingService::new(store, bus, cache),
        _invalidator: invalidator,
    })
}
