//! Infrastructure layer: persistence, read cache, integration events,
//! background workers, configuration and the booking application service.

pub mod booking;
pub mod cache;
pub mod config;
pub mod events;
pub mod store;
pub mod workers;

pub use booking::{BookingService, ServiceError, ServiceResult};
pub use cache::ReadCache;
pub use config::{AppConfig, ConfigError};
pub use events::{BookingEnvelope, BookingEvent};
pub use store::{BookingStore, InMemoryStore, PostgresStore, StoreError};
pub use workers::{WorkerHandle, spawn_cache_invalidator};
