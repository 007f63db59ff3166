//! Background consumers of the integration event bus.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use tukangin_events::{EventBus, Subscription};

use crate::cache::ReadCache;
use crate::events::BookingEnvelope;

const TICK: Duration = Duration::from_millis(250);

/// Handle to stop and join a background worker.
///
/// Dropping the handle detaches the worker; it then runs until the bus
/// is dropped.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Spawn a thread that feeds every message from `sub` to `handler`.
///
/// Handler failures are logged and the loop continues; delivery is
/// at-least-once so handlers must be idempotent.
pub fn spawn_worker<M, H, E>(name: &'static str, sub: Subscription<M>, mut handler: H) -> io::Result<WorkerHandle>
where
    M: Send + 'static,
    H: FnMut(M) -> Result<(), E> + Send + 'static,
    E: core::fmt::Debug + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let join = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))?;

    Ok(WorkerHandle {
        shutdown: shutdown_tx,
        join: Some(join),
    })
}

fn worker_loop<M, H, E>(name: &'static str, sub: Subscription<M>, shutdown_rx: mpsc::Receiver<()>, handler: &mut H)
where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(msg) => {
                if let Err(err) = handler(msg) {
                    warn!(worker = name, error = ?err, "worker handler failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Subscribe to `bus` and drop cache entries made stale by each event.
pub fn spawn_cache_invalidator<B>(bus: &B, cache: Arc<ReadCache>) -> io::Result<WorkerHandle>
where
    B: EventBus<BookingEnvelope> + ?Sized,
{
    spawn_worker("cache-invalidator", bus.subscribe(), move |envelope: BookingEnvelope| {
        for tag in envelope.payload().cache_tags() {
            let dropped = cache.invalidate_tag(&tag);
            debug!(
                event_id = %envelope.event_id(),
                event_type = envelope.event_type(),
                tag = %tag,
                dropped,
                "invalidated cache tag"
            );
        }
        Ok::<(), core::convert::Infallible>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use chrono::Utc;
    use tukangin_core::{Money, OrderId, UserId};
    use tukangin_events::InMemoryEventBus;

    use crate::cache::{TAG_ALL_ORDERS, user_orders_tag};
    use crate::events::BookingEvent;

    fn eventually(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn invalidator_drops_tagged_entries_on_publish() {
        let bus: InMemoryEventBus<BookingEnvelope> = InMemoryEventBus::new();
        let cache = Arc::new(ReadCache::new(8));
        let user_id = UserId::new();
        let tag = user_orders_tag(user_id);

        cache.put_as(cache.ticket(), "orders", &[tag.as_str(), TAG_ALL_ORDERS], &vec![1]);
        cache.put_as(cache.ticket(), "unrelated", &["other"], &vec![2]);

        let handle = spawn_cache_invalidator(&bus, Arc::clone(&cache)).unwrap();
        bus.publish(
            BookingEvent::OrderCreated {
                order_id: OrderId::new(),
                user_id,
                total: Money::new(100_000),
                voucher_id: None,
                occurred_at: Utc::now(),
            }
            .into_envelope(1),
        )
        .unwrap();

        assert!(eventually(|| cache.get_as::<Vec<i32>>("orders").is_none()));
        assert_eq!(cache.get_as::<Vec<i32>>("unrelated"), Some(vec![2]));
        handle.shutdown();
    }
}
