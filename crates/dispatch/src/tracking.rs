//! Simulated technician location for orders in active dispatch.
//!
//! Coordinates are jittered around a fixed reference point. The contract
//! callers rely on is only that tracking is live while PROCESSING and
//! disabled otherwise.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tukangin_core::OrderId;
use tukangin_orders::{Order, OrderStatus};

const REFERENCE_LAT: f64 = -6.2088;
const REFERENCE_LNG: f64 = 106.8456;
/// Max offset in degrees (~1 km).
const JITTER_DEG: f64 = 0.01;
const MAX_SPEED_KMH: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub heading: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingView {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub location: Location,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tracking {
    Live(TrackingView),
    Disabled,
}

impl Tracking {
    pub fn for_order(order: &Order, now: DateTime<Utc>) -> Self {
        if order.status != OrderStatus::Processing {
            return Tracking::Disabled;
        }
        Tracking::Live(TrackingView {
            order_id: order.id,
            status: order.status,
            location: Location::sample(),
            last_update: now,
        })
    }
}

impl Location {
    fn sample() -> Self {
        Self::from_entropy(uuid::Uuid::now_v7().into_bytes())
    }

    /// Bytes 9..16 of a v7 uuid are random. Byte 8 carries the variant bits
    /// and would skew whatever it feeds, so it is skipped.
    fn from_entropy(bytes: [u8; 16]) -> Self {
        let unit = |i: usize| f64::from(u16::from_be_bytes([bytes[i], bytes[i + 1]])) / f64::from(u16::MAX);

        Self {
            lat: REFERENCE_LAT + (unit(9) * 2.0 - 1.0) * JITTER_DEG,
            lng: REFERENCE_LNG + (unit(11) * 2.0 - 1.0) * JITTER_DEG,
            heading: (unit(13) * 360.0).floor(),
            speed: (f64::from(bytes[15]) / f64::from(u8::MAX) * MAX_SPEED_KMH).floor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_ignores_the_variant_bits() {
        // Variant `10` in byte 8, random bits all zero: the far south-west corner.
        let mut bytes = [0u8; 16];
        bytes[8] = 0x80;
        let low = Location::from_entropy(bytes);
        assert!((low.lat - (REFERENCE_LAT - JITTER_DEG)).abs() < 1e-9);
        assert!((low.lng - (REFERENCE_LNG - JITTER_DEG)).abs() < 1e-9);
        assert_eq!(low.speed, 0.0);

        let high = Location::from_entropy([0xFF; 16]);
        assert!((high.lat - (REFERENCE_LAT + JITTER_DEG)).abs() < 1e-9);
    }

    #[test]
    fn samples_fall_on_both_sides_of_the_reference() {
        let lats: Vec<f64> = (0..200).map(|_| Location::sample().lat).collect();
        assert!(lats.iter().any(|lat| *lat < REFERENCE_LAT));
        assert!(lats.iter().any(|lat| *lat > REFERENCE_LAT));
    }

    fn order_in(status: OrderStatus) -> Order {
        let mut order = Order::empty(OrderId::new());
        order.status = status;
        order
    }

    #[test]
    fn live_only_while_processing() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Warranty,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(Tracking::for_order(&order_in(status), Utc::now()), Tracking::Disabled);
        }
        assert!(matches!(
            Tracking::for_order(&order_in(OrderStatus::Processing), Utc::now()),
            Tracking::Live(_)
        ));
    }

    #[test]
    fn samples_stay_near_reference() {
        for _ in 0..100 {
            let loc = Location::sample();
            assert!((loc.lat - REFERENCE_LAT).abs() <= JITTER_DEG);
            assert!((loc.lng - REFERENCE_LNG).abs() <= JITTER_DEG);
            assert!((0.0..=360.0).contains(&loc.heading));
            assert!((0.0..=MAX_SPEED_KMH).contains(&loc.speed));
        }
    }
}
