//! Dispatch read model: professionals, assignment and live tracking.

pub mod assignment;
pub mod professional;
pub mod tracking;

pub use assignment::{AssignedProfessional, Assignment, AssignmentView, ESTIMATED_ARRIVAL};
pub use professional::{NewProfessional, Professional};
pub use tracking::{Location, Tracking, TrackingView};
