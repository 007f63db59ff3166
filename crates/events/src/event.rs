use chrono::{DateTime, Utc};

/// Something that happened to a booking record, published after the write
/// that caused it was persisted.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `"<context>.<record>.<past-tense verb>"`.
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;
}
