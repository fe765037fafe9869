//! Identifier generation for events, items, and buffers.
//!
//! Ids are opaque strings; the prefixes exist purely to make logs and traces readable.

use uuid::Uuid;

/// Generate a fresh event id (`event_<hex>`).
pub fn generate_event_id() -> String {
    format!("event_{}", Uuid::new_v4().simple())
}

/// Generate a fresh item id (`item_<hex>`), used for buffers and conversation items.
pub fn generate_item_id() -> String {
    format!("item_{}", Uuid::new_v4().simple())
}
