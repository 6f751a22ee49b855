//! UUID v7 utilities for time-ordered identifiers.
//!
//! Job and keyword rows use UUIDv7, which embeds a millisecond-precision
//! timestamp in the high bits. Identifiers generated later sort
//! lexicographically greater, which keeps queue indexes append-friendly.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
