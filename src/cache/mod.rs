//! Cache Module
//!
//! Namespaced response caching over durable storage, with lazy TTL
//! expiration, usage counting and eviction on quota failures.

mod clock;
mod entry;
pub mod eviction;
pub mod key;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{EntryRecord, Envelope};
pub use eviction::EvictionOutcome;
pub use key::{parse_real_key, real_key, ParsedKey};
pub use store::StoreCache;
