//! Eviction Policy Module
//!
//! Chooses which entries to delete after the storage reported it is full.
//! Dead data goes first; usage counts are only consulted when nothing has
//! expired.

use crate::cache::EntryRecord;

// == Eviction Outcome ==
/// What an eviction pass selected for removal.
#[derive(Debug, Clone, PartialEq)]
pub enum EvictionOutcome {
    /// The origin had no entries, so nothing could be freed
    Nothing,
    /// Every expired entry of the origin
    Expired(Vec<EntryRecord>),
    /// The single entry with the fewest reads
    LeastUsed(EntryRecord),
}

impl EvictionOutcome {
    /// Entries selected for removal.
    pub fn victims(&self) -> &[EntryRecord] {
        match self {
            EvictionOutcome::Nothing => &[],
            EvictionOutcome::Expired(records) => records,
            EvictionOutcome::LeastUsed(record) => std::slice::from_ref(record),
        }
    }

    /// Number of entries selected for removal.
    pub fn removed(&self) -> usize {
        self.victims().len()
    }
}

// == Select Victims ==
/// Runs the policy over one origin's entries, in enumeration order.
///
/// Ties on `used_times` go to the entry enumerated first.
pub fn select_victims(records: Vec<EntryRecord>, now_ms: u64) -> EvictionOutcome {
    let (expired, live): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| record.is_expired(now_ms));

    if !expired.is_empty() {
        return EvictionOutcome::Expired(expired);
    }

    live.into_iter()
        .min_by_key(|record| record.used_times)
        .map_or(EvictionOutcome::Nothing, EvictionOutcome::LeastUsed)
}
