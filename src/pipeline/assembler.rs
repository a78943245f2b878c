//! Outbound deduplication and dataset assembly.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use crate::filter::ContentFilter;
use crate::model::message::CleanedMessage;
use crate::model::pair::{Dataset, DatasetStats, MatchOutcome};

/// Dedup key: the `Message-ID`, or the input position for messages without one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Id(String),
    Unkeyed(usize),
}

/// Drop repeated copies of the same outbound message.
///
/// Keyed by `Message-ID`; the first copy wins and mailbox order is kept.
/// Messages without an id are never considered duplicates.
///
/// Returns the surviving messages and the number removed.
pub fn dedup_outbound(outbound: Vec<CleanedMessage>) -> (Vec<CleanedMessage>, u64) {
    let mut unique: IndexMap<DedupKey, CleanedMessage> = IndexMap::with_capacity(outbound.len());
    let mut removed = 0u64;

    for (position, message) in outbound.into_iter().enumerate() {
        let key = match message.message_id() {
            Some(id) => DedupKey::Id(id.to_string()),
            None => DedupKey::Unkeyed(position),
        };
        match unique.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(message);
            }
            Entry::Occupied(first) => {
                debug!(
                    message_id = message.message_id().unwrap_or_default(),
                    kept_offset = first.get().message.offset,
                    offset = message.message.offset,
                    "Dropping duplicate outbound copy"
                );
                removed += 1;
            }
        }
    }

    (unique.into_values().collect(), removed)
}

/// Applies the content filter to matched outbound messages and builds the [`Dataset`].
#[derive(Debug)]
pub struct PairAssembler<'a> {
    filter: &'a ContentFilter,
}

impl<'a> PairAssembler<'a> {
    pub fn new(filter: &'a ContentFilter) -> Self {
        Self { filter }
    }

    /// Keep every outcome whose response passes the filter.
    ///
    /// Excluded entries are counted per reason in `stats`; nothing is dropped
    /// without being accounted for.
    pub fn assemble(
        &self,
        outcomes: impl IntoIterator<Item = MatchOutcome>,
        mut stats: DatasetStats,
    ) -> Dataset {
        let mut pairs = Vec::new();
        let mut unresolved = Vec::new();

        for outcome in outcomes {
            let verdict = self
                .filter
                .classify(outcome.response_text(), outcome.subject());
            if !verdict.is_ok() {
                debug!(subject = outcome.subject(), reason = %verdict, "Filtered out response");
                stats.record_drop(verdict);
                continue;
            }
            match outcome {
                MatchOutcome::Pair(pair) => pairs.push(pair),
                MatchOutcome::Unresolved(entry) => unresolved.push(entry),
            }
        }

        Dataset {
            pairs,
            unresolved,
            stats,
        }
    }
}
