//! Conversation pairs, unresolved outbound messages, and the assembled dataset.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::FilterVerdict;

/// Where the prompt half of a training pair comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum PromptSource {
    /// Clean body of the inbound message the owner replied to.
    Inbound(String),
    /// Instruction produced by a prompt enhancer (or the fallback prompt).
    Synthetic(String),
}

impl PromptSource {
    pub fn text(&self) -> &str {
        match self {
            Self::Inbound(text) | Self::Synthetic(text) => text,
        }
    }
}

/// A (prompt, response) pair derived from one outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationPair {
    /// Message id of the outbound message the response came from.
    pub message_id: Option<String>,
    pub subject: String,
    pub prompt_source: PromptSource,
    pub response_text: String,
}

/// An outbound message with no resolvable reply context.
///
/// Needs a synthetic prompt from a [`PromptEnhancer`](crate::enhance::PromptEnhancer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedOutbound {
    pub message_id: Option<String>,
    pub subject: String,
    pub response_text: String,
}

impl UnresolvedOutbound {
    /// Turn this entry into a pair once a prompt is known.
    pub fn into_pair(self, prompt: String) -> ConversationPair {
        ConversationPair {
            message_id: self.message_id,
            subject: self.subject,
            prompt_source: PromptSource::Synthetic(prompt),
            response_text: self.response_text,
        }
    }
}

/// What the matcher produced for one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Pair(ConversationPair),
    Unresolved(UnresolvedOutbound),
}

impl MatchOutcome {
    pub fn subject(&self) -> &str {
        match self {
            Self::Pair(p) => &p.subject,
            Self::Unresolved(u) => &u.subject,
        }
    }

    pub fn response_text(&self) -> &str {
        match self {
            Self::Pair(p) => &p.response_text,
            Self::Unresolved(u) => &u.response_text,
        }
    }
}

/// Counters reported after a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    /// Records handed to the parser.
    pub total_records: u64,
    /// Records successfully parsed.
    pub total_parsed: u64,
    /// Records skipped because they could not be parsed.
    pub parse_failures: u64,
    pub outbound: u64,
    pub inbound: u64,
    /// Outbound copies dropped because their `Message-ID` was already seen.
    pub duplicates_removed: u64,
    /// Inbound messages ignored because their `Message-ID` was already indexed.
    pub inbound_duplicates: u64,
    /// Outbound messages excluded by the content filter, per reason.
    pub dropped_by_reason: BTreeMap<FilterVerdict, u64>,
    /// Indexed inbound messages the content filter kept from becoming prompts.
    pub inbound_filtered_by_reason: BTreeMap<FilterVerdict, u64>,
}

impl DatasetStats {
    /// Total number of messages excluded by the content filter.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_by_reason.values().sum()
    }

    /// Total number of inbound messages rejected as prompts.
    pub fn inbound_filtered_total(&self) -> u64 {
        self.inbound_filtered_by_reason.values().sum()
    }

    pub(crate) fn record_drop(&mut self, verdict: FilterVerdict) {
        *self.dropped_by_reason.entry(verdict).or_insert(0) += 1;
    }
}

/// Output of the extraction pipeline, fully assembled in memory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    /// Reply pairs with an inbound prompt, in mailbox order.
    pub pairs: Vec<ConversationPair>,
    /// Outbound messages that still need a synthetic prompt, in mailbox order.
    pub unresolved: Vec<UnresolvedOutbound>,
    pub stats: DatasetStats,
}

impl Dataset {
    /// Hand out the unresolved entries for prompt enhancement.
    ///
    /// Each entry is yielded once; afterwards `unresolved` is empty.
    pub fn drain_unresolved(&mut self) -> impl Iterator<Item = UnresolvedOutbound> + '_ {
        self.unresolved.drain(..)
    }

    /// Number of usable examples (pairs plus unresolved entries).
    pub fn len(&self) -> usize {
        self.pairs.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A finished `{prompt, response}` record for the dataset writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingExample {
    pub prompt_text: String,
    pub response_text: String,
}

impl From<ConversationPair> for TrainingExample {
    fn from(pair: ConversationPair) -> Self {
        let prompt_text = match pair.prompt_source {
            PromptSource::Inbound(text) | PromptSource::Synthetic(text) => text,
        };
        Self {
            prompt_text,
            response_text: pair.response_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved(subject: &str) -> UnresolvedOutbound {
        UnresolvedOutbound {
            message_id: Some("<u1@example.com>".into()),
            subject: subject.into(),
            response_text: "Project is on track.".into(),
        }
    }

    #[test]
    fn test_into_pair_uses_synthetic_prompt() {
        let pair = unresolved("Quick update").into_pair("Write a status update.".into());
        assert_eq!(
            pair.prompt_source,
            PromptSource::Synthetic("Write a status update.".into())
        );
        assert_eq!(pair.response_text, "Project is on track.");
        assert_eq!(pair.subject, "Quick update");
    }

    #[test]
    fn test_drain_unresolved_is_single_pass() {
        let mut dataset = Dataset {
            unresolved: vec![unresolved("a"), unresolved("b")],
            ..Dataset::default()
        };
        let drained: Vec<_> = dataset.drain_unresolved().collect();
        assert_eq!(drained.len(), 2);
        assert_eq!(dataset.drain_unresolved().count(), 0);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_stats_drop_accounting() {
        let mut stats = DatasetStats::default();
        stats.record_drop(FilterVerdict::MeetingInvite);
        stats.record_drop(FilterVerdict::MeetingInvite);
        stats.record_drop(FilterVerdict::UrlOnly);
        assert_eq!(stats.dropped_by_reason[&FilterVerdict::MeetingInvite], 2);
        assert_eq!(stats.dropped_total(), 3);
    }

    #[test]
    fn test_training_example_from_pair() {
        let pair = ConversationPair {
            message_id: None,
            subject: "Re: Tuesday".into(),
            prompt_source: PromptSource::Inbound("Are you free Tuesday?".into()),
            response_text: "Yes.".into(),
        };
        let example = TrainingExample::from(pair);
        assert_eq!(example.prompt_text, "Are you free Tuesday?");
        assert_eq!(example.response_text, "Yes.");
    }
}
