//! Reply matching: links outbound messages to the inbound message they answer.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::filter::{ContentFilter, FilterVerdict};
use crate::model::message::CleanedMessage;
use crate::model::pair::{ConversationPair, MatchOutcome, PromptSource, UnresolvedOutbound};

/// Split messages into `(outbound, inbound)`, keeping mailbox order in both.
pub fn partition(messages: Vec<CleanedMessage>) -> (Vec<CleanedMessage>, Vec<CleanedMessage>) {
    messages.into_iter().partition(CleanedMessage::is_outbound)
}

/// An indexed inbound message and the filter's verdict on it.
#[derive(Debug)]
struct IndexedInbound {
    message: CleanedMessage,
    verdict: FilterVerdict,
}

/// Read-only lookup of inbound messages by `Message-ID`.
///
/// Built once before any outbound message is resolved, never mutated after.
#[derive(Debug, Default)]
pub struct InboundIndex {
    by_id: HashMap<String, IndexedInbound>,
    duplicates: u64,
    filtered: BTreeMap<FilterVerdict, u64>,
}

impl InboundIndex {
    /// Index every inbound message that has an id, classifying it with `filter`.
    ///
    /// Messages without a `Message-ID` cannot be replied to and are skipped.
    /// When two messages share an id the first one stays. Messages the filter
    /// rejects stay indexed but never serve as a prompt.
    pub fn build(inbound: impl IntoIterator<Item = CleanedMessage>, filter: &ContentFilter) -> Self {
        let mut index = Self::default();
        for message in inbound {
            let Some(id) = message.message_id().map(str::to_string) else {
                continue;
            };
            if index.by_id.contains_key(&id) {
                warn!(
                    message_id = %id,
                    offset = message.message.offset,
                    "Duplicate inbound Message-ID, keeping first"
                );
                index.duplicates += 1;
                continue;
            }
            let verdict = filter.classify(&message.clean_body_text, &message.message.subject);
            if !verdict.is_ok() {
                debug!(message_id = %id, reason = %verdict, "Inbound message unusable as prompt");
                *index.filtered.entry(verdict).or_insert(0) += 1;
            }
            index.by_id.insert(id, IndexedInbound { message, verdict });
        }
        debug!(count = index.by_id.len(), "Built inbound index");
        index
    }

    pub fn get(&self, message_id: &str) -> Option<&CleanedMessage> {
        self.by_id.get(message_id).map(|entry| &entry.message)
    }

    /// The cleaned body of `message_id`, if it passed the content filter.
    pub fn prompt(&self, message_id: &str) -> Option<&str> {
        self.by_id
            .get(message_id)
            .filter(|entry| entry.verdict.is_ok())
            .map(|entry| entry.message.clean_body_text.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Inbound messages ignored because their id was already indexed.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Indexed inbound messages the filter rejected, per reason.
    pub fn filtered(&self) -> &BTreeMap<FilterVerdict, u64> {
        &self.filtered
    }
}

/// Resolves outbound messages against an [`InboundIndex`].
///
/// Only exact `In-Reply-To` == `Message-ID` matches count; there is no
/// subject or thread fallback.
#[derive(Debug)]
pub struct ConversationMatcher {
    index: InboundIndex,
}

impl ConversationMatcher {
    pub fn new(index: InboundIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &InboundIndex {
        &self.index
    }

    /// Pair one outbound message with its inbound prompt, or leave it unresolved.
    ///
    /// A matched inbound message that is empty or was rejected by the content
    /// filter gives no usable prompt, so the outbound message is left
    /// unresolved as well.
    pub fn resolve(&self, outbound: CleanedMessage) -> MatchOutcome {
        let prompt = outbound
            .in_reply_to()
            .and_then(|id| self.index.prompt(id))
            .filter(|body| !body.is_empty())
            .map(str::to_string);

        let CleanedMessage {
            message,
            clean_body_text,
        } = outbound;

        match prompt {
            Some(prompt) => MatchOutcome::Pair(ConversationPair {
                message_id: message.message_id,
                subject: message.subject,
                prompt_source: PromptSource::Inbound(prompt),
                response_text: clean_body_text,
            }),
            None => MatchOutcome::Unresolved(UnresolvedOutbound {
                message_id: message.message_id,
                subject: message.subject,
                response_text: clean_body_text,
            }),
        }
    }
}
