//! Synthetic prompts for outbound messages that answer nothing in the mailbox.
//!
//! A [`PromptEnhancer`] receives unresolved responses in batches and returns
//! one instruction per entry. Enhancement never costs an example: a failed
//! batch, a short answer, or a blank prompt all fall back to
//! [`EnhancerConfig::fallback_prompt`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EnhancerConfig;
use crate::error::Result;
use crate::model::pair::{ConversationPair, UnresolvedOutbound};

/// One unresolved response as handed to an enhancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancementRequest {
    pub subject: String,
    /// Response body, truncated to `max_body_chars`.
    pub body: String,
}

/// Produces prompts for unresolved responses.
pub trait PromptEnhancer {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return one prompt per request, in request order.
    ///
    /// Missing trailing entries and blank strings are replaced by the
    /// fallback prompt; an `Err` replaces the whole batch.
    fn enhance_batch(&mut self, batch: &[EnhancementRequest]) -> Result<Vec<String>>;
}

/// Offline enhancer deriving the intent from the subject and body.
#[derive(Debug, Clone)]
pub struct HeuristicEnhancer {
    generic_prompt: String,
}

impl HeuristicEnhancer {
    pub fn new(generic_prompt: impl Into<String>) -> Self {
        Self {
            generic_prompt: generic_prompt.into(),
        }
    }

    /// Instruction for a single response.
    pub fn intent(&self, subject: &str, body: &str) -> String {
        let subject = subject.trim().to_lowercase();
        let body = body.trim();

        let intent = if subject.contains("unsubscribe") || body.eq_ignore_ascii_case("unsubscribe")
        {
            "Write an email asking to unsubscribe."
        } else if subject.starts_with("re:") {
            "Write an email responding to a message."
        } else if subject.starts_with("fwd:") || subject.starts_with("fw:") {
            "Write a forwarded message."
        } else if body.split_whitespace().count() <= 4 {
            "Write a brief one-line email in your tone."
        } else {
            return self.generic_prompt.clone();
        };
        intent.to_string()
    }
}

impl PromptEnhancer for HeuristicEnhancer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn enhance_batch(&mut self, batch: &[EnhancementRequest]) -> Result<Vec<String>> {
        Ok(batch
            .iter()
            .map(|req| self.intent(&req.subject, &req.body))
            .collect())
    }
}

/// Enhancer that gives every entry the same prompt.
#[derive(Debug, Clone)]
pub struct FixedPromptEnhancer {
    prompt: String,
}

impl FixedPromptEnhancer {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl PromptEnhancer for FixedPromptEnhancer {
    fn name(&self) -> &str {
        "fixed"
    }

    fn enhance_batch(&mut self, batch: &[EnhancementRequest]) -> Result<Vec<String>> {
        Ok(vec![self.prompt.clone(); batch.len()])
    }
}

/// What happened during enhancement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnhancementReport {
    /// Entries sent to the enhancer.
    pub requested: u64,
    /// Enhancer calls made.
    pub batches: u64,
    /// Calls that returned an error.
    pub failed_batches: u64,
    /// Entries that ended up with the fallback prompt.
    pub fallbacks: u64,
}

/// Give every unresolved entry a synthetic prompt.
///
/// Entries are processed in batches of `config.batch_size` and come back in
/// their original order, each as a [`ConversationPair`] with a
/// [`Synthetic`](crate::model::pair::PromptSource::Synthetic) prompt.
pub fn enhance_unresolved(
    enhancer: &mut dyn PromptEnhancer,
    unresolved: Vec<UnresolvedOutbound>,
    config: &EnhancerConfig,
) -> (Vec<ConversationPair>, EnhancementReport) {
    let mut report = EnhancementReport::default();
    let mut pairs = Vec::with_capacity(unresolved.len());
    let batch_size = config.batch_size.max(1);
    let mut entries = unresolved.into_iter().peekable();

    while entries.peek().is_some() {
        let chunk: Vec<UnresolvedOutbound> = entries.by_ref().take(batch_size).collect();
        let requests: Vec<EnhancementRequest> = chunk
            .iter()
            .map(|entry| EnhancementRequest {
                subject: entry.subject.clone(),
                body: truncate_chars(&entry.response_text, config.max_body_chars),
            })
            .collect();

        report.batches += 1;
        report.requested += requests.len() as u64;

        let prompts = match enhancer.enhance_batch(&requests) {
            Ok(prompts) => {
                if prompts.len() < requests.len() {
                    warn!(
                        enhancer = enhancer.name(),
                        expected = requests.len(),
                        got = prompts.len(),
                        "Enhancer returned too few prompts, padding with fallback"
                    );
                }
                prompts
            }
            Err(e) => {
                warn!(enhancer = enhancer.name(), error = %e, "Enhancement batch failed, using fallback prompt");
                report.failed_batches += 1;
                Vec::new()
            }
        };

        let mut prompts = prompts.into_iter();
        for entry in chunk {
            let prompt = match prompts.next().map(|p| p.trim().to_string()) {
                Some(p) if !p.is_empty() => p,
                _ => {
                    report.fallbacks += 1;
                    config.fallback_prompt.clone()
                }
            };
            pairs.push(entry.into_pair(prompt));
        }
        debug!(batch = report.batches, "Enhanced batch");
    }

    info!(
        enhancer = enhancer.name(),
        requested = report.requested,
        batches = report.batches,
        fallbacks = report.fallbacks,
        "Prompt enhancement finished"
    );
    (pairs, report)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
