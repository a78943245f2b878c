//! Filter configuration: thresholds and per-category pattern lists.
//!
//! Patterns are data, not code. Every list can be replaced from the
//! `[filter.patterns]` table of the config file; the defaults below are the
//! built-in heuristics.

use serde::{Deserialize, Serialize};

/// Thresholds and pattern sets for the content filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Non-whitespace characters a body needs besides its URLs.
    pub min_content_chars: usize,
    /// Bodies shorter than this many words may be signature-only.
    pub min_signature_words: usize,
    /// Words left after removing image references for a body to count as text.
    pub min_image_words: usize,
    /// Distinct form-field patterns that mark a body as form data.
    pub min_form_fields: usize,
    /// Regex lists per category, tried case-insensitively.
    pub patterns: PatternSets,
}

/// Ordered regex lists, one per filter category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSets {
    pub auto_generated: Vec<String>,
    pub meeting_invite: Vec<String>,
    pub confirmation_tracking: Vec<String>,
    pub code_or_css: Vec<String>,
    pub signature_only: Vec<String>,
    pub image_only: Vec<String>,
    pub form_data: Vec<String>,
    pub test_message: Vec<String>,
}

impl PatternSets {
    /// `(category name, patterns)` for every category, in precedence order.
    pub fn categories(&self) -> [(&'static str, &[String]); 8] {
        [
            ("auto_generated", self.auto_generated.as_slice()),
            ("meeting_invite", self.meeting_invite.as_slice()),
            ("confirmation_tracking", self.confirmation_tracking.as_slice()),
            ("code_or_css", self.code_or_css.as_slice()),
            ("signature_only", self.signature_only.as_slice()),
            ("image_only", self.image_only.as_slice()),
            ("form_data", self.form_data.as_slice()),
            ("test_message", self.test_message.as_slice()),
        ]
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 30,
            min_signature_words: 10,
            min_image_words: 5,
            min_form_fields: 2,
            patterns: PatternSets::default(),
        }
    }
}

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

impl Default for PatternSets {
    fn default() -> Self {
        Self {
            auto_generated: owned(&[
                r"automatically generated",
                r"do[\s-]*not[\s-]*reply",
                r"\bno-?reply@",
                r"this is an automated",
                r"automated (?:message|notification|email)",
                r"reacted via gmail",
            ]),
            meeting_invite: owned(&[
                r"zoom\.us/[jw]/",
                r"teams\.microsoft\.com/l/meetup-join",
                r"meet\.google\.com/",
                r"\.webex\.com/",
                r"join\s+zoom\s+meeting",
                r"join\s+(?:microsoft\s+)?teams\s+meeting",
                r"meeting\s+id:\s*\d+",
                r"passcode:\s*\d+",
                r"dial\s+by\s+your\s+location",
                r"google\s+meet",
                r"one\s+tap\s+mobile",
                r"^BEGIN:VCALENDAR",
                r"^DTSTART[;:]",
            ]),
            confirmation_tracking: owned(&[
                r"confirmation\s*(?:#|number|code)",
                r"order\s*(?:#|number|no\.)",
                r"tracking\s*(?:#|number)",
                r"flight\s*#",
                r"reservation\s*(?:#|number)",
            ]),
            code_or_css: owned(&[
                r"\{[\s\n]*[\w-]+\s*:\s*[\w#-]+\s*;",
                r"(?m)^\s*#[\w-]+\s*\{",
                r"(?m)^\s*\.[\w-]+\s*\{",
                r"function\s*\(",
                r"\bvar\s+\w+\s*=",
                r"\bconst\s+\w+\s*=",
                r"</?(?:div|span|table|td|tr)\b",
            ]),
            signature_only: owned(&[
                r"\d{3}[-.\s]?\d{3}[-.\s]?\d{4}",
                r"\S+@\S+\.\w+",
            ]),
            image_only: owned(&[
                r"\[image:[^\]]*\]",
                r"\S+\.(?:png|jpe?g|gif|bmp|webp)\b",
                r"\bcid:\S+",
            ]),
            form_data: owned(&[
                r"account:\s*\w+",
                r"username:\s*\w+",
                r"balance:\s*\$\d+",
                r"user\s+id:\s*\d+",
                r"password:\s*\w+",
                r"(?:first|last|full)\s+name:\s*\w+",
                r"phone(?:\s+number)?:\s*[\d+(]",
                r"e-?mail(?:\s+address)?:\s*\S+@",
            ]),
            test_message: owned(&[
                r"\btest forward\b",
                r"\btest redirect\b",
                r"\btest email\b",
                r"\bthis is a test\b",
            ]),
        }
    }
}
