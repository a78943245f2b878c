//! Content filtering: decides whether a cleaned body is worth training on.
//!
//! Predicates are evaluated in a fixed order and the first match wins, so a
//! body never carries two reasons:
//!
//! | # | verdict                 | test                                                   |
//! |---|-------------------------|--------------------------------------------------------|
//! | 0 | `empty`                 | blank, punctuation/emoji only, or a lone "unsubscribe" |
//! | 1 | `auto_generated`        | pattern in body or subject                             |
//! | 2 | `meeting_invite`        | pattern in body                                        |
//! | 3 | `confirmation_tracking` | pattern in body                                        |
//! | 4 | `code_or_css`           | pattern in body                                        |
//! | 5 | `url_only`              | has a URL, too little text around it                   |
//! | 6 | `signature_only`        | few words, contact details                             |
//! | 7 | `image_only`            | image references, few words around them                |
//! | 8 | `form_data`             | several form fields, or mostly `key: value` lines      |
//! | 9 | `test_message`          | pattern in body or subject                             |
//! |   | `ok`                    | nothing matched                                        |

pub mod patterns;

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};

pub use patterns::{FilterConfig, PatternSets};

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+").expect("valid regex"));

static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Za-z][\w .'/-]{0,30}:\s+\S").expect("valid regex")
});

/// Fewest `key: value` lines that can make a body form data on their own.
const MIN_KEY_VALUE_LINES: usize = 3;

/// Classification of one cleaned body.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterVerdict {
    Ok,
    Empty,
    AutoGenerated,
    MeetingInvite,
    ConfirmationTracking,
    CodeOrCss,
    UrlOnly,
    SignatureOnly,
    ImageOnly,
    FormData,
    TestMessage,
}

impl FilterVerdict {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Empty => "empty",
            Self::AutoGenerated => "auto_generated",
            Self::MeetingInvite => "meeting_invite",
            Self::ConfirmationTracking => "confirmation_tracking",
            Self::CodeOrCss => "code_or_css",
            Self::UrlOnly => "url_only",
            Self::SignatureOnly => "signature_only",
            Self::ImageOnly => "image_only",
            Self::FormData => "form_data",
            Self::TestMessage => "test_message",
        }
    }
}

impl std::fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled content filter.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    auto_generated: Vec<Regex>,
    meeting_invite: Vec<Regex>,
    confirmation_tracking: Vec<Regex>,
    code_or_css: Vec<Regex>,
    signature_only: Vec<Regex>,
    image_only: Vec<Regex>,
    form_data: Vec<Regex>,
    test_message: Vec<Regex>,
    min_content_chars: usize,
    min_signature_words: usize,
    min_image_words: usize,
    min_form_fields: usize,
}

impl ContentFilter {
    /// Compile every pattern set. An invalid pattern is a configuration error.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        let p = &config.patterns;
        Ok(Self {
            auto_generated: compile("auto_generated", &p.auto_generated)?,
            meeting_invite: compile("meeting_invite", &p.meeting_invite)?,
            confirmation_tracking: compile("confirmation_tracking", &p.confirmation_tracking)?,
            code_or_css: compile("code_or_css", &p.code_or_css)?,
            signature_only: compile("signature_only", &p.signature_only)?,
            image_only: compile("image_only", &p.image_only)?,
            form_data: compile("form_data", &p.form_data)?,
            test_message: compile("test_message", &p.test_message)?,
            min_content_chars: config.min_content_chars,
            min_signature_words: config.min_signature_words,
            min_image_words: config.min_image_words,
            min_form_fields: config.min_form_fields,
        })
    }

    /// Classify a cleaned body. Deterministic; the first matching predicate wins.
    pub fn classify(&self, body: &str, subject: &str) -> FilterVerdict {
        let body = body.trim();

        if is_empty_body(body) {
            FilterVerdict::Empty
        } else if any_match(&self.auto_generated, body) || any_match(&self.auto_generated, subject)
        {
            FilterVerdict::AutoGenerated
        } else if any_match(&self.meeting_invite, body) {
            FilterVerdict::MeetingInvite
        } else if any_match(&self.confirmation_tracking, body) {
            FilterVerdict::ConfirmationTracking
        } else if any_match(&self.code_or_css, body) {
            FilterVerdict::CodeOrCss
        } else if self.is_url_only(body) {
            FilterVerdict::UrlOnly
        } else if self.is_signature_only(body) {
            FilterVerdict::SignatureOnly
        } else if self.is_image_only(body) {
            FilterVerdict::ImageOnly
        } else if self.is_form_data(body) {
            FilterVerdict::FormData
        } else if any_match(&self.test_message, body) || any_match(&self.test_message, subject) {
            FilterVerdict::TestMessage
        } else {
            FilterVerdict::Ok
        }
    }

    fn is_url_only(&self, body: &str) -> bool {
        URL.is_match(body) && non_whitespace_chars(&URL.replace_all(body, "")) < self.min_content_chars
    }

    fn is_signature_only(&self, body: &str) -> bool {
        word_count(body) < self.min_signature_words && any_match(&self.signature_only, body)
    }

    fn is_image_only(&self, body: &str) -> bool {
        if !any_match(&self.image_only, body) {
            return false;
        }
        let remaining = self
            .image_only
            .iter()
            .fold(body.to_string(), |text, re| re.replace_all(&text, " ").into_owned());
        word_count(&remaining) < self.min_image_words
    }

    fn is_form_data(&self, body: &str) -> bool {
        let fields = self.form_data.iter().filter(|re| re.is_match(body)).count();
        if self.min_form_fields > 0 && fields >= self.min_form_fields {
            return true;
        }
        let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
        let key_values = lines.iter().filter(|l| KEY_VALUE_LINE.is_match(l)).count();
        key_values >= MIN_KEY_VALUE_LINES && key_values * 3 >= lines.len() * 2
    }
}

fn compile(category: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|source| TuneError::Pattern {
                    category: category.to_string(),
                    source,
                })
        })
        .collect()
}

fn any_match(set: &[Regex], text: &str) -> bool {
    set.iter().any(|re| re.is_match(text))
}

fn is_empty_body(body: &str) -> bool {
    body.is_empty()
        || !body.chars().any(char::is_alphanumeric)
        || body.eq_ignore_ascii_case("unsubscribe")
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ContentFilter {
        ContentFilter::new(&FilterConfig::default()).unwrap()
    }

    fn verdict(body: &str) -> FilterVerdict {
        filter().classify(body, "")
    }

    #[test]
    fn test_meaningful_replies_pass() {
        assert_eq!(verdict("Yes, Tuesday works, see you then."), FilterVerdict::Ok);
        assert_eq!(verdict("Project is on track."), FilterVerdict::Ok);
        assert_eq!(verdict("Are you free Tuesday?"), FilterVerdict::Ok);
    }

    #[test]
    fn test_empty_and_reactions() {
        assert_eq!(verdict(""), FilterVerdict::Empty);
        assert_eq!(verdict("   \n "), FilterVerdict::Empty);
        assert_eq!(verdict("👍 !!"), FilterVerdict::Empty);
        assert_eq!(verdict("Unsubscribe"), FilterVerdict::Empty);
    }

    #[test]
    fn test_auto_generated_in_subject() {
        let f = filter();
        assert_eq!(
            f.classify("Your weekly summary is ready for review now.", "Do not reply: summary"),
            FilterVerdict::AutoGenerated
        );
        assert_eq!(
            verdict("Alice reacted via Gmail"),
            FilterVerdict::AutoGenerated
        );
    }

    #[test]
    fn test_zoom_link_is_meeting_invite() {
        assert_eq!(
            verdict("Please join: https://zoom.us/j/123456789"),
            FilterVerdict::MeetingInvite
        );
    }

    #[test]
    fn test_meeting_beats_tracking() {
        let body = "Your tracking number is 1Z999. Call in: https://meet.google.com/abc-defg-hij";
        assert_eq!(verdict(body), FilterVerdict::MeetingInvite);
    }

    #[test]
    fn test_confirmation_tracking() {
        assert_eq!(
            verdict("Thanks for your purchase, your order # is 5512 and ships soon."),
            FilterVerdict::ConfirmationTracking
        );
    }

    #[test]
    fn test_code_or_css() {
        assert_eq!(
            verdict("const total = items.length; console.log(total) if you want it"),
            FilterVerdict::CodeOrCss
        );
        assert_eq!(
            verdict("body { margin: 0; } and then some other words here"),
            FilterVerdict::CodeOrCss
        );
    }

    #[test]
    fn test_url_only() {
        assert_eq!(
            verdict("Check this out https://example.com/article/123"),
            FilterVerdict::UrlOnly
        );
        assert_eq!(
            verdict("Here is the article I mentioned during lunch, the second half is the interesting part: https://example.com/a"),
            FilterVerdict::Ok
        );
    }

    #[test]
    fn test_signature_only() {
        assert_eq!(
            verdict("Jane Doe\n555-123-4567\njane@example.com"),
            FilterVerdict::SignatureOnly
        );
    }

    #[test]
    fn test_image_only() {
        assert_eq!(verdict("[image: photo.jpg]\nLook!"), FilterVerdict::ImageOnly);
    }

    #[test]
    fn test_form_data() {
        assert_eq!(
            verdict("Here are the details you asked for.\nUsername: jdoe\nPassword: hunter2"),
            FilterVerdict::FormData
        );
        assert_eq!(
            verdict("Venue: Blue Cafe downtown\nTime: three in the afternoon\nBring: your laptop and charger"),
            FilterVerdict::FormData
        );
    }

    #[test]
    fn test_test_message() {
        let f = filter();
        assert_eq!(
            f.classify("Checking whether the forwarding rule works as expected.", "Test email"),
            FilterVerdict::TestMessage
        );
    }

    #[test]
    fn test_custom_patterns_replace_defaults() {
        let mut config = FilterConfig::default();
        config.patterns.meeting_invite = vec![r"whereby\.com/".into()];
        let f = ContentFilter::new(&config).unwrap();
        assert_eq!(
            f.classify("Room is ready for our chat later: https://whereby.com/team-room", ""),
            FilterVerdict::MeetingInvite
        );
        assert_ne!(
            f.classify("Please join: https://zoom.us/j/123456789", ""),
            FilterVerdict::MeetingInvite
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let mut config = FilterConfig::default();
        config.patterns.form_data = vec!["(unclosed".into()];
        let err = ContentFilter::new(&config).unwrap_err();
        assert!(matches!(err, TuneError::Pattern { ref category, .. } if category == "form_data"));
    }

    #[test]
    fn test_verdict_names() {
        assert_eq!(FilterVerdict::MeetingInvite.to_string(), "meeting_invite");
        assert_eq!(
            serde_json::to_string(&FilterVerdict::CodeOrCss).unwrap(),
            "\"code_or_css\""
        );
        assert!(FilterVerdict::Ok.is_ok());
    }
}
