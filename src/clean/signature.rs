//! Signature block removal.

use std::sync::LazyLock;

use regex::Regex;

/// Mobile and client footers that end the written part of a message.
static CLIENT_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:sent from my\s|sent from (?:mail|outlook) for\s|get outlook for\s|sent via\s)")
        .expect("valid regex")
});

/// A line holding nothing but a closing salutation.
static CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:best|best regards|best wishes|regards|kind regards|warm regards|warmly|thanks|thank you|thanks again|many thanks|cheers|sincerely|yours truly|all the best|talk soon|take care)\s*[,.!]?\s*$",
    )
    .expect("valid regex")
});

/// Most lines (name, title, phone, …) a signature below a salutation may have.
const MAX_SIGNATURE_LINES: usize = 4;

/// Longest line still treated as signature material.
const MAX_SIGNATURE_LINE_CHARS: usize = 60;

/// Sanitizer stage: drop a trailing signature block.
///
/// The block starts at the earliest of:
/// - a standalone `--` delimiter line,
/// - a client footer such as "Sent from my iPhone",
/// - a closing salutation followed by 1 to [`MAX_SIGNATURE_LINES`] short
///   lines that read like a name or contact details, not a sentence.
///
/// Salutations on the first line are never cut, so "Thanks!" survives.
pub fn strip_signature(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    match find_signature_start(&lines) {
        Some(start) => lines[..start].join("\n"),
        None => body.to_string(),
    }
}

fn find_signature_start(lines: &[&str]) -> Option<usize> {
    (0..lines.len()).find(|&i| {
        let line = lines[i];
        line.trim_end() == "--"
            || CLIENT_FOOTER.is_match(line)
            || (has_content_before(&lines[..i])
                && CLOSING.is_match(line)
                && is_signature_tail(&lines[i + 1..]))
    })
}

fn has_content_before(lines: &[&str]) -> bool {
    lines.iter().any(|l| !l.trim().is_empty())
}

fn is_signature_tail(lines: &[&str]) -> bool {
    let filled: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    (1..=MAX_SIGNATURE_LINES).contains(&filled.len())
        && filled
            .iter()
            .all(|l| l.chars().count() <= MAX_SIGNATURE_LINE_CHARS && !is_sentence(l))
}

/// Ends like a sentence: `?` or `!`, or `.` after three or more words.
///
/// "ACME Corp." still counts as a signature line.
fn is_sentence(line: &str) -> bool {
    line.ends_with(['?', '!'])
        || (line.ends_with('.') && line.split_whitespace().count() >= 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_line() {
        let body = "See attached.\n-- \nJohn Smith\nACME Corp";
        assert_eq!(strip_signature(body), "See attached.");
    }

    #[test]
    fn test_double_dash_inside_text_is_kept() {
        let body = "The 2023--2024 budget is final.";
        assert_eq!(strip_signature(body), body);
    }

    #[test]
    fn test_mobile_footer() {
        let body = "On my way.\n\nSent from my iPhone";
        assert_eq!(strip_signature(body).trim(), "On my way.");
    }

    #[test]
    fn test_salutation_with_contact_lines() {
        let body = "I'll review it tonight.\n\nBest regards,\nJane Doe\nProduct Manager\n+1 555 123 4567";
        assert_eq!(strip_signature(body).trim(), "I'll review it tonight.");
    }

    #[test]
    fn test_salutation_with_long_tail_is_kept() {
        let body = "Quick note.\nThanks,\nbut I also wanted to mention that the meeting was moved to Thursday afternoon at three.";
        assert_eq!(strip_signature(body), body);
    }

    #[test]
    fn test_salutation_followed_by_sentence_is_kept() {
        let body = "Can you send it?\nThanks\nAlso bring the keys.";
        assert_eq!(strip_signature(body), body);
        let body = "Draft attached.\nCheers,\nDid you get my last note?";
        assert_eq!(strip_signature(body), body);
    }

    #[test]
    fn test_company_line_with_period_is_signature() {
        let body = "Invoice attached.\nRegards,\nJohn Smith\nACME Corp.";
        assert_eq!(strip_signature(body), "Invoice attached.");
    }

    #[test]
    fn test_lone_thanks_is_kept() {
        assert_eq!(strip_signature("Thanks!"), "Thanks!");
        assert_eq!(strip_signature("Thanks,\nJane"), "Thanks,\nJane");
    }

    #[test]
    fn test_clean_text_unchanged() {
        let body = "Project is on track.";
        assert_eq!(strip_signature(body), body);
    }
}
