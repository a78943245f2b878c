//! Quoted-reply removal and header-echo cleanup.

use std::sync::LazyLock;

use regex::Regex;

/// `On <date>, <someone> wrote:`, possibly wrapped over a few lines.
static ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^[ \t]*On\s[^\n]{0,200}?(?:\n[^\n]{0,200}?){0,2}\swrote:[ \t]*$")
        .expect("valid regex")
});

/// Client markers that start a quoted or forwarded copy.
static BLOCK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:-{2,}\s*original message\s*-{2,}|-{3,}\s*forwarded message\s*-{3,}|begin forwarded message:)",
    )
    .expect("valid regex")
});

static ECHO_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\*?from:\*?\s+\S").expect("valid regex"));
static ECHO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\*?(?:sent|date):\*?\s").expect("valid regex"));
static ECHO_RECIPIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\*?(?:to|subject):\*?\s").expect("valid regex"));

/// A single header line that leaked into the body.
static LEAKED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:from|sent|to|subject|cc|bcc):(?:\s|$)").expect("valid regex")
});
static RULER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{20,}").expect("valid regex"));

/// How far below a `From:` line the rest of a header echo may appear.
const ECHO_WINDOW: usize = 6;

/// Sanitizer stage: remove quoted material.
///
/// 1. Drops every line starting with `>`.
/// 2. Cuts the body at the first reply attribution, forward/original-message
///    marker, or `From:`/`Sent:`/`To:` header echo; everything after is quoted.
/// 3. Removes stray header lines, Outlook rulers and external-sender banners.
pub fn strip_quotes(body: &str) -> String {
    let unquoted: Vec<&str> = body
        .lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect();

    let cut = find_quote_start(&unquoted).unwrap_or(unquoted.len());
    let kept = unquoted[..cut].join("\n");

    let kept = match ATTRIBUTION.find(&kept) {
        Some(m) => kept[..m.start()].to_string(),
        None => kept,
    };

    kept.lines()
        .filter(|line| !is_leaked_line(line))
        .map(|line| RULER.replace_all(line, ""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Index of the first line of a forwarded/original-message block or header echo.
fn find_quote_start(lines: &[&str]) -> Option<usize> {
    (0..lines.len()).find(|&i| {
        BLOCK_MARKER.is_match(lines[i])
            || (ECHO_FROM.is_match(lines[i]) && is_header_echo(&lines[i + 1..]))
    })
}

/// `true` if a `Sent:`/`Date:` line and a `To:`/`Subject:` line follow closely.
fn is_header_echo(following: &[&str]) -> bool {
    let window = &following[..following.len().min(ECHO_WINDOW)];
    window.iter().any(|l| ECHO_DATE.is_match(l))
        && window.iter().any(|l| ECHO_RECIPIENT.is_match(l))
}

fn is_leaked_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    LEAKED_HEADER.is_match(line)
        || lower.contains("email originated from an external sender")
        || lower.contains("do not click links")
        || line.trim_start().starts_with('⚠')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_quoted_lines() {
        let body = "Sounds good.\n> Can we meet?\n>> Earlier\nSee you.";
        assert_eq!(strip_quotes(body), "Sounds good.\nSee you.");
    }

    #[test]
    fn test_cuts_at_gmail_attribution() {
        let body = "Yes, Tuesday works.\n\nOn Mon, Jan 8, 2024 at 10:00 AM Alice <alice@example.com> wrote:\nAre you free?";
        assert_eq!(strip_quotes(body).trim(), "Yes, Tuesday works.");
    }

    #[test]
    fn test_cuts_at_wrapped_attribution() {
        let body = "Done.\n\nOn Mon, Jan 8, 2024 at 10:00 AM Alice Example\n<alice@example.com> wrote:\n\nOld text";
        assert_eq!(strip_quotes(body).trim(), "Done.");
    }

    #[test]
    fn test_sentence_starting_with_on_is_kept() {
        let body = "On Monday I will send the report.\nThanks for waiting.";
        assert_eq!(strip_quotes(body), body);
    }

    #[test]
    fn test_cuts_outlook_header_echo() {
        let body = "Approved.\n\n________________________________\nFrom: Bob <bob@example.com>\nSent: Tuesday, January 9, 2024 9:00 AM\nTo: Me <me@example.com>\nSubject: Budget\n\nPlease approve.";
        assert_eq!(strip_quotes(body).trim(), "Approved.");
    }

    #[test]
    fn test_cuts_forwarded_block() {
        let body = "FYI\n\n---------- Forwarded message ---------\nFrom: Carol <c@example.com>\nDate: Wed\nSubject: Notes\n\nThe notes.";
        assert_eq!(strip_quotes(body).trim(), "FYI");
    }

    #[test]
    fn test_removes_leaked_header_lines_and_banners() {
        let body = "CAUTION: This email originated from an external sender.\nSubject: Re: plan\nLet's go with plan B.";
        assert_eq!(strip_quotes(body), "Let's go with plan B.");
    }

    #[test]
    fn test_clean_text_unchanged() {
        let body = "Yes, Tuesday works, see you then.";
        assert_eq!(strip_quotes(body), body);
    }
}
