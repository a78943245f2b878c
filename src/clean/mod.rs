//! Text sanitization: turns a raw extracted body into clean prose.
//!
//! The pipeline runs four pure stages in a fixed order:
//!
//! 1. [`quote::strip_quotes`]: quoted lines, reply attributions, header echoes
//! 2. [`signature::strip_signature`]: trailing signature blocks
//! 3. [`html::strip_markup`]: tags, style blocks, entities, CSS-only bodies
//! 4. [`normalize_whitespace`]: blank-line runs and outer whitespace
//!
//! Quotes go first so that a signature inside a quoted block is dropped with
//! the block rather than truncating the reply above it.
//!
//! Entity decoding can surface text an earlier stage acts on (`&gt;` at the
//! start of a line, an escaped closing tag), so the stages repeat until the
//! text stops changing.

pub mod html;
pub mod quote;
pub mod signature;

/// Upper bound on stage repetitions; nested escaping rarely needs more than two.
const MAX_PASSES: usize = 4;

/// Sanitize a raw body. Never fails; the result may be empty.
///
/// Already-clean text is returned unchanged, and `sanitize(sanitize(x))`
/// equals `sanitize(x)`.
pub fn sanitize(raw_body_text: &str) -> String {
    let mut text = sanitize_pass(raw_body_text);
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&text);
        if next == text {
            break;
        }
        text = next;
    }
    text
}

fn sanitize_pass(body: &str) -> String {
    let text = quote::strip_quotes(body);
    let text = signature::strip_signature(&text);
    let text = html::strip_markup(&text);
    normalize_whitespace(&text)
}

/// Collapse runs of blank lines into one, trim line ends and the whole text.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        out.push_str(line);
        pending_blank = false;
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        let text = "\n\n  Hello  \n\n\n\nWorld\t\n \n";
        assert_eq!(normalize_whitespace(text), "Hello\n\nWorld");
    }

    #[test]
    fn test_sanitize_full_reply() {
        let raw = "Yes, Tuesday works, see you then.\r\n\r\n\
                   Cheers,\r\nMe\r\n\r\n\
                   On Mon, Jan 8, 2024 at 10:00 AM Friend <friend@example.com> wrote:\r\n\
                   > Are you free Tuesday?\r\n";
        assert_eq!(sanitize(raw), "Yes, Tuesday works, see you then.");
    }

    #[test]
    fn test_signature_inside_quote_goes_with_quote() {
        let raw = "Agreed.\n\nOn Tue, Bob wrote:\nLet's ship it.\n\nBest,\nBob";
        assert_eq!(sanitize(raw), "Agreed.");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "Yes, Tuesday works, see you then.",
            "Line one.\n\nLine two with <me@example.com> inside.",
            "Thanks!",
            "Numbers: 1 < 2 and 3 > 2.",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(once, sample, "clean input changed: {sample:?}");
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_sanitize_is_idempotent_with_entities_and_html() {
        let samples = [
            "Wrap the title in &lt;b&gt; tags please.",
            "Use &lt;b&gt;bold&lt;/b&gt; for the heading.",
            "<div>Men&uacute; del d&iacute;a &amp; postre</div>",
            "Fine by me.\n&gt; quoted after decoding",
            "Tom &amp;amp; Jerry",
            "<p>Sounds <b>great</b>,<br>see you &laquo;there&raquo;</p>",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not a fixpoint: {sample:?}");
        }
        assert_eq!(
            sanitize("Wrap the title in &lt;b&gt; tags please."),
            "Wrap the title in <b> tags please."
        );
        assert_eq!(sanitize("<div>Men&uacute; del d&iacute;a &amp; postre</div>"), "Menú del día & postre");
    }

    #[test]
    fn test_sanitize_html_derived_body_keeps_words() {
        let text = html::html_to_text("<p>Use the &lt;table&gt; element for the caf&eacute; menu.</p>");
        assert_eq!(sanitize(&text), "Use the <table> element for the café menu.");
    }

    #[test]
    fn test_sanitize_may_return_empty() {
        assert_eq!(sanitize("> only quoted\n> text"), "");
        assert_eq!(sanitize(".a { color: red; }"), "");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_html_leftovers() {
        assert_eq!(
            sanitize("<div>Lunch&nbsp;at noon?</div>"),
            "Lunch at noon?"
        );
    }
}
