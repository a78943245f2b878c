//! HTML and CSS removal.

use std::sync::LazyLock;

use regex::Regex;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?(?:</style\s*>|\z)").expect("valid regex"));
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?(?:</script\s*>|\z)").expect("valid regex")
});
static HEAD_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head\s*>").expect("valid regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|(?i)<!doctype[^>]*>").expect("valid regex"));
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:br|p|div|tr|li|ul|ol|table|blockquote|h[1-6])\b[^>]*>")
        .expect("valid regex")
});
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[a-zA-Z][a-zA-Z0-9:-]*(?:\s[^>]*)?/?>").expect("valid regex")
});
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("valid regex")
});
/// A closing tag, a `<br>`, or a tag carrying attributes.
static MARKUP_EVIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)</[a-z][a-z0-9:-]*\s*>|<br\s*/?>|<[a-z][a-z0-9:-]*\s+[a-z-]+\s*=\s*["'\w]"#)
        .expect("valid regex")
});

/// Convert an HTML document to plain text.
///
/// - Drops `<head>`, `<style>`, `<script>` and comments
/// - Turns block elements (`<p>`, `<div>`, `<br>`, …) into line breaks
/// - Turns `<li>` into `"- item"`
/// - Strips every remaining tag, then decodes entities
pub fn html_to_text(html: &str) -> String {
    let text = remove_blocks(html);
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    super::normalize_whitespace(&decode_entities(&text))
}

/// Sanitizer stage: strip markup left in a text body.
///
/// Tags are only removed when the body carries real markup (a closing tag,
/// `<br>`, an attribute, a comment or a style block). A lone `<b>` in prose,
/// such as one decoded from `&lt;b&gt;`, is the writer's text and stays.
/// Entities are decoded after tag removal. A body that is mostly CSS rules
/// becomes empty.
pub fn strip_markup(text: &str) -> String {
    let stripped = if has_markup(text) {
        let without_blocks = remove_blocks(text);
        let with_breaks = BLOCK_TAG.replace_all(&without_blocks, "\n");
        TAG.replace_all(&with_breaks, "").into_owned()
    } else {
        text.to_string()
    };

    let decoded = if ENTITY.is_match(&stripped) {
        decode_entities(&stripped)
    } else {
        stripped
    };

    if is_css_only(&decoded) {
        String::new()
    } else {
        decoded
    }
}

fn has_markup(text: &str) -> bool {
    MARKUP_EVIDENCE.is_match(text)
        || COMMENT.is_match(text)
        || STYLE_BLOCK.is_match(text)
        || SCRIPT_BLOCK.is_match(text)
        || HEAD_BLOCK.is_match(text)
}

fn remove_blocks(html: &str) -> String {
    let text = COMMENT.replace_all(html, "");
    let text = HEAD_BLOCK.replace_all(&text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    SCRIPT_BLOCK.replace_all(&text, "").into_owned()
}

/// Decode named and numeric character references. Unknown names are kept.
///
/// Non-breaking spaces become plain spaces.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).replace('\u{a0}', " ")
}

/// `true` if selectors, braces and declarations dominate the tokens.
fn is_css_only(text: &str) -> bool {
    if !text.contains('{') {
        return false;
    }
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }
    let css = tokens.iter().filter(|t| is_css_token(t)).count();
    css * 2 >= tokens.len()
}

fn is_css_token(token: &str) -> bool {
    if token.contains(['{', '}', ';']) || token.ends_with(':') {
        return true;
    }
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('.' | '#' | '@'), Some(c)) if c.is_ascii_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_basic() {
        let text = html_to_text("<p>Hello <b>world</b></p><p>Second paragraph</p>");
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
    }

    #[test]
    fn test_html_to_text_removes_scripts_and_styles() {
        let html = "<style>.x { color: red; }</style>Before<script>alert('x')</script>After";
        assert_eq!(html_to_text(html), "BeforeAfter");
    }

    #[test]
    fn test_html_to_text_lists() {
        let text = html_to_text("<ul><li>One</li><li>Two</li></ul>");
        assert!(text.contains("- One"));
        assert!(text.contains("- Two"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry &lt;3&gt;"), "Tom & Jerry <3>");
        assert_eq!(decode_entities("&#39;quoted&#x27;"), "'quoted'");
        assert_eq!(decode_entities("&bogus; stays"), "&bogus; stays");
        assert_eq!(
            decode_entities("caf&eacute; &uuml;ber &ntilde; &laquo;ok&raquo;"),
            "café über ñ «ok»"
        );
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
    }

    #[test]
    fn test_html_to_text_keeps_escaped_tags_as_text() {
        let text = html_to_text("<p>Use the &lt;table&gt; element for the caf&eacute; menu.</p>");
        assert_eq!(text, "Use the <table> element for the café menu.");
        assert_eq!(strip_markup(&text), text);
    }

    #[test]
    fn test_lone_decoded_tag_is_not_markup() {
        let once = strip_markup("Wrap the title in &lt;b&gt; tags please.");
        assert_eq!(once, "Wrap the title in <b> tags please.");
        assert_eq!(strip_markup(&once), once);
    }

    #[test]
    fn test_break_and_attribute_tags_are_markup() {
        assert_eq!(strip_markup("one<br>two"), "one\ntwo");
        assert_eq!(
            strip_markup(r#"See <a href="https://example.com">the doc</a> today"#),
            "See the doc today"
        );
    }

    #[test]
    fn test_strip_markup_leaves_prose() {
        let prose = "See you at 5 <- not a tag, and mail me at <me@example.com>.";
        assert_eq!(strip_markup(prose), prose);
    }

    #[test]
    fn test_strip_markup_removes_inline_tags() {
        assert_eq!(
            strip_markup("Sounds <b>great</b>, thanks &amp; see you"),
            "Sounds great, thanks & see you"
        );
    }

    #[test]
    fn test_css_only_body_becomes_empty() {
        let css = ".header { color: #333; }\n#main { margin: 0; padding: 4px; }";
        assert_eq!(strip_markup(css), "");
    }

    #[test]
    fn test_prose_with_braces_is_kept() {
        let text = "The set {a, b} is small but the rest of this sentence is plain words.";
        assert_eq!(strip_markup(text), text);
    }
}
