//! Markup stripping for speech input
//!
//! Responses are written for a chat surface and may carry structural
//! markup. The speech model would vocalize those tokens ("asterisk
//! asterisk"), so everything structural is removed before synthesis:
//! headings, emphasis markers, link syntax (keeping the link text), block
//! quotes, list markers, code fences and decorative bullets.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*```[^\n]*$").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").unwrap());
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*>\s?").unwrap());
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*+]|\d+[.)])\s+").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,3}([^*]+)\*{1,3}").unwrap());
static UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{1,3}([^_]+)_{1,3}").unwrap());
static BULLET_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[•◦▪‣·*_~#]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip structural markup and decorative symbols from text bound for the
/// speech model. Returns an empty string when nothing speakable remains.
pub fn strip_markup(text: &str) -> String {
    let text = CODE_FENCE.replace_all(text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    // Images before links: the image syntax embeds the link syntax.
    let text = IMAGE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = UNDERSCORE.replace_all(&text, "$1");
    // Whatever emphasis/bullet characters survived the paired forms.
    let text = BULLET_SYMBOL.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_and_link() {
        assert_eq!(strip_markup("**Hello** [world](http://x)"), "Hello world");
    }

    #[test]
    fn test_heading_and_list() {
        let text = "## Dosage\n- 500 mg every 4 hours\n- Max 4 g daily";
        assert_eq!(
            strip_markup(text),
            "Dosage 500 mg every 4 hours Max 4 g daily"
        );
    }

    #[test]
    fn test_blockquote_and_emphasis() {
        let text = "> _Always_ read the label";
        assert_eq!(strip_markup(text), "Always read the label");
    }

    #[test]
    fn test_code_fence_removed() {
        let text = "Take as directed\n```\ndose = 500\n```\ntwice daily";
        assert_eq!(strip_markup(text), "Take as directed dose = 500 twice daily");
    }

    #[test]
    fn test_image_keeps_alt_text() {
        assert_eq!(strip_markup("![pill diagram](http://x/p.png)"), "pill diagram");
    }

    #[test]
    fn test_numbered_list() {
        let text = "1. First\n2) Second";
        assert_eq!(strip_markup(text), "First Second");
    }

    #[test]
    fn test_decorative_bullets() {
        assert_eq!(strip_markup("• one • two"), "one two");
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(strip_markup(""), "");
        assert_eq!(strip_markup("   \n\t  "), "");
        assert_eq!(strip_markup("** ** __ #"), "");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(
            strip_markup("Paracetamol relieves pain and fever."),
            "Paracetamol relieves pain and fever."
        );
    }
}
