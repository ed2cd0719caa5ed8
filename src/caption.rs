//! Caption resolution for extracted images.
//!
//! An image's label is the first candidate text that parses as a caption,
//! taken in this order:
//!
//! 1. the text of the image's own paragraph,
//! 2. the next `window` timeline entries (text entries only),
//! 3. the previous `window` timeline entries, farthest first,
//! 4. the synthetic fallback `"Image {sequence}"`.
//!
//! [`candidates`] produces that order explicitly so it can be inspected on its
//! own; [`resolve_label`] takes the first candidate that [`parse_label`] accepts.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static REPEATED_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid regex"));

static NUMBERED: LazyLock<[(&str, Regex); 2]> = LazyLock::new(|| {
    [
        ("Image", numbered_pattern("Image")),
        ("Figure", numbered_pattern("Figure")),
    ]
});

/// Trailing nouns that mark a free-text line as a caption.
const DESCRIPTIVE_NOUNS: [&str; 8] = [
    "example", "sheet", "form", "format", "setup", "process", "workflow", "template",
];

static DESCRIPTIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DESCRIPTIVE_NOUNS
        .iter()
        .map(|noun| {
            Regex::new(&format!(r"(?i)([^.]+\s+{}\s*[^.]*)", noun)).expect("valid regex")
        })
        .collect()
});

fn numbered_pattern(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)^{}\s+([0-9]+)\s*[:.]?\s*(.*?)(?:\.|$)", word)).expect("valid regex")
}

/// Descriptive captions must be longer than this many characters...
const MIN_DESCRIPTION_CHARS: usize = 5;
/// ...and shorter than this many.
const MAX_DESCRIPTION_CHARS: usize = 80;

/// Normalize text before caption matching: NFKC, collapsed whitespace,
/// ASCII dashes and quotes, and runs of periods reduced to one.
pub fn normalize(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    let collapsed = WHITESPACE.replace_all(&composed, " ");
    let ascii = collapsed
        .trim()
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    REPEATED_DOTS.replace_all(&ascii, ".").into_owned()
}

/// Parse a caption out of `text`, or `None` if it does not look like one.
pub fn parse_label(text: &str) -> Option<String> {
    let text = normalize(text);

    for (word, re) in NUMBERED.iter() {
        if let Some(caps) = re.captures(&text) {
            let digits = caps[1].trim_start_matches('0');
            let number = if digits.is_empty() { "0" } else { digits };
            let desc = caps[2].trim().trim_end_matches('.');
            return Some(if desc.is_empty() {
                format!("{} {}", word, number)
            } else {
                format!("{} {}: {}", word, number, desc)
            });
        }
    }

    DESCRIPTIVE.iter().find_map(|re| {
        let desc = re.captures(&text)?.get(1)?.as_str().trim();
        let len = desc.chars().count();
        (len > MIN_DESCRIPTION_CHARS && len < MAX_DESCRIPTION_CHARS).then(|| desc.to_string())
    })
}

/// One entry of the image/text timeline used for caption lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbor<'a> {
    Text(&'a str),
    Image,
}

/// Candidate caption texts for the image at `index`, in priority order.
///
/// Image entries inside the window consume a slot but yield no candidate.
pub fn candidates<'a>(
    own_text: &'a str,
    timeline: &'a [Neighbor<'a>],
    index: usize,
    window: usize,
) -> impl Iterator<Item = &'a str> + 'a {
    let end = timeline.len().min(index.saturating_add(window).saturating_add(1));
    let forward = timeline.get(index + 1..end).unwrap_or(&[]);
    let backward = timeline
        .get(index.saturating_sub(window)..index.min(timeline.len()))
        .unwrap_or(&[]);

    let own = (!own_text.is_empty()).then_some(own_text);
    own.into_iter().chain(
        forward
            .iter()
            .chain(backward.iter())
            .filter_map(|n| match n {
                Neighbor::Text(t) => Some(*t),
                Neighbor::Image => None,
            }),
    )
}

/// Resolve the label of the image at `index`. Never fails.
pub fn resolve_label(
    own_text: &str,
    timeline: &[Neighbor<'_>],
    index: usize,
    window: usize,
    sequence: u32,
) -> String {
    candidates(own_text, timeline, index, window)
        .find_map(parse_label)
        .unwrap_or_else(|| format!("Image {}", sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("  \u{201C}Order\u{201D}\u{2014}form\u{2026}  done.. "),
            "\"Order\"-form. done."
        );
        assert_eq!(normalize("Ａ\tB\n\nC"), "A B C");
    }

    #[test]
    fn test_parse_numbered_image_caption() {
        assert_eq!(
            parse_label("Image 3: Monthly Order Form.").as_deref(),
            Some("Image 3: Monthly Order Form")
        );
        assert_eq!(parse_label("image 07").as_deref(), Some("Image 7"));
        assert_eq!(
            parse_label("IMAGE 2. Battery invoice. More text").as_deref(),
            Some("Image 2: Battery invoice")
        );
    }

    #[test]
    fn test_parse_figure_caption() {
        assert_eq!(
            parse_label("Figure 12 Delivery schedule").as_deref(),
            Some("Figure 12: Delivery schedule")
        );
    }

    #[test]
    fn test_parse_descriptive_caption() {
        assert_eq!(
            parse_label("Completed order form for Ohio").as_deref(),
            Some("Completed order form for Ohio")
        );
        assert_eq!(parse_label("Nothing to see here"), None);
        assert_eq!(parse_label("form"), None);
    }

    #[test]
    fn test_descriptive_caption_length_limit() {
        let long = format!("{} example", "word ".repeat(20));
        assert_eq!(parse_label(&long), None);
    }

    #[test]
    fn test_candidate_order() {
        let timeline = [
            Neighbor::Text("b1"),
            Neighbor::Text("b2"),
            Neighbor::Image,
            Neighbor::Text("f1"),
            Neighbor::Image,
            Neighbor::Text("f3"),
            Neighbor::Text("f4"),
        ];
        let got: Vec<&str> = candidates("own", &timeline, 2, 3).collect();
        assert_eq!(got, vec!["own", "f1", "f3", "b1", "b2"]);
    }

    #[test]
    fn test_candidate_window_at_edges() {
        let timeline = [Neighbor::Image];
        assert_eq!(candidates("", &timeline, 0, 3).count(), 0);
    }

    #[test]
    fn test_candidate_index_past_timeline_end() {
        let timeline = [Neighbor::Text("Image 1: Early")];
        assert_eq!(candidates("", &timeline, 10, 3).count(), 0);
        assert_eq!(
            candidates("Own text", &timeline, 10, 3).collect::<Vec<_>>(),
            vec!["Own text"]
        );
    }

    #[test]
    fn test_resolve_prefers_own_then_forward_then_backward() {
        let timeline = [
            Neighbor::Text("Image 1: Before"),
            Neighbor::Image,
            Neighbor::Text("Image 2: After"),
        ];
        assert_eq!(
            resolve_label("Figure 9: Own", &timeline, 1, 3, 5),
            "Figure 9: Own"
        );
        assert_eq!(resolve_label("", &timeline, 1, 3, 5), "Image 2: After");
        assert_eq!(
            resolve_label("", &timeline[..2], 1, 3, 5),
            "Image 1: Before"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_sequence() {
        let timeline = [Neighbor::Text("plain words"), Neighbor::Image];
        assert_eq!(resolve_label("", &timeline, 1, 3, 4), "Image 4");
    }
}
