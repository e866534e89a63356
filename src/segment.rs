/// Literal in-text token forcing a page boundary. Case-sensitive; no
/// surrounding whitespace is required or consumed.
pub const PAGE_BREAK_TAG: &str = "@pb@";

/// Text span between two page-break tags (or document start/end). Produced
/// once per build; the tag itself never survives into a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
}

/// Splits decoded text on every `@pb@` occurrence. N tags yield N+1
/// segments; zero-length spans between adjacent tags are kept, so a blank
/// authored page still becomes a page.
pub fn split_segments(text: &str) -> Vec<Segment> {
    text.split(PAGE_BREAK_TAG)
        .map(|part| Segment {
            text: part.to_string(),
        })
        .collect()
}
