/// One laid-out line of text with its measured pixel width. A line may
/// exceed the page's writable width only when wrapping is disabled or when
/// it holds a single unsplittable token.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualLine {
    pub text: String,
    pub width_px: f32,
}

/// Greedy word-boundary wrap of one segment's text.
///
/// Explicit newlines always start a new line. With wrapping enabled, tokens
/// accumulate onto the current line while the joined candidate still fits;
/// whitespace runs collapse to a single space when re-joining, for both
/// measurement and the later glyph pass. With wrapping disabled each source
/// line passes through verbatim.
pub fn wrap_segment<F>(
    text: &str,
    max_width_px: f32,
    measure: F,
    wrap_enabled: bool,
) -> Vec<VisualLine>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    for source_line in text.split('\n') {
        if !wrap_enabled {
            lines.push(VisualLine {
                width_px: measure(source_line),
                text: source_line.to_string(),
            });
            continue;
        }
        wrap_source_line(source_line, max_width_px, &measure, &mut lines);
    }
    lines
}

fn wrap_source_line<F>(source_line: &str, max_width_px: f32, measure: &F, out: &mut Vec<VisualLine>)
where
    F: Fn(&str) -> f32,
{
    let mut tokens = source_line.split_whitespace();
    let Some(first) = tokens.next() else {
        // Blank or whitespace-only source line stays a (empty) line.
        out.push(VisualLine {
            text: String::new(),
            width_px: 0.0,
        });
        return;
    };

    let mut current = first.to_string();
    let mut current_width = measure(&current);
    for token in tokens {
        let candidate = format!("{current} {token}");
        let candidate_width = measure(&candidate);
        if candidate_width <= max_width_px {
            current = candidate;
            current_width = candidate_width;
        } else {
            out.push(VisualLine {
                text: std::mem::take(&mut current),
                width_px: current_width,
            });
            current = token.to_string();
            current_width = measure(&current);
        }
    }
    out.push(VisualLine {
        text: current,
        width_px: current_width,
    });
}
