use crate::error::DocPressError;
use crate::wrap::VisualLine;

/// Ordered group of visual lines that fits one rendered page. Pages are
/// numbered globally across the whole document in segment order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub lines: Vec<VisualLine>,
}

/// Lines per page for the given geometry. Fails when the insets or the line
/// height leave no room for even a single line; this is checked before any
/// rendering starts.
pub fn page_capacity(
    page_height_px: u32,
    line_height_px: u32,
    vertical_inset_px: u32,
) -> Result<usize, DocPressError> {
    let available = page_height_px as i64 - 2 * vertical_inset_px as i64;
    if available <= 0 {
        return Err(DocPressError::Layout(format!(
            "vertical inset {}px leaves no writable area on a {}px page",
            vertical_inset_px, page_height_px
        )));
    }
    let capacity = available as u64 / line_height_px.max(1) as u64;
    if capacity == 0 {
        return Err(DocPressError::Layout(format!(
            "line height {}px exceeds the {}px writable area",
            line_height_px, available
        )));
    }
    Ok(capacity as usize)
}

/// Sequential fill: each page takes `capacity` lines before the next opens.
/// A segment with no lines still yields one empty page, so every authored
/// page break stays visible in the output.
pub fn paginate(lines: Vec<VisualLine>, capacity: usize) -> Vec<Page> {
    if lines.is_empty() {
        return vec![Page { lines: Vec::new() }];
    }
    let mut pages = Vec::with_capacity(lines.len().div_ceil(capacity));
    let mut current = Vec::with_capacity(capacity.min(lines.len()));
    for line in lines {
        if current.len() == capacity {
            pages.push(Page {
                lines: std::mem::take(&mut current),
            });
        }
        current.push(line);
    }
    pages.push(Page { lines: current });
    pages
}
