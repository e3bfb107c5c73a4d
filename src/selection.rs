//! Selection model for the reader.
//!
//! The terminal has no native selection object, so this module provides one:
//! the page is laid out into a line grid, a mouse drag is resolved against
//! that grid into selected text plus its bounding rectangle, and the
//! positioning math anchors the floating icon and info card to it while
//! keeping both inside the viewport.
//!
//! All coordinates here are document coordinates (line index from the top of
//! the laid-out page); the UI translates through its scroll offset.

use crate::page::Page;

/// A cell position within the laid-out document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPos {
    /// Column
    pub x: u16,
    /// Line index from the top of the document
    pub y: u16,
}

/// Bounding rectangle of a selection, in document cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl SelectionRect {
    /// Column of the selection's horizontal center
    pub fn center_x(&self) -> u16 {
        self.x + self.width / 2
    }

    /// First line below the selection
    pub fn bottom(&self) -> u16 {
        self.y + self.height
    }
}

/// User-highlighted text with its rectangle and surrounding context.
///
/// Ephemeral: recomputed on every drag and discarded on deselection or when
/// the card closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    pub rect: SelectionRect,
    /// Full text of the paragraph the selection starts in, used to
    /// disambiguate the term during analysis
    pub context: String,
}

/// One rendered line of the laid-out page
#[derive(Debug, Clone)]
struct LayoutLine {
    text: String,
    /// Index into the page's paragraphs; None for blank separator lines
    paragraph: Option<usize>,
}

/// The page wrapped to a fixed width, forming the grid that the pager
/// renders and selections are resolved against.
#[derive(Debug, Clone)]
pub struct PageLayout {
    lines: Vec<LayoutLine>,
    width: u16,
}

impl PageLayout {
    /// Wrap the page's paragraphs to the given width. Paragraphs are
    /// separated by a single blank line.
    pub fn build(page: &Page, width: u16) -> Self {
        let width = width.max(1);
        let mut lines = Vec::new();

        for (idx, paragraph) in page.paragraphs.iter().enumerate() {
            if idx > 0 {
                lines.push(LayoutLine {
                    text: String::new(),
                    paragraph: None,
                });
            }
            for wrapped in wrap_words(paragraph, width as usize) {
                lines.push(LayoutLine {
                    text: wrapped,
                    paragraph: Some(idx),
                });
            }
        }

        Self { lines, width }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    /// Total number of laid-out lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of a single line, empty for separators and out-of-range rows
    pub fn line(&self, y: usize) -> &str {
        self.lines.get(y).map(|l| l.text.as_str()).unwrap_or("")
    }

    /// Resolve a finished drag into a selection.
    ///
    /// The anchor and head may be in either order. Returns None when the
    /// span contains no non-whitespace text.
    pub fn resolve(&self, page: &Page, anchor: CellPos, head: CellPos) -> Option<Selection> {
        if self.lines.is_empty() {
            return None;
        }

        let (start, end) = order_positions(anchor, head);
        let last_line = (self.lines.len() - 1) as u16;
        let start = clamp_pos(start, last_line);
        let end = clamp_pos(end, last_line);

        let text = self.extract_text(start, end)?;
        let rect = self.bounding_rect(start, end);
        let context = self.context_for(page, start);

        Some(Selection {
            text,
            rect,
            context,
        })
    }

    /// Extract the selected text, joining wrapped lines with spaces
    fn extract_text(&self, start: CellPos, end: CellPos) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();

        for y in start.y..=end.y {
            let line = self.line(y as usize);
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                continue;
            }

            let from = if y == start.y { start.x as usize } else { 0 };
            // The end cell is included, matching terminal selection feel
            let to = if y == end.y {
                (end.x as usize + 1).min(chars.len())
            } else {
                chars.len()
            };

            if from >= to {
                continue;
            }
            parts.push(&line[char_to_byte(line, from)..char_to_byte(line, to)]);
        }

        let text = parts.join(" ").trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Bounding rectangle of the span between two ordered positions
    fn bounding_rect(&self, start: CellPos, end: CellPos) -> SelectionRect {
        if start.y == end.y {
            let line_len = self.line(start.y as usize).chars().count() as u16;
            let x = start.x.min(line_len.saturating_sub(1));
            let right = end.x.min(line_len.saturating_sub(1));
            SelectionRect {
                x,
                y: start.y,
                width: right.saturating_sub(x) + 1,
                height: 1,
            }
        } else {
            SelectionRect {
                x: 0,
                y: start.y,
                width: self.width,
                height: end.y - start.y + 1,
            }
        }
    }

    /// Paragraph text surrounding the start of the selection
    fn context_for(&self, page: &Page, start: CellPos) -> String {
        self.lines
            .get(start.y as usize)
            .and_then(|l| l.paragraph)
            .and_then(|idx| page.paragraphs.get(idx))
            .cloned()
            .unwrap_or_default()
    }
}

/// Where the floating icon goes: centered below the selection, clamped to
/// the viewport.
pub fn icon_position(rect: &SelectionRect, view_width: u16, view_height: u16) -> (u16, u16) {
    let x = rect.center_x().min(view_width.saturating_sub(1));
    let y = rect.bottom().min(view_height.saturating_sub(1));
    (x, y)
}

/// Where the info card goes: horizontally centered on the selection and
/// clamped to the viewport; below the selection, or above when there is no
/// room below.
pub fn card_position(
    rect: &SelectionRect,
    view_width: u16,
    view_height: u16,
    card_width: u16,
    card_height: u16,
    margin: u16,
) -> (u16, u16) {
    let vw = view_width as i32;
    let vh = view_height as i32;
    let cw = card_width as i32;
    let ch = card_height as i32;
    let m = margin as i32;

    // Keep within viewport horizontally
    let centered = rect.center_x() as i32 - cw / 2;
    let x = centered.max(m).min(vw - cw - m).max(0);

    // Below the selection if it fits, otherwise above
    let below = rect.bottom() as i32 + 1;
    let y = if below + ch <= vh {
        below
    } else {
        (rect.y as i32 - ch).max(0)
    };

    (x as u16, y as u16)
}

fn order_positions(a: CellPos, b: CellPos) -> (CellPos, CellPos) {
    if (a.y, a.x) <= (b.y, b.x) {
        (a, b)
    } else {
        (b, a)
    }
}

fn clamp_pos(pos: CellPos, last_line: u16) -> CellPos {
    CellPos {
        x: pos.x,
        y: pos.y.min(last_line),
    }
}

/// Byte offset of the nth char, saturating at the end of the string
fn char_to_byte(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Greedy word wrap. Words longer than the width are hard-broken.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if current.is_empty() {
            current.push_str(word);
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }

        // Hard-break words wider than the line
        while current.chars().count() > width {
            let split = char_to_byte(&current, width);
            let rest = current.split_off(split);
            lines.push(std::mem::replace(&mut current, rest));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    fn test_page() -> Page {
        Page {
            title: "Test".to_string(),
            source: "demo".to_string(),
            paragraphs: vec![
                "alpha beta gamma delta".to_string(),
                "second paragraph with more words than the first one".to_string(),
            ],
        }
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let lines = wrap_words("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn hard_breaks_overlong_words() {
        let lines = wrap_words("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn layout_separates_paragraphs_with_blank_line() {
        let layout = PageLayout::build(&test_page(), 30);
        let blank = (0..layout.line_count())
            .filter(|&y| layout.line(y).is_empty())
            .count();
        assert_eq!(blank, 1);
    }

    #[test]
    fn single_line_selection_extracts_exact_span() {
        let page = test_page();
        let layout = PageLayout::build(&page, 40);
        // Line 0 is "alpha beta gamma delta"
        let sel = layout
            .resolve(&page, CellPos { x: 6, y: 0 }, CellPos { x: 9, y: 0 })
            .unwrap();
        assert_eq!(sel.text, "beta");
        assert_eq!(
            sel.rect,
            SelectionRect {
                x: 6,
                y: 0,
                width: 4,
                height: 1
            }
        );
        assert_eq!(sel.context, "alpha beta gamma delta");
    }

    #[test]
    fn reversed_drag_selects_same_text() {
        let page = test_page();
        let layout = PageLayout::build(&page, 40);
        let forward = layout.resolve(&page, CellPos { x: 6, y: 0 }, CellPos { x: 9, y: 0 });
        let backward = layout.resolve(&page, CellPos { x: 9, y: 0 }, CellPos { x: 6, y: 0 });
        assert_eq!(forward, backward);
    }

    #[test]
    fn multi_line_selection_joins_wrapped_lines() {
        let page = test_page();
        let layout = PageLayout::build(&page, 11);
        // Lines: "alpha beta" / "gamma delta"
        let sel = layout
            .resolve(&page, CellPos { x: 6, y: 0 }, CellPos { x: 4, y: 1 })
            .unwrap();
        assert_eq!(sel.text, "beta gamma");
        assert_eq!(sel.rect.height, 2);
        assert_eq!(sel.rect.x, 0);
        assert_eq!(sel.rect.width, 11);
    }

    #[test]
    fn whitespace_only_span_yields_no_selection() {
        let page = test_page();
        let layout = PageLayout::build(&page, 40);
        // Line 1 is the blank separator
        let sel = layout.resolve(&page, CellPos { x: 0, y: 1 }, CellPos { x: 5, y: 1 });
        assert!(sel.is_none());
    }

    #[test]
    fn selection_past_line_end_is_clamped() {
        let page = test_page();
        let layout = PageLayout::build(&page, 40);
        let sel = layout
            .resolve(&page, CellPos { x: 17, y: 0 }, CellPos { x: 39, y: 0 })
            .unwrap();
        assert_eq!(sel.text, "delta");
    }

    #[test]
    fn icon_sits_below_selection_center() {
        let rect = SelectionRect {
            x: 10,
            y: 4,
            width: 6,
            height: 1,
        };
        assert_eq!(icon_position(&rect, 80, 24), (13, 5));
    }

    #[test]
    fn icon_is_clamped_to_viewport() {
        let rect = SelectionRect {
            x: 76,
            y: 23,
            width: 6,
            height: 1,
        };
        assert_eq!(icon_position(&rect, 80, 24), (79, 23));
    }

    #[test]
    fn card_stays_within_viewport_bounds() {
        let view = (80u16, 24u16);
        let card = (44u16, 12u16);

        // Selection near the left edge
        let rect = SelectionRect {
            x: 0,
            y: 2,
            width: 4,
            height: 1,
        };
        let (x, y) = card_position(&rect, view.0, view.1, card.0, card.1, 2);
        assert!(x >= 2);
        assert!(x + card.0 + 2 <= view.0);
        assert_eq!(y, 4);

        // Selection near the right edge
        let rect = SelectionRect {
            x: 74,
            y: 2,
            width: 5,
            height: 1,
        };
        let (x, _) = card_position(&rect, view.0, view.1, card.0, card.1, 2);
        assert!(x + card.0 + 2 <= view.0);
    }

    #[test]
    fn card_flips_above_when_no_room_below() {
        let rect = SelectionRect {
            x: 10,
            y: 20,
            width: 6,
            height: 1,
        };
        let (_, y) = card_position(&rect, 80, 24, 44, 12, 2);
        assert_eq!(y, 8);
        assert!(y + 12 <= 24);
    }
}
