//! Ratio policy: vertical gaps measured as a fraction of page height.
//!
//! Used for providers that return geometry only. The bottom edges of
//! consecutive fragments are compared; the larger the jump relative to
//! the page, the heavier the break. Fragments that stay on the same line
//! get extra spaces proportional to the horizontal gap between them.

use super::geometry::{self, Anchors};
use super::{LayoutDefect, LayoutStrategy, Page};

/// Vertical jump (fraction of page height) above which a paragraph break is emitted.
pub const PARAGRAPH_RATIO: f64 = 0.15;
/// Vertical jump above which a section break is emitted.
pub const SECTION_RATIO: f64 = 0.06;
/// Vertical jump above which a plain line break is emitted.
pub const LINE_RATIO: f64 = 0.03;

/// Horizontal gaps in pixels, widest first.
pub const WIDE_GAP_PX: f64 = 60.0;
pub const MEDIUM_GAP_PX: f64 = 35.0;
pub const NARROW_GAP_PX: f64 = 15.0;

/// Stateless; see module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioPolicy;

impl LayoutStrategy for RatioPolicy {
    fn name(&self) -> &'static str {
        "ratio"
    }

    fn render_page(&self, page: &Page, defects: &mut Vec<LayoutDefect>) -> String {
        let height = page.effective_height();
        let mut out = String::new();
        let mut previous: Option<Anchors> = None;
        // Cleared whenever a break starts a new line.
        let mut previous_right_x: Option<f64> = None;

        for (index, fragment) in page.fragments.iter().enumerate() {
            let anchors = geometry::resolve(
                &fragment.bounding_box,
                previous.as_ref(),
                page.number,
                index,
                defects,
            );

            if let Some(prev) = &previous {
                let ratio = (anchors.bottom_y - prev.bottom_y).abs() / height;
                if let Some(separator) = vertical_break(ratio) {
                    out.push_str(separator);
                    previous_right_x = None;
                }
            }

            if let Some(right_x) = previous_right_x {
                out.push_str(horizontal_padding(anchors.left_x - right_x));
            }

            out.push_str(&fragment.text);
            out.push(' ');

            previous_right_x = Some(anchors.right_x);
            previous = Some(anchors);
        }

        out
    }
}

/// Separator for a vertical jump, or `None` when both fragments share a line.
pub fn vertical_break(ratio: f64) -> Option<&'static str> {
    if ratio > PARAGRAPH_RATIO {
        Some("\n\n\n")
    } else if ratio > SECTION_RATIO {
        Some("\n\n")
    } else if ratio > LINE_RATIO {
        Some("\n")
    } else {
        None
    }
}

/// Extra spaces inserted before a fragment on the same line.
pub fn horizontal_padding(gap: f64) -> &'static str {
    if gap > WIDE_GAP_PX {
        "    "
    } else if gap > MEDIUM_GAP_PX {
        "  "
    } else if gap > NARROW_GAP_PX {
        " "
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BoundingBox, Fragment, Vertex};

    fn word(text: &str, left: f64, top: f64, right: f64, bottom: f64) -> Fragment {
        Fragment::new(text, BoundingBox::rect(left, top, right, bottom))
    }

    fn render(height: f64, fragments: Vec<Fragment>) -> String {
        let page = Page::new(1, height, fragments);
        let mut defects = Vec::new();
        RatioPolicy.render_page(&page, &mut defects).trim().to_string()
    }

    #[test]
    fn large_vertical_jump_is_paragraph_break() {
        // 200px on a 1000px page = 0.2 > 0.15
        let text = render(
            1000.0,
            vec![
                word("Title", 10.0, 10.0, 80.0, 40.0),
                word("Body", 10.0, 210.0, 80.0, 240.0),
            ],
        );
        assert_eq!(text, "Title \n\n\nBody");
    }

    #[test]
    fn vertical_thresholds_are_exclusive_lower_bounds() {
        assert_eq!(vertical_break(0.03), None);
        assert_eq!(vertical_break(0.031), Some("\n"));
        assert_eq!(vertical_break(0.06), Some("\n"));
        assert_eq!(vertical_break(0.061), Some("\n\n"));
        assert_eq!(vertical_break(0.15), Some("\n\n"));
        assert_eq!(vertical_break(0.151), Some("\n\n\n"));
    }

    #[test]
    fn horizontal_thresholds() {
        assert_eq!(horizontal_padding(-20.0), "");
        assert_eq!(horizontal_padding(15.0), "");
        assert_eq!(horizontal_padding(16.0), " ");
        assert_eq!(horizontal_padding(35.0), " ");
        assert_eq!(horizontal_padding(40.0), "  ");
        assert_eq!(horizontal_padding(60.0), "  ");
        assert_eq!(horizontal_padding(61.0), "    ");
    }

    #[test]
    fn forty_pixel_gap_inserts_two_spaces_after_token_space() {
        let text = render(
            1000.0,
            vec![
                word("Name", 10.0, 10.0, 60.0, 30.0),
                word("Kim", 100.0, 10.0, 140.0, 30.0),
            ],
        );
        // token separator + two padding spaces
        assert_eq!(text, "Name   Kim");
    }

    #[test]
    fn tight_gap_keeps_single_token_space() {
        let text = render(
            1000.0,
            vec![
                word("Hello", 10.0, 10.0, 60.0, 30.0),
                word("world", 65.0, 10.0, 110.0, 30.0),
            ],
        );
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn line_break_resets_horizontal_padding() {
        // Second fragment drops by 50px on a 1000px page (0.05 → single newline).
        // Its left edge is far right of the first fragment's right edge, but
        // padding is not applied across a break.
        let text = render(
            1000.0,
            vec![
                word("one", 10.0, 10.0, 40.0, 30.0),
                word("two", 500.0, 60.0, 540.0, 80.0),
            ],
        );
        assert_eq!(text, "one \ntwo");
    }

    #[test]
    fn section_break_for_medium_jump() {
        let text = render(
            1000.0,
            vec![
                word("a", 10.0, 10.0, 20.0, 30.0),
                word("b", 10.0, 90.0, 20.0, 110.0),
            ],
        );
        assert_eq!(text, "a \n\nb");
    }

    #[test]
    fn upward_jump_also_breaks() {
        let text = render(
            1000.0,
            vec![
                word("low", 10.0, 500.0, 40.0, 520.0),
                word("high", 10.0, 100.0, 40.0, 120.0),
            ],
        );
        assert_eq!(text, "low \n\n\nhigh");
    }

    #[test]
    fn empty_text_still_moves_tracking() {
        let text = render(
            1000.0,
            vec![
                word("left", 10.0, 10.0, 50.0, 30.0),
                word("", 300.0, 10.0, 400.0, 30.0),
                word("right", 405.0, 10.0, 450.0, 30.0),
            ],
        );
        // "left " + 4 pad + "" + " " + "right "; the empty fragment's right
        // edge at 400 makes the final gap 5px.
        assert_eq!(text, "left      right");
    }

    #[test]
    fn malformed_box_uses_previous_coordinates() {
        let page = Page::new(
            1,
            1000.0,
            vec![
                word("first", 10.0, 10.0, 60.0, 30.0),
                Fragment::new(
                    "second",
                    BoundingBox {
                        vertices: vec![Vertex::new(70.0, 10.0)],
                    },
                ),
            ],
        );
        let mut defects = Vec::new();
        let text = RatioPolicy.render_page(&page, &mut defects);
        assert_eq!(text.trim(), "first second");
        assert_eq!(defects.len(), 2);
    }

    #[test]
    fn zero_height_page_does_not_divide_by_zero() {
        let text = render(
            0.0,
            vec![
                word("a", 10.0, 10.0, 20.0, 30.0),
                word("b", 30.0, 10.0, 40.0, 30.0),
            ],
        );
        assert_eq!(text, "a b");
    }
}
