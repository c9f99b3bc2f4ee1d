//! Explicit-break policy for providers that flag line endings.
//!
//! When a fragment is marked as ending a line, the next fragment always
//! starts fresh. Otherwise absolute pixel gaps decide: a large drop from
//! the previous bottom edge to the current top edge inserts a newline, and
//! a wide horizontal gap inserts a tab.

use super::geometry::{self, Anchors};
use super::{LayoutDefect, LayoutStrategy, Page};

/// Vertical distance (previous bottom to current top) that starts a new line.
pub const LINE_GAP_PX: f64 = 50.0;
/// Horizontal distance (previous right to current left) that inserts a tab.
pub const TAB_GAP_PX: f64 = 70.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitBreakPolicy;

impl LayoutStrategy for ExplicitBreakPolicy {
    fn name(&self) -> &'static str {
        "explicit-break"
    }

    fn render_page(&self, page: &Page, defects: &mut Vec<LayoutDefect>) -> String {
        let mut out = String::new();
        let mut previous: Option<Anchors> = None;
        let mut previous_ended_line = false;

        for (index, fragment) in page.fragments.iter().enumerate() {
            let anchors = geometry::resolve(
                &fragment.bounding_box,
                previous.as_ref(),
                page.number,
                index,
                defects,
            );

            if let Some(prev) = previous.as_ref().filter(|_| !previous_ended_line) {
                if anchors.top_y - prev.bottom_y > LINE_GAP_PX {
                    out.push('\n');
                }
                if anchors.left_x - prev.right_x > TAB_GAP_PX {
                    out.push('\t');
                }
            }

            if fragment.explicit_break == Some(true) {
                out.push_str(fragment.text.trim());
                out.push('\n');
                previous_ended_line = true;
            } else {
                out.push_str(&fragment.text);
                out.push(' ');
                previous_ended_line = false;
            }

            previous = Some(anchors);
        }

        out
    }
}
