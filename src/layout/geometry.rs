//! Anchor points extracted from a fragment's bounding polygon.
//!
//! Both layout policies only look at two corners: top-left (where a
//! fragment starts) and bottom-right (where it ends). Missing coordinates
//! are filled from the previous fragment, or zero for the first one, and
//! recorded as a `LayoutDefect`.

use super::{BoundingBox, LayoutDefect};

const TOP_LEFT: usize = 0;
const BOTTOM_RIGHT: usize = 2;

/// Coordinates the layout policies reason about.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anchors {
    /// Top-left x.
    pub left_x: f64,
    /// Top-left y.
    pub top_y: f64,
    /// Bottom-right x.
    pub right_x: f64,
    /// Bottom-right y.
    pub bottom_y: f64,
}

/// Resolve the anchors of fragment `index` on `page`.
pub fn resolve(
    bounding_box: &BoundingBox,
    previous: Option<&Anchors>,
    page: u32,
    index: usize,
    defects: &mut Vec<LayoutDefect>,
) -> Anchors {
    let fallback = previous.copied().unwrap_or_default();
    let top_left = bounding_box.vertices.get(TOP_LEFT);
    let bottom_right = bounding_box.vertices.get(BOTTOM_RIGHT);

    let mut pick = |value: Option<f64>, default: f64, missing: &'static str| -> f64 {
        match value {
            Some(v) if v.is_finite() => v,
            _ => {
                defects.push(LayoutDefect::MalformedFragment {
                    page,
                    index,
                    missing,
                });
                default
            }
        }
    };

    Anchors {
        left_x: pick(top_left.and_then(|v| v.x), fallback.left_x, "top-left x"),
        top_y: pick(top_left.and_then(|v| v.y), fallback.top_y, "top-left y"),
        right_x: pick(
            bottom_right.and_then(|v| v.x),
            fallback.right_x,
            "bottom-right x",
        ),
        bottom_y: pick(
            bottom_right.and_then(|v| v.y),
            fallback.bottom_y,
            "bottom-right y",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Vertex;

    #[test]
    fn well_formed_box_has_no_defects() {
        let mut defects = Vec::new();
        let anchors = resolve(
            &BoundingBox::rect(10.0, 20.0, 110.0, 45.0),
            None,
            1,
            0,
            &mut defects,
        );
        assert_eq!(
            anchors,
            Anchors {
                left_x: 10.0,
                top_y: 20.0,
                right_x: 110.0,
                bottom_y: 45.0
            }
        );
        assert!(defects.is_empty());
    }

    #[test]
    fn missing_corner_falls_back_to_previous() {
        let previous = Anchors {
            left_x: 1.0,
            top_y: 2.0,
            right_x: 3.0,
            bottom_y: 4.0,
        };
        let truncated = BoundingBox {
            vertices: vec![Vertex::new(50.0, 60.0)],
        };
        let mut defects = Vec::new();
        let anchors = resolve(&truncated, Some(&previous), 2, 7, &mut defects);

        assert_eq!(anchors.left_x, 50.0);
        assert_eq!(anchors.top_y, 60.0);
        assert_eq!(anchors.right_x, 3.0);
        assert_eq!(anchors.bottom_y, 4.0);
        assert_eq!(defects.len(), 2);
        assert_eq!(
            defects[0],
            LayoutDefect::MalformedFragment {
                page: 2,
                index: 7,
                missing: "bottom-right x"
            }
        );
    }

    #[test]
    fn first_fragment_defaults_to_zero() {
        let mut defects = Vec::new();
        let anchors = resolve(&BoundingBox::default(), None, 1, 0, &mut defects);
        assert_eq!(anchors, Anchors::default());
        assert_eq!(defects.len(), 4);
    }

    #[test]
    fn non_finite_coordinates_are_treated_as_missing() {
        let bbox = BoundingBox {
            vertices: vec![
                Vertex {
                    x: Some(f64::NAN),
                    y: Some(5.0),
                },
                Vertex::default(),
                Vertex::new(30.0, f64::INFINITY),
            ],
        };
        let mut defects = Vec::new();
        let anchors = resolve(&bbox, None, 1, 0, &mut defects);
        assert_eq!(anchors.left_x, 0.0);
        assert_eq!(anchors.top_y, 5.0);
        assert_eq!(anchors.right_x, 30.0);
        assert_eq!(anchors.bottom_y, 0.0);
        assert_eq!(defects.len(), 2);
    }
}
