//! Layout reconstruction: turns positioned OCR fragments back into text.
//!
//! The OCR provider hands back fragments in reading order, each with a
//! bounding polygon. Nothing here reorders them; the reconstructor only
//! decides which separator (spaces, tab, line/paragraph breaks) goes
//! between consecutive fragments.
//!
//! Two policies exist because providers differ in what they report:
//!   - `ratio`: vertical gaps classified relative to page height
//!   - `explicit_break`: absolute pixel gaps plus provider line-break hints
//!
//! `LayoutPolicy::Auto` picks the explicit-break policy for any page whose
//! fragments carry break hints, and the ratio policy otherwise.

pub mod explicit_break;
pub mod geometry;
pub mod ratio;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use explicit_break::ExplicitBreakPolicy;
pub use ratio::RatioPolicy;

/// One corner of a bounding polygon. Either coordinate may be absent when
/// the upstream OCR result is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

/// Four corners in order: top-left, top-right, bottom-right, bottom-left.
/// Pixel coordinates, y grows downward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

impl BoundingBox {
    /// Axis-aligned box from its left/top/right/bottom edges.
    pub fn rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            vertices: vec![
                Vertex::new(left, top),
                Vertex::new(right, top),
                Vertex::new(right, bottom),
                Vertex::new(left, bottom),
            ],
        }
    }
}

/// A single recognized text unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub bounding_box: BoundingBox,
    /// `Some(true)` when the provider asserts this fragment ends a line.
    /// `None` when the provider does not report line breaks at all.
    pub explicit_break: Option<bool>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            explicit_break: None,
        }
    }

    pub fn with_break(mut self, explicit_break: bool) -> Self {
        self.explicit_break = Some(explicit_break);
        self
    }
}

/// Fragments recognized on one page image, in provider reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number in the source document.
    pub number: u32,
    /// Pixel height of the page image.
    pub height: f64,
    pub fragments: Vec<Fragment>,
}

impl Page {
    pub fn new(number: u32, height: f64, fragments: Vec<Fragment>) -> Self {
        Self {
            number,
            height,
            fragments,
        }
    }

    /// Height used to normalize vertical gaps. Never zero.
    pub fn effective_height(&self) -> f64 {
        if self.height.is_finite() && self.height > 0.0 {
            self.height
        } else {
            1.0
        }
    }

    /// True if any fragment on this page carries a provider line-break hint.
    pub fn has_break_hints(&self) -> bool {
        self.fragments.iter().any(|f| f.explicit_break.is_some())
    }
}

/// An ordered sequence of pages (one for a standalone image).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn single(page: Page) -> Self {
        Self { pages: vec![page] }
    }
}

/// A defect in upstream OCR geometry that reconstruction worked around.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutDefect {
    #[error("page {page}, fragment {index}: bounding box missing {missing}")]
    MalformedFragment {
        page: u32,
        index: usize,
        missing: &'static str,
    },
}

/// Renders one page into raw text.
///
/// The output is untrimmed: every fragment still carries its trailing
/// separator, so page renderings can be concatenated and trimmed once.
pub trait LayoutStrategy: Sync {
    fn name(&self) -> &'static str;

    fn render_page(&self, page: &Page, defects: &mut Vec<LayoutDefect>) -> String;
}

/// Which layout policy to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPolicy {
    /// Explicit-break policy when the page carries hints, ratio policy otherwise.
    #[default]
    Auto,
    Ratio,
    #[serde(rename = "explicit")]
    ExplicitBreak,
}

static RATIO: RatioPolicy = RatioPolicy;
static EXPLICIT_BREAK: ExplicitBreakPolicy = ExplicitBreakPolicy;

impl LayoutPolicy {
    /// Resolve the concrete strategy for a page.
    pub fn strategy_for(self, page: &Page) -> &'static dyn LayoutStrategy {
        match self {
            LayoutPolicy::Ratio => &RATIO,
            LayoutPolicy::ExplicitBreak => &EXPLICIT_BREAK,
            LayoutPolicy::Auto if page.has_break_hints() => &EXPLICIT_BREAK,
            LayoutPolicy::Auto => &RATIO,
        }
    }
}

impl fmt::Display for LayoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutPolicy::Auto => write!(f, "auto"),
            LayoutPolicy::Ratio => write!(f, "ratio"),
            LayoutPolicy::ExplicitBreak => write!(f, "explicit"),
        }
    }
}

impl FromStr for LayoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(LayoutPolicy::Auto),
            "ratio" => Ok(LayoutPolicy::Ratio),
            "explicit" | "explicit-break" | "explicit_break" => Ok(LayoutPolicy::ExplicitBreak),
            other => Err(format!(
                "Unknown layout policy '{}'. Use 'auto', 'ratio' or 'explicit'.",
                other
            )),
        }
    }
}

/// Options for a reconstruction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOptions {
    pub policy: LayoutPolicy,
    /// Prefix every page with an `=== Page N ===` header.
    pub page_markers: bool,
}

impl LayoutOptions {
    pub fn with_policy(policy: LayoutPolicy) -> Self {
        Self {
            policy,
            page_markers: false,
        }
    }

    pub fn page_markers(mut self, enabled: bool) -> Self {
        self.page_markers = enabled;
        self
    }
}

/// Raw rendering of a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub raw: String,
    pub defects: Vec<LayoutDefect>,
}

/// Result of a reconstruction, with every geometry defect that was patched.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub text: String,
    pub defects: Vec<LayoutDefect>,
}

/// Reconstruct a document into a single string.
///
/// Pure and deterministic: the same input always yields byte-identical output.
pub fn reconstruct(document: &Document, options: &LayoutOptions) -> String {
    reconstruct_with_report(document, options).text
}

/// Same as [`reconstruct`], but also reports the malformed fragments that
/// were defaulted along the way.
pub fn reconstruct_with_report(document: &Document, options: &LayoutOptions) -> Reconstruction {
    let pages: Vec<PageText> = document
        .pages
        .iter()
        .map(|page| render_page(page, options.policy))
        .collect();
    assemble(pages, options.page_markers)
}

/// Reconstruct pages on the rayon pool. Output is identical to
/// [`reconstruct_with_report`]; pages are joined in document order.
pub fn reconstruct_parallel(document: &Document, options: &LayoutOptions) -> Reconstruction {
    let policy = options.policy;
    let pages: Vec<PageText> = document
        .pages
        .par_iter()
        .map(|page| render_page(page, policy))
        .collect();
    assemble(pages, options.page_markers)
}

/// Render one page with the strategy the policy selects for it.
pub fn render_page(page: &Page, policy: LayoutPolicy) -> PageText {
    let strategy = policy.strategy_for(page);
    let mut defects = Vec::new();
    let raw = strategy.render_page(page, &mut defects);
    log::debug!(
        "[LAYOUT] page {}: {} fragments via {} policy",
        page.number,
        page.fragments.len(),
        strategy.name()
    );
    PageText {
        number: page.number,
        raw,
        defects,
    }
}

/// Join rendered pages in order and trim the result.
pub fn assemble(pages: Vec<PageText>, page_markers: bool) -> Reconstruction {
    let mut text = String::new();
    let mut defects = Vec::new();

    for page in pages {
        if page_markers {
            text.push_str(&format!("=== Page {} ===\n\n", page.number));
            text.push_str(page.raw.trim());
            text.push_str("\n\n\n");
        } else {
            text.push_str(&page.raw);
        }
        defects.extend(page.defects);
    }

    for defect in &defects {
        log::warn!("[LAYOUT] {}", defect);
    }

    Reconstruction {
        text: text.trim().to_string(),
        defects,
    }
}
