//! OCR accuracy scoring.
//!
//! Compares a reference text against a candidate by character-level edit
//! distance and reports similarity as a percentage.

use serde::Serialize;

/// Similarity of `candidate` to `reference` in percent, clamped to `[0, 100]`.
///
/// `(1 - levenshtein / max_len) * 100`, where lengths count Unicode scalar
/// values. Two empty strings score 100.
pub fn score(reference: &str, candidate: &str) -> f64 {
    let max_len = reference.chars().count().max(candidate.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = strsim::levenshtein(reference, candidate);
    ((1.0 - distance as f64 / max_len as f64) * 100.0).clamp(0.0, 100.0)
}

/// Accuracy of a stored upload: original OCR output versus the revised text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub accuracy: f64,
    pub original_text: String,
    pub revised_text: String,
}

impl AccuracyReport {
    pub fn compare(original_text: String, revised_text: String) -> Self {
        Self {
            accuracy: score(&original_text, &revised_text),
            original_text,
            revised_text,
        }
    }
}
