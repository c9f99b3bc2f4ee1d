//! Persistence seam for uploads, derived records and image blobs.

mod file;

pub use file::FileStore;

use crate::error::StoreError;
use crate::llm::StructuredField;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Identifier of an upload record. Opaque hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(pub String);

/// Content address of a stored image blob (SHA-256 hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UploadId {
    fn from(s: &str) -> Self {
        UploadId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUpload {
    pub filename: String,
    pub ocr_text: String,
    pub image_ids: Vec<ImageId>,
}

/// A file as it came out of OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: UploadId,
    pub filename: String,
    pub ocr_text: String,
    pub image_ids: Vec<ImageId>,
    /// Unix milliseconds.
    pub uploaded_at: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDerived {
    pub upload_id: UploadId,
    /// Text the summary was computed from, possibly revised by the user.
    pub ocr_text: String,
    pub summary: String,
    pub fields: Vec<StructuredField>,
    pub embedding: Option<Vec<f32>>,
}

/// Summary, structured fields and embedding computed for an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    pub upload_id: UploadId,
    pub filename: String,
    pub ocr_text: String,
    pub summary: String,
    pub fields: Vec<StructuredField>,
    pub uploaded_at: u64,
    pub image_ids: Vec<ImageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Keyword search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub record: DerivedRecord,
    /// Which parts matched: "filename", "text", "summary", "fields".
    pub matched: Vec<&'static str>,
}

/// Semantic search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredHit {
    pub record: DerivedRecord,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

pub trait Store: Send + Sync {
    fn put_image(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> impl Future<Output = Result<ImageId, StoreError>> + Send;

    fn get_image(&self, id: &ImageId) -> impl Future<Output = Result<Vec<u8>, StoreError>> + Send;

    fn save_upload(
        &self,
        upload: NewUpload,
    ) -> impl Future<Output = Result<UploadRecord, StoreError>> + Send;

    fn get_upload(
        &self,
        id: &UploadId,
    ) -> impl Future<Output = Result<Option<UploadRecord>, StoreError>> + Send;

    /// Create or replace the derived record of an existing upload.
    fn save_derived(
        &self,
        derived: NewDerived,
    ) -> impl Future<Output = Result<DerivedRecord, StoreError>> + Send;

    fn get_derived(
        &self,
        id: &UploadId,
    ) -> impl Future<Output = Result<Option<DerivedRecord>, StoreError>> + Send;

    fn keyword_search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchHit>, StoreError>> + Send;

    fn semantic_search(
        &self,
        vector: &[f32],
        k: usize,
    ) -> impl Future<Output = Result<Vec<ScoredHit>, StoreError>> + Send;
}

/// Cosine similarity; 0 when either vector is zero or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
