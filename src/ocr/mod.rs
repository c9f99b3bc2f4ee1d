//! OCR domain: the recognition provider seam and its HTTP adapter.
//!
//! The pipeline only depends on `OcrProvider`. `ClovaOcr` talks to a
//! general-OCR HTTP endpoint; tests substitute in-process fakes.

mod clova;
pub mod types;

pub use clova::ClovaOcr;
pub use types::{ImageFormat, OcrField, OcrImage, OcrRequest, OcrResponse};

use crate::error::ProviderError;
use std::future::Future;

/// A text-recognition service.
pub trait OcrProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Recognize every page of `request`. Implementations validate the
    /// response before returning it.
    fn recognize(
        &self,
        request: &OcrRequest,
    ) -> impl Future<Output = Result<OcrResponse, ProviderError>> + Send;
}
