//! Request/response shapes for general-OCR providers.
//!
//! Field names follow the provider's camelCase JSON so a saved response can
//! be deserialized directly (`paperlens reconstruct`, `ocr-bench`).

use crate::error::ProviderError;
use crate::layout::{BoundingBox, Document, Fragment, Page, Vertex};
use serde::{Deserialize, Serialize};

/// Source encoding sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Pdf,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Pdf => "application/pdf",
        }
    }
}

/// One recognition request: a single image, or a PDF the provider splits
/// into one image per page.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub request_id: String,
    pub format: ImageFormat,
    pub name: String,
    pub data: Vec<u8>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    #[serde(default)]
    pub images: Vec<OcrImage>,
}

/// Recognition result for one page image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrImage {
    #[serde(default)]
    pub fields: Vec<OcrField>,
    #[serde(default)]
    pub converted_image_info: Option<ImageInfo>,
    #[serde(default)]
    pub infer_result: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrField {
    #[serde(default)]
    pub infer_text: String,
    #[serde(default)]
    pub bounding_poly: BoundingPoly,
    #[serde(default)]
    pub line_break: Option<bool>,
    #[serde(default)]
    pub infer_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

impl OcrImage {
    /// Page height in pixels; absent or zero heights become 1.
    pub fn height(&self) -> f64 {
        match self.converted_image_info.and_then(|info| info.height) {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => 1.0,
        }
    }

    fn failed(&self) -> bool {
        matches!(
            self.infer_result.as_deref(),
            Some("FAILURE") | Some("ERROR")
        )
    }
}

impl OcrResponse {
    /// Reject responses where any page failed recognition.
    pub fn validate(&self, provider: &'static str) -> Result<(), ProviderError> {
        for (index, image) in self.images.iter().enumerate() {
            if image.failed() {
                let message = image.message.clone().unwrap_or_default();
                return Err(ProviderError::invalid_response(
                    provider,
                    format!("page {} failed recognition: {}", index + 1, message),
                ));
            }
        }
        Ok(())
    }

    /// Convert to the layout model, numbering pages from 1 in response order.
    pub fn into_document(self) -> Document {
        let pages = self
            .images
            .into_iter()
            .enumerate()
            .map(|(index, image)| {
                let height = image.height();
                let fragments = image
                    .fields
                    .into_iter()
                    .map(|field| Fragment {
                        text: field.infer_text,
                        bounding_box: BoundingBox {
                            vertices: field.bounding_poly.vertices,
                        },
                        explicit_break: field.line_break,
                    })
                    .collect();
                Page::new(index as u32 + 1, height, fragments)
            })
            .collect();
        Document::new(pages)
    }

    /// Number of recognized text fields across all pages.
    pub fn field_count(&self) -> usize {
        self.images.iter().map(|image| image.fields.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "V2",
        "requestId": "req-1",
        "timestamp": 1700000000000,
        "images": [{
            "uid": "abc",
            "name": "receipt",
            "inferResult": "SUCCESS",
            "message": "SUCCESS",
            "convertedImageInfo": {"width": 800, "height": 1000},
            "fields": [
                {
                    "valueType": "ALL",
                    "boundingPoly": {"vertices": [
                        {"x": 10.0, "y": 10.0}, {"x": 60.0, "y": 10.0},
                        {"x": 60.0, "y": 30.0}, {"x": 10.0, "y": 30.0}
                    ]},
                    "inferText": "Total",
                    "inferConfidence": 0.99,
                    "type": "NORMAL",
                    "lineBreak": false
                },
                {
                    "boundingPoly": {"vertices": [{"x": 70.0}, {}, {"x": 120.0, "y": 30.0}]},
                    "inferText": "12,000",
                    "lineBreak": true
                }
            ]
        }]
    }"#;

    #[test]
    fn parses_provider_json() {
        let response: OcrResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.images.len(), 1);
        assert_eq!(response.field_count(), 2);
        let image = &response.images[0];
        assert_eq!(image.height(), 1000.0);
        assert_eq!(image.fields[0].infer_text, "Total");
        assert_eq!(image.fields[0].line_break, Some(false));
        assert_eq!(image.fields[1].bounding_poly.vertices[0].y, None);
        assert!(response.validate("clova").is_ok());
    }

    #[test]
    fn converts_to_document() {
        let response: OcrResponse = serde_json::from_str(SAMPLE).unwrap();
        let document = response.into_document();
        assert_eq!(document.pages.len(), 1);
        let page = &document.pages[0];
        assert_eq!(page.number, 1);
        assert!(page.has_break_hints());
        assert_eq!(page.fragments[1].explicit_break, Some(true));
    }

    #[test]
    fn missing_or_zero_height_becomes_one() {
        let image = OcrImage::default();
        assert_eq!(image.height(), 1.0);
        let image = OcrImage {
            converted_image_info: Some(ImageInfo {
                width: Some(10.0),
                height: Some(0.0),
            }),
            ..OcrImage::default()
        };
        assert_eq!(image.height(), 1.0);
    }

    #[test]
    fn failed_page_is_rejected() {
        let response = OcrResponse {
            images: vec![
                OcrImage::default(),
                OcrImage {
                    infer_result: Some("FAILURE".into()),
                    message: Some("image too small".into()),
                    ..OcrImage::default()
                },
            ],
        };
        let err = response.validate("clova").unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("page 2"));
    }

    #[test]
    fn pages_numbered_in_response_order() {
        let response = OcrResponse {
            images: vec![OcrImage::default(), OcrImage::default(), OcrImage::default()],
        };
        let numbers: Vec<u32> = response
            .into_document()
            .pages
            .iter()
            .map(|p| p.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
