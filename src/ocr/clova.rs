//! General-OCR HTTP adapter (CLOVA OCR V2 request shape).

use super::types::{OcrRequest, OcrResponse};
use super::OcrProvider;
use crate::config::OcrSettings;
use crate::error::ProviderError;
use base64::Engine;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const PROVIDER: &str = "clova-ocr";

/// Client for an OCR endpoint that accepts base64 images and returns
/// per-field bounding polygons.
pub struct ClovaOcr {
    client: reqwest::Client,
    api_url: Option<String>,
    secret_key: Option<String>,
    lang: Option<String>,
}

impl ClovaOcr {
    /// Credentials are checked when a request is made, so commands that never
    /// OCR anything work without them.
    pub fn new(settings: &OcrSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            secret_key: settings.secret_key.clone(),
            lang: settings.lang.clone(),
        })
    }

    fn request_body(&self, request: &OcrRequest) -> serde_json::Value {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let data = base64::engine::general_purpose::STANDARD.encode(&request.data);

        let mut body = serde_json::json!({
            "version": "V2",
            "requestId": request.request_id,
            "timestamp": timestamp,
            "images": [{
                "format": request.format.as_str(),
                "name": request.name,
                "data": data,
            }]
        });
        if let Some(lang) = request.lang.as_ref().or(self.lang.as_ref()) {
            body["lang"] = serde_json::Value::String(lang.clone());
        }
        body
    }
}

impl OcrProvider for ClovaOcr {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn recognize(&self, request: &OcrRequest) -> Result<OcrResponse, ProviderError> {
        let api_url = self
            .api_url
            .as_deref()
            .ok_or_else(|| ProviderError::not_configured(PROVIDER, "OCR_API_URL is not set"))?;
        let secret_key = self.secret_key.as_deref().ok_or_else(|| {
            ProviderError::not_configured(PROVIDER, "OCR_SECRET_KEY is not set")
        })?;

        log::info!(
            "[OCR] Sending {} ({}, {} bytes)",
            request.name,
            request.format.as_str(),
            request.data.len()
        );
        let start = std::time::Instant::now();

        let resp = self
            .client
            .post(api_url)
            .header("X-OCR-SECRET", secret_key)
            .header("content-type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !status.is_success() {
            log::error!("[OCR] API returned {}", status);
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), &body));
        }

        let response: OcrResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(PROVIDER, format!("malformed JSON: {}", e))
        })?;
        response.validate(PROVIDER)?;

        log::info!(
            "[OCR] {} page(s), {} field(s) in {}ms",
            response.images.len(),
            response.field_count(),
            start.elapsed().as_millis()
        );
        Ok(response)
    }
}
