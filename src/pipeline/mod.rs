//! Document ingestion pipeline.
//!
//! extract:   file → OCR → layout reconstruction → upload record
//! summarize: upload text → summary + structured fields + embedding → derived record
//! retrieval: keyword search, semantic search, question answering
//! accuracy:  original OCR text vs. revised text
//!
//! Collaborators are generic so tests can run the whole flow in-process.

pub mod input;
pub mod retry;

pub use input::InputFile;

use crate::accuracy::AccuracyReport;
use crate::config::{AppConfig, RetryPolicy};
use crate::error::PipelineError;
use crate::layout::{self, LayoutDefect, LayoutOptions, LayoutPolicy};
use crate::llm::{
    AnswerRequest, EmbedRequest, Embedder, LanguageModel, StructureRequest, SummarizeRequest,
};
use crate::ocr::{OcrProvider, OcrRequest};
use crate::pages::PageRange;
use crate::store::{
    DerivedRecord, NewDerived, NewUpload, ScoredHit, SearchHit, Store, UploadId, UploadRecord,
};
use base64::Engine;
use retry::with_retry;
use serde::Serialize;

/// Answer returned when no stored document is similar enough to ask about.
pub const NO_SOURCES_ANSWER: &str = "No indexed documents to answer from.";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub layout_policy: LayoutPolicy,
    pub retry: RetryPolicy,
    pub lang: Option<String>,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            layout_policy: config.layout_policy,
            retry: config.retry,
            lang: config.ocr.lang.clone(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            layout_policy: LayoutPolicy::Auto,
            retry: RetryPolicy::default(),
            lang: None,
        }
    }
}

/// Result of `Pipeline::extract`.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub upload_id: UploadId,
    pub text: String,
    /// Pages the provider returned, before any page-range filtering.
    pub page_count: usize,
    pub defects: Vec<LayoutDefect>,
}

/// Keyword hit plus an inline preview of the source image.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub hit: SearchHit,
    /// `data:<mime>;base64,...` of the first stored image, if readable.
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ScoredHit>,
}

pub struct Pipeline<O, L, S> {
    ocr: O,
    llm: L,
    store: S,
    options: PipelineOptions,
}

impl<O, L, S> Pipeline<O, L, S>
where
    O: OcrProvider,
    L: LanguageModel + Embedder,
    S: Store,
{
    pub fn new(ocr: O, llm: L, store: S, options: PipelineOptions) -> Self {
        Self {
            ocr,
            llm,
            store,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// OCR a file and save its reconstructed text as a new upload.
    ///
    /// PDFs get per-page markers and honor `page_range`; images ignore it.
    pub async fn extract(
        &self,
        file: InputFile,
        page_range: Option<&PageRange>,
    ) -> Result<Extraction, PipelineError> {
        let start = std::time::Instant::now();
        let prepared = input::prepare(&file)?;
        let is_pdf = prepared.is_pdf();

        let image_id = self.store.put_image(&file.bytes, &file.filename).await?;

        let request = OcrRequest {
            request_id: format!("{}-{}", &image_id.0[..12.min(image_id.0.len())], now_millis()),
            format: prepared.format,
            name: input::stem(&file.filename).to_string(),
            data: prepared.data,
            lang: self.options.lang.clone(),
        };
        let ocr_start = std::time::Instant::now();
        let response = with_retry(&self.options.retry, "OCR", || self.ocr.recognize(&request)).await?;
        let ocr_ms = ocr_start.elapsed().as_millis();

        let mut document = response.into_document();
        let page_count = document.pages.len();
        match page_range {
            Some(range) if is_pdf => {
                document.pages.retain(|page| range.contains(page.number));
                log::info!(
                    "[PIPELINE] Kept {} of {} page(s) for range {:?}",
                    document.pages.len(),
                    page_count,
                    range.pages()
                );
            }
            Some(_) => log::debug!("[PIPELINE] Page range ignored for single image"),
            None => {}
        }

        let layout_options = LayoutOptions::with_policy(self.options.layout_policy).page_markers(is_pdf);
        let reconstruction = layout::reconstruct_parallel(&document, &layout_options);

        let record = self
            .store
            .save_upload(NewUpload {
                filename: file.filename,
                ocr_text: reconstruction.text.clone(),
                image_ids: vec![image_id],
            })
            .await?;

        log::info!(
            "[PIPELINE] Extracted {} chars from {} page(s) in {}ms (ocr={}ms)",
            reconstruction.text.chars().count(),
            document.pages.len(),
            start.elapsed().as_millis(),
            ocr_ms
        );

        Ok(Extraction {
            upload_id: record.id,
            text: reconstruction.text,
            page_count,
            defects: reconstruction.defects,
        })
    }

    pub async fn upload(&self, upload_id: &UploadId) -> Result<UploadRecord, PipelineError> {
        self.store
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("upload {}", upload_id)))
    }

    /// Summarize and structure `text` (the upload's text, possibly revised)
    /// and save the derived record.
    pub async fn summarize_and_structure(
        &self,
        upload_id: &UploadId,
        text: &str,
    ) -> Result<DerivedRecord, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("text is empty".into()));
        }
        self.upload(upload_id).await?;
        let start = std::time::Instant::now();
        let retry = &self.options.retry;

        let summarize = SummarizeRequest { text: text.to_string() };
        let structure = StructureRequest { text: text.to_string() };
        let (summary, structure) = tokio::join!(
            with_retry(retry, "summarize", || self.llm.summarize(&summarize)),
            with_retry(retry, "structure", || self.llm.extract_structure(&structure)),
        );
        let summary = summary?;
        let structure = structure?;
        let embedding = self.embed_one(text).await?;

        let record = self
            .store
            .save_derived(NewDerived {
                upload_id: upload_id.clone(),
                ocr_text: text.to_string(),
                summary: summary.summary,
                fields: structure.fields,
                embedding,
            })
            .await?;

        log::info!(
            "[PIPELINE] Derived record for {} in {}ms ({} fields, embedding={})",
            upload_id,
            start.elapsed().as_millis(),
            record.fields.len(),
            record.embedding.is_some()
        );
        Ok(record)
    }

    /// Embed a single text. `None` when the provider has no embeddings;
    /// a provider that has them but lacks a key is an error.
    async fn embed_one(&self, text: &str) -> Result<Option<Vec<f32>>, PipelineError> {
        if !self.llm.supports_embeddings() {
            log::warn!("[PIPELINE] Skipping embedding: {} has no embeddings", self.llm.name());
            return Ok(None);
        }
        let request = EmbedRequest {
            inputs: vec![text.to_string()],
        };
        let response = with_retry(&self.options.retry, "embed", || self.llm.embed(&request)).await?;
        Ok(response.vectors.into_iter().next())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidInput("search query is empty".into()));
        }
        let hits = self.store.keyword_search(query).await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let preview = match hit.record.image_ids.first() {
                Some(image_id) => match self.store.get_image(image_id).await {
                    Ok(bytes) => Some(data_url(&bytes)),
                    Err(e) => {
                        log::warn!("[PIPELINE] No preview for {}: {}", hit.record.upload_id, e);
                        None
                    }
                },
                None => None,
            };
            results.push(SearchResult { hit, preview });
        }
        Ok(results)
    }

    pub async fn semantic_search(&self, query: &str, k: usize) -> Result<Vec<ScoredHit>, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidInput("search query is empty".into()));
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embed_one(query).await?.ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "{} does not provide embeddings; semantic search is unavailable",
                self.llm.name()
            ))
        })?;
        Ok(self.store.semantic_search(&vector, k).await?)
    }

    /// Answer a question from the `k` most similar stored documents.
    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer, PipelineError> {
        let sources = self.semantic_search(question, k).await?;
        if sources.is_empty() {
            return Ok(Answer {
                answer: NO_SOURCES_ANSWER.to_string(),
                sources,
            });
        }

        let request = AnswerRequest {
            question: question.trim().to_string(),
            context: sources.iter().map(|s| s.record.ocr_text.clone()).collect(),
        };
        let response = with_retry(&self.options.retry, "answer", || self.llm.answer(&request)).await?;
        Ok(Answer {
            answer: response.answer,
            sources,
        })
    }

    /// Score the upload's original OCR text against its revised text.
    pub async fn accuracy(&self, upload_id: &UploadId) -> Result<AccuracyReport, PipelineError> {
        let upload = self.upload(upload_id).await?;
        let derived = self
            .store
            .get_derived(upload_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("derived record for {}", upload_id)))?;
        let report = AccuracyReport::compare(upload.ocr_text, derived.ocr_text);
        log::info!("[PIPELINE] Accuracy for {}: {:.2}%", upload_id, report.accuracy);
        Ok(report)
    }
}

fn data_url(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        input::sniff_mime_type(bytes),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn now_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_uses_sniffed_mime() {
        assert_eq!(data_url(b"%PDF"), "data:application/pdf;base64,JVBERg==");
    }

    #[test]
    fn options_follow_config() {
        let config = AppConfig::from_sources(
            |key| match key {
                "LAYOUT_POLICY" => Some("explicit".to_string()),
                "OCR_LANG" => Some("ko".to_string()),
                _ => None,
            },
            Default::default(),
        );
        let options = PipelineOptions::from_config(&config);
        assert_eq!(options.layout_policy, LayoutPolicy::ExplicitBreak);
        assert_eq!(options.lang.as_deref(), Some("ko"));
    }
}
