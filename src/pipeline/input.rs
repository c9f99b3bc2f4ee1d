//! Input file classification and preparation for OCR.

use crate::error::PipelineError;
use crate::ocr::ImageFormat;

const PDF_MAGIC: &[u8] = b"%PDF";

/// A file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }
}

/// Bytes ready to send to the OCR provider.
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub format: ImageFormat,
    pub data: Vec<u8>,
    /// Pixel dimensions for raster input; `None` for PDFs.
    pub dimensions: Option<(u32, u32)>,
}

impl PreparedInput {
    pub fn is_pdf(&self) -> bool {
        self.format == ImageFormat::Pdf
    }
}

/// Validate the input and normalize raster images to PNG.
///
/// PDFs pass through untouched. Anything else must decode as an image.
pub fn prepare(input: &InputFile) -> Result<PreparedInput, PipelineError> {
    if input.filename.trim().is_empty() {
        return Err(PipelineError::InvalidInput("file name is empty".into()));
    }
    if input.bytes.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "{} is empty",
            input.filename
        )));
    }

    if input.is_pdf() {
        return Ok(PreparedInput {
            format: ImageFormat::Pdf,
            data: input.bytes.clone(),
            dimensions: None,
        });
    }

    let start = std::time::Instant::now();
    let decoded = image::load_from_memory(&input.bytes)?;
    let dimensions = (decoded.width(), decoded.height());

    let mut png_bytes: Vec<u8> = Vec::new();
    decoded.write_to(
        &mut std::io::Cursor::new(&mut png_bytes),
        image::ImageFormat::Png,
    )?;
    log::info!(
        "[PIPELINE] Decoded {} ({}x{}), PNG re-encode {}ms ({} bytes)",
        input.filename,
        dimensions.0,
        dimensions.1,
        start.elapsed().as_millis(),
        png_bytes.len()
    );

    Ok(PreparedInput {
        format: ImageFormat::Png,
        data: png_bytes,
        dimensions: Some(dimensions),
    })
}

/// File name without its extension, as sent to the OCR provider.
pub fn stem(filename: &str) -> &str {
    std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(filename)
}

/// MIME type for a stored blob, sniffed from its leading bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) {
        return ImageFormat::Pdf.mime_type();
    }
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type(),
        Err(_) => "application/octet-stream",
    }
}
