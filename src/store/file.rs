//! Directory-backed store.
//!
//! Layout under the data dir:
//!   uploads/<id>.json        UploadRecord
//!   derived/<upload_id>.json DerivedRecord
//!   images/<sha256>.bin      raw source bytes

use super::*;
use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const UPLOAD_ID_LEN: usize = 24;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in ["uploads", "derived", "images"] {
            tokio::fs::create_dir_all(root.join(dir)).await?;
        }
        log::info!("[STORE] Opened {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn upload_path(&self, id: &UploadId) -> PathBuf {
        self.root.join("uploads").join(format!("{}.json", id.0))
    }

    fn derived_path(&self, id: &UploadId) -> PathBuf {
        self.root.join("derived").join(format!("{}.json", id.0))
    }

    fn image_path(&self, id: &ImageId) -> PathBuf {
        self.root.join("images").join(format!("{}.bin", id.0))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a temp file + rename so readers never see a partial file.
    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_atomic(path, &bytes).await
    }

    /// True when `path` holds exactly the blob named by `id`.
    async fn blob_intact(path: &Path, id: &ImageId) -> Result<bool, StoreError> {
        match tokio::fs::read(path).await {
            Ok(existing) => Ok(hex_digest(&[existing.as_slice()]) == id.0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn all_derived(&self) -> Result<Vec<DerivedRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(self.root.join("derived")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_json::<DerivedRecord>(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::warn!("[STORE] Skipping unreadable {}: {}", path.display(), e),
            }
        }
        // Newest first, id as tiebreak for a stable order.
        records.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.upload_id.cmp(&b.upload_id))
        });
        Ok(records)
    }
}

/// Ids are hex digests; anything else cannot name a stored record.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn hex_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Case-insensitive pattern; an invalid regex is matched literally.
fn search_pattern(query: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(query)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(query))
                .case_insensitive(true)
                .build()
        })
}

fn matched_parts(pattern: &Regex, record: &DerivedRecord) -> Vec<&'static str> {
    let mut matched = Vec::new();
    if pattern.is_match(&record.filename) {
        matched.push("filename");
    }
    if pattern.is_match(&record.ocr_text) {
        matched.push("text");
    }
    if pattern.is_match(&record.summary) {
        matched.push("summary");
    }
    if record
        .fields
        .iter()
        .any(|f| pattern.is_match(&f.key) || pattern.is_match(&f.value))
    {
        matched.push("fields");
    }
    matched
}

impl Store for FileStore {
    async fn put_image(&self, bytes: &[u8], filename: &str) -> Result<ImageId, StoreError> {
        let id = ImageId(hex_digest(&[bytes]));
        let path = self.image_path(&id);
        if Self::blob_intact(&path, &id).await? {
            log::debug!("[STORE] Image {} already stored", id);
        } else {
            Self::write_atomic(&path, bytes).await?;
            log::info!("[STORE] Stored image {} ({}, {} bytes)", id, filename, bytes.len());
        }
        Ok(id)
    }

    async fn get_image(&self, id: &ImageId) -> Result<Vec<u8>, StoreError> {
        let not_found = || StoreError::NotFound {
            what: "image",
            id: id.0.clone(),
        };
        if !is_valid_id(&id.0) {
            return Err(not_found());
        }
        match tokio::fs::read(self.image_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_upload(&self, upload: NewUpload) -> Result<UploadRecord, StoreError> {
        let uploaded_at = now_millis();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut digest = hex_digest(&[
            upload.filename.as_bytes(),
            upload.ocr_text.as_bytes(),
            &nanos.to_le_bytes(),
        ]);
        digest.truncate(UPLOAD_ID_LEN);

        let record = UploadRecord {
            id: UploadId(digest),
            filename: upload.filename,
            ocr_text: upload.ocr_text,
            image_ids: upload.image_ids,
            uploaded_at,
        };
        Self::write_json(&self.upload_path(&record.id), &record).await?;
        log::info!("[STORE] Saved upload {} ({})", record.id, record.filename);
        Ok(record)
    }

    async fn get_upload(&self, id: &UploadId) -> Result<Option<UploadRecord>, StoreError> {
        if !is_valid_id(&id.0) {
            return Ok(None);
        }
        Self::read_json(&self.upload_path(id)).await
    }

    async fn save_derived(&self, derived: NewDerived) -> Result<DerivedRecord, StoreError> {
        let upload = self
            .get_upload(&derived.upload_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                what: "upload",
                id: derived.upload_id.0.clone(),
            })?;

        let record = DerivedRecord {
            upload_id: upload.id,
            filename: upload.filename,
            ocr_text: derived.ocr_text,
            summary: derived.summary,
            fields: derived.fields,
            uploaded_at: upload.uploaded_at,
            image_ids: upload.image_ids,
            embedding: derived.embedding,
        };
        Self::write_json(&self.derived_path(&record.upload_id), &record).await?;
        log::info!(
            "[STORE] Saved derived record for {} ({} fields)",
            record.upload_id,
            record.fields.len()
        );
        Ok(record)
    }

    async fn get_derived(&self, id: &UploadId) -> Result<Option<DerivedRecord>, StoreError> {
        if !is_valid_id(&id.0) {
            return Ok(None);
        }
        Self::read_json(&self.derived_path(id)).await
    }

    async fn keyword_search(&self, query: &str) -> Result<Vec<SearchHit>, StoreError> {
        let start = std::time::Instant::now();
        let pattern = match search_pattern(query) {
            Ok(p) => p,
            Err(e) => {
                // Only reachable for patterns that exceed regex size limits.
                log::warn!("[STORE] Unusable search pattern: {}", e);
                return Ok(Vec::new());
            }
        };

        let hits: Vec<SearchHit> = self
            .all_derived()
            .await?
            .into_iter()
            .filter_map(|record| {
                let matched = matched_parts(&pattern, &record);
                (!matched.is_empty()).then_some(SearchHit { record, matched })
            })
            .collect();

        log::info!(
            "[STORE] Keyword search '{}': {} hit(s) in {}ms",
            query,
            hits.len(),
            start.elapsed().as_millis()
        );
        Ok(hits)
    }

    async fn semantic_search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredHit>, StoreError> {
        let mut hits: Vec<ScoredHit> = self
            .all_derived()
            .await?
            .into_iter()
            .filter_map(|record| {
                let score = cosine_similarity(vector, record.embedding.as_deref()?);
                Some(ScoredHit { record, score })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        log::info!("[STORE] Semantic search: {} hit(s)", hits.len());
        Ok(hits)
    }
}
