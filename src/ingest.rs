//! Ingestion orchestrator: extract → split → embed → upsert.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use crate::config::RagConfig;
use crate::diag::DiagnosticLog;
use crate::document::{Document, Metadata, VectorRecord, META_PAGE, META_SOURCE, META_TITLE};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::TextExtractor;
use crate::splitter::Splitter;
use crate::vectorstore::VectorStore;

/// Counters describing one ingestion run.
///
/// `files_seen - files_loaded` is the number of files skipped due to
/// tolerated extraction failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// PDF files found in the source directory.
    pub files_seen: usize,
    /// Files whose text was successfully extracted.
    pub files_loaded: usize,
    /// Passages embedded and upserted.
    pub passages: usize,
}

/// The ingestion orchestrator.
///
/// Drives extract → split → embed → upsert across all PDF files in a source
/// directory. Extraction failures are tolerated per file; any failure from
/// the split phase onward aborts the whole call. Construct via
/// [`IngestPipeline::builder()`].
pub struct IngestPipeline {
    config: RagConfig,
    extractor: Arc<dyn TextExtractor>,
    splitter: Arc<dyn Splitter>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    log: DiagnosticLog,
}

impl IngestPipeline {
    /// Create a new [`IngestPipelineBuilder`].
    pub fn builder() -> IngestPipelineBuilder {
        IngestPipelineBuilder::default()
    }

    /// Ingest every PDF file directly inside `dir` (non-recursive).
    ///
    /// Zero PDF files is not an error. A file that fails extraction is
    /// logged and skipped; a failure during splitting, embedding, or upsert
    /// aborts the entire call.
    pub async fn ingest(&self, dir: &Path) -> Result<IngestReport> {
        let files = list_pdfs(dir)?;
        if files.is_empty() {
            info!(dir = %dir.display(), "no PDF files found in the directory");
            return Ok(IngestReport::default());
        }

        let mut documents = Vec::new();
        for file in &files {
            match self.load_file(file) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "skipping file after extraction failure");
                    self.log.warn(format!("extraction failed, file skipped: {e}"));
                }
            }
        }

        info!(files_seen = files.len(), files_loaded = documents.len(), "loaded documents");

        let passages = self.splitter.split(&documents).map_err(|e| {
            error!(error = %e, "split phase failed");
            self.log.error(format!("split phase failed: {e}"));
            RagError::Pipeline(format!("split phase failed: {e}"))
        })?;
        info!(passage_count = passages.len(), "split documents into passages");

        self.store
            .ensure_collection(&self.config.collection, self.embedder.dimensions(), self.config.distance)
            .await
            .map_err(|e| {
                error!(error = %e, "collection setup failed");
                self.log.error(format!("collection setup failed: {e}"));
                RagError::Pipeline(format!("collection setup failed: {e}"))
            })?;

        // Strictly sequential, and intolerant: one bad passage aborts the
        // run, unlike the per-file extraction tolerance above.
        for passage in &passages {
            let vector = self.embedder.embed(&passage.text).await.map_err(|e| {
                error!(passage.id = %passage.id, error = %e, "embed phase failed");
                self.log.error(format!("embed phase failed for passage '{}': {e}", passage.id));
                RagError::Pipeline(format!("embed phase failed for passage '{}': {e}", passage.id))
            })?;

            let record = VectorRecord::from_document(passage, vector);
            self.store.upsert(&self.config.collection, &[record]).await.map_err(|e| {
                error!(passage.id = %passage.id, error = %e, "upsert phase failed");
                self.log.error(format!("upsert phase failed for passage '{}': {e}", passage.id));
                RagError::Pipeline(format!("upsert phase failed for passage '{}': {e}", passage.id))
            })?;
        }

        info!(passage_count = passages.len(), "document ingestion complete");
        self.log.info("document ingestion complete");

        Ok(IngestReport {
            files_seen: files.len(),
            files_loaded: documents.len(),
            passages: passages.len(),
        })
    }

    /// Extract one file into a whole-document record.
    fn load_file(&self, path: &Path) -> Result<Document> {
        let extracted = self.extractor.extract(path)?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let title = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());

        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE.to_string(), json!(filename));
        metadata.insert(META_PAGE.to_string(), json!(extracted.pages));
        metadata.insert(META_TITLE.to_string(), json!(title));

        Ok(Document::new(extracted.text, metadata))
    }
}

/// List `.pdf` files directly inside `dir`, sorted by path.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        RagError::Config(format!("cannot read source directory '{}': {e}", dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Builder for constructing an [`IngestPipeline`].
#[derive(Default)]
pub struct IngestPipelineBuilder {
    config: Option<RagConfig>,
    extractor: Option<Arc<dyn TextExtractor>>,
    splitter: Option<Arc<dyn Splitter>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    log: Option<DiagnosticLog>,
}

impl IngestPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the passage splitter.
    pub fn splitter(mut self, splitter: Arc<dyn Splitter>) -> Self {
        self.splitter = Some(splitter);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store backend.
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the diagnostic log sink (a fresh one is used when unset).
    pub fn log(mut self, log: DiagnosticLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Build the [`IngestPipeline`], validating that all required fields are
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<IngestPipeline> {
        let config = self.config.unwrap_or_default();
        let extractor =
            self.extractor.ok_or_else(|| RagError::Config("extractor is required".to_string()))?;
        let splitter =
            self.splitter.ok_or_else(|| RagError::Config("splitter is required".to_string()))?;
        let embedder =
            self.embedder.ok_or_else(|| RagError::Config("embedder is required".to_string()))?;
        let store = self.store.ok_or_else(|| RagError::Config("store is required".to_string()))?;

        Ok(IngestPipeline {
            config,
            extractor,
            splitter,
            embedder,
            store,
            log: self.log.unwrap_or_default(),
        })
    }
}
