pub mod cache;
pub mod cleanup;
pub mod columns;
pub mod pdftotext;

use crate::error::PresuError;
use crate::model::LayoutSummary;
use columns::LayoutInfo;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// A text fragment with its bounding box on the page. Used only by the
/// column detector.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Content extracted from a single page of a PDF, already resolved to
/// reading order (per-column extraction has happened by this point).
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_number: usize,
    pub lines: Vec<String>,
    pub layout: LayoutInfo,
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract the document page by page, choosing between whole-page and
    /// per-column extraction from the page's word layout.
    fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<PageContent>, PresuError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Result of a full document extraction, after page-break repair.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub lines: Vec<String>,
    pub title: Option<String>,
    pub layout: LayoutSummary,
    pub from_cache: bool,
}

/// Extracts a document into clean, ordered text lines, with an on-disk
/// cache keyed by (owner, document).
pub struct DocumentExtractor {
    owner_id: u64,
    document_id: u64,
    cache_dir: Option<PathBuf>,
}

impl DocumentExtractor {
    pub fn new(owner_id: u64, document_id: u64) -> Self {
        DocumentExtractor {
            owner_id,
            document_id,
            cache_dir: None,
        }
    }

    /// Enable the extraction cache under the given directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Run the full extraction pipeline: cache lookup, per-page extraction
    /// via the backend, then the four page-break repair passes in order
    /// (repeated headers, pagination footers, displaced numeric triples,
    /// fragmented TOTAL lines).
    ///
    /// A missing file or a backend failure aborts the whole operation;
    /// nothing partial is cached.
    pub fn extract(
        &self,
        backend: &dyn PdfExtractor,
        pdf_path: &Path,
    ) -> Result<ExtractionResult, PresuError> {
        if !pdf_path.exists() {
            return Err(PresuError::PdfNotFound(pdf_path.to_path_buf()));
        }

        let cache_file = self
            .cache_dir
            .as_ref()
            .map(|dir| dir.join(cache::cache_file_name(self.owner_id, self.document_id, pdf_path)));

        if let Some(path) = &cache_file {
            if let Some(lines) = cache::read_cache(path) {
                info!("using cached extraction: {}", path.display());
                let title = cleanup::detect_title(&lines);
                return Ok(ExtractionResult {
                    lines,
                    title,
                    layout: LayoutSummary::default(),
                    from_cache: true,
                });
            }
        }

        let pages = backend.extract_pages(pdf_path)?;

        let mut layout = LayoutSummary::default();
        let mut all_lines: Vec<String> = Vec::new();
        for page in &pages {
            let cols = page.layout.num_columns();
            if cols > 1 {
                layout.multi_column_pages += 1;
            }
            layout.max_columns = layout.max_columns.max(cols);
            all_lines.extend(page.lines.iter().cloned());
        }

        let before = all_lines.len();
        let (mut lines, title) = cleanup::remove_repeated_headers(&all_lines);
        if lines.len() < before {
            info!("repeated headers removed: {} -> {} lines", before, lines.len());
        }
        lines = cleanup::remove_pagination_footers(&lines);
        lines = cleanup::reorder_displaced_triples(&lines);
        lines = cleanup::fuse_fragmented_totals(&lines);

        if let Some(path) = &cache_file {
            // Read-then-write with no lock: two concurrent first extractions
            // of the same document may both write. Content is deterministic,
            // so last writer wins and the race is benign.
            if let Err(e) = cache::write_cache(path, &lines) {
                warn!("could not write extraction cache {}: {}", path.display(), e);
            }
        }

        info!("extracted {} lines via {}", lines.len(), backend.backend_name());

        Ok(ExtractionResult {
            lines,
            title,
            layout,
            from_cache: false,
        })
    }
}
