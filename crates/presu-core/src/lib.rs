pub mod amounts;
pub mod classify;
pub mod error;
pub mod extraction;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod structure;

use error::PresuError;
use extraction::{DocumentExtractor, PdfExtractor};
use model::{
    DocumentType, LayoutSummary, ParseWarning, StructureFormat, StructureTree, WarningKind,
};
use std::path::Path;

/// Everything learned from one budget document: what kind it is, how its
/// structure was marked up, and the recovered chapter tree.
#[derive(Debug, Clone)]
pub struct BudgetAnalysis {
    pub title: Option<String>,
    pub document_type: DocumentType,
    pub format: StructureFormat,
    pub tree: StructureTree,
    pub warnings: Vec<ParseWarning>,
    pub layout: LayoutSummary,
    pub from_cache: bool,
}

/// Main API entry point: extract a budget PDF and recover its chapter
/// structure.
///
/// Runs the extraction pipeline (cache, per-page extraction, page-break
/// repair), classifies the document, then parses the structure with the
/// parser matching the detected format.
pub fn parse_budget(
    extractor: &DocumentExtractor,
    backend: &dyn PdfExtractor,
    pdf_path: &Path,
) -> Result<BudgetAnalysis, PresuError> {
    let extraction = extractor.extract(backend, pdf_path)?;
    let mut analysis = parse_lines(&extraction.lines);
    analysis.title = extraction.title;
    analysis.layout = extraction.layout;
    analysis.from_cache = extraction.from_cache;
    Ok(analysis)
}

/// Classify and parse already-extracted lines. Infallible: an unparseable
/// document yields an empty tree plus warnings, never an error.
pub fn parse_lines(lines: &[String]) -> BudgetAnalysis {
    let document_type = classify::detect_document_type(lines);
    let format = classify::detect_structure_format(lines);
    let outcome = structure::parse_structure(lines, format);

    let mut warnings = outcome.warnings;
    if document_type.has_breakdowns() {
        // Breakdown rows have no dedicated parser; the simple-variant
        // structure parsers already skip them, so the result stands but the
        // caller should know precision may suffer.
        log::warn!(
            "document type {} parsed with the simple-variant parser",
            document_type
        );
        warnings.push(ParseWarning::new(
            WarningKind::ParserFallback,
            None,
            format!(
                "no dedicated parser for {}, parsed with the simple variant",
                document_type
            ),
        ));
    }

    BudgetAnalysis {
        title: None,
        document_type,
        format: outcome.format,
        tree: outcome.tree,
        warnings,
        layout: LayoutSummary::default(),
        from_cache: false,
    }
}
