//! Document-type and structure-format classification from a sample of
//! extracted lines. Both are cheap, front-loaded heuristics: budget
//! documents commit to one convention within their first page.

use crate::model::{DocumentType, StructureFormat};
use log::{debug, info};
use regex::Regex;
use std::sync::LazyLock;

const TYPE_SAMPLE_LINES: usize = 50;
const FORMAT_SAMPLE_LINES: usize = 100;
const FORMAT_KEYWORD_MIN: usize = 2;

/// Breakdown ("descompuesto") row shapes. Intentionally permissive: one
/// match anywhere in the sample flags the whole document, since breakdown
/// rows must never be parsed as ordinary items.
static BREAKDOWN_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "20 % Esponjamiento 0,2 6.160,20 1.232,04"
        r"^\d+\s*%\s+\w+\s+[\d.,]+\s+[\d.,]+\s+[\d.,]+",
        r"^\s*%\s*(mano|obra|material|materiales|m\.?o\.?)",
        r"^\s*(mo|mat|maq):",
        r"porcentajes?\s*:",
        r"descompuesto\s*:",
        r"^\s*mano\s+de\s+obra\s*[:.]",
        r"^\s*materiales?\s*[:.]",
        r"cos\.?\s*indirecto",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Flexible item-header shape: code, a unit-ish word, then uppercase text.
/// Covers "01.01.01 m2 RASANTEO..." as well as "m23U01C190 Ud DESMONTAJE...".
static ITEM_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{2,}[\w.]*\s+\w+\s+[A-Z]").unwrap());

/// A line ending in a quantity/price/amount triple, thousands separators
/// included ("1.250,00 0,85 1.062,50").
static INLINE_TRIPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^.+?\s+\d{1,3}(?:\.\d{3})*,\d{2}\s+\d{1,3}(?:\.\d{3})*,\d{2}\s+\d{1,3}(?:\.\d{3})*,\d{2}\s*$",
    )
    .unwrap()
});

static FORMAT_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CAPÍTULO|SUBCAPÍTULO|APARTADO").unwrap());

/// Classify a document from its first 50 extracted lines.
pub fn detect_document_type(lines: &[String]) -> DocumentType {
    let sample = &lines[..lines.len().min(TYPE_SAMPLE_LINES)];

    let has_breakdowns = detect_breakdowns(sample);
    let data_inline = detect_inline_data(sample);

    let doc_type = DocumentType::from_flags(data_inline, has_breakdowns);
    info!(
        "document type: {} (inline: {}, breakdowns: {})",
        doc_type, data_inline, has_breakdowns
    );
    doc_type
}

fn detect_breakdowns(sample: &[String]) -> bool {
    for line in sample {
        let lower = line.to_lowercase();
        if BREAKDOWN_RES.iter().any(|re| re.is_match(&lower)) {
            debug!("breakdown row detected: '{}'", line.trim());
            return true;
        }
    }
    false
}

/// Inline means item-header lines carry their own numeric triple. Over 50%
/// of code-like lines must, to classify as inline; with no code-like lines
/// at all the conservative answer is data-at-end.
fn detect_inline_data(sample: &[String]) -> bool {
    let mut code_lines = 0usize;
    let mut inline_lines = 0usize;

    for line in sample {
        if ITEM_HEADER_RE.is_match(line) {
            code_lines += 1;
            if INLINE_TRIPLE_RE.is_match(line) {
                inline_lines += 1;
            }
        }
    }

    if code_lines == 0 {
        return false;
    }
    debug!("inline analysis: {}/{} code lines carry triples", inline_lines, code_lines);
    inline_lines * 2 > code_lines
}

/// EXPLICIT when the first 100 lines contain at least two occurrences of a
/// structural keyword (CAPÍTULO, SUBCAPÍTULO, APARTADO); IMPLICIT otherwise.
pub fn detect_structure_format(lines: &[String]) -> StructureFormat {
    let keyword_lines = lines
        .iter()
        .take(FORMAT_SAMPLE_LINES)
        .filter(|line| FORMAT_KEYWORD_RE.is_match(line))
        .count();

    let format = if keyword_lines >= FORMAT_KEYWORD_MIN {
        StructureFormat::Explicit
    } else {
        StructureFormat::Implicit
    };
    info!("structure format: {} ({} keyword lines)", format, keyword_lines);
    format
}
