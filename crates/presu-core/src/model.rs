use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chapter or sub-chapter recovered from the document.
///
/// Serializes to the Spanish-keyed hand-off contract expected by the
/// persistence layer (`codigo`, `nombre`, `subcapitulos`, `total`, plus the
/// internal `_generado`/`_adopted` debug flags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureNode {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "subcapitulos")]
    pub children: Vec<StructureNode>,
    /// Declared total as read from the document, or the aggregated fallback
    /// filled in by `compute_missing_totals`.
    pub total: Option<Decimal>,
    /// Synthesized to fill a missing intermediate hierarchy level.
    #[serde(rename = "_generado", default, skip_serializing_if = "is_false")]
    pub generated: bool,
    /// Code prefix did not match the containing chapter; force-assigned by
    /// document order.
    #[serde(rename = "_adopted", default, skip_serializing_if = "is_false")]
    pub adopted: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl StructureNode {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        StructureNode {
            code: code.into(),
            name: name.into(),
            children: Vec::new(),
            total: None,
            generated: false,
            adopted: false,
        }
    }

    /// Depth implied by the code: `C08` -> 1, `C08.01.02` -> 3.
    pub fn level(&self) -> usize {
        self.code.split('.').count()
    }
}

/// The recovered hierarchical structure of one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureTree {
    #[serde(rename = "capitulos")]
    pub chapters: Vec<StructureNode>,
}

impl StructureTree {
    /// Look up a node anywhere in the tree by its code.
    pub fn find(&self, code: &str) -> Option<&StructureNode> {
        fn walk<'a>(nodes: &'a [StructureNode], code: &str) -> Option<&'a StructureNode> {
            for node in nodes {
                if node.code == code {
                    return Some(node);
                }
                if let Some(found) = walk(&node.children, code) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.chapters, code)
    }
}

/// A budget line item ("partida"). Item extraction itself is a later phase;
/// this is the input contract for totals reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "unidad")]
    pub unit: String,
    #[serde(rename = "resumen")]
    pub summary: String,
    #[serde(rename = "cantidad")]
    pub quantity: Decimal,
    #[serde(rename = "precio")]
    pub price: Decimal,
    #[serde(rename = "importe")]
    pub amount: Decimal,
}

/// Document classification: where the numeric data sits, and whether the
/// document carries cost breakdowns ("descompuestos").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    InlineSimple,
    TrailingSimple,
    InlineBreakdown,
    TrailingBreakdown,
}

impl DocumentType {
    pub fn from_flags(data_inline: bool, has_breakdowns: bool) -> DocumentType {
        match (data_inline, has_breakdowns) {
            (true, false) => DocumentType::InlineSimple,
            (false, false) => DocumentType::TrailingSimple,
            (true, true) => DocumentType::InlineBreakdown,
            (false, true) => DocumentType::TrailingBreakdown,
        }
    }

    pub fn data_inline(&self) -> bool {
        matches!(self, DocumentType::InlineSimple | DocumentType::InlineBreakdown)
    }

    pub fn has_breakdowns(&self) -> bool {
        matches!(self, DocumentType::InlineBreakdown | DocumentType::TrailingBreakdown)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::InlineSimple => write!(f, "inline_simple"),
            DocumentType::TrailingSimple => write!(f, "trailing_simple"),
            DocumentType::InlineBreakdown => write!(f, "inline_breakdown"),
            DocumentType::TrailingBreakdown => write!(f, "trailing_breakdown"),
        }
    }
}

/// Whether chapter headers use explicit keywords ("CAPÍTULO", "SUBCAPÍTULO")
/// or bare codes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    Explicit,
    Implicit,
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Explicit => write!(f, "EXPLICIT"),
            StructureFormat::Implicit => write!(f, "IMPLICIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Sub-chapter code prefix did not match its chapter; attached by order.
    AdoptedNode,
    /// A missing intermediate level was synthesized.
    GeneratedLevel,
    /// Sub-chapter seen before any chapter; dropped.
    OrphanSubchapter,
    /// A parent code was missing; node attached at chapter level instead.
    ParentNotFound,
    /// TOTAL line matched but no target code could be resolved.
    TotalWithoutCode,
    /// TOTAL line amount could not be located or parsed.
    TotalWithoutAmount,
    /// No parser registered for the detected document type; fell back.
    ParserFallback,
}

/// A recoverable condition surfaced during parsing. The parse still returns
/// a usable tree; these flag the uncertainties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, code: Option<&str>, message: impl Into<String>) -> Self {
        ParseWarning {
            kind,
            code: code.map(|c| c.to_string()),
            message: message.into(),
        }
    }
}

/// Aggregate column-layout information kept after per-page layouts are
/// consumed by the extractor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub max_columns: usize,
    pub multi_column_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_node_level() {
        assert_eq!(StructureNode::new("C08", "X").level(), 1);
        assert_eq!(StructureNode::new("C08.01.02", "X").level(), 3);
    }

    #[test]
    fn test_document_type_flags() {
        assert_eq!(DocumentType::from_flags(true, true), DocumentType::InlineBreakdown);
        assert!(DocumentType::TrailingBreakdown.has_breakdowns());
        assert!(!DocumentType::TrailingSimple.data_inline());
    }

    #[test]
    fn test_tree_find_nested() {
        let mut root = StructureNode::new("01", "MOVIMIENTO DE TIERRAS");
        let mut sub = StructureNode::new("01.01", "EXCAVACIONES");
        sub.children.push(StructureNode::new("01.01.02", "ZANJAS"));
        root.children.push(sub);
        let tree = StructureTree { chapters: vec![root] };

        assert!(tree.find("01.01.02").is_some());
        assert!(tree.find("02").is_none());
    }

    #[test]
    fn test_serialized_contract_keys() {
        let mut node = StructureNode::new("C01", "DEMOLICIONES");
        node.total = Some(dec!(1234.56));
        node.generated = true;
        let tree = StructureTree { chapters: vec![node] };

        let json = serde_json::to_value(&tree).unwrap();
        let cap = &json["capitulos"][0];
        assert_eq!(cap["codigo"], "C01");
        assert_eq!(cap["nombre"], "DEMOLICIONES");
        assert_eq!(cap["total"], "1234.56");
        assert_eq!(cap["_generado"], true);
        assert!(cap.get("_adopted").is_none());
        assert!(cap["subcapitulos"].as_array().unwrap().is_empty());
    }
}
