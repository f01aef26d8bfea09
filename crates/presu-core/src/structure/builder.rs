//! Shared tree-building state for both structure parser variants.
//!
//! The builder keeps a flat arena of nodes plus a code lookup map while the
//! line stream is consumed, and converts to the nested output tree at the
//! end. All repair policies live here: forced adoption of inconsistent
//! codes, synthesis of missing intermediate levels, on-the-fly creation of
//! sub-chapters referenced only by their TOTAL line, and the bottom-up
//! totals fallback.

use crate::amounts::parse_spanish;
use crate::model::{ParseWarning, StructureNode, StructureTree, WarningKind};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Structural type carried by a TOTAL line's keyword, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalHint {
    Chapter,
    Subchapter,
    Apartado,
}

impl TotalHint {
    pub fn from_keyword(word: &str) -> Option<TotalHint> {
        match word.to_uppercase().as_str() {
            "CAPÍTULO" => Some(TotalHint::Chapter),
            "SUBCAPÍTULO" => Some(TotalHint::Subchapter),
            "APARTADO" => Some(TotalHint::Apartado),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TotalHint::Chapter => "CAPÍTULO",
            TotalHint::Subchapter => "SUBCAPÍTULO",
            TotalHint::Apartado => "APARTADO",
        }
    }

    fn is_subchapter_like(&self) -> bool {
        matches!(self, TotalHint::Subchapter | TotalHint::Apartado)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    code: String,
    name: String,
    children: Vec<usize>,
    total: Option<Decimal>,
    generated: bool,
    adopted: bool,
}

impl NodeData {
    fn new(code: &str, name: &str) -> Self {
        NodeData {
            code: code.to_string(),
            name: name.to_string(),
            children: Vec::new(),
            total: None,
            generated: false,
            adopted: false,
        }
    }
}

/// Builds the chapter tree while lines stream through one of the parsers.
/// One builder per parse run; nothing is shared between runs.
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    index: HashMap<String, usize>,
    chapters: Vec<usize>,
    current_chapter: Option<usize>,
    last_code: Option<String>,
    warnings: Vec<ParseWarning>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            nodes: Vec::new(),
            index: HashMap::new(),
            chapters: Vec::new(),
            current_chapter: None,
            last_code: None,
            warnings: Vec::new(),
        }
    }

    /// Append a new top-level chapter and make it current.
    pub fn process_chapter(&mut self, code: &str, name: &str) {
        debug!("chapter: {} - {}", code, name);
        let idx = self.nodes.len();
        self.nodes.push(NodeData::new(code, name));
        self.chapters.push(idx);
        self.index.insert(code.to_string(), idx);
        self.current_chapter = Some(idx);
        self.last_code = Some(code.to_string());
    }

    /// Attach a sub-chapter at the depth implied by its dot-count.
    ///
    /// A sub-chapter whose code prefix does not match the current chapter is
    /// still attached under it, flagged adopted: document order is a
    /// stronger ancestry signal than a possibly mistyped code scheme.
    /// Without any current chapter the line is dropped with a warning.
    pub fn process_subchapter(&mut self, code: &str, name: &str) {
        let Some(chapter_idx) = self.current_chapter else {
            warn!("sub-chapter {} with no containing chapter, ignored", code);
            self.warnings.push(ParseWarning::new(
                WarningKind::OrphanSubchapter,
                Some(code),
                format!("sub-chapter {code} appeared before any chapter"),
            ));
            return;
        };

        debug!("sub-chapter: {} - {}", code, name);

        let parts: Vec<&str> = code.split('.').collect();
        let chapter_code = self.nodes[chapter_idx].code.clone();
        let adopted = parts.len() > 1 && parts[0] != chapter_code;
        if adopted {
            warn!(
                "inconsistent code: sub-chapter {} under chapter {}, attaching by document order",
                code, chapter_code
            );
            self.warnings.push(ParseWarning::new(
                WarningKind::AdoptedNode,
                Some(code),
                format!("sub-chapter {code} does not match chapter {chapter_code}"),
            ));
        }

        self.ensure_intermediate_levels(code, adopted);

        let idx = self.nodes.len();
        let mut node = NodeData::new(code, name);
        node.adopted = adopted;
        self.nodes.push(node);

        if parts.len() == 2 {
            self.nodes[chapter_idx].children.push(idx);
        } else {
            let parent_code = parts[..parts.len() - 1].join(".");
            match self.index.get(&parent_code) {
                Some(&parent_idx) => self.nodes[parent_idx].children.push(idx),
                None => {
                    warn!("parent {} not found for {}, attaching to chapter", parent_code, code);
                    self.warnings.push(ParseWarning::new(
                        WarningKind::ParentNotFound,
                        Some(code),
                        format!("parent {parent_code} not found for {code}"),
                    ));
                    self.nodes[chapter_idx].children.push(idx);
                }
            }
        }

        self.index.insert(code.to_string(), idx);
        self.last_code = Some(code.to_string());
    }

    /// Create any missing ancestor levels for the code, so the tree stays
    /// contiguous from chapter to leaf whatever the observed code sequence.
    /// Synthetic levels get a generic name and the generated flag; under an
    /// adopted code they inherit the adopted flag too.
    fn ensure_intermediate_levels(&mut self, code: &str, adopted: bool) {
        let parts: Vec<&str> = code.split('.').collect();
        if parts.len() <= 2 {
            return;
        }
        let Some(chapter_idx) = self.current_chapter else {
            return;
        };

        for depth in 2..parts.len() {
            let level_code = parts[..depth].join(".");
            if self.index.contains_key(&level_code) {
                continue;
            }

            info!("creating intermediate level: {}", level_code);
            self.warnings.push(ParseWarning::new(
                WarningKind::GeneratedLevel,
                Some(&level_code),
                format!("intermediate level {level_code} synthesized"),
            ));

            let idx = self.nodes.len();
            let mut node = NodeData::new(&level_code, &format!("SUBCAPÍTULO {level_code}"));
            node.generated = true;
            node.adopted = adopted;
            self.nodes.push(node);

            if depth == 2 {
                self.nodes[chapter_idx].children.push(idx);
            } else {
                let parent_code = parts[..depth - 1].join(".");
                match self.index.get(&parent_code) {
                    Some(&parent_idx) => self.nodes[parent_idx].children.push(idx),
                    None => {
                        warn!(
                            "parent {} not found, attaching {} to chapter",
                            parent_code, level_code
                        );
                        self.nodes[chapter_idx].children.push(idx);
                    }
                }
            }

            self.index.insert(level_code, idx);
        }
    }

    /// Assign a declared total. The target is the explicit code when given,
    /// else the last structural code seen. A sub-chapter-like total for a
    /// dotted code that was never declared creates the node on the fly.
    pub fn process_total(&mut self, amount_text: &str, explicit_code: Option<&str>, hint: Option<TotalHint>) {
        let Some(target) = explicit_code
            .map(|c| c.to_string())
            .or_else(|| self.last_code.clone())
        else {
            warn!("TOTAL line with no resolvable code");
            self.warnings.push(ParseWarning::new(
                WarningKind::TotalWithoutCode,
                None,
                "TOTAL line before any structural code".to_string(),
            ));
            return;
        };

        let Some(amount) = parse_spanish(amount_text) else {
            warn!("unparsable total amount '{}' for {}", amount_text, target);
            self.warnings.push(ParseWarning::new(
                WarningKind::TotalWithoutAmount,
                Some(&target),
                format!("could not parse amount '{amount_text}'"),
            ));
            return;
        };

        if !self.index.contains_key(&target) {
            if let Some(hint) = hint {
                if hint.is_subchapter_like() && target.contains('.') {
                    info!("creating sub-chapter from TOTAL line: {}", target);
                    let name = format!("{} {}", hint.label(), target);
                    self.process_subchapter(&target, &name);
                }
            }
        }

        match self.index.get(&target) {
            Some(&idx) => {
                debug!("total: {} = {}", target, amount);
                self.nodes[idx].total = Some(amount);
            }
            None => {
                warn!("node not found for total: {}", target);
                self.warnings.push(ParseWarning::new(
                    WarningKind::TotalWithoutCode,
                    Some(&target),
                    format!("no node for total {target}"),
                ));
            }
        }
    }

    pub fn push_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    /// Depth-first post-pass: keep declared totals where present, else sum
    /// the children; childless nodes without a total get zero. Every node
    /// ends numeric.
    pub fn compute_missing_totals(&mut self) {
        let chapters = self.chapters.clone();
        for idx in chapters {
            compute_node_total(&mut self.nodes, idx);
        }
    }

    /// Consume the builder into the nested output tree plus warnings.
    pub fn finish(self) -> (StructureTree, Vec<ParseWarning>) {
        let tree = StructureTree {
            chapters: self
                .chapters
                .iter()
                .map(|&idx| to_structure_node(&self.nodes, idx))
                .collect(),
        };
        (tree, self.warnings)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_node_total(nodes: &mut [NodeData], idx: usize) -> Decimal {
    let children = nodes[idx].children.clone();
    let mut sum = Decimal::ZERO;
    for child in &children {
        sum += compute_node_total(nodes, *child);
    }

    if let Some(total) = nodes[idx].total {
        return total;
    }

    let total = if children.is_empty() { Decimal::ZERO } else { sum };
    nodes[idx].total = Some(total);
    total
}

fn to_structure_node(nodes: &[NodeData], idx: usize) -> StructureNode {
    let data = &nodes[idx];
    StructureNode {
        code: data.code.clone(),
        name: data.name.clone(),
        children: data
            .children
            .iter()
            .map(|&child| to_structure_node(nodes, child))
            .collect(),
        total: data.total,
        generated: data.generated,
        adopted: data.adopted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_chapter_and_subchapter() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "MOVIMIENTO DE TIERRAS");
        b.process_subchapter("01.01", "EXCAVACIONES");
        let (tree, warnings) = b.finish();

        assert_eq!(tree.chapters.len(), 1);
        assert_eq!(tree.chapters[0].children[0].code, "01.01");
        assert!(!tree.chapters[0].children[0].adopted);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_orphan_subchapter_dropped() {
        let mut b = TreeBuilder::new();
        b.process_subchapter("01.01", "EXCAVACIONES");
        let (tree, warnings) = b.finish();

        assert!(tree.chapters.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::OrphanSubchapter);
    }

    #[test]
    fn test_forced_adoption() {
        let mut b = TreeBuilder::new();
        b.process_chapter("C01", "DEMOLICIONES");
        b.process_subchapter("C08.01", "INSTALACIONES");
        let (tree, warnings) = b.finish();

        let sub = &tree.chapters[0].children[0];
        assert_eq!(sub.code, "C08.01");
        assert!(sub.adopted);
        assert!(warnings.iter().any(|w| w.kind == WarningKind::AdoptedNode));
    }

    #[test]
    fn test_intermediate_level_synthesis() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_subchapter("01.02.03", "ZANJAS");
        let (tree, warnings) = b.finish();

        let mid = &tree.chapters[0].children[0];
        assert_eq!(mid.code, "01.02");
        assert_eq!(mid.name, "SUBCAPÍTULO 01.02");
        assert!(mid.generated);
        assert_eq!(mid.children[0].code, "01.02.03");
        assert!(warnings.iter().any(|w| w.kind == WarningKind::GeneratedLevel));
    }

    #[test]
    fn test_adopted_intermediate_inherits_flag() {
        let mut b = TreeBuilder::new();
        b.process_chapter("C01", "DEMOLICIONES");
        b.process_subchapter("C08.08.01", "CUADROS");
        let (tree, _) = b.finish();

        let mid = &tree.chapters[0].children[0];
        assert_eq!(mid.code, "C08.08");
        assert!(mid.generated);
        assert!(mid.adopted);
    }

    #[test]
    fn test_total_explicit_and_last_code() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_subchapter("01.01", "EXCAVACIONES");
        b.process_total("1.234,56", Some("01"), Some(TotalHint::Chapter));
        b.process_total("500,00", None, None); // applies to 01.01
        let (tree, _) = b.finish();

        assert_eq!(tree.chapters[0].total, Some(dec!(1234.56)));
        assert_eq!(tree.chapters[0].children[0].total, Some(dec!(500.00)));
    }

    #[test]
    fn test_total_creates_subchapter_on_the_fly() {
        let mut b = TreeBuilder::new();
        b.process_chapter("02", "INSTALACIONES");
        b.process_total("4.500,00", Some("02.03"), Some(TotalHint::Subchapter));
        let (tree, _) = b.finish();

        let sub = &tree.chapters[0].children[0];
        assert_eq!(sub.code, "02.03");
        assert_eq!(sub.name, "SUBCAPÍTULO 02.03");
        assert_eq!(sub.total, Some(dec!(4500.00)));
    }

    #[test]
    fn test_total_chapter_hint_does_not_create_node() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_total("9,99", Some("05"), Some(TotalHint::Chapter));
        let (tree, warnings) = b.finish();

        assert_eq!(tree.chapters.len(), 1);
        assert!(warnings.iter().any(|w| w.kind == WarningKind::TotalWithoutCode));
    }

    #[test]
    fn test_unparsable_amount_is_soft() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_total("..........", Some("01"), None);
        let (tree, warnings) = b.finish();

        assert_eq!(tree.chapters[0].total, None);
        assert!(warnings.iter().any(|w| w.kind == WarningKind::TotalWithoutAmount));
    }

    #[test]
    fn test_compute_missing_totals_aggregates() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_subchapter("01.01", "A");
        b.process_subchapter("01.02", "B");
        b.process_total("100,00", Some("01.01"), None);
        b.process_total("50,50", Some("01.02"), None);
        b.compute_missing_totals();
        let (tree, _) = b.finish();

        assert_eq!(tree.chapters[0].total, Some(dec!(150.50)));
    }

    #[test]
    fn test_declared_total_wins_over_aggregate() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_subchapter("01.01", "A");
        b.process_total("100,00", Some("01.01"), None);
        b.process_total("999,99", Some("01"), None);
        b.compute_missing_totals();
        let (tree, _) = b.finish();

        assert_eq!(tree.chapters[0].total, Some(dec!(999.99)));
    }

    #[test]
    fn test_childless_node_gets_zero() {
        let mut b = TreeBuilder::new();
        b.process_chapter("01", "OBRA CIVIL");
        b.process_subchapter("01.01", "A");
        b.compute_missing_totals();
        let (tree, _) = b.finish();

        assert_eq!(tree.chapters[0].children[0].total, Some(dec!(0)));
        assert_eq!(tree.chapters[0].total, Some(dec!(0)));
    }
}
