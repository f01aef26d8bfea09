//! Declared-vs-computed totals reconciliation.
//!
//! Item amounts are rounded per item before summation (accounting method),
//! never on the aggregate, so cent drift cannot accumulate. Declared totals
//! are always treated as ground truth; the computed side is the quantity
//! under suspicion.

use crate::model::{LineItem, StructureNode, StructureTree};
use crate::normalize::validate_amount;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Threshold policy for flagging a declared/computed mismatch.
///
/// The parse-time check uses the relative rule; the persisted-data audit
/// uses the absolute-cents rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscrepancyRule {
    /// Report when |declared - computed| / |declared| exceeds the ratio.
    Relative(Decimal),
    /// Report when |declared - computed| reaches the given amount.
    AbsoluteCents(Decimal),
}

impl DiscrepancyRule {
    pub fn relative_default() -> Self {
        DiscrepancyRule::Relative(Decimal::new(1, 3)) // 0.1%
    }

    pub fn absolute_default() -> Self {
        DiscrepancyRule::AbsoluteCents(Decimal::new(5, 2)) // 0.05
    }

    fn violated(&self, declared: Decimal, computed: Decimal) -> bool {
        let diff = (declared - computed).abs();
        match self {
            DiscrepancyRule::Relative(ratio) => {
                if declared.is_zero() {
                    !diff.is_zero()
                } else {
                    diff / declared.abs() > *ratio
                }
            }
            DiscrepancyRule::AbsoluteCents(cents) => diff >= *cents,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Discrepancy {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "total_declarado")]
    pub declared: Decimal,
    #[serde(rename = "total_calculado")]
    pub computed: Decimal,
    #[serde(rename = "diferencia")]
    pub difference: Decimal,
}

/// A line item whose printed amount disagrees with quantity x price.
#[derive(Debug, Clone, Serialize)]
pub struct ItemMismatch {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "importe_impreso")]
    pub printed: Decimal,
    #[serde(rename = "importe_calculado")]
    pub computed: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    #[serde(rename = "discrepancias")]
    pub discrepancies: Vec<Discrepancy>,
    #[serde(rename = "partidas_inconsistentes")]
    pub item_mismatches: Vec<ItemMismatch>,
    #[serde(rename = "nodos_revisados")]
    pub nodes_checked: usize,
}

/// Per-item contribution: round(quantity x price, 2).
pub fn item_amount(item: &LineItem) -> Decimal {
    (item.quantity * item.price).round_dp(2)
}

/// Compare every node's declared total against the bottom-up aggregate of
/// its items and descendants. `items_by_node` maps a node code to the
/// partidas directly under it.
pub fn reconcile(
    tree: &StructureTree,
    items_by_node: &HashMap<String, Vec<LineItem>>,
    rule: DiscrepancyRule,
) -> ReconcileReport {
    let mut report = ReconcileReport {
        discrepancies: Vec::new(),
        item_mismatches: Vec::new(),
        nodes_checked: 0,
    };

    for chapter in &tree.chapters {
        check_node(chapter, items_by_node, rule, &mut report);
    }

    report
}

/// Returns the node's computed total while recording discrepancies.
/// A child's mismatch surfaces in every ancestor's aggregate too, which is
/// what makes fixes propagate upward.
fn check_node(
    node: &StructureNode,
    items_by_node: &HashMap<String, Vec<LineItem>>,
    rule: DiscrepancyRule,
    report: &mut ReconcileReport,
) -> Decimal {
    let mut computed = Decimal::ZERO;
    for child in &node.children {
        computed += check_node(child, items_by_node, rule, report);
    }
    if let Some(items) = items_by_node.get(&node.code) {
        for item in items {
            let recomputed = item_amount(item);
            // The recomputed value enters the aggregate either way; the
            // printed amount is only audited, within a cent.
            if !validate_amount(item.quantity, item.price, item.amount, Decimal::new(1, 2)) {
                log::warn!(
                    "item {}: printed amount {} vs computed {}",
                    item.code,
                    item.amount,
                    recomputed
                );
                report.item_mismatches.push(ItemMismatch {
                    code: item.code.clone(),
                    printed: item.amount,
                    computed: recomputed,
                });
            }
            computed += recomputed;
        }
    }

    report.nodes_checked += 1;

    match node.total {
        Some(declared) => {
            if rule.violated(declared, computed) {
                log::warn!(
                    "discrepancy at {}: declared {} vs computed {}",
                    node.code,
                    declared,
                    computed
                );
                report.discrepancies.push(Discrepancy {
                    code: node.code.clone(),
                    name: node.name.clone(),
                    declared,
                    computed,
                    difference: declared - computed,
                });
            }
            // The document's own number is authoritative upstream.
            declared
        }
        None => computed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StructureNode;
    use rust_decimal_macros::dec;

    fn item(code: &str, quantity: Decimal, price: Decimal) -> LineItem {
        LineItem {
            code: code.to_string(),
            unit: "m2".to_string(),
            summary: "PARTIDA".to_string(),
            quantity,
            price,
            amount: (quantity * price).round_dp(2),
        }
    }

    fn chapter_with_total(code: &str, total: Decimal) -> StructureTree {
        let mut node = StructureNode::new(code, "CAPÍTULO DE PRUEBA");
        node.total = Some(total);
        StructureTree {
            chapters: vec![node],
        }
    }

    #[test]
    fn test_per_item_rounding() {
        // Each 0.333 rounds to 0.33 before summing: 0.99, not round(0.999).
        let items = vec![
            item("A1", dec!(1), dec!(0.333)),
            item("A2", dec!(1), dec!(0.333)),
            item("A3", dec!(1), dec!(0.333)),
        ];
        let total: Decimal = items.iter().map(item_amount).sum();
        assert_eq!(total, dec!(0.99));
    }

    #[test]
    fn test_matching_totals_no_discrepancy() {
        let tree = chapter_with_total("01", dec!(1062.50));
        let mut items = HashMap::new();
        items.insert("01".to_string(), vec![item("E1", dec!(1250), dec!(0.85))]);

        let report = reconcile(&tree, &items, DiscrepancyRule::relative_default());
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.nodes_checked, 1);
    }

    #[test]
    fn test_relative_rule_tolerates_small_drift() {
        // 0.06% off: inside the 0.1% relative threshold.
        let tree = chapter_with_total("01", dec!(1000.00));
        let mut items = HashMap::new();
        items.insert("01".to_string(), vec![item("E1", dec!(1), dec!(999.40))]);

        let report = reconcile(&tree, &items, DiscrepancyRule::relative_default());
        assert!(report.discrepancies.is_empty());
    }

    #[test]
    fn test_absolute_rule_flags_same_drift() {
        let tree = chapter_with_total("01", dec!(1000.00));
        let mut items = HashMap::new();
        items.insert("01".to_string(), vec![item("E1", dec!(1), dec!(999.40))]);

        let report = reconcile(&tree, &items, DiscrepancyRule::absolute_default());
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].difference, dec!(0.60));
    }

    #[test]
    fn test_declared_total_authoritative_upward() {
        // The sub-chapter declares 500 but its items compute 400. The
        // chapter declares 500 and must reconcile against the child's
        // DECLARED figure, so only the sub-chapter is flagged.
        let mut sub = StructureNode::new("01.01", "SUB");
        sub.total = Some(dec!(500.00));
        let mut chapter = StructureNode::new("01", "CAP");
        chapter.total = Some(dec!(500.00));
        chapter.children.push(sub);
        let tree = StructureTree {
            chapters: vec![chapter],
        };

        let mut items = HashMap::new();
        items.insert("01.01".to_string(), vec![item("E1", dec!(1), dec!(400))]);

        let report = reconcile(&tree, &items, DiscrepancyRule::relative_default());
        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].code, "01.01");
    }

    #[test]
    fn test_printed_amount_mismatch_flagged() {
        let tree = chapter_with_total("01", dec!(20.00));
        let mut bad = item("E1", dec!(10), dec!(2));
        bad.amount = dec!(25.00);
        let mut items = HashMap::new();
        items.insert("01".to_string(), vec![bad]);

        let report = reconcile(&tree, &items, DiscrepancyRule::relative_default());
        assert_eq!(report.item_mismatches.len(), 1);
        assert_eq!(report.item_mismatches[0].code, "E1");
        assert_eq!(report.item_mismatches[0].printed, dec!(25.00));
        assert_eq!(report.item_mismatches[0].computed, dec!(20.00));
        // The aggregate uses the recomputed amount, so the node still matches.
        assert!(report.discrepancies.is_empty());
    }

    #[test]
    fn test_printed_amount_within_a_cent_tolerated() {
        let tree = chapter_with_total("01", dec!(20.00));
        let mut close = item("E1", dec!(10), dec!(2));
        close.amount = dec!(20.01);
        let mut items = HashMap::new();
        items.insert("01".to_string(), vec![close]);

        let report = reconcile(&tree, &items, DiscrepancyRule::relative_default());
        assert!(report.item_mismatches.is_empty());
    }

    #[test]
    fn test_missing_declared_total_not_flagged() {
        let tree = StructureTree {
            chapters: vec![StructureNode::new("01", "CAP")],
        };
        let report = reconcile(&tree, &HashMap::new(), DiscrepancyRule::relative_default());
        assert!(report.discrepancies.is_empty());
        assert_eq!(report.nodes_checked, 1);
    }
}
