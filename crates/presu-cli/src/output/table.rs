use presu_core::amounts::format_spanish;
use presu_core::model::StructureNode;
use presu_core::reconcile::ReconcileReport;
use presu_core::BudgetAnalysis;

pub fn print_analysis(analysis: &BudgetAnalysis) {
    if let Some(title) = &analysis.title {
        println!("=== {title} ===\n");
    }
    println!(
        "  type: {}   format: {}",
        analysis.document_type, analysis.format
    );
    if analysis.layout.max_columns > 1 {
        println!(
            "  layout: up to {} columns on {} page(s)",
            analysis.layout.max_columns, analysis.layout.multi_column_pages
        );
    }
    println!();

    if analysis.tree.chapters.is_empty() {
        println!("  (no chapters recovered)");
    }
    for chapter in &analysis.tree.chapters {
        print_node(chapter, 0);
    }

    if !analysis.warnings.is_empty() {
        println!("\n  {} warning(s):", analysis.warnings.len());
        for w in &analysis.warnings {
            println!("    {}", w.message);
        }
    }
}

fn print_node(node: &StructureNode, depth: usize) {
    let indent = "  ".repeat(depth + 1);
    let mut markers = String::new();
    if node.generated {
        markers.push_str(" [generado]");
    }
    if node.adopted {
        markers.push_str(" [adoptado]");
    }
    let total = node
        .total
        .map(format_spanish)
        .unwrap_or_else(|| "-".to_string());
    println!("{indent}{}  {}{}  {}", node.code, node.name, markers, total);

    for child in &node.children {
        print_node(child, depth + 1);
    }
}

pub fn print_report(report: &ReconcileReport) {
    if report.discrepancies.is_empty() {
        println!(
            "No discrepancies across {} node(s)",
            report.nodes_checked
        );
    } else {
        println!(
            "{} discrepancy(ies) across {} node(s):\n",
            report.discrepancies.len(),
            report.nodes_checked
        );

        let max_code = report
            .discrepancies
            .iter()
            .map(|d| d.code.len())
            .max()
            .unwrap_or(6);

        for d in &report.discrepancies {
            println!(
                "  {:<width$}  declared {} / computed {}  (diff {})",
                d.code,
                format_spanish(d.declared),
                format_spanish(d.computed),
                format_spanish(d.difference),
                width = max_code
            );
        }
    }

    if !report.item_mismatches.is_empty() {
        println!(
            "\n{} item(s) whose printed amount disagrees with quantity x price:",
            report.item_mismatches.len()
        );
        for m in &report.item_mismatches {
            println!(
                "  {}  printed {} / computed {}",
                m.code,
                format_spanish(m.printed),
                format_spanish(m.computed)
            );
        }
    }
}
