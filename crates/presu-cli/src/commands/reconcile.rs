use presu_core::model::{LineItem, StructureTree};
use presu_core::normalize;
use presu_core::reconcile::{self, DiscrepancyRule};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::output;

pub fn run(
    tree_file: PathBuf,
    items_file: PathBuf,
    rule: &str,
    output_format: &str,
) -> Result<(), presu_core::error::PresuError> {
    let tree: StructureTree = serde_json::from_slice(&std::fs::read(&tree_file)?)?;
    let mut items: HashMap<String, Vec<LineItem>> =
        serde_json::from_slice(&std::fs::read(&items_file)?)?;
    for list in items.values_mut() {
        for item in list.iter_mut() {
            normalize::normalize_item(item);
        }
    }

    let rule = match rule {
        "absolute" => DiscrepancyRule::absolute_default(),
        _ => DiscrepancyRule::relative_default(),
    };

    let report = reconcile::reconcile(&tree, &items, rule);

    match output_format {
        "json" => output::json::print(&serde_json::to_value(&report)?)?,
        _ => output::table::print_report(&report),
    }

    Ok(())
}
