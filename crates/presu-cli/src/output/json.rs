use presu_core::error::PresuError;
use presu_core::BudgetAnalysis;
use serde_json::json;

pub fn print(value: &serde_json::Value) -> Result<(), PresuError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// JSON view of an analysis, using the same Spanish field names the model
/// types serialize with.
pub fn analysis_value(analysis: &BudgetAnalysis) -> serde_json::Value {
    json!({
        "titulo": analysis.title,
        "tipo": analysis.document_type,
        "formato": analysis.format,
        "capitulos": analysis.tree.chapters,
        "avisos": analysis.warnings,
        "layout": analysis.layout,
        "desde_cache": analysis.from_cache,
    })
}
