use presu_core::extraction::pdftotext::PdftotextExtractor;
use presu_core::extraction::DocumentExtractor;
use std::path::PathBuf;

use crate::output;

pub fn run(
    pdf_file: PathBuf,
    owner: u64,
    document: u64,
    cache_dir: Option<PathBuf>,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), presu_core::error::PresuError> {
    let backend = PdftotextExtractor::new();
    let mut extractor = DocumentExtractor::new(owner, document);
    if let Some(dir) = cache_dir {
        extractor = extractor.with_cache_dir(dir);
    }

    let analysis = presu_core::parse_budget(&extractor, &backend, &pdf_file)?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&output::json::analysis_value(&analysis))?;
            std::fs::write(&path, json)?;
            eprintln!(
                "{} chapter(s) recovered, written to {}",
                analysis.tree.chapters.len(),
                path.display()
            );
            for w in &analysis.warnings {
                eprintln!("  warning: {}", w.message);
            }
        }
        None => match output_format {
            "json" => output::json::print(&output::json::analysis_value(&analysis))?,
            _ => output::table::print_analysis(&analysis),
        },
    }

    Ok(())
}
