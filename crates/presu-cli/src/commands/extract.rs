use presu_core::extraction::pdftotext::PdftotextExtractor;
use presu_core::extraction::DocumentExtractor;
use std::path::PathBuf;

pub fn run(
    pdf_file: PathBuf,
    owner: u64,
    document: u64,
    cache_dir: Option<PathBuf>,
    output_file: Option<PathBuf>,
) -> Result<(), presu_core::error::PresuError> {
    let backend = PdftotextExtractor::new();
    let mut extractor = DocumentExtractor::new(owner, document);
    if let Some(dir) = cache_dir {
        extractor = extractor.with_cache_dir(dir);
    }

    let result = extractor.extract(&backend, &pdf_file)?;

    match output_file {
        Some(path) => {
            let mut text = result.lines.join("\n");
            text.push('\n');
            std::fs::write(&path, text)?;
            eprintln!("{} line(s) written to {}", result.lines.len(), path.display());
            if let Some(title) = &result.title {
                eprintln!("  title: {title}");
            }
            if result.from_cache {
                eprintln!("  (from cache)");
            }
        }
        None => {
            for line in &result.lines {
                println!("{line}");
            }
        }
    }

    Ok(())
}
