//! On-disk cache of extracted line lists, keyed by (owner, document).
//!
//! Plain UTF-8 text, one extracted line per line. Presence of the file
//! short-circuits re-extraction entirely.

use log::warn;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

static ID_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^u\d+_p\d+_(.+)$").unwrap());

/// Cache file name for a document: `u{owner}_p{document}_{name}_extracted.txt`.
///
/// The PDF may itself have been stored with an id prefix (either the current
/// `u1_p2_name` form or the older `1_name` form); those are stripped first so
/// the same source document always maps to the same cache entry.
pub fn cache_file_name(owner_id: u64, document_id: u64, pdf_path: &Path) -> String {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let cleaned = if let Some(caps) = ID_PREFIX_RE.captures(&stem) {
        caps[1].to_string()
    } else {
        match stem.split_once('_') {
            Some((first, rest)) if first.parse::<u64>() == Ok(owner_id) => rest.to_string(),
            _ => stem,
        }
    };

    format!("u{owner_id}_p{document_id}_{cleaned}_extracted.txt")
}

/// Read a cached extraction if present. Unreadable cache files are treated
/// as a miss so extraction runs again.
pub fn read_cache(path: &Path) -> Option<Vec<String>> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => Some(content.lines().map(|l| l.to_string()).collect()),
        Err(e) => {
            warn!("unreadable extraction cache {}: {}", path.display(), e);
            None
        }
    }
}

pub fn write_cache(path: &Path, lines: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}
