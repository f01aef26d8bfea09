//! Structure parser for the IMPLICIT format: documents that mark structure
//! with bare codes ("01 NOMBRE", "01.04 NOMBRE") and no keywords. More
//! permissive than the explicit variant, so it leans on unit-word checks
//! to keep item rows out of the tree.

use crate::model::{ParseWarning, StructureTree};
use crate::normalize::is_unit_token;
use crate::structure::builder::TreeBuilder;
use regex::Regex;
use std::sync::LazyLock;

/// "01 NOMBRE" or "C01 NOMBRE". The `[A-Z]?\d{1,2}` code shape keeps long
/// item codes like U01AB100 from reading as chapters.
static CHAPTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]?\d{1,2})\s+([A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑa-záéíóúñ0-9\s\-/.,:;()]+)$").unwrap()
});

/// "01.04 NOMBRE" or "C08.01 NOMBRE".
static SUBCHAPTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]?\d{1,2}(?:\.\d{1,2})+)\s+([A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑa-záéíóúñ0-9\s\-/.,:;()]+)$")
        .unwrap()
});

/// "TOTAL 01.04....... 12.345,67". Same separator guard as the explicit
/// parser: a bare "TOTAL 9.876,54" must not be misread as a coded total.
static TOTAL_DOTTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^TOTAL\s+([A-Z]?\d{1,2}(?:\.\d{1,2})*)(?:\s[\s.]*|\.{3,}[\s.]*)(\d{1,3}(?:\.\d{3})*,\d{2})\s*$",
    )
    .unwrap()
});

/// "TOTAL 12.345,67".
static TOTAL_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^TOTAL\s+([\d.,]+)\s*$").unwrap());

pub fn parse(lines: &[String]) -> (StructureTree, Vec<ParseWarning>) {
    log::info!("implicit structure parser: {} lines", lines.len());

    let mut builder = TreeBuilder::new();

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = CHAPTER_RE.captures(line) {
            let code = &caps[1];
            let name = caps[2].trim();
            if !chapter_rejected(code, name) {
                builder.process_chapter(code, name);
            }
            continue;
        }

        if let Some(caps) = SUBCHAPTER_RE.captures(line) {
            let code = &caps[1];
            let name = caps[2].trim();
            // A unit word followed by more text marks an item row wearing a
            // sub-chapter shape: "04.01 UD SEGURIDAD Y SALUD".
            let words: Vec<&str> = name.split_whitespace().collect();
            if words.len() > 1 && is_unit_token(words[0]) {
                log::debug!("rejected as item row: {} {}", code, name);
                continue;
            }
            builder.process_subchapter(code, name);
            continue;
        }

        if let Some(caps) = TOTAL_DOTTED_RE.captures(line) {
            let code = caps[1].to_string();
            builder.process_total(&caps[2], Some(&code), None);
            continue;
        }

        if let Some(caps) = TOTAL_BARE_RE.captures(line) {
            builder.process_total(&caps[1], None, None);
            continue;
        }
    }

    builder.compute_missing_totals();
    builder.finish()
}

fn chapter_rejected(code: &str, name: &str) -> bool {
    if code == "0" || code == "00" {
        return true;
    }
    let lower = name.to_lowercase();
    if lower.contains("página") || lower.contains("pagina") {
        return true;
    }
    // A unit as the first name word means the line is an item row.
    match name.split_whitespace().next() {
        Some(first) if is_unit_token(first) => {
            log::debug!("chapter rejected, looks like item row: {} {}", code, name);
            true
        }
        _ => false,
    }
}
