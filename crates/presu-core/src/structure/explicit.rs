//! Structure parser for the EXPLICIT format: documents that spell out
//! "CAPÍTULO" and "SUBCAPÍTULO" in the text. Strict by design, a line
//! without the keyword is never a structural header here.

use crate::model::{ParseWarning, StructureTree};
use crate::structure::builder::{TotalHint, TreeBuilder};
use regex::Regex;
use std::sync::LazyLock;

/// "CAPÍTULO 01 NOMBRE" or "CAPÍTULO C01 NOMBRE". The `[A-Z]?\d{1,2}` code
/// shape keeps long item codes like U01AB100 from reading as chapters.
static CHAPTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^CAPÍTULO\s+([A-Z]?\d{1,2})\s+([A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑa-záéíóúñ0-9\s\-/.,:;()]+)$")
        .unwrap()
});

/// "SUBCAPÍTULO 01.04 NOMBRE", "APARTADO C08.01 NOMBRE".
static SUBCHAPTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:SUBCAPÍTULO|APARTADO)\s+([A-Z]?\d{1,2}(?:\.\d{1,2})+)\s+([A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑa-záéíóúñ0-9\s\-/.,:;()]+)$",
    )
    .unwrap()
});

/// Dotted code followed by a unit: an item row, never a sub-chapter.
static ITEM_WITH_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}(?:\.\d{1,2})+)\s+(UD|U|M|M2|M3|ML|KG|T|PA|H|L|P:A)\s+").unwrap()
});

/// "TOTAL SUBCAPÍTULO 01.04.01 ... 12.345,67". The last group is loose on
/// purpose: a dots-only tail means the amount is still pending.
static TOTAL_WITH_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^TOTAL\s+(SUBCAPÍTULO|CAPÍTULO|APARTADO)\s+([A-Z]?[\d.]+)\s+.*?([\d.,]+)\s*$")
        .unwrap()
});

/// "TOTAL 01.04....... 12.345,67" (dotted leader, no type keyword). The
/// separator needs whitespace or a run of leader dots, so a bare
/// "TOTAL 9.876,54" is not misread as code 9 with amount 876,54.
static TOTAL_DOTTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^TOTAL\s+([A-Z]?\d{1,2}(?:\.\d{1,2})*)(?:\s[\s.]*|\.{3,}[\s.]*)(\d{1,3}(?:\.\d{3})*,\d{2})\s*$",
    )
    .unwrap()
});

/// "TOTAL 12.345,67" or a bare "....... 12.345,67" continuation line.
static TOTAL_BARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:TOTAL\s+|[\s.]+)(\d{1,3}(?:\.\d{3})*,\d{2})\s*$").unwrap()
});

/// Summary-table row: "01 MOVIMIENTOS DE TIERRAS....... 58.340,10 2,70".
static SUMMARY_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2})\s+[A-ZÁÉÍÓÚÑ][\sA-ZÁÉÍÓÚÑa-záéíóúñ\-/,;:()]+?[\s.]+(\d{1,3}(?:\.\d{3})*,\d{2})\s+[\d,]+\s*$",
    )
    .unwrap()
});

fn is_numeric_amount(s: &str) -> bool {
    let digits: String = s.chars().filter(|c| !matches!(c, '.' | ',' | ' ')).collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn parse(lines: &[String]) -> (StructureTree, Vec<ParseWarning>) {
    log::info!("explicit structure parser: {} lines", lines.len());

    let mut builder = TreeBuilder::new();
    // Set when a TOTAL line ended in dots only; the amount arrives on a
    // later bare line and applies to the last code seen.
    let mut awaiting_amount = false;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = CHAPTER_RE.captures(line) {
            let code = &caps[1];
            let name = caps[2].trim();
            if chapter_code_rejected(code, name) {
                continue;
            }
            builder.process_chapter(code, name);
            continue;
        }

        // Item rows share the dotted-code shape with sub-chapters and must
        // be ruled out first.
        if ITEM_WITH_UNIT_RE.is_match(line) {
            continue;
        }

        if let Some(caps) = SUBCHAPTER_RE.captures(line) {
            builder.process_subchapter(&caps[1], caps[2].trim());
            continue;
        }

        if let Some(caps) = TOTAL_WITH_CODE_RE.captures(line) {
            let hint = TotalHint::from_keyword(&caps[1]);
            let code = caps[2].to_string();
            let amount = &caps[3];
            if is_numeric_amount(amount) {
                builder.process_total(amount, Some(&code), hint);
            } else {
                log::debug!("total for {} pending on a later line", code);
                awaiting_amount = true;
            }
            continue;
        }

        if let Some(caps) = TOTAL_DOTTED_RE.captures(line) {
            let code = caps[1].to_string();
            builder.process_total(&caps[2], Some(&code), None);
            continue;
        }

        if let Some(caps) = TOTAL_BARE_RE.captures(line) {
            if awaiting_amount {
                builder.process_total(&caps[1], None, None);
                awaiting_amount = false;
                continue;
            }
            if line.to_uppercase().starts_with("TOTAL") {
                builder.process_total(&caps[1], None, None);
                continue;
            }
        }

        if let Some(caps) = SUMMARY_ROW_RE.captures(line) {
            let code = caps[1].to_string();
            log::debug!("summary-row total: chapter {} = {}", code, &caps[2]);
            builder.process_total(&caps[2], Some(&code), None);
            continue;
        }
    }

    builder.compute_missing_totals();
    builder.finish()
}

fn chapter_code_rejected(code: &str, name: &str) -> bool {
    if code == "0" || code == "00" {
        return true;
    }
    let lower = name.to_lowercase();
    lower.contains("página") || lower.contains("pagina")
}
