//! Page-break artifact repair on the extracted line stream.
//!
//! Four passes, applied in order by the extractor: repeated page headers,
//! pagination footers, numeric triples displaced below their TOTAL line,
//! and TOTAL lines whose amount landed on its own line.

use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Header phrases repeated at the top of every page. Generic enough to
/// cover most budget layouts; the document title is detected dynamically.
const KNOWN_HEADERS: [&str; 4] = [
    "PRESUPUESTO",
    "PRESUPUESTO Y MEDICIONES",
    "CÓDIGO RESUMEN CANTIDAD PRECIO IMPORTE",
    "CÓDIGO RESUMEN UDS LONGITUD ANCHURA ALTURA PARCIALES CANTIDAD PRECIO IMPORTE",
];

/// Prefix-matched header variants whose tails differ between documents.
const PARTIAL_HEADERS: [&str; 2] = ["CÓDIGO RESUMEN", "PRESUPUESTO Y"];

const TITLE_EXCLUDED_PREFIXES: [&str; 19] = [
    "CÓDIGO",
    "PRESUPUESTO",
    "CAPÍTULO",
    "SUBCAPÍTULO",
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15",
];

/// Item codes like DEM06, U01AB100, E04SM090, CABLE16, GR0001.
static ITEM_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{2,}[\s\d]").unwrap());

static LABELED_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:PRESUPUESTO|PROYECTO|OBRA)\s*:\s*(.+)$").unwrap());

static PAGINATION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\s*\d+\s*$",
        r"^\s*-\s*\d+\s*-\s*$",
        r"(?i)^\s*página\s+\d+\s*$",
        r"(?i)^\s*pág\.?\s+\d+\s*$",
        r"(?i)^\s*page\s+\d+\s*$",
        r"(?i)^\s*p\.\s*\d+\s*$",
        r"^\s*\d+\s*/\s*\d+\s*$",
        r"^\s*\[\s*\d+\s*\]\s*$",
        r"(?i)^\s*\d+\s+de\s+\w+\s+de\s+\d{4}\s+página\s+\d+\s*$",
        r"(?i)^\s*\d+\s+de\s+\w+\s+de\s+\d{4}\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TOTAL_KEYWORD_NO_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^TOTAL\s+(SUBCAPÍTULO|CAPÍTULO|APARTADO)\s+[A-Z]?\d{1,2}(?:\.\d{1,2})*\s+")
        .unwrap()
});

static TRAILING_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:\.\d{3})*,\d{2}\s*$").unwrap());

static NUMERIC_TRIPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\d{1,3}(?:\.\d{3})*,\d{1,4}\s+\d{1,3}(?:\.\d{3})*,\d{1,4}\s+\d{1,3}(?:\.\d{3})*,\d{1,4}\s*$",
    )
    .unwrap()
});

static HEADER_JUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(ANCHURA|ALTURA|PARCIALES|CANTIDAD|PRECIO|IMPORTE|UDS|LONGITUD|CÓDIGO|RESUMEN|PRESUPUESTO|CÓDIGO\s+RESUMEN)",
    )
    .unwrap()
});

static FRAGMENT_JUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(ANCHURA|ALTURA|PARCIALES|CANTIDAD|PRECIO|IMPORTE|UDS|LONGITUD|CÓDIGO|RESUMEN|PRESUPUESTO\s+Y\s+MEDICIONES|PRESUPUESTO|Página\s+\d+|Pág\.?\s+\d+|\d+,\d+\s+\d+,\d+\s+\d+,\d+|[\d.,\s]+)$",
    )
    .unwrap()
});

static TOTAL_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^TOTAL\s+(?:SUBCAPÍTULO|CAPÍTULO|APARTADO)?\s*[A-Z]?\d{1,2}(?:\.\d{1,2})*\s+[A-ZÁÉÍÓÚÑ][^0-9]*?\.{3,}\s*$",
    )
    .unwrap()
});

static DOTS_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.{10,}\s*(\d{1,3}(?:\.\d{3})*,\d{2})\s*$").unwrap());

static DOTS_LEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.{10,}").unwrap());

static STRUCTURAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}(?:\.\d{1,2})*\s+").unwrap());

fn looks_like_title(line: &str) -> bool {
    line.chars().count() > 30
        && !TITLE_EXCLUDED_PREFIXES.iter().any(|p| line.starts_with(p))
        && !ITEM_CODE_RE.is_match(line)
        && !KNOWN_HEADERS.contains(&line)
}

/// Best-effort document title from the first 10 lines: a long line that is
/// not a standard header or a code, else a labeled "PRESUPUESTO:"-style line.
pub fn detect_title(lines: &[String]) -> Option<String> {
    let head = lines.iter().take(10);
    for line in head.clone() {
        let line = line.trim();
        if looks_like_title(line) {
            return Some(line.to_string());
        }
    }
    for line in head {
        if let Some(caps) = LABELED_TITLE_RE.captures(line.trim()) {
            let title = caps[1].trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}

/// Drop header lines repeated on every page, keeping the first occurrence
/// of each. The document title is detected dynamically from the first 10
/// lines and treated as one more header pattern. TOTAL lines and lines that
/// look like item codes are never filtered, even on a coincidental match.
pub fn remove_repeated_headers(lines: &[String]) -> (Vec<String>, Option<String>) {
    let mut patterns: Vec<String> = KNOWN_HEADERS.iter().map(|s| s.to_string()).collect();
    let mut title: Option<String> = None;

    for line in lines.iter().take(10) {
        let line = line.trim();
        if looks_like_title(line) && !patterns.iter().any(|p| p == line) {
            if title.is_none() {
                title = Some(line.to_string());
                info!("document title detected: '{}'", line);
            }
            patterns.push(line.to_string());
        }
    }
    if title.is_none() {
        title = detect_title(lines);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        let trimmed = line.trim();

        if trimmed.to_uppercase().starts_with("TOTAL") || ITEM_CODE_RE.is_match(trimmed) {
            out.push(line.clone());
            continue;
        }

        let pattern_key = if patterns.iter().any(|p| p == trimmed) {
            Some(trimmed.to_string())
        } else if PARTIAL_HEADERS.iter().any(|p| trimmed.starts_with(p)) {
            Some(trimmed.to_string())
        } else {
            None
        };

        match pattern_key {
            Some(key) => {
                if seen.insert(key) {
                    out.push(line.clone());
                } else {
                    debug!("repeated header filtered: '{}'", trimmed);
                }
            }
            None => out.push(line.clone()),
        }
    }

    (out, title)
}

/// Drop pagination-footer lines (bare numbers, "Página N", "N / M", dates)
/// anywhere in the stream.
pub fn remove_pagination_footers(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            !PAGINATION_RES.iter().any(|re| re.is_match(trimmed))
        })
        .cloned()
        .collect()
}

/// Move a last-item numeric triple that a page break pushed BELOW its
/// `TOTAL CAPÍTULO/SUBCAPÍTULO` line back above it, keeping the lines in
/// between. Lookahead is 8 lines; a dots-leader line ends the search since
/// that is the chapter amount, not item data.
pub fn reorder_displaced_triples(lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if TOTAL_KEYWORD_NO_AMOUNT_RE.is_match(line) && !TRAILING_AMOUNT_RE.is_match(line) {
            let mut triple_idx = None;
            for j in (i + 1)..(i + 8).min(lines.len()) {
                let next = lines[j].trim();
                if next.is_empty() || HEADER_JUNK_RE.is_match(next) {
                    continue;
                }
                if NUMERIC_TRIPLE_RE.is_match(next) {
                    triple_idx = Some(j);
                    break;
                }
                if DOTS_LEADER_RE.is_match(next) {
                    break;
                }
            }

            if let Some(j) = triple_idx {
                info!("displaced item triple moved above TOTAL: '{}'", lines[j].trim());
                out.push(lines[j].clone());
                for line in lines.iter().take(j).skip(i) {
                    out.push(line.clone());
                }
                i = j + 1;
                continue;
            }
        }

        out.push(lines[i].clone());
        i += 1;
    }

    out
}

/// Splice a TOTAL line's amount back on when extraction dropped it onto its
/// own "dots + amount" line, discarding the junk lines skipped over.
/// Lookahead is 10 lines; if no amount is found the TOTAL is kept unfused
/// and a warning is logged, bottom-up aggregation covers the node later.
pub fn fuse_fragmented_totals(lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if TOTAL_FRAGMENT_RE.is_match(line) {
            let mut found: Option<(usize, String)> = None;
            for j in (i + 1)..(i + 10).min(lines.len()) {
                let next = lines[j].trim();
                if let Some(caps) = DOTS_AMOUNT_RE.captures(next) {
                    found = Some((j, caps[1].to_string()));
                    break;
                }
                if next.is_empty() || FRAGMENT_JUNK_RE.is_match(next) {
                    continue;
                }
                // Another significant line means the amount is gone; stop
                // rather than fuse the wrong number.
                if next.starts_with("TOTAL") || STRUCTURAL_CODE_RE.is_match(next) {
                    break;
                }
            }

            match found {
                Some((j, amount)) => {
                    let fused = format!("{} {}", line.trim_end_matches('.'), amount);
                    info!("fragmented TOTAL fused: '{}'", fused);
                    out.push(fused);
                    i = j + 1;
                    continue;
                }
                None => {
                    warn!("TOTAL line without amount within lookahead: '{}'", line);
                    out.push(lines[i].clone());
                }
            }
        } else {
            out.push(lines[i].clone());
        }

        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_title_long_line() {
        let input = lines(&[
            "PRESUPUESTO",
            "REHABILITACIÓN DEL MERCADO MUNICIPAL DE ABASTOS",
            "CÓDIGO RESUMEN CANTIDAD PRECIO IMPORTE",
        ]);
        assert_eq!(
            detect_title(&input).as_deref(),
            Some("REHABILITACIÓN DEL MERCADO MUNICIPAL DE ABASTOS")
        );
    }

    #[test]
    fn test_detect_title_labeled_fallback() {
        let input = lines(&["PROYECTO: Nave industrial", "CAPÍTULO 01 DEMOLICIONES"]);
        assert_eq!(detect_title(&input).as_deref(), Some("Nave industrial"));
    }

    #[test]
    fn test_repeated_headers_keep_first() {
        let input = lines(&[
            "PRESUPUESTO Y MEDICIONES",
            "CAPÍTULO 01 DEMOLICIONES",
            "PRESUPUESTO Y MEDICIONES",
            "CAPÍTULO 02 CIMENTACIONES",
            "PRESUPUESTO Y MEDICIONES",
        ]);
        let (out, _) = remove_repeated_headers(&input);
        assert_eq!(
            out,
            lines(&[
                "PRESUPUESTO Y MEDICIONES",
                "CAPÍTULO 01 DEMOLICIONES",
                "CAPÍTULO 02 CIMENTACIONES",
            ])
        );
    }

    #[test]
    fn test_dynamic_title_removed_on_repeat() {
        let input = lines(&[
            "REHABILITACIÓN DEL MERCADO MUNICIPAL DE ABASTOS",
            "CAPÍTULO 01 DEMOLICIONES",
            "REHABILITACIÓN DEL MERCADO MUNICIPAL DE ABASTOS",
        ]);
        let (out, title) = remove_repeated_headers(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(
            title.as_deref(),
            Some("REHABILITACIÓN DEL MERCADO MUNICIPAL DE ABASTOS")
        );
    }

    #[test]
    fn test_total_lines_never_filtered() {
        let input = lines(&[
            "TOTAL CAPÍTULO 01 DEMOLICIONES....... 1.234,56",
            "TOTAL CAPÍTULO 01 DEMOLICIONES....... 1.234,56",
        ]);
        let (out, _) = remove_repeated_headers(&input);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_item_code_lines_never_filtered() {
        // An item line longer than 30 chars must not become a title pattern.
        let input = lines(&[
            "E04SM090 m2 SOLERA DE HORMIGÓN ARMADO HA-25",
            "E04SM090 m2 SOLERA DE HORMIGÓN ARMADO HA-25",
        ]);
        let (out, _) = remove_repeated_headers(&input);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_pagination_footers() {
        let input = lines(&[
            "CAPÍTULO 01 DEMOLICIONES",
            "23",
            "- 5 -",
            "Página 12",
            "23 / 89",
            "8 de mayo de 2024 Página 1",
            "01.01 excavación 23",
        ]);
        let out = remove_pagination_footers(&input);
        assert_eq!(out, lines(&["CAPÍTULO 01 DEMOLICIONES", "01.01 excavación 23"]));
    }

    #[test]
    fn test_reorder_displaced_triple() {
        let input = lines(&[
            "Solera Edificación instalaciones 1 28,00 0,10 2,80",
            "TOTAL CAPÍTULO 02 CIMENTACIONES...................",
            "ANCHURA ALTURA PARCIALES CANTIDAD PRECIO IMPORTE",
            "44,83 20,92 937,84",
            "......................... 12.050,55",
        ]);
        let out = reorder_displaced_triples(&input);
        assert_eq!(out[1], "44,83 20,92 937,84");
        assert!(out[2].starts_with("TOTAL CAPÍTULO 02"));
    }

    #[test]
    fn test_fuse_fragmented_total() {
        let input = lines(&[
            "TOTAL SUBCAPÍTULO 02.03 INSTALACIÓN ELÉCTRICA...........",
            "CÓDIGO RESUMEN CANTIDAD PRECIO IMPORTE",
            "...................................... 4.500,00",
            "CAPÍTULO 03 ESTRUCTURAS",
        ]);
        let out = fuse_fragmented_totals(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            "TOTAL SUBCAPÍTULO 02.03 INSTALACIÓN ELÉCTRICA 4.500,00"
        );
        assert_eq!(out[1], "CAPÍTULO 03 ESTRUCTURAS");
    }

    #[test]
    fn test_fuse_gives_up_on_structural_line() {
        let input = lines(&[
            "TOTAL SUBCAPÍTULO 02.03 INSTALACIÓN ELÉCTRICA...........",
            "03.01 RED DE SANEAMIENTO",
            "...................................... 4.500,00",
        ]);
        let out = fuse_fragmented_totals(&input);
        // TOTAL kept unfused; nothing dropped.
        assert_eq!(out.len(), 3);
        assert!(out[0].ends_with("..........."));
    }
}
