//! PDF extraction backend using pdftotext (from poppler-utils).
//!
//! Two passes over the document: `pdftotext -layout` for whitespace-aligned
//! text in reading order, and `pdftotext -bbox` for word bounding boxes fed
//! to the column detector. Pages classified as genuinely multi-column are
//! re-extracted column by column with `-x/-W` crops.

use crate::error::PresuError;
use crate::extraction::columns::{self, LayoutInfo};
use crate::extraction::{PageContent, PdfExtractor, Word};
use log::{debug, info};
use std::path::Path;
use std::process::Command;

/// Header keywords that mark a standard tabular budget page. Such pages can
/// trip the column detector (wide aligned numeric columns look like gaps)
/// but must be read whole, or single logical rows get split apart.
const BUDGET_PAGE_MARKERS: [&str; 6] = [
    "CÓDIGO RESUMEN CANTIDAD PRECIO IMPORTE",
    "CODIGO RESUMEN CANTIDAD PRECIO IMPORTE",
    "CAPÍTULO C",
    "CAPITULO C",
    "SUBCAPÍTULO",
    "SUBCAPITULO",
];

pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<PageContent>, PresuError> {
        let layout_text = run_pdftotext(pdf_path, &["-layout"])?;
        // pdftotext uses form feed \x0c as page separator
        let layout_pages: Vec<Vec<String>> = layout_text
            .split('\x0c')
            .map(page_lines)
            .collect();

        let word_pages = extract_word_pages(pdf_path)?;

        let mut pages = Vec::new();
        for (i, geom) in word_pages.iter().enumerate() {
            let page_number = i + 1;
            let layout_lines = layout_pages.get(i).cloned().unwrap_or_default();
            let layout = columns::analyze_layout(&geom.words);

            let lines = if layout.is_multi_column() && !is_budget_table_page(&layout_lines) {
                info!(
                    "page {}: {} columns detected, extracting per column",
                    page_number,
                    layout.num_columns()
                );
                extract_columns(pdf_path, page_number, geom, &layout)?
            } else {
                layout_lines
            };

            pages.push(PageContent {
                page_number,
                lines,
                layout,
            });
        }

        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

fn page_lines(page_text: &str) -> Vec<String> {
    page_text
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn is_budget_table_page(lines: &[String]) -> bool {
    lines
        .iter()
        .take(10)
        .any(|line| BUDGET_PAGE_MARKERS.iter().any(|m| line.contains(m)))
}

/// Extract one multi-column page as vertical slices, concatenating the
/// columns left to right.
fn extract_columns(
    pdf_path: &Path,
    page_number: usize,
    geom: &WordPage,
    layout: &LayoutInfo,
) -> Result<Vec<String>, PresuError> {
    let page_arg = page_number.to_string();
    let mut out = Vec::new();

    for (i, band) in layout.columns.iter().enumerate() {
        // Column bands are built from word left edges; stretch the last one
        // to the page edge so trailing characters are not clipped.
        let x_max = if i + 1 == layout.columns.len() {
            geom.width
        } else {
            band.x_max
        };
        let x = band.x_min.floor().max(0.0);
        let width = (x_max - x).ceil().max(1.0);

        let text = run_pdftotext(
            pdf_path,
            &[
                "-layout",
                "-f",
                &page_arg,
                "-l",
                &page_arg,
                "-x",
                &format!("{}", x as i64),
                "-y",
                "0",
                "-W",
                &format!("{}", width as i64),
                "-H",
                &format!("{}", geom.height.ceil() as i64),
            ],
        )?;

        let col_lines = page_lines(&text);
        debug!("page {} column {}: {} lines", page_number, i + 1, col_lines.len());
        out.extend(col_lines);
    }

    Ok(out)
}

fn run_pdftotext(pdf_path: &Path, args: &[&str]) -> Result<String, PresuError> {
    let output = Command::new("pdftotext")
        .args(args)
        .arg(pdf_path)
        .arg("-") // output to stdout
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PresuError::PdftotextNotFound
            } else {
                PresuError::Extraction(format!("pdftotext failed: {}", e))
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(PresuError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[derive(Debug, Clone)]
struct WordPage {
    width: f32,
    height: f32,
    words: Vec<Word>,
}

fn extract_word_pages(pdf_path: &Path) -> Result<Vec<WordPage>, PresuError> {
    let xml = run_pdftotext(pdf_path, &["-bbox"])?;
    Ok(parse_bbox_xml(&xml))
}

fn parse_bbox_xml(xml: &str) -> Vec<WordPage> {
    let mut pages = Vec::new();

    for raw in xml.lines() {
        let line = raw.trim();

        if line.starts_with("<page ") {
            pages.push(WordPage {
                width: parse_attr_f32(line, "width").unwrap_or(0.0),
                height: parse_attr_f32(line, "height").unwrap_or(0.0),
                words: Vec::new(),
            });
            continue;
        }

        if line.starts_with("<word ") {
            let (Some(page), Some(text)) = (pages.last_mut(), parse_word_text(line)) else {
                continue;
            };
            let text = decode_xml_entities(&text).trim().to_string();
            if text.is_empty() {
                continue;
            }
            let (Some(x0), Some(x1), Some(top), Some(bottom)) = (
                parse_attr_f32(line, "xMin"),
                parse_attr_f32(line, "xMax"),
                parse_attr_f32(line, "yMin"),
                parse_attr_f32(line, "yMax"),
            ) else {
                continue;
            };
            page.words.push(Word {
                text,
                x0,
                x1,
                top,
                bottom,
            });
        }
    }

    pages
}

fn parse_attr_f32(tag: &str, name: &str) -> Option<f32> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse_word_text(word_tag: &str) -> Option<String> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    Some(word_tag[start..end].to_string())
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox_xml_words() {
        let xml = r#"
<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="10.0" yMin="20.0" xMax="62.5" yMax="30.0">CAP&#205;TULO</word>
    <word xMin="70.0" yMin="20.0" xMax="80.0" yMax="30.0">01</word>
  </page>
  <page width="612.000000" height="792.000000">
  </page>
</doc>
"#;
        let pages = parse_bbox_xml(xml);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].words.len(), 2);
        assert_eq!(pages[0].words[1].text, "01");
        assert_eq!(pages[0].words[1].x0, 70.0);
        assert_eq!(pages[0].height, 792.0);
        assert!(pages[1].words.is_empty());
    }

    #[test]
    fn test_budget_table_page_detection() {
        let lines: Vec<String> = vec![
            "MERCADO DE ABASTOS".to_string(),
            "CÓDIGO RESUMEN CANTIDAD PRECIO IMPORTE".to_string(),
        ];
        assert!(is_budget_table_page(&lines));

        let other: Vec<String> = vec!["Memoria descriptiva".to_string()];
        assert!(!is_budget_table_page(&other));
    }

    #[test]
    fn test_parse_attr() {
        let tag = r#"<page width="612.000000" height="792.000000">"#;
        assert_eq!(parse_attr_f32(tag, "width"), Some(612.0));
        assert_eq!(parse_attr_f32(tag, "missing"), None);
    }
}
