//! Text and unit cleanup for extracted budget lines.

use crate::model::LineItem;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::LazyLock;

static PA_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[Pp][.:]+[Aa][.:]*$").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Measurement-unit tokens as they appear uppercased in these documents.
/// Used to tell a unit column apart from a code or a name word.
pub static UNIT_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "M", "M2", "M3", "ML", "UD", "U", "KG", "T", "TM", "PA", "H", "L", "DM2", "DM3", "CM2",
        "CM3", "HA", "KM", "DM", "CM", "MM", "KW", "KWH", "MWH", "UR", "U20R", "P:A",
    ]
    .into_iter()
    .collect()
});

/// True if the token reads as a measurement unit (case-insensitive, trailing
/// dots ignored): "m2", "Ud.", "P.A." all qualify.
pub fn is_unit_token(token: &str) -> bool {
    let cleaned = token.trim().trim_end_matches('.').to_uppercase();
    if cleaned.is_empty() {
        return false;
    }
    UNIT_TOKENS.contains(cleaned.as_str()) || PA_UNIT_RE.is_match(token.trim())
}

/// Collapse runs of whitespace and mend soft hyphenation from wrapped lines.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    collapsed.replace("- ", "").trim().to_string()
}

/// Canonical display form for a unit: "ml" -> "m", "m2" -> "m²", "P.A." -> "PA".
pub fn normalize_unit(unit: &str) -> String {
    let unit = unit.trim();
    if unit.is_empty() {
        return String::new();
    }
    if PA_UNIT_RE.is_match(unit) {
        return "PA".to_string();
    }
    match unit.to_lowercase().as_str() {
        "ud" | "u" => "Ud".to_string(),
        "ml" | "m." => "m".to_string(),
        "m2" => "m²".to_string(),
        "m3" => "m³".to_string(),
        "pa" => "PA".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Canonicalize a line item arriving from the hand-off contract: collapse
/// whitespace in the summary and bring the unit to its display form.
pub fn normalize_item(item: &mut LineItem) {
    item.summary = clean_text(&item.summary);
    item.unit = normalize_unit(&item.unit);
}

/// Check quantity x price against the printed amount, within tolerance.
/// OCR and layout noise make exact equality too strict for single items.
pub fn validate_amount(
    quantity: Decimal,
    price: Decimal,
    amount: Decimal,
    tolerance: Decimal,
) -> bool {
    let computed = (quantity * price).round_dp(2);
    (computed - amount).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unit_tokens() {
        assert!(is_unit_token("m2"));
        assert!(is_unit_token("Ud."));
        assert!(is_unit_token("P.A."));
        assert!(is_unit_token("kWh"));
        assert!(!is_unit_token("HORMIGON"));
        assert!(!is_unit_token(""));
    }

    #[test]
    fn test_normalize_unit() {
        assert_eq!(normalize_unit("ml"), "m");
        assert_eq!(normalize_unit("m2"), "m²");
        assert_eq!(normalize_unit("M3"), "m³");
        assert_eq!(normalize_unit("u"), "Ud");
        assert_eq!(normalize_unit("P:A:"), "PA");
        assert_eq!(normalize_unit("p.a."), "PA");
        assert_eq!(normalize_unit("kg"), "Kg");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  EXCAVACIÓN   EN\tZANJAS  "), "EXCAVACIÓN EN ZANJAS");
        assert_eq!(clean_text("HORMI- GÓN ARMADO"), "HORMIGÓN ARMADO");
    }

    #[test]
    fn test_normalize_item() {
        let mut item = LineItem {
            code: "E02AM010".to_string(),
            unit: "ml".to_string(),
            summary: "  DESBROCE   Y\tLIMPIEZA ".to_string(),
            quantity: dec!(1250.00),
            price: dec!(0.85),
            amount: dec!(1062.50),
        };
        normalize_item(&mut item);
        assert_eq!(item.unit, "m");
        assert_eq!(item.summary, "DESBROCE Y LIMPIEZA");
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(1250.00), dec!(0.85), dec!(1062.50), dec!(0.05)));
        assert!(validate_amount(dec!(1250.00), dec!(0.85), dec!(1062.53), dec!(0.05)));
        assert!(!validate_amount(dec!(1250.00), dec!(0.85), dec!(1063.00), dec!(0.05)));
    }
}
