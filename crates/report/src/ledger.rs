//! Ledger block handling: line parsing, field classification, summation.
//!
//! A ledger block is the E segment of the SPED text file, one record per
//! line, fields wrapped in pipes: `|E116|000|1.234,56|20240110|...|`.
//! Splitting such a line on `|` yields an empty string at index 0, the
//! record code at index 1 and the positional values after it.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::format::{format_localized, parse_localized, with_currency};

/// Two aggregate sums match when they differ by less than one cent.
pub const MATCH_TOLERANCE: f64 = 0.01;

/// Record code of the obligations-payable lines summed against the book.
pub const PAYABLE_RECORD: &str = "E116";

/// Split position of the amount field in an E116 line.
pub const PAYABLE_AMOUNT_FIELD: usize = 3;

/// Record code of the adjustment lines whose codes must appear in the book.
pub const ADJUSTMENT_RECORD: &str = "E111";

/// Split position of the adjustment code in an E111 line.
pub const ADJUSTMENT_CODE_FIELD: usize = 2;

/// Text the backend substitutes when it could not extract the block.
pub const BLOCK_NOT_FOUND_MARKER: &str = "Bloco E não encontrado ou vazio.";

pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() < MATCH_TOLERANCE
}

/// Record code of a line, i.e. the first pipe-delimited field.
pub fn record_code(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('|')?;
    let code = rest.split('|').next()?;
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

fn block_lines<'a>(block: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    block.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Sum one monetary field across every line of the given record code.
///
/// `field` indexes the raw `|` split of the line. Lines whose field is
/// missing or not a localized number add nothing.
pub fn sum_block_values(block: Option<&str>, code: &str, field: usize) -> f64 {
    let Some(block) = block else {
        return 0.0;
    };

    let mut total = 0.0;
    for line in block_lines(block) {
        if record_code(line) != Some(code) {
            continue;
        }
        let Some(raw) = line.split('|').nth(field) else {
            log::debug!("{code} line without field {field}: {line}");
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        match parse_localized(raw) {
            Some(value) => total += value,
            None => log::debug!("skipping malformed {code} amount '{raw}'"),
        }
    }
    total
}

/// Distinct values of one field across the lines of a record code, in
/// first-seen order.
pub fn extract_codes(block: Option<&str>, code: &str, field: usize) -> Vec<String> {
    let Some(block) = block else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    block_lines(block)
        .filter(|line| record_code(line) == Some(code))
        .filter_map(|line| line.split('|').nth(field))
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.to_string()))
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Row categories + cell classification
// ---------------------------------------------------------------------------

/// Category tag attached to a rendered ledger row, used by filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordCategory {
    #[serde(rename = "reg-e110")]
    Assessment,
    #[serde(rename = "reg-e111")]
    Adjustment,
    #[serde(rename = "reg-e116")]
    Payable,
    /// Block opening and closing records (E001, E990).
    #[serde(rename = "reg-e001")]
    Boundary,
}

impl RecordCategory {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E110" => Some(Self::Assessment),
            "E111" => Some(Self::Adjustment),
            "E116" => Some(Self::Payable),
            "E001" | "E990" => Some(Self::Boundary),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Assessment => "reg-e110",
            Self::Adjustment => "reg-e111",
            Self::Payable => "reg-e116",
            Self::Boundary => "reg-e001",
        }
    }

    /// Parse a filter name: the tag itself or its short record form.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "reg-e110" | "e110" => Some(Self::Assessment),
            "reg-e111" | "e111" => Some(Self::Adjustment),
            "reg-e116" | "e116" => Some(Self::Payable),
            "reg-e001" | "e001" | "e990" => Some(Self::Boundary),
            _ => None,
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Monetary,
    AdjustmentCode,
    Default,
}

fn monetary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d[\d.]*,\d{2}$").expect("monetary pattern"))
}

fn adjustment_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2}\d{5,12}$").expect("adjustment code pattern"))
}

pub fn classify_field(field: &str) -> CellKind {
    if monetary_re().is_match(field) {
        CellKind::Monetary
    } else if adjustment_code_re().is_match(field) {
        CellKind::AdjustmentCode
    } else {
        CellKind::Default
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockCell {
    pub kind: CellKind,
    pub text: String,
}

/// One ledger line prepared for the detail table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRow {
    pub category: Option<RecordCategory>,
    pub cells: Vec<BlockCell>,
    /// Set by row filters; hidden rows stay in the table.
    pub hidden: bool,
}

impl BlockRow {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let category = record_code(line).and_then(RecordCategory::from_code);

        let fields: Vec<&str> = line.split('|').collect();
        let inner = if fields.len() >= 2 { &fields[1..fields.len() - 1] } else { &[][..] };

        let cells = inner
            .iter()
            .map(|field| {
                let kind = classify_field(field);
                let text = match kind {
                    CellKind::Monetary => with_currency(format_localized(Some(field))),
                    _ => field.to_string(),
                };
                BlockCell { kind, text }
            })
            .collect();

        BlockRow { category, cells, hidden: false }
    }
}

/// Parse every non-blank line of a block into table rows.
pub fn parse_block(block: &str) -> Vec<BlockRow> {
    block_lines(block).map(BlockRow::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "|E001|0|\n\
                         |E110|1.000,00|0,00|\n\
                         |E111|PA010001|Ajuste|150,00|\n\
                         |E116|000|1.234,56|20240110|\n\
                         |E116|001|100,00|20240110|\n\
                         |E990|6|\n";

    #[test]
    fn sums_target_record_only() {
        let total = sum_block_values(Some(BLOCK), "E116", 3);
        assert!((total - 1334.56).abs() < 1e-9);
    }

    #[test]
    fn documented_example() {
        let block = "|E116|001|1.234,56|\n|E116|002|100,00|";
        let total = sum_block_values(Some(block), "E116", 3);
        assert!((total - 1334.56).abs() < 1e-9);
    }

    #[test]
    fn empty_or_absent_block_sums_to_zero() {
        assert_eq!(sum_block_values(None, "E116", 3), 0.0);
        assert_eq!(sum_block_values(Some(""), "E116", 3), 0.0);
        assert_eq!(sum_block_values(Some("\n\n"), "E116", 3), 0.0);
    }

    #[test]
    fn malformed_lines_contribute_nothing() {
        let block = "|E116|001|abc|\n|E116|002|\n|E116|003|50,00|\r\n|E116|004||";
        assert_eq!(sum_block_values(Some(block), "E116", 3), 50.0);
    }

    #[test]
    fn code_must_match_whole_field() {
        let block = "|E1160|001|10,00|\n|E116|001|5,00|";
        assert_eq!(sum_block_values(Some(block), "E116", 3), 5.0);
    }

    #[test]
    fn tolerance_boundary() {
        assert!(amounts_match(100.0, 100.009));
        assert!(!amounts_match(100.0, 100.02));
        assert!(!amounts_match(0.0, 0.01 + 1e-9));
    }

    #[test]
    fn classify_cells() {
        assert_eq!(classify_field("1.234,56"), CellKind::Monetary);
        assert_eq!(classify_field("0,00"), CellKind::Monetary);
        assert_eq!(classify_field("1.234,5"), CellKind::Default);
        assert_eq!(classify_field("PA01000"), CellKind::AdjustmentCode);
        assert_eq!(classify_field("MG123456789012"), CellKind::AdjustmentCode);
        assert_eq!(classify_field("PA0100"), CellKind::Default);
        assert_eq!(classify_field("E116"), CellKind::Default);
    }

    #[test]
    fn rows_are_tagged_and_formatted() {
        let rows = parse_block(BLOCK);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].category, Some(RecordCategory::Boundary));
        assert_eq!(rows[2].category, Some(RecordCategory::Adjustment));
        assert_eq!(rows[2].cells[1].kind, CellKind::AdjustmentCode);
        assert_eq!(rows[3].cells[2].text, "R$ 1.234,56");
        assert_eq!(rows[3].cells[2].kind, CellKind::Monetary);
        assert_eq!(rows[5].category, Some(RecordCategory::Boundary));
    }

    #[test]
    fn unknown_record_is_untagged() {
        let row = BlockRow::parse("|E200|SP|01012024|");
        assert_eq!(row.category, None);
        assert_eq!(row.cells.len(), 3);
    }

    #[test]
    fn extracts_distinct_codes_in_order() {
        let block = "|E111|PA010001|x|1,00|\n|E111|MG020002|y|2,00|\n|E111|PA010001|z|3,00|";
        assert_eq!(extract_codes(Some(block), "E111", 2), vec!["PA010001", "MG020002"]);
        assert!(extract_codes(None, "E111", 2).is_empty());
    }

    #[test]
    fn category_names() {
        assert_eq!(RecordCategory::parse("e116"), Some(RecordCategory::Payable));
        assert_eq!(RecordCategory::parse("reg-e001"), Some(RecordCategory::Boundary));
        assert_eq!(RecordCategory::parse("E990"), Some(RecordCategory::Boundary));
        assert_eq!(RecordCategory::parse("x"), None);
    }
}
