use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::ledger::{BlockRow, RecordCategory};

/// Ledger table filter: show every row, or only rows of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilter {
    #[default]
    All,
    Category(RecordCategory),
}

impl RowFilter {
    pub fn shows(&self, row: &BlockRow) -> bool {
        match self {
            RowFilter::All => true,
            RowFilter::Category(category) => row.category == Some(*category),
        }
    }

    /// Mark rows hidden or visible. Rows are never removed.
    pub fn apply(&self, rows: &mut [BlockRow]) {
        for row in rows {
            row.hidden = !self.shows(row);
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFilter::All => f.write_str("all"),
            RowFilter::Category(c) => write!(f, "{c}"),
        }
    }
}

impl FromStr for RowFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("all") || name.eq_ignore_ascii_case("todos") {
            return Ok(RowFilter::All);
        }
        RecordCategory::parse(name)
            .map(RowFilter::Category)
            .ok_or_else(|| format!("unknown filter \"{name}\" (expected all, e110, e111, e116 or e001)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::parse_block;

    #[test]
    fn category_filter_hides_other_rows() {
        let mut rows = parse_block("|E001|0|\n|E116|000|1,00|\n|E116|001|2,00|\n|E200|SP|");
        "e116".parse::<RowFilter>().unwrap().apply(&mut rows);
        let visible: Vec<bool> = rows.iter().map(|r| !r.hidden).collect();
        assert_eq!(visible, vec![false, true, true, false]);

        RowFilter::All.apply(&mut rows);
        assert!(rows.iter().all(|r| !r.hidden));
    }

    #[test]
    fn parse_names() {
        assert_eq!("all".parse::<RowFilter>().unwrap(), RowFilter::All);
        assert_eq!(
            "reg-e111".parse::<RowFilter>().unwrap(),
            RowFilter::Category(RecordCategory::Adjustment)
        );
        assert!("e999".parse::<RowFilter>().is_err());
    }
}
