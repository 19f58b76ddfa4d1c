use std::fmt;

use serde::Serialize;

/// Outcome of comparing one value (or one group of values) between the
/// ledger and the reference book.
///
/// Anything the backend sends that is not an explicit match or divergence
/// is `Failed`: an unreadable status is surfaced, never assumed to be fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Matched,
    Divergent,
    Failed,
}

impl Status {
    /// Map a wire status (`"OK"`, `"Divergente"`, `"Falha"`, ...).
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("OK") => Status::Matched,
            Some("Divergente") => Status::Divergent,
            _ => Status::Failed,
        }
    }

    /// Map a bracketed detail token (`"[OK]"`, `"[DIVERGÊNCIA]"`).
    pub fn from_token(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Status::Failed;
        };
        let inner = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
        match inner.to_uppercase().as_str() {
            "OK" => Status::Matched,
            "DIVERGÊNCIA" | "DIVERGENCIA" | "DIVERGENTE" => Status::Divergent,
            _ => Status::Failed,
        }
    }

    pub fn from_match(matched: bool) -> Self {
        if matched {
            Status::Matched
        } else {
            Status::Divergent
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Status::Matched)
    }

    pub fn class(&self) -> DisplayClass {
        match self {
            Status::Matched => DisplayClass::Ok,
            Status::Divergent => DisplayClass::Divergent,
            Status::Failed => DisplayClass::Divergent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Matched => "OK",
            Status::Divergent => "Divergent",
            Status::Failed => "Failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Visual state of a card or indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayClass {
    Ok,
    Divergent,
    #[default]
    Awaiting,
}

impl DisplayClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayClass::Ok => "ok",
            DisplayClass::Divergent => "divergent",
            DisplayClass::Awaiting => "awaiting",
        }
    }
}

impl fmt::Display for DisplayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
