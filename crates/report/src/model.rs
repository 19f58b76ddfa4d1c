//! Common report shape produced from either backend variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::format::RawNumber;
use crate::status::Status;
use crate::wire::{CombinedResponse, LedgerRecordRows, LegacyResponse, TotalsReport};

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Backend flavor. Each exposes its own endpoint and response contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Totals plus ledger block text, code breakdown and missing codes.
    #[default]
    Legacy,
    /// Totals plus itemized assessment comparison rows.
    Combined,
}

impl Variant {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Variant::Legacy => "/upload-e-processar/",
            Variant::Combined => "/processar-tudo/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Legacy => "legacy",
            Variant::Combined => "combined",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "a" => Ok(Variant::Legacy),
            "combined" | "b" => Ok(Variant::Combined),
            other => Err(ReportError::UnknownVariant(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One itemized comparison line (field label, both values, status).
#[derive(Debug, Clone, PartialEq)]
pub struct DetailItem {
    pub label: Option<String>,
    pub source: Option<RawNumber>,
    pub reference: Option<RawNumber>,
    pub status: Status,
}

/// A reconciliation report, independent of the variant that produced it.
///
/// Every section is optional; renderers decide what an absent section
/// looks like.
#[derive(Debug, Clone, Default)]
pub struct ReconReport {
    pub variant: Variant,
    pub totals: Option<TotalsReport>,
    pub block_text: Option<String>,
    /// Adjustment code to book total, in arrival order.
    pub breakdown: Option<Vec<(String, Option<RawNumber>)>>,
    pub missing_codes: Option<Vec<String>>,
    pub reference_supplementary_sum: Option<RawNumber>,
    pub details: Option<Vec<DetailItem>>,
    /// Raw ledger rows grouped by record code, sorted by code.
    pub ledger_records: Option<Vec<(String, LedgerRecordRows)>>,
}

impl ReconReport {
    /// Decode a response body through the adapter of `variant`.
    pub fn decode(variant: Variant, body: &[u8]) -> Result<Self, ReportError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| ReportError::Json(e.to_string()))?;
        Self::from_value(variant, value)
    }

    pub fn from_value(variant: Variant, value: serde_json::Value) -> Result<Self, ReportError> {
        let kind = match &value {
            serde_json::Value::Object(_) => None,
            serde_json::Value::Null => Some("null"),
            serde_json::Value::Bool(_) => Some("a boolean"),
            serde_json::Value::Number(_) => Some("a number"),
            serde_json::Value::String(_) => Some("a string"),
            serde_json::Value::Array(_) => Some("an array"),
        };
        if let Some(kind) = kind {
            return Err(ReportError::NotAnObject(kind));
        }

        let report = match variant {
            Variant::Legacy => {
                let resp: LegacyResponse =
                    serde_json::from_value(value).map_err(|e| ReportError::Json(e.to_string()))?;
                Self::from(resp)
            }
            Variant::Combined => {
                let resp: CombinedResponse =
                    serde_json::from_value(value).map_err(|e| ReportError::Json(e.to_string()))?;
                Self::from(resp)
            }
        };
        Ok(report)
    }
}

impl From<LegacyResponse> for ReconReport {
    fn from(resp: LegacyResponse) -> Self {
        let has_totals = resp.entradas.is_some() || resp.saidas.is_some() || resp.apuracao.is_some();
        let totals = has_totals.then(|| TotalsReport {
            entradas: resp.entradas,
            saidas: resp.saidas,
            apuracao: resp.apuracao,
        });

        ReconReport {
            variant: Variant::Legacy,
            totals,
            block_text: resp.bloco_e_texto,
            breakdown: resp.detalhamento_codigos.map(|map| map.into_iter().collect()),
            missing_codes: resp.codigos_ausentes_livro,
            reference_supplementary_sum: resp.soma_livro_inf_comp,
            details: None,
            ledger_records: None,
        }
    }
}

impl From<CombinedResponse> for ReconReport {
    fn from(resp: CombinedResponse) -> Self {
        let (details, ledger_records) = match resp.conciliacao_detalhes {
            Some(d) => {
                let details = d.comparisons.map(|rows| {
                    rows.into_iter()
                        .map(|row| DetailItem {
                            status: Status::from_token(row.status.as_deref()),
                            label: row.campo,
                            source: row.valor_sped,
                            reference: row.valor_livro,
                        })
                        .collect()
                });
                let records = d.dados_blocos_sped.map(|map| {
                    let mut groups: Vec<_> = map.into_iter().collect();
                    groups.sort_by(|a, b| a.0.cmp(&b.0));
                    groups
                });
                (details, records)
            }
            None => (None, None),
        };

        ReconReport {
            variant: Variant::Combined,
            totals: resp.conciliacao_totais,
            block_text: None,
            breakdown: None,
            missing_codes: None,
            reference_supplementary_sum: None,
            details,
            ledger_records,
        }
    }
}
