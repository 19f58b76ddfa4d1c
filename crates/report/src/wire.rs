//! Backend response contracts.
//!
//! The backend is loosely typed: a value set may come back as an object,
//! an error string, or not at all. Every field here is optional and
//! decoded leniently, so a sub-tree with the wrong shape turns into `None`
//! and the renderer for that section shows its fallback instead of the
//! whole report failing to decode.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::format::RawNumber;

/// Decode a field, treating any shape mismatch as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            log::debug!("ignoring malformed report field: {e}");
            Ok(None)
        }
    }
}

/// Like `lenient`, but only a JSON object may fill a struct field. Derived
/// struct impls also accept arrays positionally, which would let a
/// malformed sub-tree pass as present.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    if !value.is_object() {
        log::debug!("ignoring report section that is not an object: {value}");
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            log::debug!("ignoring malformed report section: {e}");
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Totals (shared by both variants)
// ---------------------------------------------------------------------------

/// Totals read from one document for one category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueSet {
    #[serde(default, deserialize_with = "lenient")]
    pub total_operacao: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub base_de_calculo_icms: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_icms: Option<RawNumber>,
}

/// Per-field status strings of a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldStatuses {
    #[serde(default, deserialize_with = "lenient")]
    pub total_operacao: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub base_de_calculo_icms: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_icms: Option<String>,
}

/// Inflows or outflows comparison.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryComparison {
    #[serde(default, deserialize_with = "lenient_object")]
    pub sped: Option<ValueSet>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub livro: Option<ValueSet>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub status_detalhado: Option<FieldStatuses>,
}

/// Reference-book assessment values: keyed by book line code, or a plain
/// list where position 0 is line 013 and position 1 is line 014.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BookValues {
    Keyed(HashMap<String, Option<RawNumber>>),
    Positional(Vec<Option<RawNumber>>),
}

impl BookValues {
    pub fn get(&self, code: &str, position: usize) -> Option<&RawNumber> {
        match self {
            BookValues::Keyed(map) => map.get(code).and_then(Option::as_ref),
            BookValues::Positional(list) => list.get(position).and_then(Option::as_ref),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentComparison {
    #[serde(default, deserialize_with = "lenient")]
    pub sped_recolher: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub sped_saldo_credor: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub livro_valores: Option<BookValues>,
    #[serde(default, deserialize_with = "lenient")]
    pub status_recolher: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status_saldo_credor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalsReport {
    #[serde(default, deserialize_with = "lenient_object")]
    pub entradas: Option<CategoryComparison>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub saidas: Option<CategoryComparison>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub apuracao: Option<AssessmentComparison>,
}

// ---------------------------------------------------------------------------
// Variant A: single response with block text and code checks
// ---------------------------------------------------------------------------

/// Response of `POST /upload-e-processar/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyResponse {
    #[serde(default, deserialize_with = "lenient_object")]
    pub entradas: Option<CategoryComparison>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub saidas: Option<CategoryComparison>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub apuracao: Option<AssessmentComparison>,
    #[serde(default, deserialize_with = "lenient")]
    pub bloco_e_texto: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub detalhamento_codigos: Option<HashMap<String, Option<RawNumber>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub codigos_ausentes_livro: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub soma_livro_inf_comp: Option<RawNumber>,
}

// ---------------------------------------------------------------------------
// Variant B: totals + itemized details
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailRowWire {
    #[serde(default, deserialize_with = "lenient")]
    pub campo: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub valor_sped: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub valor_livro: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
}

/// Raw ledger rows of one record code, column name to value.
pub type LedgerRecordRows = Vec<serde_json::Map<String, serde_json::Value>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailsReport {
    #[serde(rename = "conciliacao_E110", default, deserialize_with = "lenient")]
    pub comparisons: Option<Vec<DetailRowWire>>,
    #[serde(default, deserialize_with = "lenient")]
    pub dados_blocos_sped: Option<HashMap<String, LedgerRecordRows>>,
}

/// Response of `POST /processar-tudo/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombinedResponse {
    #[serde(default, deserialize_with = "lenient_object")]
    pub conciliacao_totais: Option<TotalsReport>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub conciliacao_detalhes: Option<DetailsReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_shapes_become_absent() {
        let json = r#"{
            "entradas": {"sped": "ERRO", "livro": {"total_operacao": "1.000,00"}, "status": "Falha"},
            "saidas": [],
            "codigos_ausentes_livro": null,
            "detalhamento_codigos": {"PA010": 12.5, "MG020": "7.25", "XX": null}
        }"#;
        let resp: LegacyResponse = serde_json::from_str(json).unwrap();

        let entradas = resp.entradas.unwrap();
        assert!(entradas.sped.is_none());
        assert_eq!(
            entradas.livro.unwrap().total_operacao,
            Some(RawNumber::Text("1.000,00".into()))
        );
        assert!(resp.saidas.is_none());
        assert!(resp.codigos_ausentes_livro.is_none());
        assert_eq!(resp.detalhamento_codigos.unwrap().len(), 3);
    }

    #[test]
    fn positional_arrays_do_not_fill_sections() {
        let json = r#"{"entradas": [null, null, "OK", null], "saidas": [], "apuracao": ["1,00"]}"#;
        let resp: LegacyResponse = serde_json::from_str(json).unwrap();
        assert!(resp.entradas.is_none());
        assert!(resp.saidas.is_none());
        assert!(resp.apuracao.is_none());

        let json = r#"{"sped": ["1,00", "2,00", "3,00"], "status": "OK", "status_detalhado": ["OK"]}"#;
        let category: CategoryComparison = serde_json::from_str(json).unwrap();
        assert!(category.sped.is_none());
        assert!(category.status_detalhado.is_none());
        assert_eq!(category.status.as_deref(), Some("OK"));

        let json = r#"{"conciliacao_totais": [{"status": "OK"}], "conciliacao_detalhes": [[]]}"#;
        let resp: CombinedResponse = serde_json::from_str(json).unwrap();
        assert!(resp.conciliacao_totais.is_none());
        assert!(resp.conciliacao_detalhes.is_none());
    }

    #[test]
    fn empty_missing_list_is_distinct_from_absent() {
        let resp: LegacyResponse = serde_json::from_str(r#"{"codigos_ausentes_livro": []}"#).unwrap();
        assert_eq!(resp.codigos_ausentes_livro, Some(vec![]));

        let resp: LegacyResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.codigos_ausentes_livro, None);
    }

    #[test]
    fn book_values_both_shapes() {
        let keyed: BookValues = serde_json::from_str(r#"{"013": "10,00", "014": null}"#).unwrap();
        assert_eq!(keyed.get("013", 0), Some(&RawNumber::Text("10,00".into())));
        assert_eq!(keyed.get("014", 1), None);

        let list: BookValues = serde_json::from_str(r#"["10,00", "20,00"]"#).unwrap();
        assert_eq!(list.get("014", 1), Some(&RawNumber::Text("20,00".into())));
        assert_eq!(list.get("015", 2), None);
    }

    #[test]
    fn combined_details_decode() {
        let json = r#"{
            "conciliacao_totais": {"entradas": {"status": "OK"}},
            "conciliacao_detalhes": {
                "conciliacao_E110": [
                    {"campo": "Total de Débitos", "valor_sped": "1,000.00", "valor_livro": "1,000.00", "status": "[OK]"}
                ],
                "dados_blocos_sped": {"E111": [{"REG": "E111", "COD_AJ_APUR": "PA010001"}]}
            }
        }"#;
        let resp: CombinedResponse = serde_json::from_str(json).unwrap();
        let details = resp.conciliacao_detalhes.unwrap();
        assert_eq!(details.comparisons.unwrap()[0].status.as_deref(), Some("[OK]"));
        assert_eq!(details.dados_blocos_sped.unwrap()["E111"].len(), 1);
    }
}
