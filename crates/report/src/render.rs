//! Report renderers.
//!
//! Each renderer owns one dashboard section and fills it from one part of
//! the report. Absent input is rendered as an empty sub-tree: values fall
//! back to the sentinel and statuses to `Failed`, never to a match.

use crate::filter::RowFilter;
use crate::format::{
    format_amount, format_decimal, format_localized, with_currency, RawNumber, SENTINEL,
};
use crate::ledger::{
    amounts_match, parse_block, sum_block_values, BLOCK_NOT_FOUND_MARKER, PAYABLE_AMOUNT_FIELD,
    PAYABLE_RECORD,
};
use crate::model::{DetailItem, ReconReport, Variant};
use crate::status::{DisplayClass, Status};
use crate::view::{
    AlertsCard, BlockDetailCard, BreakdownRow, Dashboard, DetailLine, DetailsCard, RecordGroup,
    RecordsPanel, SumCard, TotalsCard,
};
use crate::wire::{
    AssessmentComparison, CategoryComparison, FieldStatuses, LedgerRecordRows, TotalsReport,
    ValueSet,
};

pub const ANALYSIS_FAILED_TEXT: &str = "Analysis failed";

/// Display a totals value. Book-style strings go through the localized
/// parser, bare numbers through the decimal one.
fn display_value(raw: Option<&RawNumber>) -> String {
    match raw {
        Some(RawNumber::Text(s)) => format_localized(Some(s)),
        other => format_decimal(other),
    }
}

fn aggregate_text(status: Status) -> &'static str {
    match status {
        Status::Matched => "Values match",
        Status::Divergent => "Values diverge",
        Status::Failed => "Comparison failed",
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

pub fn render_category(card: &mut TotalsCard, data: Option<&CategoryComparison>) {
    let empty = CategoryComparison::default();
    let empty_set = ValueSet::default();
    let empty_statuses = FieldStatuses::default();

    let data = data.unwrap_or(&empty);
    let sped = data.sped.as_ref().unwrap_or(&empty_set);
    let livro = data.livro.as_ref().unwrap_or(&empty_set);
    let statuses = data.status_detalhado.as_ref().unwrap_or(&empty_statuses);

    let fields = [
        (&sped.total_operacao, &livro.total_operacao, &statuses.total_operacao),
        (&sped.base_de_calculo_icms, &livro.base_de_calculo_icms, &statuses.base_de_calculo_icms),
        (&sped.total_icms, &livro.total_icms, &statuses.total_icms),
    ];
    for (row, (source, reference, status)) in card.rows.iter_mut().zip(fields) {
        row.source = display_value(source.as_ref());
        row.reference = display_value(reference.as_ref());
        row.set_status(Status::from_wire(status.as_deref()));
    }

    let status = Status::from_wire(data.status.as_deref());
    card.class = status.class();
    card.status.set(aggregate_text(status), status.class());
}

pub fn render_assessment(card: &mut TotalsCard, data: Option<&AssessmentComparison>) {
    let empty = AssessmentComparison::default();
    let data = data.unwrap_or(&empty);

    let book = data.livro_valores.as_ref();
    let fields = [
        (
            data.sped_recolher.as_ref(),
            book.and_then(|values| values.get("013", 0)),
            data.status_recolher.as_deref(),
        ),
        (
            data.sped_saldo_credor.as_ref(),
            book.and_then(|values| values.get("014", 1)),
            data.status_saldo_credor.as_deref(),
        ),
    ];

    let mut all_matched = true;
    for (row, (source, reference, status)) in card.rows.iter_mut().zip(fields) {
        let status = Status::from_wire(status);
        all_matched &= status.is_matched();
        row.source = display_value(source);
        row.reference = display_value(reference);
        row.set_status(status);
    }

    let status = Status::from_match(all_matched);
    card.class = status.class();
    card.status.set(aggregate_text(status), status.class());
}

pub fn render_totals(dashboard: &mut Dashboard, totals: Option<&TotalsReport>) {
    let empty = TotalsReport::default();
    let totals = totals.unwrap_or_else(|| {
        log::warn!("report has no totals section");
        &empty
    });
    render_category(&mut dashboard.inflows, totals.entradas.as_ref());
    render_category(&mut dashboard.outflows, totals.saidas.as_ref());
    render_assessment(&mut dashboard.assessment, totals.apuracao.as_ref());
}

// ---------------------------------------------------------------------------
// Ledger block + breakdown
// ---------------------------------------------------------------------------

pub fn render_block_detail(card: &mut BlockDetailCard, block: Option<&str>, filter: RowFilter) {
    card.rows.clear();
    card.error = None;

    let block = block.filter(|text| !text.trim().is_empty() && text.trim() != BLOCK_NOT_FOUND_MARKER);
    match block {
        Some(text) => {
            card.rows = parse_block(text);
            filter.apply(&mut card.rows);
            card.status = "Ready for manual review".to_string();
            card.class = DisplayClass::Ok;
        }
        None => {
            card.error =
                Some("ERROR: the ledger block could not be extracted from the ledger file.".to_string());
            card.status = "Failed to read ledger block".to_string();
            card.class = DisplayClass::Divergent;
        }
    }
}

pub fn render_breakdown(card: &mut BlockDetailCard, breakdown: Option<&[(String, Option<RawNumber>)]>) {
    card.breakdown.clear();
    card.breakdown_message = None;

    match breakdown {
        Some(entries) if !entries.is_empty() => {
            let mut sorted: Vec<_> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            card.breakdown = sorted
                .into_iter()
                .map(|(code, amount)| BreakdownRow {
                    code: code.clone(),
                    amount: format!("R$ {}", format_decimal(amount.as_ref())),
                })
                .collect();
        }
        _ => {
            card.breakdown_message = Some(
                "No breakdown codes (PA, MG, ...) were found in the reference document.".to_string(),
            );
            card.status = "Codes not found in reference document".to_string();
            card.class = DisplayClass::Divergent;
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

pub fn render_alerts(card: &mut AlertsCard, missing: Option<&[String]>) {
    card.lines.clear();
    match missing {
        Some(codes) if !codes.is_empty() => {
            card.class = DisplayClass::Divergent;
            card.status.set(format!("{} alert(s) found", codes.len()), DisplayClass::Divergent);
            card.lines = codes
                .iter()
                .map(|code| format!("Code {code} (ledger E111) was not found in the reference book."))
                .collect();
        }
        Some(_) => {
            card.class = DisplayClass::Ok;
            card.status.set("All matched", DisplayClass::Ok);
            card.lines.push(
                "Every E111 adjustment code in the ledger was found in the reference book.".to_string(),
            );
        }
        None => {
            card.class = DisplayClass::Divergent;
            card.status.set("Verification failed", DisplayClass::Divergent);
            card.lines.push(
                "The E111 adjustment codes could not be verified against the reference book.".to_string(),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Summed comparison
// ---------------------------------------------------------------------------

pub fn render_payable_sum(card: &mut SumCard, block: Option<&str>, reference: Option<&RawNumber>) {
    let ledger_sum = sum_block_values(block, PAYABLE_RECORD, PAYABLE_AMOUNT_FIELD);
    let reference_sum = reference.and_then(RawNumber::as_f64).unwrap_or(0.0);

    // An unreadable reference is shown as received; a missing one counts as zero.
    let reference_shown = match format_decimal(reference) {
        shown if shown == SENTINEL => format_amount(0.0),
        shown => shown,
    };

    card.ledger = with_currency(format_amount(ledger_sum));
    card.reference = with_currency(reference_shown);

    let status = Status::from_match(amounts_match(ledger_sum, reference_sum));
    card.class = status.class();
    card.status.set(aggregate_text(status), status.class());
}

// ---------------------------------------------------------------------------
// Itemized details + raw records
// ---------------------------------------------------------------------------

pub fn render_details(card: &mut DetailsCard, details: Option<&[DetailItem]>) {
    card.lines.clear();

    let items = match details {
        Some(items) if !items.is_empty() => items,
        _ => {
            card.class = DisplayClass::Divergent;
            card.status.set("No itemized comparison returned", DisplayClass::Divergent);
            return;
        }
    };

    card.lines = items
        .iter()
        .map(|item| DetailLine {
            label: item.label.clone().unwrap_or_else(|| SENTINEL.to_string()),
            source: format_decimal(item.source.as_ref()),
            reference: format_decimal(item.reference.as_ref()),
            status: item.status,
        })
        .collect();

    let diverging = items.iter().filter(|i| !i.status.is_matched()).count();
    if diverging == 0 {
        card.class = DisplayClass::Ok;
        card.status.set("All items match", DisplayClass::Ok);
    } else {
        card.class = DisplayClass::Divergent;
        card.status.set(
            format!("{diverging} of {} items diverge", items.len()),
            DisplayClass::Divergent,
        );
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn render_records(panel: &mut RecordsPanel, records: Option<&[(String, LedgerRecordRows)]>) {
    panel.groups.clear();
    let Some(records) = records else {
        return;
    };

    for (code, rows) in records {
        let mut columns: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).map(cell_text).unwrap_or_default())
                    .collect::<Vec<_>>()
            })
            .collect();
        panel.groups.push(RecordGroup { code: code.clone(), columns, rows });
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Render every section of a report in the variant's fixed order.
pub fn apply_report(dashboard: &mut Dashboard, report: &ReconReport) {
    match report.variant {
        Variant::Legacy => {
            render_totals(dashboard, report.totals.as_ref());
            render_block_detail(&mut dashboard.block_detail, report.block_text.as_deref(), dashboard.filter);
            render_breakdown(&mut dashboard.block_detail, report.breakdown.as_deref());
            render_alerts(&mut dashboard.alerts, report.missing_codes.as_deref());
            render_payable_sum(
                &mut dashboard.payable_sum,
                report.block_text.as_deref(),
                report.reference_supplementary_sum.as_ref(),
            );
        }
        Variant::Combined => {
            render_totals(dashboard, report.totals.as_ref());
            render_details(&mut dashboard.details, report.details.as_deref());
            render_records(&mut dashboard.records, report.ledger_records.as_deref());
        }
    }
}

/// Surface a failed submission on the status line and the cards that
/// depend on the backend analysis.
pub fn mark_failed(dashboard: &mut Dashboard, variant: Variant, message: &str) {
    dashboard.status_line = format!("ERROR: {message}");
    match variant {
        Variant::Legacy => {
            dashboard.block_detail.class = DisplayClass::Divergent;
            dashboard.block_detail.status = ANALYSIS_FAILED_TEXT.to_string();
            dashboard.alerts.class = DisplayClass::Divergent;
            dashboard.alerts.status.set(ANALYSIS_FAILED_TEXT, DisplayClass::Divergent);
        }
        Variant::Combined => {
            dashboard.details.class = DisplayClass::Divergent;
            dashboard.details.status.set(ANALYSIS_FAILED_TEXT, DisplayClass::Divergent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::RecordCategory;
    use crate::view::AWAITING_TEXT;

    fn category(json: &str) -> CategoryComparison {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn category_renders_values_and_statuses() {
        let mut d = Dashboard::new();
        let data = category(
            r#"{
                "sped": {"total_operacao": "1.234,5", "base_de_calculo_icms": "Não lido", "total_icms": 10.0},
                "livro": {"total_operacao": "1.234,50"},
                "status": "OK",
                "status_detalhado": {"total_operacao": "OK", "base_de_calculo_icms": "Divergente"}
            }"#,
        );
        render_category(&mut d.inflows, Some(&data));

        let rows = &d.inflows.rows;
        assert_eq!(rows[0].source, "1.234,50");
        assert_eq!(rows[0].reference, "1.234,50");
        assert_eq!(rows[1].source, "--");
        assert_eq!(rows[2].source, "10,00");
        assert_eq!(rows[2].reference, "--");
        assert_eq!(rows[0].indicator.class, DisplayClass::Ok);
        assert_eq!(rows[1].indicator.class, DisplayClass::Divergent);
        assert_eq!(rows[2].indicator.text, "ICMS total Failed");
        assert_eq!(d.inflows.class, DisplayClass::Ok);
        assert_eq!(d.inflows.status.text, "Values match");
    }

    #[test]
    fn absent_category_is_failed_not_ok() {
        let mut d = Dashboard::new();
        render_category(&mut d.outflows, None);
        assert_eq!(d.outflows.class, DisplayClass::Divergent);
        assert!(d.outflows.rows.iter().all(|r| r.source == "--" && r.reference == "--"));
        assert!(d.outflows.rows.iter().all(|r| r.indicator.class == DisplayClass::Divergent));
    }

    #[test]
    fn assessment_needs_both_matches() {
        let mut d = Dashboard::new();
        let data: AssessmentComparison = serde_json::from_str(
            r#"{
                "sped_recolher": "500,00", "sped_saldo_credor": "0,00",
                "livro_valores": {"013": "500,00", "014": "0,00"},
                "status_recolher": "OK", "status_saldo_credor": "OK"
            }"#,
        )
        .unwrap();
        render_assessment(&mut d.assessment, Some(&data));
        assert_eq!(d.assessment.class, DisplayClass::Ok);
        assert_eq!(d.assessment.rows[0].reference, "500,00");
        assert_eq!(d.assessment.rows[1].indicator.text, "Code 014 OK");

        let data: AssessmentComparison = serde_json::from_str(
            r#"{"livro_valores": ["500,00"], "status_recolher": "OK"}"#,
        )
        .unwrap();
        render_assessment(&mut d.assessment, Some(&data));
        assert_eq!(d.assessment.class, DisplayClass::Divergent);
        assert_eq!(d.assessment.rows[0].reference, "500,00");
        assert_eq!(d.assessment.rows[1].reference, "--");
    }

    #[test]
    fn block_detail_success_and_failure() {
        let mut card = BlockDetailCard::default();
        render_block_detail(&mut card, Some("|E001|0|\n\n|E116|0|1,00|"), RowFilter::All);
        assert_eq!(card.rows.len(), 2);
        assert_eq!(card.class, DisplayClass::Ok);
        assert_eq!(card.status, "Ready for manual review");

        render_block_detail(&mut card, Some(BLOCK_NOT_FOUND_MARKER), RowFilter::All);
        assert!(card.rows.is_empty());
        assert!(card.error.is_some());
        assert_eq!(card.class, DisplayClass::Divergent);

        render_block_detail(&mut card, None, RowFilter::All);
        assert_eq!(card.status, "Failed to read ledger block");
    }

    #[test]
    fn block_detail_respects_active_filter() {
        let mut card = BlockDetailCard::default();
        let filter = RowFilter::Category(RecordCategory::Boundary);
        render_block_detail(&mut card, Some("|E001|0|\n|E116|0|1,00|\n|E990|3|"), filter);
        let hidden: Vec<bool> = card.rows.iter().map(|r| r.hidden).collect();
        assert_eq!(hidden, vec![false, true, false]);
    }

    #[test]
    fn breakdown_is_sorted() {
        let mut card = BlockDetailCard::default();
        let entries = vec![
            ("PA020".to_string(), Some(RawNumber::Number(5.0))),
            ("MG010".to_string(), Some(RawNumber::Text("1234.5".into()))),
            ("PA010".to_string(), None),
        ];
        render_breakdown(&mut card, Some(entries.as_slice()));
        let codes: Vec<_> = card.breakdown.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["MG010", "PA010", "PA020"]);
        assert_eq!(card.breakdown[0].amount, "R$ 1.234,50");
        assert_eq!(card.breakdown[1].amount, "R$ --");
        assert!(card.breakdown_message.is_none());
    }

    #[test]
    fn empty_breakdown_marks_card() {
        let mut card = BlockDetailCard { class: DisplayClass::Ok, ..Default::default() };
        render_breakdown(&mut card, Some(&[][..]));
        assert!(card.breakdown.is_empty());
        assert!(card.breakdown_message.is_some());
        assert_eq!(card.class, DisplayClass::Divergent);
        assert_eq!(card.status, "Codes not found in reference document");
    }

    #[test]
    fn alerts_three_outcomes() {
        let mut card = AlertsCard::default();

        render_alerts(&mut card, Some(&["PA010".to_string()][..]));
        assert_eq!(card.lines.len(), 1);
        assert!(card.lines[0].contains("PA010"));
        assert_eq!(card.status.text, "1 alert(s) found");
        assert_eq!(card.class, DisplayClass::Divergent);

        render_alerts(&mut card, Some(&[][..]));
        assert_eq!(card.status.text, "All matched");
        assert_eq!(card.class, DisplayClass::Ok);
        assert_eq!(card.lines.len(), 1);
        let all_matched_line = card.lines[0].clone();

        render_alerts(&mut card, None);
        assert_eq!(card.status.text, "Verification failed");
        assert_eq!(card.class, DisplayClass::Divergent);
        assert_eq!(card.lines.len(), 1);
        assert_ne!(card.lines[0], all_matched_line);
    }

    #[test]
    fn payable_sum_within_tolerance() {
        let mut card = SumCard::default();
        let block = "|E116|001|1.234,56|\n|E116|002|100,00|";
        render_payable_sum(&mut card, Some(block), Some(&RawNumber::Number(1334.555)));
        assert_eq!(card.ledger, "R$ 1.334,56");
        assert_eq!(card.class, DisplayClass::Ok);

        render_payable_sum(&mut card, Some(block), None);
        assert_eq!(card.reference, "R$ 0,00");
        assert_eq!(card.class, DisplayClass::Divergent);
        assert_eq!(card.status.text, "Values diverge");
    }

    #[test]
    fn payable_sum_shows_unreadable_reference_as_received() {
        let mut card = SumCard::default();
        render_payable_sum(&mut card, Some("|E116|001|5,00|"), Some(&RawNumber::Text("ERRO".into())));
        assert_eq!(card.ledger, "R$ 5,00");
        assert_eq!(card.reference, "R$ ERRO");
        assert_eq!(card.class, DisplayClass::Divergent);

        render_payable_sum(&mut card, Some("|E116|001|5,00|"), Some(&RawNumber::Text(" ".into())));
        assert_eq!(card.reference, "R$ 0,00");

        render_payable_sum(&mut card, Some("|E116|001|5,00|"), Some(&RawNumber::Text("5.00".into())));
        assert_eq!(card.reference, "R$ 5,00");
        assert_eq!(card.class, DisplayClass::Ok);
    }

    #[test]
    fn positional_category_is_not_rendered_as_match() {
        let resp: crate::wire::LegacyResponse =
            serde_json::from_str(r#"{"entradas": [null, null, "OK", null]}"#).unwrap();
        let mut d = Dashboard::new();
        render_category(&mut d.inflows, resp.entradas.as_ref());
        assert_eq!(d.inflows.class, DisplayClass::Divergent);
        assert_ne!(d.inflows.status.text, "Values match");
    }

    #[test]
    fn details_summary() {
        let mut card = DetailsCard::default();
        let items = vec![
            DetailItem {
                label: Some("Total debits".into()),
                source: Some("1,000.00".into()),
                reference: Some("1,000.00".into()),
                status: Status::Matched,
            },
            DetailItem { label: None, source: None, reference: None, status: Status::Failed },
        ];
        render_details(&mut card, Some(items.as_slice()));
        assert_eq!(card.lines[0].source, "1.000,00");
        assert_eq!(card.lines[1].label, "--");
        assert_eq!(card.status.text, "1 of 2 items diverge");
        assert_eq!(card.class, DisplayClass::Divergent);

        render_details(&mut card, Some(&items[..1]));
        assert_eq!(card.class, DisplayClass::Ok);

        render_details(&mut card, None);
        assert!(card.lines.is_empty());
        assert_eq!(card.class, DisplayClass::Divergent);
    }

    #[test]
    fn records_collect_columns() {
        let mut panel = RecordsPanel::default();
        let rows: LedgerRecordRows = serde_json::from_str(
            r#"[{"REG": "E111", "COD_AJ_APUR": "PA010001"}, {"REG": "E111", "VL_AJ_APUR": 3}]"#,
        )
        .unwrap();
        let records = vec![("E111".to_string(), rows)];
        render_records(&mut panel, Some(records.as_slice()));
        let group = &panel.groups[0];
        assert_eq!(group.columns, vec!["REG", "COD_AJ_APUR", "VL_AJ_APUR"]);
        assert_eq!(group.rows[1], vec!["E111", "", "3"]);
    }

    #[test]
    fn mark_failed_per_variant() {
        let mut d = Dashboard::new();
        mark_failed(&mut d, Variant::Legacy, "boom");
        assert_eq!(d.status_line, "ERROR: boom");
        assert_eq!(d.block_detail.status, ANALYSIS_FAILED_TEXT);
        assert_eq!(d.alerts.class, DisplayClass::Divergent);
        assert_eq!(d.details.status.text, AWAITING_TEXT);

        let mut d = Dashboard::new();
        mark_failed(&mut d, Variant::Combined, "boom");
        assert_eq!(d.details.class, DisplayClass::Divergent);
        assert_eq!(d.alerts.class, DisplayClass::Awaiting);
    }
}
