//! Plain-text rendering of the dashboard for terminals and logs.

use std::fmt::Write;

use ledgercheck_report::view::{BlockDetailCard, TotalsCard};
use ledgercheck_report::{Dashboard, DisplayClass, RowFilter, Variant};

fn badge(class: DisplayClass) -> String {
    format!("[{}]", class.as_str().to_ascii_uppercase())
}

/// Section titles shown for a variant, in display order.
pub fn section_index(variant: Variant) -> &'static [&'static str] {
    match variant {
        Variant::Legacy => &[
            "Inflows",
            "Outflows",
            "Assessment",
            "Ledger block",
            "Breakdown codes",
            "Alerts",
            "Payable sum",
        ],
        Variant::Combined => &[
            "Inflows",
            "Outflows",
            "Assessment",
            "Itemized comparison",
            "Ledger records",
        ],
    }
}

fn padded_line<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut s = String::from(" ");
    for (width, cell) in widths.iter().zip(cells) {
        let pad = width.saturating_sub(cell.chars().count());
        let _ = write!(s, " {}{}", cell, " ".repeat(pad));
    }
    s.trim_end().to_string()
}

/// Left-aligned table with two-space indent.
fn table(out: &mut String, header: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i >= widths.len() {
                widths.push(0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let _ = writeln!(out, "{}", padded_line(&widths, header.iter().copied()));
    for row in rows {
        let _ = writeln!(out, "{}", padded_line(&widths, row.iter().map(String::as_str)));
    }
}

fn heading(out: &mut String, title: &str, class: DisplayClass, status: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "== {} {} {}", title, badge(class), status);
}

fn totals(out: &mut String, card: &TotalsCard) {
    heading(out, card.title, card.class, &card.status.text);
    let rows: Vec<Vec<String>> = card
        .rows
        .iter()
        .map(|r| {
            vec![
                r.name.to_string(),
                r.source.clone(),
                r.reference.clone(),
                format!("{} {}", badge(r.indicator.class), r.indicator.text),
            ]
        })
        .collect();
    table(out, &["Field", "Ledger", "Book", "Status"], &rows);
}

fn block_detail(out: &mut String, card: &BlockDetailCard, filter: RowFilter) {
    heading(out, "Ledger block", card.class, &card.status);
    if let Some(err) = &card.error {
        let _ = writeln!(out, "  {}", err);
        return;
    }

    let mut hidden = 0;
    for row in &card.rows {
        if row.hidden {
            hidden += 1;
            continue;
        }
        let tag = row.category.map(|c| c.tag()).unwrap_or("");
        let cells: Vec<&str> = row.cells.iter().map(|c| c.text.as_str()).collect();
        let _ = writeln!(out, "  {:<9} |{}|", tag, cells.join("|"));
    }
    if hidden > 0 {
        let _ = writeln!(out, "  ({} rows hidden by filter {})", hidden, filter);
    }
}

fn breakdown(out: &mut String, card: &BlockDetailCard) {
    let _ = writeln!(out);
    let _ = writeln!(out, "== Breakdown codes");
    match &card.breakdown_message {
        Some(msg) => {
            let _ = writeln!(out, "  {}", msg);
        }
        None => {
            let rows: Vec<Vec<String>> = card
                .breakdown
                .iter()
                .map(|r| vec![r.code.clone(), r.amount.clone()])
                .collect();
            table(out, &["Code", "Book amount"], &rows);
        }
    }
}

/// Render the whole dashboard as text.
pub fn render_dashboard(dashboard: &Dashboard, variant: Variant) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ledgercheck ({})", variant);
    if !dashboard.status_line.is_empty() {
        let _ = writeln!(out, "{}", dashboard.status_line);
    }

    if dashboard.sidebar_open {
        let _ = writeln!(out);
        let _ = writeln!(out, "Sections:");
        for (i, title) in section_index(variant).iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, title);
        }
    }

    totals(&mut out, &dashboard.inflows);
    totals(&mut out, &dashboard.outflows);
    totals(&mut out, &dashboard.assessment);

    match variant {
        Variant::Legacy => {
            block_detail(&mut out, &dashboard.block_detail, dashboard.filter);
            breakdown(&mut out, &dashboard.block_detail);

            let alerts = &dashboard.alerts;
            heading(&mut out, "Alerts", alerts.class, &alerts.status.text);
            for line in &alerts.lines {
                let _ = writeln!(out, "  - {}", line);
            }

            let sum = &dashboard.payable_sum;
            heading(&mut out, "Payable sum (E116)", sum.class, &sum.status.text);
            let _ = writeln!(out, "  Ledger: {}", sum.ledger);
            let _ = writeln!(out, "  Book:   {}", sum.reference);
        }
        Variant::Combined => {
            let details = &dashboard.details;
            heading(&mut out, "Itemized comparison", details.class, &details.status.text);
            let rows: Vec<Vec<String>> = details
                .lines
                .iter()
                .map(|l| {
                    vec![
                        l.label.clone(),
                        l.source.clone(),
                        l.reference.clone(),
                        badge(l.status.class()),
                    ]
                })
                .collect();
            if !rows.is_empty() {
                table(&mut out, &["Field", "Ledger", "Book", "Status"], &rows);
            }

            let records = &dashboard.records;
            let _ = writeln!(out);
            let _ = writeln!(out, "== Ledger records ({} groups)", records.groups.len());
            if records.expanded {
                for group in &records.groups {
                    let _ = writeln!(out, "  {} ({} rows)", group.code, group.rows.len());
                    let header: Vec<&str> = group.columns.iter().map(String::as_str).collect();
                    table(&mut out, &header, &group.rows);
                }
            } else if !records.groups.is_empty() {
                let codes: Vec<&str> = records.groups.iter().map(|g| g.code.as_str()).collect();
                let _ = writeln!(out, "  {} (use --records to expand)", codes.join(", "));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgercheck_report::{apply_report, RecordCategory, ReconReport};

    const LEGACY: &str = r#"{
        "entradas": {
            "sped": {"total_operacao": "1.000,00"},
            "livro": {"total_operacao": "1.000,00"},
            "status_detalhado": {"total_operacao": "OK"},
            "status": "OK"
        },
        "bloco_e_texto": "|E001|0|\n|E111|PA010001|Ajuste|150,00|\n|E116|000|150,00|\n|E990|4|",
        "detalhamento_codigos": {"PA010001": 150.0},
        "codigos_ausentes_livro": ["MG020002"],
        "soma_livro_inf_comp": 150.0
    }"#;

    fn legacy_dashboard() -> Dashboard {
        let report = ReconReport::decode(Variant::Legacy, LEGACY.as_bytes()).unwrap();
        let mut dashboard = Dashboard::new();
        apply_report(&mut dashboard, &report);
        dashboard
    }

    #[test]
    fn legacy_sections_are_printed() {
        let text = render_dashboard(&legacy_dashboard(), Variant::Legacy);
        assert!(text.contains("== Inflows [OK] Values match"));
        assert!(text.contains("R$ 150,00"));
        assert!(text.contains("PA010001"));
        assert!(text.contains("== Alerts [DIVERGENT] 1 alert(s) found"));
        assert!(text.contains("MG020002"));
        assert!(text.contains("== Payable sum (E116) [OK]"));
        assert!(!text.contains("Sections:"));
    }

    #[test]
    fn filter_hides_rows_and_reports_count() {
        let mut dashboard = legacy_dashboard();
        dashboard.set_filter(RowFilter::Category(RecordCategory::Payable));
        let text = render_dashboard(&dashboard, Variant::Legacy);
        assert!(text.contains("reg-e116"));
        assert!(!text.contains("|E111|"));
        assert!(text.contains("(3 rows hidden by filter reg-e116)"));
    }

    #[test]
    fn sidebar_lists_sections() {
        let mut dashboard = Dashboard::new();
        dashboard.toggle_sidebar();
        let text = render_dashboard(&dashboard, Variant::Combined);
        assert!(text.contains("Sections:"));
        assert!(text.contains("  4. Itemized comparison"));
        assert!(text.contains("== Inflows [AWAITING] Awaiting..."));
    }

    #[test]
    fn records_collapse_and_expand() {
        let body = r#"{
            "conciliacao_detalhes": {
                "conciliacao_E110": [],
                "dados_blocos_sped": {"E116": [{"COD_OR": "000", "VL_OR": "150,00"}]}
            }
        }"#;
        let report = ReconReport::decode(Variant::Combined, body.as_bytes()).unwrap();
        let mut dashboard = Dashboard::new();
        apply_report(&mut dashboard, &report);

        let text = render_dashboard(&dashboard, Variant::Combined);
        assert!(text.contains("E116 (use --records to expand)"));

        dashboard.toggle_records();
        let text = render_dashboard(&dashboard, Variant::Combined);
        assert!(text.contains("COD_OR"));
        assert!(text.contains("150,00"));
    }
}
