//! Dashboard view-model.
//!
//! Plain data describing what is on screen: cards, status boxes, tables.
//! Renderers in [`crate::render`] write into it; front-ends only read it.

use serde::Serialize;

use crate::filter::RowFilter;
use crate::format::SENTINEL;
use crate::ledger::BlockRow;
use crate::status::{DisplayClass, Status};

pub const AWAITING_TEXT: &str = "Awaiting...";
pub const TRIGGER_IDLE_LABEL: &str = "Run full analysis";
pub const TRIGGER_BUSY_LABEL: &str = "Processing...";

/// A status text with its visual class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBox {
    pub text: String,
    pub class: DisplayClass,
}

impl StatusBox {
    pub fn awaiting() -> Self {
        Self { text: AWAITING_TEXT.to_string(), class: DisplayClass::Awaiting }
    }

    pub fn set(&mut self, text: impl Into<String>, class: DisplayClass) {
        self.text = text.into();
        self.class = class;
    }
}

impl Default for StatusBox {
    fn default() -> Self {
        Self::awaiting()
    }
}

/// One compared field: ledger value, book value and its mini indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRow {
    pub name: &'static str,
    pub source: String,
    pub reference: String,
    pub indicator: StatusBox,
}

impl ValueRow {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            source: SENTINEL.to_string(),
            reference: SENTINEL.to_string(),
            indicator: StatusBox::awaiting(),
        }
    }

    pub fn set_status(&mut self, status: Status) {
        self.indicator.set(format!("{} {}", self.name, status.label()), status.class());
    }

    fn reset(&mut self) {
        self.source = SENTINEL.to_string();
        self.reference = SENTINEL.to_string();
        self.indicator = StatusBox::awaiting();
    }
}

/// Totals card for inflows, outflows or the tax assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsCard {
    pub title: &'static str,
    pub class: DisplayClass,
    pub status: StatusBox,
    pub rows: Vec<ValueRow>,
}

impl TotalsCard {
    fn new(title: &'static str, fields: &[&'static str]) -> Self {
        Self {
            title,
            class: DisplayClass::Awaiting,
            status: StatusBox::awaiting(),
            rows: fields.iter().copied().map(ValueRow::new).collect(),
        }
    }

    fn reset(&mut self) {
        self.class = DisplayClass::Awaiting;
        self.status = StatusBox::awaiting();
        self.rows.iter_mut().for_each(ValueRow::reset);
    }
}

/// Ledger block table plus the adjustment-code breakdown from the book.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockDetailCard {
    pub class: DisplayClass,
    pub status: String,
    pub rows: Vec<BlockRow>,
    /// Replaces the rows when the block could not be read.
    pub error: Option<String>,
    pub breakdown: Vec<BreakdownRow>,
    /// Shown instead of the breakdown when the book had no codes.
    pub breakdown_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub code: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertsCard {
    pub class: DisplayClass,
    pub status: StatusBox,
    pub lines: Vec<String>,
}

/// Ledger payable sum against the book's supplementary-information sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumCard {
    pub class: DisplayClass,
    pub status: StatusBox,
    pub ledger: String,
    pub reference: String,
}

impl Default for SumCard {
    fn default() -> Self {
        Self {
            class: DisplayClass::Awaiting,
            status: StatusBox::awaiting(),
            ledger: SENTINEL.to_string(),
            reference: SENTINEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailLine {
    pub label: String,
    pub source: String,
    pub reference: String,
    pub status: Status,
}

/// Itemized assessment comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailsCard {
    pub class: DisplayClass,
    pub status: StatusBox,
    pub lines: Vec<DetailLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordGroup {
    pub code: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Collapsible panel with the raw ledger records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordsPanel {
    pub expanded: bool,
    pub groups: Vec<RecordGroup>,
}

/// The submit control and its busy indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub enabled: bool,
    pub label: String,
    pub busy: bool,
}

impl Trigger {
    pub fn begin(&mut self) {
        self.enabled = false;
        self.busy = true;
        self.label = TRIGGER_BUSY_LABEL.to_string();
    }

    pub fn release(&mut self) {
        self.enabled = true;
        self.busy = false;
        self.label = TRIGGER_IDLE_LABEL.to_string();
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self { enabled: true, label: TRIGGER_IDLE_LABEL.to_string(), busy: false }
    }
}

pub const INFLOW_FIELDS: [&str; 3] = ["Total operations", "ICMS base", "ICMS total"];
pub const ASSESSMENT_FIELDS: [&str; 2] = ["Code 013", "Code 014"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub status_line: String,
    pub trigger: Trigger,
    pub inflows: TotalsCard,
    pub outflows: TotalsCard,
    pub assessment: TotalsCard,
    pub block_detail: BlockDetailCard,
    pub alerts: AlertsCard,
    pub payable_sum: SumCard,
    pub details: DetailsCard,
    pub records: RecordsPanel,
    pub filter: RowFilter,
    pub sidebar_open: bool,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            status_line: String::new(),
            trigger: Trigger::default(),
            inflows: TotalsCard::new("Inflows", &INFLOW_FIELDS),
            outflows: TotalsCard::new("Outflows", &INFLOW_FIELDS),
            assessment: TotalsCard::new("Assessment", &ASSESSMENT_FIELDS),
            block_detail: BlockDetailCard { status: AWAITING_TEXT.to_string(), ..Default::default() },
            alerts: AlertsCard::default(),
            payable_sum: SumCard::default(),
            details: DetailsCard::default(),
            records: RecordsPanel::default(),
            filter: RowFilter::All,
            sidebar_open: false,
        }
    }

    /// Put every section back to its awaiting state.
    ///
    /// The status line, trigger and sidebar are owned by the caller and
    /// left alone.
    pub fn reset(&mut self) {
        self.inflows.reset();
        self.outflows.reset();
        self.assessment.reset();

        self.block_detail = BlockDetailCard { status: AWAITING_TEXT.to_string(), ..Default::default() };
        self.alerts = AlertsCard::default();
        self.payable_sum = SumCard::default();
        self.details = DetailsCard::default();
        self.records.groups.clear();
        self.filter = RowFilter::All;
    }

    /// Change the ledger table filter and re-apply it to rendered rows.
    pub fn set_filter(&mut self, filter: RowFilter) {
        self.filter = filter;
        filter.apply(&mut self.block_detail.rows);
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn toggle_records(&mut self) {
        self.records.expanded = !self.records.expanded;
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &BlockRow> {
        self.block_detail.rows.iter().filter(|r| !r.hidden)
    }

    /// Classes of every card that carries a comparison outcome.
    pub fn outcome_classes(&self) -> Vec<DisplayClass> {
        vec![
            self.inflows.class,
            self.outflows.class,
            self.assessment.class,
            self.block_detail.class,
            self.alerts.class,
            self.payable_sum.class,
            self.details.class,
        ]
    }

    /// True when any card ended up divergent.
    pub fn has_divergence(&self) -> bool {
        self.outcome_classes().contains(&DisplayClass::Divergent)
    }
}
