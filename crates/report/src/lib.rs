//! `ledgercheck-report`: fiscal reconciliation report normalization.
//!
//! Pure crate: decodes backend responses of either variant into one
//! report shape and renders it into a dashboard view-model.
//! No HTTP, no terminal output.

pub mod error;
pub mod filter;
pub mod format;
pub mod ledger;
pub mod model;
pub mod render;
pub mod status;
pub mod view;
pub mod wire;

pub use error::ReportError;
pub use filter::RowFilter;
pub use format::{format_decimal, format_localized, RawNumber, SENTINEL};
pub use ledger::{amounts_match, sum_block_values, RecordCategory};
pub use model::{ReconReport, Variant};
pub use render::{apply_report, mark_failed};
pub use status::{DisplayClass, Status};
pub use view::Dashboard;
