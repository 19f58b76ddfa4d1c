//! Upload controller.
//!
//! Drives one submission at a time through
//! `Idle → Validating → Submitting → {Success, Failed}` and owns the
//! dashboard the renderers write into. The trigger is released exactly once
//! for every submission that reaches the backend, whatever the outcome.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ledgercheck_client::{ClientError, ReconClient, UploadFile};
use ledgercheck_report::{apply_report, mark_failed, Dashboard, ReconReport, ReportError, Variant};

pub const VALIDATION_TEXT: &str =
    "Select both documents: the ledger (.txt) and the reference book (.pdf).";
pub const PROCESSING_TEXT: &str =
    "Processing: uploading documents and running the analysis. This can take several minutes.";
pub const SUCCESS_TEXT: &str = "Analysis complete.";

/// Seam between the controller and the HTTP transport.
pub trait ReconBackend {
    fn submit(&self, variant: Variant, ledger: UploadFile, book: UploadFile)
        -> Result<Vec<u8>, ClientError>;
}

impl ReconBackend for ReconClient {
    fn submit(&self, variant: Variant, ledger: UploadFile, book: UploadFile)
        -> Result<Vec<u8>, ClientError>
    {
        ReconClient::submit(self, variant, ledger, book)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Validating,
    Submitting,
    Success,
    Failed,
}

impl ControllerState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ControllerState::Validating | ControllerState::Submitting)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    /// Another submission is still in flight
    Busy,
    /// Inputs rejected before anything was sent
    Validation(String),
    /// Transport failure or non-success response
    Client(ClientError),
    /// Success response that is not a usable report
    Report(ReportError),
}

impl ControllerError {
    /// Text shown on the status line after `ERROR: `.
    pub fn failure_message(&self) -> String {
        match self {
            ControllerError::Client(ClientError::Server { message, .. }) => message.clone(),
            ControllerError::Client(ClientError::Network(msg))
            | ControllerError::Client(ClientError::Io(msg)) => msg.clone(),
            ControllerError::Report(err) => format!("invalid report from server: {}", err),
            ControllerError::Busy | ControllerError::Validation(_) => self.to_string(),
        }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Busy => write!(f, "a submission is already in progress"),
            ControllerError::Validation(msg) => write!(f, "{}", msg),
            ControllerError::Client(err) => write!(f, "{}", err),
            ControllerError::Report(err) => write!(f, "invalid report from server: {}", err),
        }
    }
}

impl std::error::Error for ControllerError {}

/// Documents accepted by validation, waiting to be sent.
#[derive(Debug)]
pub struct PendingSubmission {
    ledger: UploadFile,
    book: UploadFile,
    started_at: DateTime<Utc>,
}

/// What a successful submission leaves behind besides the dashboard.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub variant: Variant,
    pub submitted_at: DateTime<Utc>,
    pub ledger_fingerprint: String,
    pub book_fingerprint: String,
    /// Raw response body, as received.
    pub body: Vec<u8>,
}

pub struct UploadController<B> {
    backend: B,
    variant: Variant,
    state: ControllerState,
    dashboard: Dashboard,
    cleanups: usize,
}

impl<B: ReconBackend> UploadController<B> {
    pub fn new(backend: B, variant: Variant) -> Self {
        Self {
            backend,
            variant,
            state: ControllerState::Idle,
            dashboard: Dashboard::new(),
            cleanups: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard {
        &mut self.dashboard
    }

    /// Number of times the trigger has been released.
    pub fn cleanups(&self) -> usize {
        self.cleanups
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate, send and render one submission.
    pub fn submit(&mut self, ledger: Option<&Path>, book: Option<&Path>) -> Result<Receipt, ControllerError> {
        let pending = self.begin(ledger, book)?;
        self.dispatch(pending)
    }

    /// Validate the inputs and enter `Submitting`.
    ///
    /// On validation failure the controller stays idle and the backend is
    /// never reached.
    pub fn begin(&mut self, ledger: Option<&Path>, book: Option<&Path>) -> Result<PendingSubmission, ControllerError> {
        if self.state.is_busy() {
            log::warn!("submission rejected: controller is {:?}", self.state);
            return Err(ControllerError::Busy);
        }

        let previous = self.state;
        self.transition(ControllerState::Validating);
        let uploads = validate(ledger, book);
        let (ledger, book) = match uploads {
            Ok(files) => files,
            Err(err) => {
                self.dashboard.status_line = err.to_string();
                self.transition(previous);
                return Err(err);
            }
        };

        self.dashboard.trigger.begin();
        self.dashboard.status_line = PROCESSING_TEXT.to_string();
        self.dashboard.reset();
        self.transition(ControllerState::Submitting);

        Ok(PendingSubmission { ledger, book, started_at: Utc::now() })
    }

    /// Send a validated submission and render whatever comes back.
    pub fn dispatch(&mut self, pending: PendingSubmission) -> Result<Receipt, ControllerError> {
        let ledger_fingerprint = pending.ledger.digest();
        let book_fingerprint = pending.book.digest();
        log::info!(
            "submitting {} and {} ({})",
            pending.ledger.path.display(),
            pending.book.path.display(),
            self.variant
        );

        let result = self.backend.submit(self.variant, pending.ledger, pending.book);
        let outcome = result
            .map_err(ControllerError::Client)
            .and_then(|body| {
                let report = ReconReport::decode(self.variant, &body).map_err(ControllerError::Report)?;
                Ok((body, report))
            });

        let outcome = match outcome {
            Ok((body, report)) => {
                apply_report(&mut self.dashboard, &report);
                self.dashboard.status_line = SUCCESS_TEXT.to_string();
                self.transition(ControllerState::Success);
                Ok(Receipt {
                    variant: self.variant,
                    submitted_at: pending.started_at,
                    ledger_fingerprint,
                    book_fingerprint,
                    body,
                })
            }
            Err(err) => {
                log::warn!("submission failed: {}", err);
                mark_failed(&mut self.dashboard, self.variant, &err.failure_message());
                self.transition(ControllerState::Failed);
                Err(err)
            }
        };

        self.cleanup();
        outcome
    }

    fn cleanup(&mut self) {
        self.dashboard.trigger.release();
        self.cleanups += 1;
    }

    fn transition(&mut self, next: ControllerState) {
        log::debug!("controller: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn validate(ledger: Option<&Path>, book: Option<&Path>) -> Result<(UploadFile, UploadFile), ControllerError> {
    let (ledger, book) = match (ledger, book) {
        (Some(l), Some(b)) => (l, b),
        _ => return Err(ControllerError::Validation(VALIDATION_TEXT.to_string())),
    };

    for (what, path) in [("ledger", ledger), ("reference book", book)] {
        if !path.is_file() {
            return Err(ControllerError::Validation(format!(
                "{} file not found: {}",
                what,
                path.display()
            )));
        }
    }

    let load_err = |e: ClientError| ControllerError::Validation(e.to_string());
    let ledger = UploadFile::ledger(ledger).map_err(load_err)?;
    let book = UploadFile::book(book).map_err(load_err)?;
    Ok((ledger, book))
}
