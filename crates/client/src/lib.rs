//! Reconciliation backend client.
//!
//! Single source of truth for the upload contract: endpoint per variant,
//! multipart field names, error envelope.
//!
//! No retries. No cancellation. One request per submission.

mod client;
mod envelope;

pub use client::{hash_bytes, hash_file, ClientError, ReconClient, UploadFile, BOOK_FIELD, LEDGER_FIELD};
pub use envelope::{extract_error, ErrorEnvelope, GENERIC_SERVER_ERROR};
