//! Reconciliation backend HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One multipart POST
//! per submission, carrying the ledger text and the reference book PDF.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ledgercheck_report::Variant;

use crate::envelope::extract_error;

/// Multipart field carrying the SPED ledger text.
pub const LEDGER_FIELD: &str = "file_sped";
/// Multipart field carrying the reference book PDF.
pub const BOOK_FIELD: &str = "file_livro";

/// Reconciliation backend client (blocking).
#[derive(Clone)]
pub struct ReconClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

/// Error type for backend calls.
#[derive(Debug)]
pub enum ClientError {
    /// Reading an upload from disk failed
    Io(String),
    /// Client construction or transport failure
    Network(String),
    /// Backend answered with a non-success status
    Server { status: u16, message: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Io(msg) => write!(f, "I/O error: {}", msg),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Server { status, message } => {
                write!(f, "Processing error (HTTP {}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for ClientError {}

/// A document loaded for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub field: &'static str,
    pub path: PathBuf,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn load(field: &'static str, path: &Path, mime: &'static str) -> Result<Self, ClientError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.to_string());
        Ok(Self { field, path: path.to_path_buf(), file_name, mime, bytes })
    }

    pub fn ledger(path: &Path) -> Result<Self, ClientError> {
        Self::load(LEDGER_FIELD, path, "text/plain")
    }

    pub fn book(path: &Path) -> Result<Self, ClientError> {
        Self::load(BOOK_FIELD, path, "application/pdf")
    }

    pub fn digest(&self) -> String {
        hash_bytes(&self.bytes)
    }

    fn into_part(self) -> Result<reqwest::blocking::multipart::Part, ClientError> {
        reqwest::blocking::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(self.mime)
            .map_err(|e| ClientError::Network(e.to_string()))
    }
}

impl ReconClient {
    /// Create a client for `base_url`. `None` timeout waits indefinitely:
    /// the backend drives a desktop robot and can take several minutes.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("ledgercheck/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("cannot create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, variant: Variant) -> String {
        format!("{}{}", self.base_url, variant.endpoint())
    }

    /// Upload both documents and return the raw success body.
    pub fn submit(
        &self,
        variant: Variant,
        ledger: UploadFile,
        book: UploadFile,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint_url(variant);
        log::info!(
            "POST {} ({} {} bytes, {} {} bytes)",
            url,
            ledger.field,
            ledger.bytes.len(),
            book.field,
            book.bytes.len()
        );

        let form = reqwest::blocking::multipart::Form::new()
            .part(ledger.field, ledger.into_part()?)
            .part(book.field, book.into_part()?);

        let response = self.http.post(&url)
            .multipart(form)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            log::warn!("backend answered HTTP {}", status);
            return Err(ClientError::Server { status, message: extract_error(&body) });
        }

        let body = response.bytes().map_err(|e| ClientError::Network(e.to_string()))?;
        log::debug!("received {} byte report", body.len());
        Ok(body.to_vec())
    }
}

// ── Free functions ──────────────────────────────────────────────────

/// Compute blake3 hash of a file (with algorithm prefix).
pub fn hash_file(path: &Path) -> Result<String, ClientError> {
    let contents = std::fs::read(path)
        .map_err(|e| ClientError::Io(e.to_string()))?;
    Ok(hash_bytes(&contents))
}

/// Compute blake3 hash of bytes (with algorithm prefix).
pub fn hash_bytes(data: &[u8]) -> String {
    format!("blake3:{}", blake3::hash(data).to_hex())
}
