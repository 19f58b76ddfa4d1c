//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | reconciliation   | Outcome codes (only with --strict)       |
//! | 40-41   | backend          | Transport, server and report codes       |
//! | 42      | configuration    | Invalid settings file or env override    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use ledgercheck_cli::controller::ControllerError;
use ledgercheck_client::ClientError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unreadable input files.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Reconciliation (3-9)
// =============================================================================

/// At least one section diverged (and --strict is set).
pub const EXIT_DIVERGENT: u8 = 3;

// =============================================================================
// Backend (40-41)
// =============================================================================

/// Network failure or non-success HTTP status from the backend.
pub const EXIT_BACKEND: u8 = 40;

/// Backend answered 2xx but the body is not a usable report.
pub const EXIT_MALFORMED_REPORT: u8 = 41;

// =============================================================================
// Configuration (42)
// =============================================================================

/// Settings file or environment override is invalid.
pub const EXIT_CONFIG: u8 = 42;

/// Map a ControllerError to its exit code.
pub fn controller_exit_code(err: &ControllerError) -> u8 {
    match err {
        ControllerError::Busy => EXIT_ERROR,
        ControllerError::Validation(_) => EXIT_USAGE,
        ControllerError::Client(ClientError::Io(_)) => EXIT_USAGE,
        ControllerError::Client(_) => EXIT_BACKEND,
        ControllerError::Report(_) => EXIT_MALFORMED_REPORT,
    }
}
