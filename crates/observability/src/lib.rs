//! Structured logging setup shared by ledger hosts and tests.

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init();
}

/// Subscriber configuration (filters, formatting).
pub mod logging;
