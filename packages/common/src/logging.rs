//! Structured logging bootstrap
//!
//! Library crates emit events through `tracing` (with its `log` bridge) or `log`
//! directly; this module installs an `env_logger` backend and provides the
//! helpers used to keep bearer tokens out of log output.

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Number of hex characters kept from a token digest.
const FINGERPRINT_LEN: usize = 12;

/// Logging bootstrap for applications embedding the token engine
pub struct LoggingTransformer;

impl LoggingTransformer {
    /// Initialize logging system (should be called once at application startup)
    ///
    /// Configure logging levels via the `RUST_LOG` environment variable:
    /// - `RUST_LOG=debug` - every rejected token is logged with its classification
    /// - `RUST_LOG=info` - signatory configuration and startup events
    /// - `RUST_LOG=warrant_security=debug` - module-specific levels
    pub fn init() {
        INIT_LOGGER.call_once(|| {
            env_logger::Builder::from_default_env()
                .format_timestamp_micros()
                .init();

            info!("structured logging initialized");
        });
    }

    /// Initialize logging for test environments
    ///
    /// Safe to call from every test; later calls are ignored.
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Log a signatory being configured for a purpose.
    pub fn log_signatory_configured(purpose: &str, algorithm: &str, encrypted: bool) {
        info!("signatory configured: {purpose} (alg: {algorithm}, encrypted: {encrypted})");
    }

    /// Log a token that failed validation.
    ///
    /// Only the fingerprint of the token is written, never the token itself.
    pub fn log_token_rejected(purpose: &str, token: &str, detail: &str) {
        debug!(
            "token rejected: {purpose} (token: {}, detail: {detail})",
            fingerprint(token)
        );
    }

    /// Log a token operation that failed for a reason other than validation.
    pub fn log_token_failure(operation: &str, purpose: &str, error: &dyn std::error::Error) {
        warn!("token operation failed: {operation} for {purpose} ({error})");
    }
}

/// Short, log-safe digest of a bearer token.
///
/// Returns `#` followed by the first twelve hex characters of the token's
/// SHA-256 digest, enough to correlate log lines without revealing the token.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let hash = hex::encode(Sha256::digest(token.as_bytes()));
    format!("#{}", &hash[..FINGERPRINT_LEN])
}
