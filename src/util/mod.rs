//! Utility module
//! 
//! This module provides common utilities and helper functions used
//! throughout the library.

use std::fmt::Write;

use tracing::Level;

/// Formats bytes as space-prefixed upper-case hex, e.g. `" 04 A1"`
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = write!(out, " {:02X}", b);
    }
    out
}

/// Backoff for programming replies
///
/// Adapters answering the same broadcast spread their replies by their
/// own low address.
pub fn reply_backoff(backoff_max: u8, adapter_low: u8) -> u8 {
    backoff_max.saturating_sub(adapter_low % 10)
}

/// Installs a formatting subscriber at `level`
///
/// Returns false if a global subscriber was already set.
pub fn init_tracing(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
