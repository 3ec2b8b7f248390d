//! Profile pin handling.
//!
//! Pins are stored base64 encoded, which is the format existing records use.
//! This keeps casual eyes off the value in the data file; it is not a
//! security boundary and anyone with access to the file can decode it.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode a pin for storage
pub fn obfuscate(pin: &str) -> String {
    STANDARD.encode(pin.as_bytes())
}

/// Check `candidate` against a stored pin.
/// A missing or empty stored pin accepts any candidate.
pub fn matches(stored: Option<&str>, candidate: &str) -> bool {
    match stored {
        None => true,
        Some(stored) if stored.is_empty() => true,
        Some(stored) => stored == obfuscate(candidate),
    }
}
