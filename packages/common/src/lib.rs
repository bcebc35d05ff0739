//! Common infrastructure shared by the warrant crates
//!
//! This crate provides:
//! - Logging bootstrap and log-safe token fingerprints
//! - The base64url segment codec used by every token wire format
//! - An injectable clock so time-bound checks can be tested deterministically

pub mod clock;
pub mod encoding;
pub mod logging;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use encoding::{decode_segment, encode_segment, encode_segment_padded};
pub use logging::{fingerprint, LoggingTransformer};
