//! Base64url segment codec
//!
//! Every wire format in the workspace is built from URL-safe base64 segments.
//! Encoding never pads; decoding accepts both padded and unpadded input, so
//! blobs produced by padded encoders elsewhere still round-trip.

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    DecodeError, Engine as _,
};

/// Base64 URL-safe encoding without padding (RFC 7515)
#[inline]
#[must_use]
pub fn encode_segment(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Base64 URL-safe encoding with `=` padding
#[inline]
#[must_use]
pub fn encode_segment_padded(input: &[u8]) -> String {
    URL_SAFE.encode(input)
}

/// Base64 URL-safe decoding, padding optional
///
/// # Errors
/// Returns the underlying [`DecodeError`] for any non-alphabet character,
/// impossible length, or non-canonical trailing bits.
#[inline]
pub fn decode_segment(input: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_has_no_padding() {
        assert_eq!(encode_segment(b"ab"), "YWI");
        assert_eq!(encode_segment_padded(b"ab"), "YWI=");
    }

    #[test]
    fn test_decode_accepts_padded_and_unpadded() {
        assert_eq!(decode_segment("YWI").unwrap(), b"ab");
        assert_eq!(decode_segment("YWI=").unwrap(), b"ab");
    }

    #[test]
    fn test_url_safe_alphabet() {
        let bytes = [0xfb, 0xff, 0xbf];
        let encoded = encode_segment(&bytes);
        assert_eq!(encoded, "-_-_");
        assert_eq!(decode_segment(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_segment("not base64!").is_err());
        assert!(decode_segment("A").is_err());
    }
}
