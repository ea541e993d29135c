use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::DecodeError;

// Gmail sometimes drops the trailing padding.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode Gmail's URL-safe base64 (`-`/`_`) into raw bytes.
pub fn decode_base64url_bytes(data: &str) -> Result<Vec<u8>, DecodeError> {
    let standard: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    Ok(STANDARD_LENIENT.decode(standard)?)
}

/// Decode a base64url body into text. Bytes are read as UTF-8; invalid
/// sequences become U+FFFD instead of failing the whole body.
pub fn decode_base64url(data: &str) -> Result<String, DecodeError> {
    let bytes = decode_base64url_bytes(data)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn to_url_safe(standard: &str) -> String {
        standard.replace('+', "-").replace('/', "_")
    }

    #[test]
    fn round_trips_bytes_through_url_safe_alphabet() {
        // 0xfb 0xff produces both '+' and '/' in standard base64
        let samples: [&[u8]; 4] = [b"", b"hello world", &[0xfb, 0xff, 0xbf, 0x3e], &[0u8; 7]];
        for bytes in samples {
            let encoded = to_url_safe(&STANDARD.encode(bytes));
            assert_eq!(decode_base64url_bytes(&encoded).unwrap(), bytes);
        }
    }

    #[test]
    fn decodes_multibyte_utf8() {
        let encoded = to_url_safe(&STANDARD.encode("Grüße — 日本語"));
        assert_eq!(decode_base64url(&encoded).unwrap(), "Grüße — 日本語");
    }

    #[test]
    fn accepts_missing_padding() {
        assert_eq!(decode_base64url("aGk").unwrap(), "hi");
        assert_eq!(decode_base64url("aGk=").unwrap(), "hi");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let encoded = to_url_safe(&STANDARD.encode([b'a', 0xff, b'b']));
        assert_eq!(decode_base64url(&encoded).unwrap(), "a\u{fffd}b");
    }

    #[test]
    fn rejects_non_base64_input() {
        assert!(matches!(
            decode_base64url("not*base64!"),
            Err(DecodeError::InvalidBase64(_))
        ));
    }
}
