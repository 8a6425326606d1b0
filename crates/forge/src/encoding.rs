//! Binary-safe text encoding for the contents APIs
//!
//! Both forges carry file content as standard base64. GitHub wraps the
//! encoded text at 60 columns, so decoding ignores ASCII whitespace.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use repotable_core::{Error, Result};

/// Encode UTF-8 text as base64
pub fn encode_base64(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode base64 (whitespace tolerated) into UTF-8 text
pub fn decode_base64(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| Error::UnreadableContent {
        reason: format!("invalid base64 content: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| Error::UnreadableContent {
        reason: format!("content is not UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode_base64("[{\"id\":1}]"), "W3siaWQiOjF9XQ==");
        assert_eq!(encode_base64(""), "");
    }

    #[test]
    fn test_decode_tolerates_line_breaks() {
        assert_eq!(decode_base64("W3siaWQi\nOjF9XQ==\n").unwrap(), "[{\"id\":1}]");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_base64("not base64!"),
            Err(Error::UnreadableContent { .. })
        ));
        // 0xff is not valid UTF-8
        assert!(decode_base64("/w==").is_err());
    }

    #[test]
    fn test_non_ascii_text() {
        let text = "name\nZoë\n";
        assert_eq!(decode_base64(&encode_base64(text)).unwrap(), text);
    }
}
