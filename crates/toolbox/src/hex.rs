//! Conversions between UTF-8 text and `0x` prefixed hex.

pub fn encode(text: &str) -> String {
    const_hex::encode_prefixed(text.as_bytes())
}

/// Decodes `0x` prefixed hex into UTF-8 text. Input without the prefix, that
/// isn't hex or doesn't decode to UTF-8 is returned unchanged.
pub fn decode(hex: &str) -> String {
    hex.strip_prefix("0x")
        .and_then(|digits| const_hex::decode(digits).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| hex.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_text() {
        assert_eq!(encode("Hello World"), "0x48656c6c6f20576f726c64");
        assert_eq!(encode(""), "0x");
    }

    #[test]
    fn decodes_text() {
        assert_eq!(decode("0x48656c6c6f20576f726c64"), "Hello World");
        assert_eq!(decode("0x"), "");
    }

    #[test]
    fn undecodable_input_is_returned_unchanged() {
        assert_eq!(decode("not hex"), "not hex");
        assert_eq!(decode("48656c6c6f"), "48656c6c6f");
        assert_eq!(decode("0x123"), "0x123");
        // invalid UTF-8
        assert_eq!(decode("0xff"), "0xff");
    }
}
