//! Parsing of caller supplied strings into the strongly typed model.
//!
//! Everything that enters the signing or verification code from the outside
//! world goes through these helpers so shape errors surface as a single
//! [`MalformedInput`] error before any network request is made.

use {
    alloy::primitives::{Address, B256, Bytes},
    std::str::FromStr,
    thiserror::Error,
};

/// Ill-formed signature, hash, address or payload.
///
/// This error is never retried: the same input always fails the same way.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MalformedInput {
    #[error("{field} must be 0x prefixed")]
    MissingPrefix { field: &'static str },
    #[error("{field} is not valid hex: {reason}")]
    Hex { field: &'static str, reason: String },
    #[error("{field} must be {expected} bytes long but is {actual} bytes")]
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("signature is empty")]
    EmptySignature,
    #[error("{0:?} is not a valid address")]
    Address(String),
    #[error("invalid typed data: {0}")]
    TypedData(String),
}

/// Decodes `0x` prefixed hex into bytes.
///
/// Odd length and non-hex characters are rejected.
pub fn hex_bytes(field: &'static str, value: &str) -> Result<Bytes, MalformedInput> {
    let digits = value
        .trim()
        .strip_prefix("0x")
        .ok_or(MalformedInput::MissingPrefix { field })?;
    const_hex::decode(digits)
        .map(Bytes::from)
        .map_err(|err| MalformedInput::Hex {
            field,
            reason: err.to_string(),
        })
}

/// Decodes `0x` prefixed hex that must be exactly 32 bytes long.
pub fn hex_b256(field: &'static str, value: &str) -> Result<B256, MalformedInput> {
    let bytes = hex_bytes(field, value)?;
    if bytes.len() != 32 {
        return Err(MalformedInput::Length {
            field,
            expected: 32,
            actual: bytes.len(),
        });
    }
    Ok(B256::from_slice(&bytes))
}

/// Parses an address. Checksums are not enforced, so any casing is accepted.
pub fn address(value: &str) -> Result<Address, MalformedInput> {
    let trimmed = value.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(MalformedInput::Address(value.to_owned()));
    }
    Address::from_str(trimmed).map_err(|_| MalformedInput::Address(value.to_owned()))
}

/// Parses a signature and rejects empty ones.
pub fn signature(value: &str) -> Result<Bytes, MalformedInput> {
    let bytes = hex_bytes("signature", value)?;
    if bytes.is_empty() {
        return Err(MalformedInput::EmptySignature);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_odd_length_and_non_hex() {
        assert!(matches!(
            hex_bytes("data", "0x123"),
            Err(MalformedInput::Hex { field: "data", .. })
        ));
        assert!(matches!(
            hex_bytes("data", "0xzz"),
            Err(MalformedInput::Hex { field: "data", .. })
        ));
        assert_eq!(
            hex_bytes("data", "1234"),
            Err(MalformedInput::MissingPrefix { field: "data" })
        );
        assert_eq!(hex_bytes("data", "0x").unwrap(), Bytes::new());
    }

    #[test]
    fn b256_requires_32_bytes() {
        assert_eq!(
            hex_b256("hash", "0x1234"),
            Err(MalformedInput::Length {
                field: "hash",
                expected: 32,
                actual: 2,
            })
        );
        assert_eq!(
            hex_b256("hash", &format!("0x{}", "11".repeat(32))).unwrap(),
            B256::repeat_byte(0x11)
        );
    }

    #[test]
    fn addresses_are_case_insensitive() {
        let lower = address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        let checksummed = address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(lower, checksummed);
        assert!(address("0x1234").is_err());
        assert!(address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
    }

    #[test]
    fn empty_signature_is_rejected() {
        assert_eq!(signature("0x"), Err(MalformedInput::EmptySignature));
    }
}
