//! Digests of signable payloads.
//!
//! Wallets and smart contract accounts don't agree on a single digest per
//! payload kind, so besides the canonical digest this module also derives the
//! other digests a signature might have been produced over.

use {
    alloy::primitives::{B256, eip191_hash_message, keccak256},
    model::{MalformedInput, payload::SignaturePayload},
};

/// The canonical digest of a payload.
///
/// - messages are hashed with the EIP-191 `personal_sign` prefix
/// - raw data of exactly 32 bytes is the digest itself, anything else is
///   hashed with keccak256
/// - typed data is hashed according to EIP-712
/// - user operation hashes are digests already
pub fn digest_for(payload: &SignaturePayload) -> Result<B256, MalformedInput> {
    Ok(match payload {
        SignaturePayload::Message { text } => eip191_hash_message(text.as_bytes()),
        SignaturePayload::Raw { data } => raw_digest(data),
        SignaturePayload::TypedData(document) => document
            .to_alloy()?
            .eip712_signing_hash()
            .map_err(|err| MalformedInput::TypedData(err.to_string()))?,
        SignaturePayload::UserOperation { hash } => *hash,
    })
}

fn raw_digest(data: &[u8]) -> B256 {
    match B256::try_from(data) {
        Ok(digest) => digest,
        Err(_) => keccak256(data),
    }
}

/// Digests to pass to ERC-1271 `isValidSignature`, in the order they should
/// be tried. The primary digest always comes first.
///
/// Some smart wallets validate messages against the bare keccak256 of the
/// text instead of the EIP-191 hash, so both are tried for messages.
pub fn alternative_digests(payload: &SignaturePayload, primary: B256) -> Vec<B256> {
    let candidates = match payload {
        SignaturePayload::Message { text } => vec![primary, keccak256(text.as_bytes())],
        SignaturePayload::Raw { data } => vec![raw_digest(data)],
        SignaturePayload::TypedData(_) => vec![primary],
        SignaturePayload::UserOperation { hash } => vec![*hash],
    };
    dedup(candidates)
}

/// Digests an EOA signature may recover against, in the order they should be
/// tried.
///
/// Wallets sign raw data and user operation hashes through `personal_sign`,
/// which prefixes the bytes, so the prefixed hash comes before the record
/// digest.
pub fn eoa_digests(payload: &SignaturePayload, primary: B256) -> Vec<B256> {
    let candidates = match payload {
        SignaturePayload::Message { .. } | SignaturePayload::TypedData(_) => vec![primary],
        SignaturePayload::Raw { data } => vec![eip191_hash_message(data), primary],
        SignaturePayload::UserOperation { hash } => vec![eip191_hash_message(hash), primary],
    };
    dedup(candidates)
}

fn dedup(candidates: Vec<B256>) -> Vec<B256> {
    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{Bytes, b256},
        model::payload::TypedDataDocument,
    };

    #[test]
    fn message_digest_uses_personal_sign_prefix() {
        // keccak256("\x19Ethereum Signed Message:\n11Hello World")
        assert_eq!(
            digest_for(&SignaturePayload::message("Hello World")).unwrap(),
            b256!("a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2")
        );
    }

    #[test]
    fn message_alternatives_add_unprefixed_hash() {
        let payload = SignaturePayload::message("Hello World");
        let primary = digest_for(&payload).unwrap();
        assert_eq!(
            alternative_digests(&payload, primary),
            vec![primary, keccak256(b"Hello World")]
        );
        assert_eq!(eoa_digests(&payload, primary), vec![primary]);
    }

    #[test]
    fn raw_32_bytes_is_the_digest() {
        let hash = B256::repeat_byte(0x42);
        let payload = SignaturePayload::Raw {
            data: Bytes::copy_from_slice(hash.as_slice()),
        };
        assert_eq!(digest_for(&payload).unwrap(), hash);
        assert_eq!(alternative_digests(&payload, hash), vec![hash]);
        assert_eq!(
            eoa_digests(&payload, hash),
            vec![eip191_hash_message(hash), hash]
        );
    }

    #[test]
    fn raw_other_lengths_are_hashed() {
        let payload = SignaturePayload::example_raw();
        let primary = digest_for(&payload).unwrap();
        assert_eq!(primary, keccak256(b"Hello World"));
        assert_eq!(alternative_digests(&payload, primary), vec![primary]);
        assert_eq!(
            eoa_digests(&payload, primary),
            vec![eip191_hash_message(b"Hello World"), primary]
        );
    }

    #[test]
    fn typed_data_has_no_alternatives_and_is_deterministic() {
        let payload = SignaturePayload::TypedData(TypedDataDocument::example());
        let primary = digest_for(&payload).unwrap();
        assert_eq!(digest_for(&payload.clone()).unwrap(), primary);
        assert_eq!(alternative_digests(&payload, primary), vec![primary]);
    }

    #[test]
    fn typed_data_with_undeclared_primary_type_is_malformed() {
        let mut document = TypedDataDocument::example();
        document.primary_type = "Nope".into();
        assert!(matches!(
            digest_for(&SignaturePayload::TypedData(document)),
            Err(MalformedInput::TypedData(_))
        ));
    }

    #[test]
    fn user_operation_hash_is_its_own_digest() {
        let hash = B256::repeat_byte(7);
        let payload = SignaturePayload::UserOperation { hash };
        assert_eq!(digest_for(&payload).unwrap(), hash);
        assert_eq!(alternative_digests(&payload, hash), vec![hash]);
    }
}
