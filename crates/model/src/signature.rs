use {
    crate::{ChainId, payload::SignaturePayload, verification::VerificationRequest},
    alloy::primitives::{Address, B256, Bytes, Signature},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// A signature produced by a wallet together with everything needed to
/// verify it later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub signature: Bytes,
    /// Digest of the payload, see `signature_validator::digest`.
    pub digest: B256,
    pub signer: Address,
    pub payload: SignaturePayload,
    pub produced_at: DateTime<Utc>,
}

impl SignatureRecord {
    /// Builds the request that verifies this record.
    pub fn verification_request(&self, preferred_chain_id: Option<ChainId>) -> VerificationRequest {
        VerificationRequest {
            signature: self.signature.clone(),
            payload: self.payload.clone(),
            signer: self.signer,
            preferred_chain_id,
        }
    }
}

/// Rough classification of signature bytes. Only used for diagnostics, the
/// verification itself never depends on it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureShape {
    /// r + s + v
    Ecdsa,
    /// EIP-2098 compact r + yParityAndS.
    CompactEcdsa,
    /// A smart wallet signature wrapping a WebAuthn assertion.
    WebAuthn,
    Opaque,
}

impl SignatureShape {
    /// The start of the JSON client data of a WebAuthn assertion.
    const WEBAUTHN_MARKER: &'static [u8] = br#"{"type":"webauthn.get""#;

    pub fn classify(signature: &[u8]) -> Self {
        match signature.len() {
            65 => Self::Ecdsa,
            64 => Self::CompactEcdsa,
            _ if signature
                .windows(Self::WEBAUTHN_MARKER.len())
                .any(|window| window == Self::WEBAUTHN_MARKER) =>
            {
                Self::WebAuthn
            }
            _ => Self::Opaque,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("ECDSA signature must be 64 or 65 bytes long but is {0} bytes")]
    Length(usize),
    #[error("ECDSA recovery id must be 0, 1, 27 or 28 but is {0}")]
    RecoveryId(u8),
    #[error(transparent)]
    Signature(#[from] alloy::primitives::SignatureError),
}

/// Recovers the address that produced `signature` over `prehash`.
///
/// Accepts 65 byte r + s + v signatures (v as 0/1 or 27/28) and 64 byte
/// EIP-2098 compact signatures. EIP-155 style v values are rejected.
pub fn recover(signature: &[u8], prehash: &B256) -> Result<Address, RecoveryError> {
    let signature = match signature.len() {
        65 => match signature[64] {
            0 | 1 | 27 | 28 => Signature::from_raw(signature)?,
            v => return Err(RecoveryError::RecoveryId(v)),
        },
        64 => Signature::from_erc2098(signature),
        len => return Err(RecoveryError::Length(len)),
    };
    Ok(signature.recover_address_from_prehash(prehash)?)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{eip191_hash_message, keccak256},
            signers::{SignerSync, local::PrivateKeySigner},
        },
    };

    #[test]
    fn recovers_legacy_and_compact_signatures() {
        let signer = PrivateKeySigner::random();
        let hash = keccak256(b"order");
        let signature = signer.sign_hash_sync(&hash).unwrap();

        let legacy = signature.as_bytes();
        assert_eq!(recover(&legacy, &hash).unwrap(), signer.address());

        let compact = signature.as_erc2098();
        assert_eq!(recover(&compact, &hash).unwrap(), signer.address());
    }

    #[test]
    fn recovery_against_other_hash_yields_other_address() {
        let signer = PrivateKeySigner::random();
        let signature = signer.sign_message_sync(b"hello").unwrap().as_bytes();

        assert_eq!(
            recover(&signature, &eip191_hash_message(b"hello")).unwrap(),
            signer.address()
        );
        assert_ne!(
            recover(&signature, &keccak256(b"hello")).ok(),
            Some(signer.address())
        );
    }

    #[test]
    fn rejects_chain_specific_recovery_ids() {
        let signer = PrivateKeySigner::random();
        let hash = keccak256(b"order");
        let mut signature = signer.sign_hash_sync(&hash).unwrap().as_bytes();

        for v in [0, 1, 27, 28] {
            signature[64] = v;
            assert!(recover(&signature, &hash).is_ok(), "v {v}");
        }
        // same parity as 27 and 28 once read as EIP-155 values
        for v in [59, 60, 91, 92, 155, 156] {
            signature[64] = v;
            let result = recover(&signature, &hash);
            assert!(
                matches!(result, Err(RecoveryError::RecoveryId(id)) if id == v),
                "v {v}"
            );
        }
    }

    #[test]
    fn rejects_odd_lengths() {
        assert!(matches!(
            recover(&[0; 20], &B256::ZERO),
            Err(RecoveryError::Length(20))
        ));
    }

    #[test]
    fn classifies_signature_shapes() {
        assert_eq!(SignatureShape::classify(&[0; 65]), SignatureShape::Ecdsa);
        assert_eq!(SignatureShape::classify(&[0; 64]), SignatureShape::CompactEcdsa);
        assert_eq!(SignatureShape::classify(&[0; 300]), SignatureShape::Opaque);

        let mut webauthn = vec![0; 200];
        webauthn.extend_from_slice(br#"{"type":"webauthn.get","challenge":"abc"}"#);
        assert_eq!(SignatureShape::classify(&webauthn), SignatureShape::WebAuthn);
    }
}
