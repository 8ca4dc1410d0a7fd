use {
    crate::{ChainId, MalformedInput, input, payload::SignaturePayload},
    alloy::primitives::{Address, Bytes},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// A request to check that `signer` signed `payload`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub signature: Bytes,
    pub payload: SignaturePayload,
    pub signer: Address,
    /// The chain the signature was produced on, if known.
    pub preferred_chain_id: Option<ChainId>,
}

impl VerificationRequest {
    /// Builds a request from user provided strings.
    pub fn parse(
        signature: &str,
        payload: SignaturePayload,
        signer: &str,
        preferred_chain_id: Option<ChainId>,
    ) -> Result<Self, MalformedInput> {
        Ok(Self {
            signature: input::signature(signature)?,
            payload,
            signer: input::address(signer)?,
            preferred_chain_id,
        })
    }

    /// Checks the parts of the request shape that the types can't express.
    pub fn validate(&self) -> Result<(), MalformedInput> {
        if self.signature.is_empty() {
            return Err(MalformedInput::EmptySignature);
        }
        if let SignaturePayload::TypedData(document) = &self.payload {
            document.validate()?;
        }
        Ok(())
    }
}

/// How a verification was decided.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    /// ECDSA recovery of an externally owned account.
    Eoa,
    /// `isValidSignature` on a smart contract account.
    ///
    /// https://eips.ethereum.org/EIPS/eip-1271
    Erc1271,
    /// No chain could be reached, only the offline ECDSA check ran.
    #[serde(rename = "format_check")]
    FormatCheckOnly,
}

/// Result of a single verification. The caller owns persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub is_valid: bool,
    pub method: VerificationMethod,
    pub signer_is_contract: bool,
    pub verified_on_chain: Option<ChainId>,
    pub error_detail: Option<String>,
    pub verified_at: DateTime<Utc>,
}

impl VerificationOutcome {
    pub fn valid_eoa() -> Self {
        Self {
            is_valid: true,
            method: VerificationMethod::Eoa,
            signer_is_contract: false,
            verified_on_chain: None,
            error_detail: None,
            verified_at: Utc::now(),
        }
    }

    pub fn valid_contract(chain: ChainId) -> Self {
        Self {
            is_valid: true,
            method: VerificationMethod::Erc1271,
            signer_is_contract: true,
            verified_on_chain: Some(chain),
            error_detail: None,
            verified_at: Utc::now(),
        }
    }

    pub fn invalid(
        method: VerificationMethod,
        signer_is_contract: bool,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            is_valid: false,
            method,
            signer_is_contract,
            verified_on_chain: None,
            error_detail: Some(error_detail.into()),
            verified_at: Utc::now(),
        }
    }

    /// Attaches additional context to the error detail.
    pub fn with_note(mut self, note: Option<String>) -> Self {
        if let Some(note) = note {
            self.error_detail = Some(match self.error_detail.take() {
                Some(detail) => format!("{detail}; {note}"),
                None => note,
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn method_serialization() {
        assert_eq!(
            serde_json::to_value(VerificationMethod::Erc1271).unwrap(),
            json!("erc1271")
        );
        assert_eq!(
            serde_json::to_value(VerificationMethod::FormatCheckOnly).unwrap(),
            json!("format_check")
        );
    }

    #[test]
    fn parse_rejects_malformed_request() {
        let payload = SignaturePayload::message("hi");
        let signer = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        assert_eq!(
            VerificationRequest::parse("0x", payload.clone(), signer, None),
            Err(MalformedInput::EmptySignature)
        );
        assert!(VerificationRequest::parse("0x123", payload.clone(), signer, None).is_err());
        assert!(VerificationRequest::parse("0x1234", payload.clone(), "0xabc", None).is_err());
        assert!(VerificationRequest::parse("0x1234", payload, signer, Some(10)).is_ok());
    }

    #[test]
    fn notes_are_appended() {
        let outcome = VerificationOutcome::invalid(VerificationMethod::Eoa, false, "no match")
            .with_note(Some("classification failed".into()));
        assert_eq!(
            outcome.error_detail.as_deref(),
            Some("no match; classification failed")
        );
        let outcome = VerificationOutcome::valid_eoa().with_note(None);
        assert_eq!(outcome.error_detail, None);
    }
}
