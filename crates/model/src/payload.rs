use {
    crate::{ChainId, MalformedInput, input},
    alloy::{
        dyn_abi::TypedData,
        primitives::{Address, B256, Bytes, U256},
        sol_types::Eip712Domain,
    },
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::{borrow::Cow, collections::BTreeMap, fmt},
};

/// Name of the implicit EIP-712 domain type. Callers never have to provide
/// it, the domain separator is derived from [`Domain`] directly.
pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// Data a wallet can be asked to sign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SignaturePayload {
    /// A human readable message signed with the EIP-191 `personal_sign`
    /// prefix.
    ///
    /// https://eips.ethereum.org/EIPS/eip-191
    Message { text: String },
    /// Arbitrary bytes. A 32 byte value is treated as an already computed
    /// digest.
    Raw { data: Bytes },
    /// Structured data signed according to EIP-712.
    ///
    /// https://eips.ethereum.org/EIPS/eip-712
    TypedData(TypedDataDocument),
    /// An ERC-4337 user operation hash.
    UserOperation { hash: B256 },
}

/// See [`SignaturePayload`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadKind {
    Message,
    Raw,
    TypedData,
    UserOperation,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Message => "message",
            Self::Raw => "raw",
            Self::TypedData => "typed_data",
            Self::UserOperation => "userop",
        })
    }
}

impl SignaturePayload {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    /// Parses `0x` prefixed raw hex data.
    pub fn raw_from_hex(data: &str) -> Result<Self, MalformedInput> {
        Ok(Self::Raw {
            data: input::hex_bytes("raw data", data)?,
        })
    }

    /// Parses a JSON encoded EIP-712 document (`domain`, `types`,
    /// `primaryType`, `message`).
    pub fn typed_data_from_json(json: &str) -> Result<Self, MalformedInput> {
        let document: TypedDataDocument = serde_json::from_str(json)
            .map_err(|err| MalformedInput::TypedData(err.to_string()))?;
        document.validate()?;
        Ok(Self::TypedData(document))
    }

    pub fn user_operation_from_hex(hash: &str) -> Result<Self, MalformedInput> {
        Ok(Self::UserOperation {
            hash: input::hex_b256("user operation hash", hash)?,
        })
    }

    /// Example raw payload: "Hello World" as hex.
    pub fn example_raw() -> Self {
        Self::Raw {
            data: Bytes::from_static(b"Hello World"),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Message { .. } => PayloadKind::Message,
            Self::Raw { .. } => PayloadKind::Raw,
            Self::TypedData(_) => PayloadKind::TypedData,
            Self::UserOperation { .. } => PayloadKind::UserOperation,
        }
    }

    /// Short human readable rendering used in logs.
    pub fn preview(&self) -> String {
        const MAX: usize = 50;
        let full = match self {
            Self::Message { text } => text.clone(),
            Self::Raw { data } => data.to_string(),
            Self::TypedData(document) => document.primary_type.clone(),
            Self::UserOperation { hash } => hash.to_string(),
        };
        match full.char_indices().nth(MAX) {
            Some((end, _)) => format!("{}...", &full[..end]),
            None => full,
        }
    }
}

/// EIP-712 typed data as produced by dapps and wallets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDocument {
    pub domain: Domain,
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    pub message: Map<String, Value>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedField {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_owned(),
            type_name: type_name.to_owned(),
        }
    }
}

/// The EIP-712 domain. Only present fields take part in the domain
/// separator.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl From<&Domain> for Eip712Domain {
    fn from(domain: &Domain) -> Self {
        Eip712Domain::new(
            domain.name.clone().map(Cow::Owned),
            domain.version.clone().map(Cow::Owned),
            domain.chain_id.map(U256::from),
            domain.verifying_contract,
            domain.salt,
        )
    }
}

impl TypedDataDocument {
    /// Checks that `primaryType` names one of the declared types.
    pub fn validate(&self) -> Result<(), MalformedInput> {
        if !self.types.contains_key(&self.primary_type) {
            return Err(MalformedInput::TypedData(format!(
                "primary type {:?} is not declared in types",
                self.primary_type
            )));
        }
        Ok(())
    }

    /// The declared types without `EIP712Domain`, which is synthesized from
    /// the domain when hashing.
    pub fn types_without_domain(&self) -> BTreeMap<String, Vec<TypedField>> {
        self.types
            .iter()
            .filter(|(name, _)| {
                name.as_str() != EIP712_DOMAIN_TYPE || self.primary_type == EIP712_DOMAIN_TYPE
            })
            .map(|(name, fields)| (name.clone(), fields.clone()))
            .collect()
    }

    /// Converts the document into alloy's dynamic typed data which knows how
    /// to encode and hash it.
    pub fn to_alloy(&self) -> Result<TypedData, MalformedInput> {
        self.validate()?;
        let domain = Eip712Domain::from(&self.domain);
        let value = serde_json::json!({
            "domain": domain,
            "types": self.types_without_domain(),
            "primaryType": self.primary_type,
            "message": self.message,
        });
        serde_json::from_value(value).map_err(|err| MalformedInput::TypedData(err.to_string()))
    }

    /// A small `Message` struct under a fixed domain, handy for trying out
    /// signing flows.
    pub fn example() -> Self {
        let mut message = Map::new();
        message.insert("content".into(), "Hello from the dapp toolbox!".into());
        message.insert("timestamp".into(), chrono::Utc::now().timestamp().into());
        message.insert("sender".into(), Address::ZERO.to_string().into());

        Self {
            domain: Domain {
                name: Some("Dapp Toolbox".into()),
                version: Some("1".into()),
                chain_id: Some(1),
                verifying_contract: Some(Address::repeat_byte(0x12)),
                salt: None,
            },
            types: BTreeMap::from([
                (
                    EIP712_DOMAIN_TYPE.to_owned(),
                    vec![
                        TypedField::new("name", "string"),
                        TypedField::new("version", "string"),
                        TypedField::new("chainId", "uint256"),
                        TypedField::new("verifyingContract", "address"),
                    ],
                ),
                (
                    "Message".to_owned(),
                    vec![
                        TypedField::new("content", "string"),
                        TypedField::new("timestamp", "uint256"),
                        TypedField::new("sender", "address"),
                    ],
                ),
            ]),
            primary_type: "Message".into(),
            message,
        }
    }
}
