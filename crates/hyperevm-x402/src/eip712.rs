//! EIP-712 typed-data construction for EIP-3009 `TransferWithAuthorization`.
//!
//! Provides:
//! - Domain descriptors ([`DomainFields`]) and their `alloy` form
//! - The type map with and without the `EIP712Domain` entry ([`transfer_types`])
//! - The JSON payload sent to `eth_signTypedData_v4` ([`TypedDataPayload`])
//! - Nonce generation and normalisation ([`random_nonce`], [`format_nonce`])
//! - Signature parsing, encoding and recovery

use std::borrow::Cow;
use std::collections::BTreeMap;

use alloy::primitives::{Address, Signature, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};

use crate::constants::PRIMARY_TYPE;
use crate::payment::Authorization;
use crate::X402Error;

pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

/// `{name, version, chainId, verifyingContract}` as wallets expect it in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainFields {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl DomainFields {
    pub fn to_eip712_domain(&self) -> Eip712Domain {
        Eip712Domain {
            name: Some(Cow::Owned(self.name.clone())),
            version: Some(Cow::Owned(self.version.clone())),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        }
    }
}

/// One `{name, type}` member of an EIP-712 struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypeField {
    fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }
}

pub type TypeMap = BTreeMap<String, Vec<TypeField>>;

/// Members of `EIP712Domain` for a domain with name, version, chainId and verifyingContract.
pub fn domain_type_fields() -> Vec<TypeField> {
    vec![
        TypeField::new("name", "string"),
        TypeField::new("version", "string"),
        TypeField::new("chainId", "uint256"),
        TypeField::new("verifyingContract", "address"),
    ]
}

/// Type map for `TransferWithAuthorization`. `with_domain` adds the explicit
/// `EIP712Domain` entry that raw `eth_signTypedData_v4` callers must supply.
pub fn transfer_types(with_domain: bool) -> TypeMap {
    let mut types = TypeMap::new();
    types.insert(
        PRIMARY_TYPE.to_string(),
        vec![
            TypeField::new("from", "address"),
            TypeField::new("to", "address"),
            TypeField::new("value", "uint256"),
            TypeField::new("validAfter", "uint256"),
            TypeField::new("validBefore", "uint256"),
            TypeField::new("nonce", "bytes32"),
        ],
    );
    if with_domain {
        types.insert(EIP712_DOMAIN_TYPE.to_string(), domain_type_fields());
    }
    types
}

/// The message half of the typed data. Addresses are EIP-55 checksummed and
/// integers are decimal strings.
pub fn transfer_message(auth: &Authorization) -> serde_json::Value {
    serde_json::json!({
        "from": auth.from.to_checksum(None),
        "to": auth.to.to_checksum(None),
        "value": auth.value.to_string(),
        "validAfter": auth.valid_after.to_string(),
        "validBefore": auth.valid_before.to_string(),
        "nonce": format!("0x{}", alloy::hex::encode(auth.nonce)),
    })
}

/// Full `eth_signTypedData_v4` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    pub domain: DomainFields,
    pub types: TypeMap,
    pub primary_type: String,
    pub message: serde_json::Value,
}

impl TypedDataPayload {
    pub fn new(domain: DomainFields, types: TypeMap, message: serde_json::Value) -> Self {
        Self {
            domain,
            types,
            primary_type: PRIMARY_TYPE.to_string(),
            message,
        }
    }

    pub fn has_domain_type(&self) -> bool {
        self.types.contains_key(EIP712_DOMAIN_TYPE)
    }
}

/// Compute the EIP-712 signing hash of an authorization under `domain`.
pub fn signing_hash(auth: &Authorization, domain: &DomainFields) -> B256 {
    auth.to_typed()
        .eip712_signing_hash(&domain.to_eip712_domain())
}

/// Generate a random 32-byte nonce from the OS CSPRNG.
pub fn random_nonce() -> B256 {
    let mut bytes = [0u8; 32];
    rand::fill(&mut bytes);
    B256::from(bytes)
}

/// Normalise a hex nonce (with or without `0x`) to `0x` + 64 hex characters,
/// left-padding with zeroes. Already-normalised input is returned unchanged.
pub fn format_nonce(nonce: &str) -> Result<String, X402Error> {
    let digits = nonce
        .strip_prefix("0x")
        .or_else(|| nonce.strip_prefix("0X"))
        .unwrap_or(nonce);
    if digits.len() > 64 {
        return Err(X402Error::SignatureError(format!(
            "nonce longer than 32 bytes: {} hex chars",
            digits.len()
        )));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(X402Error::SignatureError(format!("nonce is not hex: {nonce}")));
    }
    Ok(format!("0x{digits:0>64}"))
}

/// Format a numeric nonce as a 32-byte hex string.
pub fn format_numeric_nonce(nonce: u128) -> String {
    format!("0x{nonce:064x}")
}

/// Parse a nonce string into bytes after normalising it.
pub fn parse_nonce(nonce: &str) -> Result<B256, X402Error> {
    format_nonce(nonce)?
        .parse()
        .map_err(|e| X402Error::SignatureError(format!("invalid nonce: {e}")))
}

/// secp256k1 curve order N / 2 -- signatures with s above this are malleable (EIP-2).
const SECP256K1_N_DIV_2: U256 = U256::from_limbs([
    0xBFD25E8CD0364140,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0x7FFFFFFFFFFFFFFF,
]);

/// Parse a `0x` + 130 hex character signature.
pub fn parse_signature_hex(sig_hex: &str) -> Result<Signature, X402Error> {
    let digits = sig_hex.strip_prefix("0x").ok_or_else(|| {
        X402Error::SignatureError("signature must be 0x-prefixed".to_string())
    })?;
    if digits.len() != 130 {
        return Err(X402Error::SignatureError(format!(
            "signature must be 65 bytes, got {} hex chars",
            digits.len()
        )));
    }
    let bytes = alloy::hex::decode(digits)
        .map_err(|e| X402Error::SignatureError(format!("invalid signature hex: {e}")))?;
    Signature::from_raw(&bytes)
        .map_err(|e| X402Error::SignatureError(format!("invalid signature: {e}")))
}

/// Encode a signature as `0x` + 130 hex chars (v = 27/28 in the last byte).
pub fn encode_signature_hex(sig: &Signature) -> String {
    format!("0x{}", alloy::hex::encode(sig.as_bytes()))
}

/// Recover the address that produced `sig_hex` over `auth` under `domain`.
/// Rejects high-s signatures.
pub fn recover_signer(
    auth: &Authorization,
    domain: &DomainFields,
    sig_hex: &str,
) -> Result<Address, X402Error> {
    let sig = parse_signature_hex(sig_hex)?;
    if sig.s() > SECP256K1_N_DIV_2 {
        return Err(X402Error::SignatureError(
            "high-s signature rejected (EIP-2 malleability)".to_string(),
        ));
    }
    let hash = signing_hash(auth, domain);
    sig.recover_address_from_prehash(&hash)
        .map_err(|e| X402Error::SignatureError(format!("recovery failed: {e}")))
}
