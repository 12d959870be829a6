//! Key and address newtypes.
//!
//! Public keys are 33-byte compressed secp256k1 points; the engine never
//! verifies signatures (the host validates blocks before feeding them in) so
//! keys are treated as opaque identity bytes. Program hashes are the 21-byte
//! address form: a 1-byte account-type tag followed by a 20-byte digest of
//! the standard single-signer redeem script.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::EngineError;

/// Account-type tag of a standard single-signer program hash.
pub const PREFIX_STANDARD: u8 = 0x21;

const PUSH_33: u8 = 0x21;
const OP_CHECKSIG: u8 = 0xac;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey(pub [u8; 33]);

impl PublicKey {
    pub fn from_hex(s: &str) -> Result<Self, EngineError> {
        let bytes = hex::decode(s)
            .map_err(|e| EngineError::InvalidKey(format!("{s}: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EngineError> {
        if bytes.len() != 33 {
            return Err(EngineError::InvalidKey(format!(
                "expected 33 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 33];
        out.copy_from_slice(bytes);
        Ok(PublicKey(out))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(D::Error::custom)
    }
}

/// 21-byte address identifier: type tag plus 20-byte script digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramHash(pub [u8; 21]);

impl ProgramHash {
    pub fn from_hex(s: &str) -> Result<Self, EngineError> {
        let bytes = hex::decode(s)
            .map_err(|e| EngineError::InvalidKey(format!("{s}: {e}")))?;
        if bytes.len() != 21 {
            return Err(EngineError::InvalidKey(format!(
                "expected 21 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 21];
        out.copy_from_slice(&bytes);
        Ok(ProgramHash(out))
    }
}

impl fmt::Display for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramHash({})", hex::encode(self.0))
    }
}

impl Serialize for ProgramHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ProgramHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ProgramHash::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Program hash of the standard single-signer script for `pk`.
///
/// Script template: PUSH33 <pk> CHECKSIG. The digest is truncated to 20
/// bytes and tagged with the standard account prefix.
pub fn standard_program_hash(pk: &PublicKey) -> ProgramHash {
    let mut script = Vec::with_capacity(35);
    script.push(PUSH_33);
    script.extend_from_slice(&pk.0);
    script.push(OP_CHECKSIG);

    let digest = blake3::hash(&script);
    let mut out = [0u8; 21];
    out[0] = PREFIX_STANDARD;
    out[1..].copy_from_slice(&digest.as_bytes()[..20]);
    ProgramHash(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let pk = PublicKey([0xab; 33]);
        let parsed = PublicKey::from_hex(&pk.to_string()).unwrap();
        assert_eq!(pk, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(PublicKey::from_hex("aabb").is_err());
        assert!(ProgramHash::from_hex("aabb").is_err());
    }

    #[test]
    fn program_hash_is_deterministic_and_tagged() {
        let pk = PublicKey([7; 33]);
        let h1 = standard_program_hash(&pk);
        let h2 = standard_program_hash(&pk);
        assert_eq!(h1, h2);
        assert_eq!(h1.0[0], PREFIX_STANDARD);
    }

    #[test]
    fn different_keys_different_hashes() {
        let a = standard_program_hash(&PublicKey([1; 33]));
        let b = standard_program_hash(&PublicKey([2; 33]));
        assert_ne!(a, b);
    }
}
