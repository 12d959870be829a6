//! Chain parameters recognized by the arbitrator engine.
//!
//! Hosts usually embed these in their node config file; [`ChainParams`] is a
//! plain serde struct so it can be deserialized straight out of a TOML
//! section. Public keys are hex strings in config form and are parsed into
//! typed keys when the engine is constructed.

use serde::{Deserialize, Serialize};

use crate::types::{Fixed64, Height};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// H1: height at which the CRC-only committee takes over block signing.
    pub crc_only_dpos_height: Height,
    /// H2: height at which publicly elected producers join the committee.
    pub public_dpos_height: Height,
    /// Blocks before H1/H2 at which the next committee is pre-seeded so
    /// peers can connect ahead of the switch.
    pub pre_connect_offset: Height,
    /// Number of elected (non-CRC) arbitrators per round.
    pub general_arbiters: usize,
    /// Number of second-tier candidates kept per round.
    pub candidate_arbiters: usize,
    /// Consecutive missed confirms tolerated before a producer is marked
    /// inactive.
    pub max_inactive_rounds: u32,
    pub inactive_penalty: Fixed64,
    pub illegal_penalty: Fixed64,
    /// Base block subsidy folded into the DPoS reward share.
    pub reward_per_block: Fixed64,
    /// CRC council arbiter public keys (hex, 33 bytes each).
    pub crc_arbiters: Vec<String>,
    /// Pre-H1 block signers (hex, 33 bytes each).
    pub origin_arbiters: Vec<String>,
    /// CRC treasury address (hex, 21 bytes).
    pub crc_address: String,
    /// Blocks emergency mode lasts once an inactive-arbitrators payload is
    /// accepted.
    pub emergency_duration: Height,
    /// Confirmations before a registration or re-activation takes effect.
    pub activate_delay_blocks: Height,
    /// Blocks after cancellation until the deposit returns and the keys are
    /// reusable.
    pub deposit_return_delay: Height,
    /// Journal capacity: how many block frames are retained for rollback.
    pub history_capacity: usize,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            crc_only_dpos_height: 343_400,
            public_dpos_height: 402_680,
            pre_connect_offset: 360,
            general_arbiters: 24,
            candidate_arbiters: 72,
            max_inactive_rounds: 720,
            inactive_penalty: Fixed64(10_000_000_000),
            illegal_penalty: Fixed64(50_000_000_000),
            reward_per_block: Fixed64(126_288_100),
            crc_arbiters: Vec::new(),
            origin_arbiters: Vec::new(),
            crc_address: String::new(),
            emergency_duration: 7_200,
            activate_delay_blocks: 6,
            deposit_return_delay: 2_160,
            history_capacity: 720,
        }
    }
}

impl ChainParams {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let p = ChainParams::default();
        assert!(p.crc_only_dpos_height < p.public_dpos_height);
        assert_eq!(p.activate_delay_blocks, 6);
        assert!(p.history_capacity > 0);
    }

    #[test]
    fn loads_partial_toml() {
        let p = ChainParams::from_toml_str(
            r#"
            crc_only_dpos_height = 100
            public_dpos_height = 200
            general_arbiters = 5
            crc_arbiters = ["aa"]
            "#,
        )
        .unwrap();
        assert_eq!(p.crc_only_dpos_height, 100);
        assert_eq!(p.public_dpos_height, 200);
        assert_eq!(p.general_arbiters, 5);
        assert_eq!(p.crc_arbiters, vec!["aa".to_string()]);
        // untouched fields keep their defaults
        assert_eq!(p.activate_delay_blocks, 6);
    }

    #[test]
    fn toml_round_trip() {
        let p = ChainParams::default();
        let s = toml::to_string(&p).unwrap();
        let q = ChainParams::from_toml_str(&s).unwrap();
        assert_eq!(p.public_dpos_height, q.public_dpos_height);
        assert_eq!(p.reward_per_block, q.reward_per_block);
    }
}
