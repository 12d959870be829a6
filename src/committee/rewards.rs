//! DPoS reward arithmetic.
//!
//! The reward pool for a round is 35% of block fees plus the per-block
//! subsidy, accumulated per block and settled at each committee change.
//! 25% of the pool is split evenly across the sitting arbitrators as the
//! block-confirm share; the remaining 75% is paid per vote across elected
//! arbitrators and candidates. Shares owed to CRC arbiters are redirected to
//! the CRC treasury address. All divisions floor; the residual is the
//! final-round change credited to the treasury, and a negative residual
//! aborts settlement.

use std::collections::{BTreeMap, BTreeSet};

use crate::crypto::ProgramHash;
use crate::error::EngineError;
use crate::types::{Block, Fixed64, Height};

/// `ceil((fees + reward_per_block) * 0.35)`, in fixed-point integer math.
pub fn block_dpos_share(block: &Block, reward_per_block: Fixed64) -> Fixed64 {
    let base = (block.total_fees() + reward_per_block).0 as i128;
    Fixed64(((base * 35 + 99) / 100) as i64)
}

/// Inputs of one settlement round.
pub struct RoundContext<'a> {
    pub current_owner_hashes: &'a [ProgramHash],
    pub candidate_owner_hashes: &'a [ProgramHash],
    pub owner_votes: &'a BTreeMap<ProgramHash, Fixed64>,
    pub total_votes: Fixed64,
    pub crc_hashes: &'a BTreeSet<ProgramHash>,
    pub crc_address: ProgramHash,
}

/// Distributes `reward` across the round's owner hashes.
///
/// Returns the payout map and the non-negative change. The map always
/// carries an entry for the CRC address, and
/// `sum(payouts) + change == reward` holds exactly.
pub fn distribute(
    reward: Fixed64,
    ctx: &RoundContext<'_>,
    height: Height,
) -> Result<(BTreeMap<ProgramHash, Fixed64>, Fixed64), EngineError> {
    let mut payouts: BTreeMap<ProgramHash, Fixed64> = BTreeMap::new();
    payouts.insert(ctx.crc_address, Fixed64::ZERO);

    if ctx.current_owner_hashes.is_empty() {
        return Err(EngineError::Internal {
            height,
            context: "no arbiters to distribute reward to".into(),
        });
    }

    // A round nobody voted in sends everything to the treasury.
    if ctx.total_votes.is_zero() {
        payouts.insert(ctx.crc_address, reward);
        return Ok((payouts, Fixed64::ZERO));
    }

    let reward_i = reward.0 as i128;
    let n = ctx.current_owner_hashes.len() as i128;
    let total_votes = ctx.total_votes.0 as i128;
    let individual_confirm = Fixed64(((reward_i * 25) / (100 * n)) as i64);

    let producer_share = |votes: Fixed64| -> Fixed64 {
        Fixed64(((votes.0 as i128 * reward_i * 75) / (100 * total_votes)) as i64)
    };

    let mut paid = Fixed64::ZERO;
    for owner_hash in ctx.current_owner_hashes {
        if ctx.crc_hashes.contains(owner_hash) {
            // CRC arbiters hold no votes; their confirm share goes to the
            // treasury.
            *payouts.entry(ctx.crc_address).or_default() += individual_confirm;
            paid += individual_confirm;
        } else {
            let votes = ctx.owner_votes.get(owner_hash).copied().unwrap_or_default();
            let r = individual_confirm + producer_share(votes);
            *payouts.entry(*owner_hash).or_default() += r;
            paid += r;
        }
    }

    for owner_hash in ctx.candidate_owner_hashes {
        let votes = ctx.owner_votes.get(owner_hash).copied().unwrap_or_default();
        let r = producer_share(votes);
        *payouts.entry(*owner_hash).or_default() += r;
        paid += r;
    }

    let change = reward - paid;
    if change < Fixed64::ZERO {
        return Err(EngineError::RewardOverflow { height });
    }
    Ok((payouts, change))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockHeader, Hash32};

    fn hash(b: u8) -> ProgramHash {
        ProgramHash([b; 21])
    }

    fn empty_block() -> Block {
        Block {
            header: BlockHeader { height: 1, prev: Hash32::zero() },
            txs: vec![],
        }
    }

    #[test]
    fn share_rounds_up() {
        // 10 * 0.35 = 3.5 -> 4
        let share = block_dpos_share(&empty_block(), Fixed64(10));
        assert_eq!(share, Fixed64(4));
        let share = block_dpos_share(&empty_block(), Fixed64(100));
        assert_eq!(share, Fixed64(35));
    }

    #[test]
    fn conservation_holds() {
        let current = vec![hash(1), hash(2), hash(3)];
        let candidates = vec![hash(4)];
        let mut owner_votes = BTreeMap::new();
        owner_votes.insert(hash(2), Fixed64(700));
        owner_votes.insert(hash(3), Fixed64(200));
        owner_votes.insert(hash(4), Fixed64(100));
        let crc: BTreeSet<ProgramHash> = [hash(1)].into_iter().collect();

        let ctx = RoundContext {
            current_owner_hashes: &current,
            candidate_owner_hashes: &candidates,
            owner_votes: &owner_votes,
            total_votes: Fixed64(1000),
            crc_hashes: &crc,
            crc_address: hash(0xcc),
        };
        let reward = Fixed64(1_000_003);
        let (payouts, change) = distribute(reward, &ctx, 1).unwrap();

        let paid: Fixed64 = payouts.values().copied().sum();
        assert_eq!(paid + change, reward);
        assert!(change >= Fixed64::ZERO);
        assert!(payouts.values().all(|v| *v >= Fixed64::ZERO));
    }

    #[test]
    fn crc_share_redirected_to_treasury() {
        let current = vec![hash(1), hash(2)];
        let mut owner_votes = BTreeMap::new();
        owner_votes.insert(hash(2), Fixed64(100));
        let crc: BTreeSet<ProgramHash> = [hash(1)].into_iter().collect();

        let ctx = RoundContext {
            current_owner_hashes: &current,
            candidate_owner_hashes: &[],
            owner_votes: &owner_votes,
            total_votes: Fixed64(100),
            crc_hashes: &crc,
            crc_address: hash(0xcc),
        };
        let (payouts, _) = distribute(Fixed64(1_000), &ctx, 1).unwrap();

        // individual confirm share = 1000 * 25 / 100 / 2 = 125
        assert_eq!(payouts[&hash(0xcc)], Fixed64(125));
        assert!(!payouts.contains_key(&hash(1)));
        // non-CRC: 125 confirm + full producer pool 750
        assert_eq!(payouts[&hash(2)], Fixed64(875));
    }

    #[test]
    fn zero_votes_pays_treasury_everything() {
        let current = vec![hash(1)];
        let owner_votes = BTreeMap::new();
        let crc: BTreeSet<ProgramHash> = [hash(1)].into_iter().collect();

        let ctx = RoundContext {
            current_owner_hashes: &current,
            candidate_owner_hashes: &[],
            owner_votes: &owner_votes,
            total_votes: Fixed64::ZERO,
            crc_hashes: &crc,
            crc_address: hash(0xcc),
        };
        let reward = Fixed64(777);
        let (payouts, change) = distribute(reward, &ctx, 9).unwrap();
        assert_eq!(payouts[&hash(0xcc)], reward);
        assert_eq!(change, Fixed64::ZERO);
        let paid: Fixed64 = payouts.values().copied().sum();
        assert_eq!(paid + change, reward);
    }

    #[test]
    fn empty_committee_is_an_error() {
        let ctx = RoundContext {
            current_owner_hashes: &[],
            candidate_owner_hashes: &[],
            owner_votes: &BTreeMap::new(),
            total_votes: Fixed64(1),
            crc_hashes: &BTreeSet::new(),
            crc_address: hash(0xcc),
        };
        assert!(distribute(Fixed64(100), &ctx, 3).is_err());
    }
}
