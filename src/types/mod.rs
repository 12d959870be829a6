use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

pub mod payload;

pub type Height = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn zero() -> Self {
        Self([0u8; 32])
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Fixed-point currency amount with 8 implied decimal places.
///
/// All reward arithmetic is integer-only; intermediate products widen to
/// `i128` so that `votes * reward` cannot overflow.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fixed64(pub i64);

impl Fixed64 {
    pub const ZERO: Fixed64 = Fixed64(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Fixed64 {
    type Output = Fixed64;
    fn add(self, rhs: Fixed64) -> Fixed64 {
        Fixed64(self.0 + rhs.0)
    }
}

impl AddAssign for Fixed64 {
    fn add_assign(&mut self, rhs: Fixed64) {
        self.0 += rhs.0;
    }
}

impl Sub for Fixed64 {
    type Output = Fixed64;
    fn sub(self, rhs: Fixed64) -> Fixed64 {
        Fixed64(self.0 - rhs.0)
    }
}

impl SubAssign for Fixed64 {
    fn sub_assign(&mut self, rhs: Fixed64) {
        self.0 -= rhs.0;
    }
}

impl Sum for Fixed64 {
    fn sum<I: Iterator<Item = Fixed64>>(iter: I) -> Fixed64 {
        Fixed64(iter.map(|v| v.0).sum())
    }
}

impl fmt::Display for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / 100_000_000, (self.0 % 100_000_000).abs())
    }
}

pub fn hash_bytes(b: &[u8]) -> Hash32 {
    let h = blake3::hash(b);
    let mut out = [0u8; 32];
    out.copy_from_slice(h.as_bytes());
    Hash32(out)
}

/// Reference to a transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash32,
    pub index: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Input {
    pub previous: OutPoint,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Output {
    pub value: Fixed64,
    /// Present when this output carries delegate votes.
    pub vote: Option<payload::VoteOutput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub payload: payload::TxPayload,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub fee: Fixed64,
}

impl Transaction {
    /// Deterministic transaction hash over a fixed binary format.
    ///
    /// Format: "DPOS_TX" || payload_tag(1) || payload_digest(32) ||
    ///         input_count(4 LE) || (txid(32) || index(2 LE))* ||
    ///         output_count(4 LE) || (value(8 LE) || vote_digest(32))* ||
    ///         fee(8 LE)
    ///
    /// Stable across serde versions and field reordering.
    pub fn hash(&self) -> Hash32 {
        let mut buf = Vec::with_capacity(64 + self.inputs.len() * 34 + self.outputs.len() * 40);
        buf.extend_from_slice(b"DPOS_TX");
        buf.push(self.payload.tag());
        buf.extend_from_slice(&self.payload.digest().0);
        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.previous.txid.0);
            buf.extend_from_slice(&input.previous.index.to_le_bytes());
        }
        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.0.to_le_bytes());
            match &output.vote {
                Some(v) => buf.extend_from_slice(&v.digest().0),
                None => buf.extend_from_slice(&[0u8; 32]),
            }
        }
        buf.extend_from_slice(&self.fee.0.to_le_bytes());
        hash_bytes(&buf)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: Height,
    pub prev: Hash32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Transaction>,
}

impl Block {
    pub fn total_fees(&self) -> Fixed64 {
        self.txs.iter().map(|t| t.fee).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PublicKey;

    fn sample_tx() -> Transaction {
        Transaction {
            payload: payload::TxPayload::TransferAsset,
            inputs: vec![Input {
                previous: OutPoint { txid: Hash32([7u8; 32]), index: 1 },
            }],
            outputs: vec![Output {
                value: Fixed64(100),
                vote: Some(payload::VoteOutput {
                    candidates: vec![PublicKey([3u8; 33])],
                }),
            }],
            fee: Fixed64(10),
        }
    }

    #[test]
    fn tx_hash_is_stable() {
        let tx = sample_tx();
        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn tx_hash_commits_to_vote_candidates() {
        let a = sample_tx();
        let mut b = sample_tx();
        b.outputs[0].vote = Some(payload::VoteOutput {
            candidates: vec![PublicKey([4u8; 33])],
        });
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn block_fees_sum() {
        let block = Block {
            header: BlockHeader { height: 1, prev: Hash32::zero() },
            txs: vec![sample_tx(), sample_tx()],
        };
        assert_eq!(block.total_fees(), Fixed64(20));
    }
}
