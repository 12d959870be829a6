//! The closed set of transaction payloads the engine interprets, plus the
//! `Confirm` attestation that may accompany a block.
//!
//! Payloads are a tagged variant; dispatch pattern-matches on the tag and
//! unknown shapes on the special path are rejected with
//! [`InvalidSpecialPayload`](crate::error::EngineError::InvalidSpecialPayload).

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::types::{hash_bytes, Hash32, Height};

/// On-chain producer registration / update descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerInfo {
    pub owner_public_key: PublicKey,
    pub node_public_key: PublicKey,
    pub nickname: String,
    /// Free-form metadata carried along with the registration.
    pub url: String,
    pub location: u64,
    pub net_address: String,
}

/// Payload of cancel / activate operations: references the owner key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessProducer {
    pub owner_public_key: PublicKey,
}

/// Delegate votes attached to a `TransferAsset` output. Candidates are
/// producer owner public keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutput {
    pub candidates: Vec<PublicKey>,
}

impl VoteOutput {
    pub fn digest(&self) -> Hash32 {
        let mut buf = Vec::with_capacity(8 + self.candidates.len() * 33);
        buf.extend_from_slice(b"DPOS_VOTE");
        buf.extend_from_slice(&(self.candidates.len() as u32).to_le_bytes());
        for c in &self.candidates {
            buf.extend_from_slice(&c.0);
        }
        hash_bytes(&buf)
    }
}

/// One side of a double-signed-block accusation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvidence {
    pub header: Vec<u8>,
    pub block_height: Height,
    pub signers: Vec<PublicKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DposIllegalBlocks {
    pub evidence: BlockEvidence,
    pub compare_evidence: BlockEvidence,
}

impl DposIllegalBlocks {
    pub fn hash(&self) -> Hash32 {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DPOS_ILLBLK");
        for ev in [&self.evidence, &self.compare_evidence] {
            buf.extend_from_slice(&(ev.header.len() as u32).to_le_bytes());
            buf.extend_from_slice(&ev.header);
            buf.extend_from_slice(&ev.block_height.to_le_bytes());
            buf.extend_from_slice(&(ev.signers.len() as u32).to_le_bytes());
            for s in &ev.signers {
                buf.extend_from_slice(&s.0);
            }
        }
        hash_bytes(&buf)
    }

    /// Union of the signers named by both evidences.
    pub fn accused(&self) -> Vec<PublicKey> {
        let mut keys: Vec<PublicKey> = self
            .evidence
            .signers
            .iter()
            .chain(self.compare_evidence.signers.iter())
            .copied()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// One side of a double-proposal accusation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalEvidence {
    pub sponsor: PublicKey,
    pub block_header: Vec<u8>,
    pub block_height: Height,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DposIllegalProposals {
    pub evidence: ProposalEvidence,
    pub compare_evidence: ProposalEvidence,
}

impl DposIllegalProposals {
    pub fn hash(&self) -> Hash32 {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"DPOS_ILLPROP");
        for ev in [&self.evidence, &self.compare_evidence] {
            buf.extend_from_slice(&ev.sponsor.0);
            buf.extend_from_slice(&(ev.block_header.len() as u32).to_le_bytes());
            buf.extend_from_slice(&ev.block_header);
            buf.extend_from_slice(&ev.block_height.to_le_bytes());
        }
        hash_bytes(&buf)
    }

    pub fn accused(&self) -> Vec<PublicKey> {
        let mut keys = vec![self.evidence.sponsor, self.compare_evidence.sponsor];
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Network-accepted accusation that a set of arbitrators went dark.
/// Accepting one flips the engine into emergency mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactiveArbitrators {
    pub sponsor: PublicKey,
    pub arbitrators: Vec<PublicKey>,
    pub block_height: Height,
}

impl InactiveArbitrators {
    pub fn hash(&self) -> Hash32 {
        let mut buf = Vec::with_capacity(64 + self.arbitrators.len() * 33);
        buf.extend_from_slice(b"DPOS_INACT");
        buf.extend_from_slice(&self.sponsor.0);
        buf.extend_from_slice(&self.block_height.to_le_bytes());
        buf.extend_from_slice(&(self.arbitrators.len() as u32).to_le_bytes());
        for a in &self.arbitrators {
            buf.extend_from_slice(&a.0);
        }
        hash_bytes(&buf)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TxPayload {
    RegisterProducer(ProducerInfo),
    UpdateProducer(ProducerInfo),
    CancelProducer(ProcessProducer),
    ActivateProducer(ProcessProducer),
    TransferAsset,
    IllegalBlocks(DposIllegalBlocks),
    IllegalProposals(DposIllegalProposals),
    InactiveArbitrators(InactiveArbitrators),
    /// Sidechain mining anchor; carried on chain but ignored by this engine.
    SideChainPow,
}

impl TxPayload {
    pub fn tag(&self) -> u8 {
        match self {
            TxPayload::RegisterProducer(_) => 0x09,
            TxPayload::UpdateProducer(_) => 0x0b,
            TxPayload::CancelProducer(_) => 0x0a,
            TxPayload::ActivateProducer(_) => 0x0d,
            TxPayload::TransferAsset => 0x02,
            TxPayload::IllegalBlocks(_) => 0x10,
            TxPayload::IllegalProposals(_) => 0x11,
            TxPayload::InactiveArbitrators(_) => 0x13,
            TxPayload::SideChainPow => 0x05,
        }
    }

    /// Digest of the payload body, folded into the transaction hash.
    pub fn digest(&self) -> Hash32 {
        match self {
            TxPayload::RegisterProducer(info) | TxPayload::UpdateProducer(info) => {
                let mut buf = Vec::new();
                buf.extend_from_slice(b"DPOS_PRODUCER");
                buf.extend_from_slice(&info.owner_public_key.0);
                buf.extend_from_slice(&info.node_public_key.0);
                buf.extend_from_slice(info.nickname.as_bytes());
                buf.push(0);
                buf.extend_from_slice(info.url.as_bytes());
                buf.push(0);
                buf.extend_from_slice(&info.location.to_le_bytes());
                buf.extend_from_slice(info.net_address.as_bytes());
                hash_bytes(&buf)
            }
            TxPayload::CancelProducer(p) | TxPayload::ActivateProducer(p) => {
                let mut buf = Vec::with_capacity(40);
                buf.extend_from_slice(b"DPOS_PROC");
                buf.extend_from_slice(&p.owner_public_key.0);
                hash_bytes(&buf)
            }
            TxPayload::TransferAsset => hash_bytes(b"DPOS_XFER"),
            TxPayload::IllegalBlocks(p) => p.hash(),
            TxPayload::IllegalProposals(p) => p.hash(),
            TxPayload::InactiveArbitrators(p) => p.hash(),
            TxPayload::SideChainPow => hash_bytes(b"DPOS_SIDEPOW"),
        }
    }
}

/// Signed attestation accompanying a block: names the sponsor that proposed
/// it and the arbitrators that endorsed it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Confirm {
    pub proposal: DposProposal,
    pub votes: Vec<DposProposalVote>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DposProposal {
    pub sponsor: PublicKey,
    pub view_offset: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DposProposalVote {
    pub signer: PublicKey,
}

impl Confirm {
    /// Sponsor plus every vote signer, deduplicated.
    pub fn signers(&self) -> Vec<PublicKey> {
        let mut keys = vec![self.proposal.sponsor];
        keys.extend(self.votes.iter().map(|v| v.signer));
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_blocks_hash_commits_to_signers() {
        let ev = |b: u8| BlockEvidence {
            header: vec![1, 2, 3],
            block_height: 7,
            signers: vec![PublicKey([b; 33])],
        };
        let a = DposIllegalBlocks { evidence: ev(1), compare_evidence: ev(1) };
        let b = DposIllegalBlocks { evidence: ev(2), compare_evidence: ev(2) };
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.hash());
    }

    #[test]
    fn accused_deduplicates() {
        let ev = BlockEvidence {
            header: vec![],
            block_height: 1,
            signers: vec![PublicKey([9; 33])],
        };
        let p = DposIllegalBlocks { evidence: ev.clone(), compare_evidence: ev };
        assert_eq!(p.accused().len(), 1);
    }

    #[test]
    fn confirm_signers_include_sponsor() {
        let confirm = Confirm {
            proposal: DposProposal { sponsor: PublicKey([1; 33]), view_offset: 0 },
            votes: vec![
                DposProposalVote { signer: PublicKey([2; 33]) },
                DposProposalVote { signer: PublicKey([1; 33]) },
            ],
        };
        assert_eq!(confirm.signers().len(), 2);
    }
}
