//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use dpos_arbiter::config::ChainParams;
use dpos_arbiter::crypto::PublicKey;
use dpos_arbiter::types::payload::*;
use dpos_arbiter::types::{Block, BlockHeader, Fixed64, Hash32, Input, OutPoint, Output, Transaction};

/// Owner keys follow the spec fixture: `owner_key(i) = [i; 33]`.
pub fn owner_key(i: u8) -> PublicKey {
    PublicKey([i; 33])
}

/// Node keys are distinct from every owner key via a marker byte.
pub fn node_key(i: u8) -> PublicKey {
    let mut bytes = [i; 33];
    bytes[0] = 0xfe;
    PublicKey(bytes)
}

pub fn producer_info(i: u8) -> ProducerInfo {
    ProducerInfo {
        owner_public_key: owner_key(i),
        node_public_key: node_key(i),
        nickname: format!("Producer-{}", i + 1),
        url: String::new(),
        location: 0,
        net_address: String::new(),
    }
}

pub fn register_tx(info: ProducerInfo) -> Transaction {
    Transaction {
        payload: TxPayload::RegisterProducer(info),
        inputs: vec![],
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn update_tx(info: ProducerInfo) -> Transaction {
    Transaction {
        payload: TxPayload::UpdateProducer(info),
        inputs: vec![],
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn cancel_tx(owner: PublicKey) -> Transaction {
    Transaction {
        payload: TxPayload::CancelProducer(ProcessProducer { owner_public_key: owner }),
        inputs: vec![],
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn activate_tx(owner: PublicKey) -> Transaction {
    Transaction {
        payload: TxPayload::ActivateProducer(ProcessProducer { owner_public_key: owner }),
        inputs: vec![],
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn vote_tx(value: i64, candidates: Vec<PublicKey>) -> Transaction {
    Transaction {
        payload: TxPayload::TransferAsset,
        inputs: vec![],
        outputs: vec![Output {
            value: Fixed64(value),
            vote: Some(VoteOutput { candidates }),
        }],
        fee: Fixed64::ZERO,
    }
}

/// Spends every output of a previous vote transaction.
pub fn cancel_vote_tx(prev: &Transaction) -> Transaction {
    let txid = prev.hash();
    let inputs = (0..prev.outputs.len())
        .map(|i| Input {
            previous: OutPoint { txid, index: i as u16 },
        })
        .collect();
    Transaction {
        payload: TxPayload::TransferAsset,
        inputs,
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn illegal_blocks_payload(accused: PublicKey, height: u32) -> DposIllegalBlocks {
    let evidence = |header: Vec<u8>| BlockEvidence {
        header,
        block_height: height,
        signers: vec![accused],
    };
    DposIllegalBlocks {
        evidence: evidence(vec![1]),
        compare_evidence: evidence(vec![2]),
    }
}

pub fn illegal_blocks_tx(accused: PublicKey, height: u32) -> Transaction {
    Transaction {
        payload: TxPayload::IllegalBlocks(illegal_blocks_payload(accused, height)),
        inputs: vec![],
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn inactive_arbitrators_payload(
    sponsor: PublicKey,
    arbitrators: Vec<PublicKey>,
    height: u32,
) -> InactiveArbitrators {
    InactiveArbitrators { sponsor, arbitrators, block_height: height }
}

pub fn inactive_arbitrators_tx(payload: InactiveArbitrators) -> Transaction {
    Transaction {
        payload: TxPayload::InactiveArbitrators(payload),
        inputs: vec![],
        outputs: vec![],
        fee: Fixed64::ZERO,
    }
}

pub fn mock_block(height: u32, txs: Vec<Transaction>) -> Block {
    Block {
        header: BlockHeader { height, prev: Hash32::zero() },
        txs,
    }
}

pub fn confirm_by(sponsor: PublicKey) -> Confirm {
    Confirm {
        proposal: DposProposal { sponsor, view_offset: 0 },
        votes: vec![DposProposalVote { signer: sponsor }],
    }
}

/// Registry-focused parameters: inactivity detection starts at height 11,
/// tight inactive window, visible penalties.
pub fn registry_params() -> ChainParams {
    ChainParams {
        crc_only_dpos_height: 1_000_000,
        public_dpos_height: 11,
        max_inactive_rounds: 10,
        inactive_penalty: Fixed64(100),
        illegal_penalty: Fixed64(500),
        history_capacity: 720,
        ..ChainParams::default()
    }
}

/// Parameters where inactivity detection is effectively disabled.
pub fn lifecycle_params() -> ChainParams {
    ChainParams {
        crc_only_dpos_height: 1_000_000,
        public_dpos_height: 1_000_001,
        history_capacity: 720,
        ..ChainParams::default()
    }
}
