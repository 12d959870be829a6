//! Property tests over the registry: determinism, rollback symmetry, and the
//! majority arithmetic the consensus checks lean on.

mod common;

use std::sync::Arc;

use common::*;
use dpos_arbiter::config::ChainParams;
use dpos_arbiter::state::{State, StateData};
use dpos_arbiter::types::Block;
use proptest::prelude::*;

/// (op, target, value) triples; op selects register / cancel / vote / noop.
fn op_stream() -> impl Strategy<Value = Vec<(u8, u8, i64)>> {
    proptest::collection::vec((0u8..4, 0u8..8, 1i64..1_000), 1..24)
}

/// Builds a valid block stream out of raw ops: ops that would be rejected by
/// validation are dropped so every block applies cleanly.
fn build_blocks(params: &ChainParams, ops: &[(u8, u8, i64)]) -> Vec<Block> {
    let mut state = State::new(Arc::new(params.clone()));
    let mut blocks = Vec::new();
    for (i, (op, target, value)) in ops.iter().enumerate() {
        let height = i as u32 + 1;
        let txs = match op {
            0 if !state.producer_exists(&owner_key(*target)) => {
                vec![register_tx(producer_info(*target))]
            }
            1 => match state.get_producer(&owner_key(*target)) {
                Some(p) if !p.status.is_terminalish() => vec![cancel_tx(owner_key(*target))],
                _ => vec![],
            },
            2 => vec![vote_tx(*value, vec![owner_key(*target)])],
            _ => vec![],
        };
        let block = mock_block(height, txs);
        state.process_block(&block, None, &[]).unwrap();
        blocks.push(block);
    }
    blocks
}

fn replay(params: &ChainParams, blocks: &[Block]) -> State {
    let mut state = State::new(Arc::new(params.clone()));
    for block in blocks {
        state.process_block(block, None, &[]).unwrap();
    }
    state
}

fn snapshot(state: &State) -> StateData {
    state.snapshot_at(state.height()).unwrap()
}

proptest! {
    /// majority == floor(n * 2 / 3) for every committee size.
    #[test]
    fn majority_is_exact_floor(n in 1usize..=256) {
        let majority = n * 2 / 3;
        prop_assert!(3 * majority <= 2 * n);
        prop_assert!(3 * (majority + 1) > 2 * n);
        // the minority threshold pairs with it
        let minority = n - majority;
        prop_assert!(minority >= 1);
        prop_assert!(majority + minority == n);
    }

    /// Two registries fed the identical stream answer identically.
    #[test]
    fn registry_is_deterministic(ops in op_stream()) {
        let params = lifecycle_params();
        let blocks = build_blocks(&params, &ops);
        let a = replay(&params, &blocks);
        let b = replay(&params, &blocks);
        prop_assert_eq!(snapshot(&a), snapshot(&b));
        prop_assert_eq!(a.height(), b.height());
    }

    /// Rolling back k blocks and re-applying them reconverges exactly.
    #[test]
    fn rollback_then_replay_is_identity(ops in op_stream(), k in 1usize..8) {
        let params = lifecycle_params();
        let blocks = build_blocks(&params, &ops);
        let n = blocks.len();
        let cut = n.saturating_sub(k).max(1);

        let reference = replay(&params, &blocks);

        let mut state = replay(&params, &blocks);
        state.rollback_to(cut as u32).unwrap();
        for block in &blocks[cut..] {
            state.process_block(block, None, &[]).unwrap();
        }

        prop_assert_eq!(snapshot(&reference), snapshot(&state));
        prop_assert_eq!(reference.height(), state.height());
    }

    /// A rollback alone reproduces the state that existed at the cut height.
    #[test]
    fn rollback_matches_shorter_replay(ops in op_stream(), k in 1usize..8) {
        let params = lifecycle_params();
        let blocks = build_blocks(&params, &ops);
        let n = blocks.len();
        let cut = n.saturating_sub(k).max(1);

        let shorter = replay(&params, &blocks[..cut]);

        let mut state = replay(&params, &blocks);
        state.rollback_to(cut as u32).unwrap();

        prop_assert_eq!(snapshot(&shorter), snapshot(&state));
    }
}
