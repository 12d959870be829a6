use thiserror::Error;

use crate::types::Height;

/// Errors surfaced by the arbitrator state engine.
///
/// `InsufficientProducer` is recovered internally (the degradation controller
/// flips to understaffed); everything else propagates to the host, which
/// decides whether to reject the block or shut down.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("producers count less than required arbitrators count at height {height}")]
    InsufficientProducer { height: Height },

    #[error("seek to {height} overflows history capacity, at most seek to {oldest}")]
    OverflowHorizon { height: Height, oldest: Height },

    #[error("real dpos reward exceeds reward pool at height {height}")]
    RewardOverflow { height: Height },

    #[error("expected illegal evidence transaction missing in block at height {height}")]
    ExpectedIllegalTxAbsent { height: Height },

    #[error("invalid special payload type")]
    InvalidSpecialPayload,

    #[error("producer not found at height {height}: {key}")]
    ProducerNotFound { height: Height, key: String },

    #[error("owner key already registered at height {height}: {key}")]
    DuplicateOwner { height: Height, key: String },

    #[error("node key already in use at height {height}: {key}")]
    DuplicateNode { height: Height, key: String },

    #[error("nickname already in use at height {height}: {nickname}")]
    DuplicateNickname { height: Height, nickname: String },

    #[error("illegal status transition at height {height} for {key}: {context}")]
    InvalidStatusTransition {
        height: Height,
        key: String,
        context: String,
    },

    #[error("can't rollback to height {height}: {context}")]
    InvalidRollback { height: Height, context: String },

    #[error("rollback to {height} would cross more than one committee epoch")]
    RollbackTooDeep { height: Height },

    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal inconsistency at height {height}: {context}")]
    Internal { height: Height, context: String },
}
