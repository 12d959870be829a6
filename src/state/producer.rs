use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::types::payload::ProducerInfo;
use crate::types::{Fixed64, Height};

/// Lifecycle status of a registered producer.
///
/// Legal transitions:
///   Pending  -> Active (registration confirmations elapsed)
///   Active   -> Canceled | Inactive | Illegal
///   Inactive -> Active (activate request + confirmations) | Illegal
///   Canceled -> Returned (deposit delay elapsed)
///   Illegal is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProducerStatus {
    Pending,
    Active,
    Inactive,
    Canceled,
    Illegal,
    Returned,
}

impl ProducerStatus {
    /// Statuses whose node key and nickname are released for reuse.
    pub fn is_terminalish(&self) -> bool {
        matches!(
            self,
            ProducerStatus::Canceled | ProducerStatus::Illegal | ProducerStatus::Returned
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub info: ProducerInfo,
    pub status: ProducerStatus,
    pub registration_height: Height,
    pub cancel_height: Option<Height>,
    pub activate_request_height: Option<Height>,
    pub inactive_since: Option<Height>,
    pub continuous_missed_rounds: u32,
    pub votes: Fixed64,
    pub penalty: Fixed64,
}

impl Producer {
    pub fn new(info: ProducerInfo, height: Height) -> Self {
        Self {
            info,
            status: ProducerStatus::Pending,
            registration_height: height,
            cancel_height: None,
            activate_request_height: None,
            inactive_since: None,
            continuous_missed_rounds: 0,
            votes: Fixed64::ZERO,
            penalty: Fixed64::ZERO,
        }
    }

    pub fn owner_key(&self) -> PublicKey {
        self.info.owner_public_key
    }

    pub fn node_key(&self) -> PublicKey {
        self.info.node_public_key
    }

    pub fn nickname(&self) -> &str {
        &self.info.nickname
    }

    pub fn votes(&self) -> Fixed64 {
        self.votes
    }

    pub fn penalty(&self) -> Fixed64 {
        self.penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ProducerInfo {
        ProducerInfo {
            owner_public_key: PublicKey([1; 33]),
            node_public_key: PublicKey([2; 33]),
            nickname: "n".into(),
            url: String::new(),
            location: 0,
            net_address: String::new(),
        }
    }

    #[test]
    fn new_producer_is_pending() {
        let p = Producer::new(info(), 7);
        assert_eq!(p.status, ProducerStatus::Pending);
        assert_eq!(p.registration_height, 7);
        assert!(p.votes.is_zero());
    }

    #[test]
    fn terminalish_statuses() {
        assert!(ProducerStatus::Canceled.is_terminalish());
        assert!(ProducerStatus::Illegal.is_terminalish());
        assert!(ProducerStatus::Returned.is_terminalish());
        assert!(!ProducerStatus::Active.is_terminalish());
        assert!(!ProducerStatus::Pending.is_terminalish());
        assert!(!ProducerStatus::Inactive.is_terminalish());
    }
}
