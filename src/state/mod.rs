//! Producer registry: the multi-status producer lifecycle driven by on-chain
//! transactions, vote tallies, nickname bookkeeping and per-producer
//! inactivity counters.
//!
//! The registry is a single-writer structure; the engine facade serializes
//! access. Every mutation is staged into the [`ChangeLog`] journal and either
//! committed as one frame per block or discarded wholesale when a handler
//! fails, so no partial mutation ever escapes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ChainParams;
use crate::crypto::PublicKey;
use crate::error::EngineError;
use crate::types::payload::{Confirm, InactiveArbitrators, ProducerInfo, TxPayload};
use crate::types::{Block, Fixed64, Hash32, Height, OutPoint, Transaction};

pub mod degradation;
pub mod history;
pub mod producer;

use history::ChangeLog;
pub use producer::{Producer, ProducerStatus};

/// A vote output the registry remembers so that a later spend of the same
/// outpoint can subtract exactly the votes it added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub value: Fixed64,
    pub candidates: Vec<PublicKey>,
}

/// The journaled portion of registry state. Plain data: undo closures apply
/// to any instance, which is what makes historical snapshots a clone-and-
/// replay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    /// node public key -> owner public key, for records whose node key is
    /// still live (not canceled/illegal/returned).
    pub node_owner_keys: BTreeMap<PublicKey, PublicKey>,
    pub pending: BTreeMap<PublicKey, Producer>,
    pub active: BTreeMap<PublicKey, Producer>,
    pub inactive: BTreeMap<PublicKey, Producer>,
    /// Canceled and Returned records, keyed by owner.
    pub canceled: BTreeMap<PublicKey, Producer>,
    pub illegal: BTreeMap<PublicKey, Producer>,
    pub nicknames: BTreeSet<String>,
    pub votes: BTreeMap<OutPoint, VoteEntry>,
    /// Evidence payload hashes already applied, so duplicated accusations are
    /// processed at most once.
    pub special_tx_hashes: BTreeSet<Hash32>,
}

impl StateData {
    /// Resolves a producer by owner or node public key.
    pub fn producer(&self, key: &PublicKey) -> Option<&Producer> {
        let owner = self.node_owner_keys.get(key).copied().unwrap_or(*key);
        self.pending
            .get(&owner)
            .or_else(|| self.active.get(&owner))
            .or_else(|| self.inactive.get(&owner))
            .or_else(|| self.canceled.get(&owner))
            .or_else(|| self.illegal.get(&owner))
    }

    fn owner_of(&self, key: &PublicKey) -> PublicKey {
        self.node_owner_keys.get(key).copied().unwrap_or(*key)
    }

    fn producer_mut(&mut self, owner: &PublicKey) -> Option<&mut Producer> {
        if self.pending.contains_key(owner) {
            return self.pending.get_mut(owner);
        }
        if self.active.contains_key(owner) {
            return self.active.get_mut(owner);
        }
        if self.inactive.contains_key(owner) {
            return self.inactive.get_mut(owner);
        }
        if self.canceled.contains_key(owner) {
            return self.canceled.get_mut(owner);
        }
        self.illegal.get_mut(owner)
    }

    fn take(&mut self, owner: &PublicKey) -> Option<Producer> {
        self.pending
            .remove(owner)
            .or_else(|| self.active.remove(owner))
            .or_else(|| self.inactive.remove(owner))
            .or_else(|| self.canceled.remove(owner))
            .or_else(|| self.illegal.remove(owner))
    }

    fn put(&mut self, p: Producer) {
        let owner = p.owner_key();
        match p.status {
            ProducerStatus::Pending => self.pending.insert(owner, p),
            ProducerStatus::Active => self.active.insert(owner, p),
            ProducerStatus::Inactive => self.inactive.insert(owner, p),
            ProducerStatus::Canceled | ProducerStatus::Returned => self.canceled.insert(owner, p),
            ProducerStatus::Illegal => self.illegal.insert(owner, p),
        };
    }
}

pub struct State {
    params: Arc<ChainParams>,
    pub(crate) data: StateData,
    pub(crate) history: ChangeLog,
}

impl State {
    pub fn new(params: Arc<ChainParams>) -> Self {
        let capacity = params.history_capacity;
        Self {
            params,
            data: StateData::default(),
            history: ChangeLog::new(capacity),
        }
    }

    pub fn height(&self) -> Height {
        self.history.height()
    }

    /// Interprets one block's effect on the registry.
    ///
    /// `current_arbiters` is the committee signing this round; it drives the
    /// inactivity counters when a `Confirm` accompanies the block.
    ///
    /// A frame committed at this height or above (a special payload processed
    /// between blocks) is provisional and is rolled back first: evidence that
    /// the block does not embed evaporates, embedded evidence is re-applied
    /// from the block's own transactions.
    pub fn process_block(
        &mut self,
        block: &Block,
        confirm: Option<&Confirm>,
        current_arbiters: &[PublicKey],
    ) -> Result<(), EngineError> {
        let height = block.header.height;
        self.history.rollback_provisional(height, &mut self.data);

        let result = self.process_transactions(&block.txs, height).map(|_| {
            if let Some(confirm) = confirm {
                self.count_inactivity(height, confirm, current_arbiters);
            }
            self.process_lifecycle_sweeps(height);
        });

        match result {
            Ok(()) => {
                self.history.commit(height, &mut self.data);
                Ok(())
            }
            Err(e) => {
                self.history.discard();
                Err(e)
            }
        }
    }

    /// Applies a special payload broadcast between blocks. The changes are
    /// journaled one height past the tip and must be matched by an embedded
    /// transaction in the very next block to survive.
    pub fn process_special_payload(&mut self, payload: &TxPayload) -> Result<(), EngineError> {
        let height = self.history.height() + 1;
        let result = match payload {
            TxPayload::IllegalBlocks(p) => {
                self.stage_illegal_evidence(p.hash(), &p.accused(), height)
            }
            TxPayload::IllegalProposals(p) => {
                self.stage_illegal_evidence(p.hash(), &p.accused(), height)
            }
            TxPayload::InactiveArbitrators(p) => {
                self.stage_emergency_inactive(p, height);
                Ok(())
            }
            _ => Err(EngineError::InvalidSpecialPayload),
        };
        match result {
            Ok(()) => {
                self.history.commit(height, &mut self.data);
                Ok(())
            }
            Err(e) => {
                self.history.discard();
                Err(e)
            }
        }
    }

    pub fn rollback_to(&mut self, height: Height) -> Result<(), EngineError> {
        self.history.rollback_to(height, &mut self.data)
    }

    /// Read-only snapshot of the registry as of `height`, produced by
    /// replaying undo frames into a clone of the live data.
    pub fn snapshot_at(&self, height: Height) -> Result<StateData, EngineError> {
        let mut view = self.data.clone();
        self.history.replay_undo_into(height, &mut view)?;
        Ok(view)
    }

    // ── transaction dispatch ──────────────────────────────────────────────

    fn process_transactions(
        &mut self,
        txs: &[Transaction],
        height: Height,
    ) -> Result<(), EngineError> {
        for tx in txs {
            self.process_transaction(tx, height)?;
        }
        Ok(())
    }

    fn process_transaction(&mut self, tx: &Transaction, height: Height) -> Result<(), EngineError> {
        match &tx.payload {
            TxPayload::RegisterProducer(info) => self.register_producer(info, height)?,
            TxPayload::UpdateProducer(info) => self.update_producer(info, height)?,
            TxPayload::CancelProducer(p) => {
                self.cancel_producer(&p.owner_public_key, height)?
            }
            TxPayload::ActivateProducer(p) => {
                self.activate_producer(&p.owner_public_key, height)?
            }
            TxPayload::TransferAsset => {
                self.process_vote_outputs(tx, height);
                self.process_vote_spends(tx);
            }
            TxPayload::IllegalBlocks(p) => {
                self.stage_illegal_evidence(p.hash(), &p.accused(), height)?
            }
            TxPayload::IllegalProposals(p) => {
                self.stage_illegal_evidence(p.hash(), &p.accused(), height)?
            }
            TxPayload::InactiveArbitrators(p) => self.stage_emergency_inactive(p, height),
            TxPayload::SideChainPow => {}
        }
        // Spends of vote outputs can ride on any transaction kind.
        if !matches!(tx.payload, TxPayload::TransferAsset) {
            self.process_vote_spends(tx);
        }
        Ok(())
    }

    /// True if this transaction affects registry state in any way. Hosts use
    /// it to decide whether a mempool entry needs DPoS-aware validation.
    pub fn is_dpos_transaction(&self, tx: &Transaction) -> bool {
        match &tx.payload {
            TxPayload::RegisterProducer(_)
            | TxPayload::UpdateProducer(_)
            | TxPayload::CancelProducer(_)
            | TxPayload::ActivateProducer(_)
            | TxPayload::IllegalBlocks(_)
            | TxPayload::IllegalProposals(_)
            | TxPayload::InactiveArbitrators(_) => true,
            TxPayload::SideChainPow => false,
            TxPayload::TransferAsset => {
                tx.outputs.iter().any(|o| o.vote.is_some())
                    || tx
                        .inputs
                        .iter()
                        .any(|i| self.data.votes.contains_key(&i.previous))
            }
        }
    }

    // ── producer lifecycle handlers ───────────────────────────────────────

    fn register_producer(
        &mut self,
        info: &ProducerInfo,
        height: Height,
    ) -> Result<(), EngineError> {
        let owner = info.owner_public_key;
        let node = info.node_public_key;

        let existing = self
            .data
            .pending
            .get(&owner)
            .or_else(|| self.data.active.get(&owner))
            .or_else(|| self.data.inactive.get(&owner))
            .or_else(|| self.data.canceled.get(&owner))
            .or_else(|| self.data.illegal.get(&owner));
        let prior_returned = match existing {
            Some(p) if p.status == ProducerStatus::Returned => Some(p.clone()),
            Some(_) => {
                return Err(EngineError::DuplicateOwner {
                    height,
                    key: owner.to_string(),
                })
            }
            None => None,
        };
        if self.data.node_owner_keys.contains_key(&node) {
            return Err(EngineError::DuplicateNode {
                height,
                key: node.to_string(),
            });
        }
        if self.data.nicknames.contains(&info.nickname) {
            return Err(EngineError::DuplicateNickname {
                height,
                nickname: info.nickname.clone(),
            });
        }

        let producer = Producer::new(info.clone(), height);
        let nickname = info.nickname.clone();
        debug!(owner = %owner, nickname = %nickname, height, "register producer");

        let p = producer;
        let replaced = prior_returned.is_some();
        let restore = prior_returned;
        let nick = nickname.clone();
        self.history.append(
            Box::new(move |d| {
                if replaced {
                    d.canceled.remove(&owner);
                }
                d.nicknames.insert(nick.clone());
                d.node_owner_keys.insert(node, owner);
                d.pending.insert(owner, p.clone());
            }),
            Box::new(move |d| {
                d.pending.remove(&owner);
                d.node_owner_keys.remove(&node);
                d.nicknames.remove(&nickname);
                if let Some(old) = restore.clone() {
                    d.canceled.insert(owner, old);
                }
            }),
        );
        Ok(())
    }

    fn update_producer(&mut self, info: &ProducerInfo, height: Height) -> Result<(), EngineError> {
        let owner = info.owner_public_key;
        let old = match self.data.producer(&owner) {
            Some(p) if !p.status.is_terminalish() && p.owner_key() == owner => p.clone(),
            _ => {
                return Err(EngineError::ProducerNotFound {
                    height,
                    key: owner.to_string(),
                })
            }
        };

        if info.nickname != old.info.nickname && self.data.nicknames.contains(&info.nickname) {
            return Err(EngineError::DuplicateNickname {
                height,
                nickname: info.nickname.clone(),
            });
        }
        if info.node_public_key != old.info.node_public_key
            && self.data.node_owner_keys.contains_key(&info.node_public_key)
        {
            return Err(EngineError::DuplicateNode {
                height,
                key: info.node_public_key.to_string(),
            });
        }

        let new_info = info.clone();
        let old_info = old.info.clone();
        debug!(owner = %owner, height, "update producer");

        let (ni, oi) = (new_info.clone(), old_info.clone());
        self.history.append(
            Box::new(move |d| {
                d.nicknames.remove(&oi.nickname);
                d.nicknames.insert(ni.nickname.clone());
                d.node_owner_keys.remove(&oi.node_public_key);
                d.node_owner_keys.insert(ni.node_public_key, owner);
                if let Some(p) = d.producer_mut(&owner) {
                    p.info = ni.clone();
                }
            }),
            Box::new(move |d| {
                d.nicknames.remove(&new_info.nickname);
                d.nicknames.insert(old_info.nickname.clone());
                d.node_owner_keys.remove(&new_info.node_public_key);
                d.node_owner_keys.insert(old_info.node_public_key, owner);
                if let Some(p) = d.producer_mut(&owner) {
                    p.info = old_info.clone();
                }
            }),
        );
        Ok(())
    }

    fn cancel_producer(&mut self, key: &PublicKey, height: Height) -> Result<(), EngineError> {
        let old = match self.data.producer(key) {
            Some(p) => p.clone(),
            None => {
                return Err(EngineError::ProducerNotFound {
                    height,
                    key: key.to_string(),
                })
            }
        };
        if old.status.is_terminalish() {
            return Err(EngineError::InvalidStatusTransition {
                height,
                key: key.to_string(),
                context: format!("cancel on {:?} producer", old.status),
            });
        }

        let owner = old.owner_key();
        let node = old.node_key();
        let nickname = old.info.nickname.clone();
        debug!(owner = %owner, height, "cancel producer");

        let prev = old;
        let nick = nickname;
        self.history.append(
            {
                let nick = nick.clone();
                Box::new(move |d| {
                    if let Some(mut p) = d.take(&owner) {
                        p.status = ProducerStatus::Canceled;
                        p.cancel_height = Some(height);
                        d.put(p);
                    }
                    d.nicknames.remove(&nick);
                    d.node_owner_keys.remove(&node);
                })
            },
            Box::new(move |d| {
                d.canceled.remove(&owner);
                d.nicknames.insert(nick.clone());
                d.node_owner_keys.insert(node, owner);
                d.put(prev.clone());
            }),
        );
        Ok(())
    }

    fn activate_producer(&mut self, key: &PublicKey, height: Height) -> Result<(), EngineError> {
        let old = match self.data.producer(key) {
            Some(p) => p.clone(),
            None => {
                return Err(EngineError::ProducerNotFound {
                    height,
                    key: key.to_string(),
                })
            }
        };
        if old.status != ProducerStatus::Inactive {
            return Err(EngineError::InvalidStatusTransition {
                height,
                key: key.to_string(),
                context: format!("activate on {:?} producer", old.status),
            });
        }

        let owner = old.owner_key();
        let prev_request = old.activate_request_height;
        debug!(owner = %owner, height, "activate producer requested");

        self.history.append(
            Box::new(move |d| {
                if let Some(p) = d.producer_mut(&owner) {
                    p.activate_request_height = Some(height);
                }
            }),
            Box::new(move |d| {
                if let Some(p) = d.producer_mut(&owner) {
                    p.activate_request_height = prev_request;
                }
            }),
        );
        Ok(())
    }

    // ── votes ─────────────────────────────────────────────────────────────

    fn process_vote_outputs(&mut self, tx: &Transaction, height: Height) {
        let txid = tx.hash();
        for (index, output) in tx.outputs.iter().enumerate() {
            let Some(vote) = &output.vote else { continue };
            let outpoint = OutPoint {
                txid,
                index: index as u16,
            };
            let value = output.value;

            for candidate in &vote.candidates {
                match self.data.producer(candidate) {
                    Some(p) if !p.status.is_terminalish() => {
                        let owner = p.owner_key();
                        self.history.append(
                            Box::new(move |d| {
                                if let Some(p) = d.producer_mut(&owner) {
                                    p.votes += value;
                                }
                            }),
                            Box::new(move |d| {
                                if let Some(p) = d.producer_mut(&owner) {
                                    p.votes -= value;
                                }
                            }),
                        );
                    }
                    _ => warn!(candidate = %candidate, height, "vote for unknown or retired producer"),
                }
            }

            let entry = VoteEntry {
                value,
                candidates: vote.candidates.clone(),
            };
            let prior = self.data.votes.get(&outpoint).cloned();
            self.history.append(
                Box::new(move |d| {
                    d.votes.insert(outpoint, entry.clone());
                }),
                Box::new(move |d| {
                    match prior.clone() {
                        Some(e) => d.votes.insert(outpoint, e),
                        None => d.votes.remove(&outpoint),
                    };
                }),
            );
        }
    }

    fn process_vote_spends(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            let outpoint = input.previous;
            let Some(entry) = self.data.votes.get(&outpoint) else {
                continue;
            };
            let entry = entry.clone();

            let forward = entry.clone();
            self.history.append(
                Box::new(move |d| {
                    for candidate in &forward.candidates {
                        let owner = d.owner_of(candidate);
                        if let Some(p) = d.producer_mut(&owner) {
                            if !p.status.is_terminalish() {
                                p.votes -= forward.value;
                            }
                        }
                    }
                    d.votes.remove(&outpoint);
                }),
                Box::new(move |d| {
                    for candidate in &entry.candidates {
                        let owner = d.owner_of(candidate);
                        if let Some(p) = d.producer_mut(&owner) {
                            if !p.status.is_terminalish() {
                                p.votes += entry.value;
                            }
                        }
                    }
                    d.votes.insert(
                        outpoint,
                        VoteEntry {
                            value: entry.value,
                            candidates: entry.candidates.clone(),
                        },
                    );
                }),
            );
        }
    }

    // ── evidence ──────────────────────────────────────────────────────────

    fn stage_illegal_evidence(
        &mut self,
        hash: Hash32,
        accused: &[PublicKey],
        height: Height,
    ) -> Result<(), EngineError> {
        if self.data.special_tx_hashes.contains(&hash) {
            debug!(%hash, height, "duplicated illegal evidence, skipping");
            return Ok(());
        }
        self.history.append(
            Box::new(move |d| {
                d.special_tx_hashes.insert(hash);
            }),
            Box::new(move |d| {
                d.special_tx_hashes.remove(&hash);
            }),
        );

        let penalty = self.params.illegal_penalty;
        for key in accused {
            let old = match self.data.producer(key) {
                Some(p)
                    if matches!(
                        p.status,
                        ProducerStatus::Pending
                            | ProducerStatus::Active
                            | ProducerStatus::Inactive
                    ) =>
                {
                    p.clone()
                }
                _ => {
                    warn!(key = %key, height, "illegal evidence against unknown or retired producer");
                    continue;
                }
            };
            let owner = old.owner_key();
            let node = old.node_key();
            let nickname = old.info.nickname.clone();
            warn!(owner = %owner, height, "producer marked illegal");

            let prev = old;
            self.history.append(
                {
                    let nick = nickname.clone();
                    Box::new(move |d| {
                        if let Some(mut p) = d.take(&owner) {
                            p.status = ProducerStatus::Illegal;
                            p.penalty += penalty;
                            d.put(p);
                        }
                        d.nicknames.remove(&nick);
                        d.node_owner_keys.remove(&node);
                    })
                },
                Box::new(move |d| {
                    d.illegal.remove(&owner);
                    d.nicknames.insert(nickname.clone());
                    d.node_owner_keys.insert(node, owner);
                    d.put(prev.clone());
                }),
            );
        }
        Ok(())
    }

    fn stage_emergency_inactive(&mut self, payload: &InactiveArbitrators, height: Height) {
        let hash = payload.hash();
        if self.data.special_tx_hashes.contains(&hash) {
            debug!(%hash, height, "duplicated inactive-arbitrators payload, skipping");
            return;
        }
        self.history.append(
            Box::new(move |d| {
                d.special_tx_hashes.insert(hash);
            }),
            Box::new(move |d| {
                d.special_tx_hashes.remove(&hash);
            }),
        );

        let penalty = self.params.inactive_penalty;
        for key in &payload.arbitrators {
            let old = match self.data.producer(key) {
                Some(p) if p.status == ProducerStatus::Active => p.clone(),
                _ => continue,
            };
            let owner = old.owner_key();
            warn!(owner = %owner, height, "producer forced inactive by network accusation");

            let prev = old;
            self.history.append(
                Box::new(move |d| {
                    if let Some(mut p) = d.active.remove(&owner) {
                        p.status = ProducerStatus::Inactive;
                        p.inactive_since = Some(height);
                        p.continuous_missed_rounds = 0;
                        p.penalty += penalty;
                        d.inactive.insert(owner, p);
                    }
                }),
                Box::new(move |d| {
                    d.inactive.remove(&owner);
                    d.active.insert(owner, prev.clone());
                }),
            );
        }
    }

    // ── inactivity detection ──────────────────────────────────────────────

    /// After each confirmed block from `public_dpos_height` on, bump the
    /// missed-round counter of every current arbitrator that neither
    /// sponsored nor signed the confirm; any signature resets the counter.
    /// Crossing `max_inactive_rounds` consecutive misses demotes the
    /// producer to Inactive and applies the inactivity penalty. CRC arbiters
    /// are not registry producers and are never demoted here.
    fn count_inactivity(&mut self, height: Height, confirm: &Confirm, arbiters: &[PublicKey]) {
        if height < self.params.public_dpos_height {
            return;
        }

        let signers = confirm.signers();
        let max_rounds = self.params.max_inactive_rounds;
        let penalty = self.params.inactive_penalty;

        for arbiter in arbiters {
            let Some(owner) = self.data.node_owner_keys.get(arbiter).copied() else {
                continue;
            };
            let Some(p) = self.data.active.get(&owner) else {
                continue;
            };
            let missed = p.continuous_missed_rounds;
            let signed = signers.contains(arbiter);

            if signed {
                if missed == 0 {
                    continue;
                }
                self.history.append(
                    Box::new(move |d| {
                        if let Some(p) = d.active.get_mut(&owner) {
                            p.continuous_missed_rounds = 0;
                        }
                    }),
                    Box::new(move |d| {
                        if let Some(p) = d.active.get_mut(&owner) {
                            p.continuous_missed_rounds = missed;
                        }
                    }),
                );
            } else if missed + 1 > max_rounds {
                let prev = p.clone();
                warn!(owner = %owner, height, missed = missed + 1, "producer inactive");
                self.history.append(
                    Box::new(move |d| {
                        if let Some(mut p) = d.active.remove(&owner) {
                            p.status = ProducerStatus::Inactive;
                            p.inactive_since = Some(height);
                            p.continuous_missed_rounds = 0;
                            p.penalty += penalty;
                            d.inactive.insert(owner, p);
                        }
                    }),
                    Box::new(move |d| {
                        d.inactive.remove(&owner);
                        d.active.insert(owner, prev.clone());
                    }),
                );
            } else {
                self.history.append(
                    Box::new(move |d| {
                        if let Some(p) = d.active.get_mut(&owner) {
                            p.continuous_missed_rounds = missed + 1;
                        }
                    }),
                    Box::new(move |d| {
                        if let Some(p) = d.active.get_mut(&owner) {
                            p.continuous_missed_rounds = missed;
                        }
                    }),
                );
            }
        }
    }

    // ── end-of-block lifecycle sweeps ─────────────────────────────────────

    fn process_lifecycle_sweeps(&mut self, height: Height) {
        let delay = self.params.activate_delay_blocks;

        // Pending producers with enough confirmations become active.
        let matured: Vec<PublicKey> = self
            .data
            .pending
            .values()
            .filter(|p| height - p.registration_height + 1 >= delay)
            .map(|p| p.owner_key())
            .collect();
        for owner in matured {
            let prev = self.data.pending[&owner].clone();
            self.history.append(
                Box::new(move |d| {
                    if let Some(mut p) = d.pending.remove(&owner) {
                        p.status = ProducerStatus::Active;
                        d.active.insert(owner, p);
                    }
                }),
                Box::new(move |d| {
                    d.active.remove(&owner);
                    d.pending.insert(owner, prev.clone());
                }),
            );
        }

        // Inactive producers whose activation request has matured rejoin;
        // the deposit paid their pending penalty.
        let reactivated: Vec<PublicKey> = self
            .data
            .inactive
            .values()
            .filter(|p| match p.activate_request_height {
                Some(request) => height > request && height - request + 1 >= delay,
                None => false,
            })
            .map(|p| p.owner_key())
            .collect();
        for owner in reactivated {
            let prev = self.data.inactive[&owner].clone();
            debug!(owner = %owner, height, "producer reactivated");
            self.history.append(
                Box::new(move |d| {
                    if let Some(mut p) = d.inactive.remove(&owner) {
                        p.status = ProducerStatus::Active;
                        p.activate_request_height = None;
                        p.inactive_since = None;
                        p.penalty = Fixed64::ZERO;
                        d.active.insert(owner, p);
                    }
                }),
                Box::new(move |d| {
                    d.active.remove(&owner);
                    d.inactive.insert(owner, prev.clone());
                }),
            );
        }

        // Canceled producers past the deposit delay release their keys.
        let return_delay = self.params.deposit_return_delay;
        let returned: Vec<PublicKey> = self
            .data
            .canceled
            .values()
            .filter(|p| {
                p.status == ProducerStatus::Canceled
                    && p.cancel_height
                        .map(|c| height - c >= return_delay)
                        .unwrap_or(false)
            })
            .map(|p| p.owner_key())
            .collect();
        for owner in returned {
            self.history.append(
                Box::new(move |d| {
                    if let Some(p) = d.canceled.get_mut(&owner) {
                        p.status = ProducerStatus::Returned;
                    }
                }),
                Box::new(move |d| {
                    if let Some(p) = d.canceled.get_mut(&owner) {
                        p.status = ProducerStatus::Canceled;
                    }
                }),
            );
        }
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn get_producer(&self, key: &PublicKey) -> Option<&Producer> {
        self.data.producer(key)
    }

    pub fn pending_producers(&self) -> Vec<&Producer> {
        self.data.pending.values().collect()
    }

    pub fn active_producers(&self) -> Vec<&Producer> {
        self.data.active.values().collect()
    }

    pub fn inactive_producers(&self) -> Vec<&Producer> {
        self.data.inactive.values().collect()
    }

    pub fn canceled_producers(&self) -> Vec<&Producer> {
        self.data
            .canceled
            .values()
            .filter(|p| p.status == ProducerStatus::Canceled)
            .collect()
    }

    pub fn returned_producers(&self) -> Vec<&Producer> {
        self.data
            .canceled
            .values()
            .filter(|p| p.status == ProducerStatus::Returned)
            .collect()
    }

    pub fn illegal_producers(&self) -> Vec<&Producer> {
        self.data.illegal.values().collect()
    }

    /// All producers still holding a live registration (pending, active or
    /// inactive).
    pub fn producers(&self) -> Vec<&Producer> {
        self.data
            .pending
            .values()
            .chain(self.data.active.values())
            .chain(self.data.inactive.values())
            .collect()
    }

    /// Active producers carrying votes; the electorate for committee
    /// selection.
    pub fn voted_producers(&self) -> Vec<Producer> {
        self.data
            .active
            .values()
            .filter(|p| p.votes > Fixed64::ZERO)
            .cloned()
            .collect()
    }

    pub fn nickname_exists(&self, nickname: &str) -> bool {
        self.data.nicknames.contains(nickname)
    }

    pub fn producer_exists(&self, key: &PublicKey) -> bool {
        self.data.producer(key).is_some()
    }

    pub fn is_active_producer(&self, key: &PublicKey) -> bool {
        matches!(self.data.producer(key), Some(p) if p.status == ProducerStatus::Active)
    }

    pub fn is_inactive_producer(&self, key: &PublicKey) -> bool {
        matches!(self.data.producer(key), Some(p) if p.status == ProducerStatus::Inactive)
    }

    pub fn is_canceled_producer(&self, key: &PublicKey) -> bool {
        matches!(self.data.producer(key), Some(p) if p.status == ProducerStatus::Canceled)
    }

    pub fn is_illegal_producer(&self, key: &PublicKey) -> bool {
        matches!(self.data.producer(key), Some(p) if p.status == ProducerStatus::Illegal)
    }
}
