//! Committee manager and engine facade.
//!
//! `Arbitrators` owns the producer registry, the rotating committee slates,
//! the reward ledger and the degradation controller behind one exclusive
//! section, and is driven strictly in height order by the host's block
//! stream. Rotation points are derived from the protocol-version checkpoints
//! H1 (`crc_only_dpos_height`) and H2 (`public_dpos_height`):
//!
//!   H1 - pre_connect_offset  update next slate (CRC peers pre-connect)
//!   H1                       promote: CRC-only committee
//!   H2 - pre_connect_offset  update next slate (elected peers pre-connect)
//!   H2                       promote: CRC + elected committee
//!   h > H2, duty exhausted   promote at the end of every full rotation
//!
//! Events are collected under the lock and dispatched on a background thread
//! after it is released.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ChainParams;
use crate::crypto::{standard_program_hash, ProgramHash, PublicKey};
use crate::error::EngineError;
use crate::events::{self, Event, Notifier};
use crate::state::degradation::Degradation;
use crate::state::{Producer, ProducerStatus, State, StateData};
use crate::types::payload::{Confirm, ProducerInfo, TxPayload};
use crate::types::{Block, Fixed64, Hash32, Height};

pub mod legacy;
pub mod rewards;

use rewards::RoundContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChangeType {
    None,
    UpdateNext,
    NormalChange,
}

/// The rotating committee slates and the per-round reward ledger.
struct CommitteeState {
    duty_index: usize,
    current_arbitrators: Vec<PublicKey>,
    current_candidates: Vec<PublicKey>,
    next_arbitrators: Vec<PublicKey>,
    next_candidates: Vec<PublicKey>,

    current_owner_hashes: Vec<ProgramHash>,
    candidate_owner_hashes: Vec<ProgramHash>,
    next_owner_hashes: Vec<ProgramHash>,
    next_candidate_owner_hashes: Vec<ProgramHash>,

    owner_votes_in_round: BTreeMap<ProgramHash, Fixed64>,
    total_votes_in_round: Fixed64,

    accumulative_reward: Fixed64,
    final_round_change: Fixed64,
    clearing_height: Height,
    arbiters_round_reward: BTreeMap<ProgramHash, Fixed64>,

    /// Evidence hashes announced between blocks that the very next block must
    /// embed as transactions.
    illegal_payload_hashes: BTreeSet<Hash32>,
}

impl CommitteeState {
    fn new(origin_arbiters: &[PublicKey]) -> Self {
        let origin_hashes: Vec<ProgramHash> =
            origin_arbiters.iter().map(standard_program_hash).collect();
        Self {
            duty_index: 0,
            current_arbitrators: origin_arbiters.to_vec(),
            current_candidates: Vec::new(),
            next_arbitrators: origin_arbiters.to_vec(),
            next_candidates: Vec::new(),
            current_owner_hashes: origin_hashes.clone(),
            candidate_owner_hashes: Vec::new(),
            next_owner_hashes: origin_hashes,
            next_candidate_owner_hashes: Vec::new(),
            owner_votes_in_round: BTreeMap::new(),
            total_votes_in_round: Fixed64::ZERO,
            accumulative_reward: Fixed64::ZERO,
            final_round_change: Fixed64::ZERO,
            clearing_height: 0,
            arbiters_round_reward: BTreeMap::new(),
            illegal_payload_hashes: BTreeSet::new(),
        }
    }
}

struct Inner {
    state: State,
    committee: CommitteeState,
    degradation: Degradation,
}

pub type BestHeightFn = Box<dyn Fn() -> Height + Send + Sync>;
pub type BestBlockFn = Box<dyn Fn() -> Result<Block, EngineError> + Send + Sync>;

/// The DPoS arbitrator state engine.
pub struct Arbitrators {
    params: Arc<ChainParams>,
    // CRC configuration is read-only after construction and lives outside
    // the exclusive section.
    crc_arbiters: Vec<PublicKey>,
    crc_node_keys: BTreeSet<PublicKey>,
    crc_program_hashes: BTreeSet<ProgramHash>,
    crc_producers: BTreeMap<PublicKey, Producer>,
    crc_address: ProgramHash,
    origin_arbiters: Vec<PublicKey>,

    inner: Mutex<Inner>,
    notifier: Arc<dyn Notifier>,
    started: AtomicBool,
    best_height: BestHeightFn,
    best_block: BestBlockFn,
}

impl Arbitrators {
    /// Builds the engine from chain parameters and host callbacks.
    ///
    /// `best_block` is called while the exclusive section is held (to settle
    /// rewards on a force change) and must not call back into the engine.
    pub fn new(
        params: ChainParams,
        best_height: BestHeightFn,
        best_block: BestBlockFn,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, EngineError> {
        let params = Arc::new(params);

        let origin_arbiters = params
            .origin_arbiters
            .iter()
            .map(|s| PublicKey::from_hex(s))
            .collect::<Result<Vec<_>, _>>()?;
        let crc_arbiters = params
            .crc_arbiters
            .iter()
            .map(|s| PublicKey::from_hex(s))
            .collect::<Result<Vec<_>, _>>()?;
        let crc_address = if params.crc_address.is_empty() {
            ProgramHash([0u8; 21])
        } else {
            ProgramHash::from_hex(&params.crc_address)?
        };

        let crc_node_keys: BTreeSet<PublicKey> = crc_arbiters.iter().copied().collect();
        let crc_program_hashes: BTreeSet<ProgramHash> =
            crc_arbiters.iter().map(standard_program_hash).collect();
        let mut crc_producers = BTreeMap::new();
        for pk in &crc_arbiters {
            // CRC node public key doubles as its owner public key.
            let info = ProducerInfo {
                owner_public_key: *pk,
                node_public_key: *pk,
                nickname: String::new(),
                url: String::new(),
                location: 0,
                net_address: String::new(),
            };
            let mut producer = Producer::new(info, 0);
            producer.status = ProducerStatus::Active;
            crc_producers.insert(*pk, producer);
        }

        let inner = Inner {
            state: State::new(params.clone()),
            committee: CommitteeState::new(&origin_arbiters),
            degradation: Degradation::new(),
        };

        Ok(Self {
            params,
            crc_arbiters,
            crc_node_keys,
            crc_program_hashes,
            crc_producers,
            crc_address,
            origin_arbiters,
            inner: Mutex::new(inner),
            notifier,
            started: AtomicBool::new(false),
            best_height,
            best_block,
        })
    }

    /// Enables event emission. Before `start` the engine replays silently.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn emit(&self, events: Vec<Event>) {
        if self.started.load(Ordering::SeqCst) {
            events::dispatch(self.notifier.clone(), events);
        }
    }

    // ── block stream ──────────────────────────────────────────────────────

    pub fn process_block(
        &self,
        block: &Block,
        confirm: Option<&Confirm>,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        {
            let Inner { state, committee, .. } = &mut *inner;
            state.process_block(block, confirm, &committee.current_arbitrators)?;
        }
        let notify = self.increase_chain_height(&mut inner, block)?;
        let events = if notify {
            vec![
                Event::PeersNeedReconnect(self.need_connect_locked(&inner)),
                Event::CommitteeChanged { height: block.header.height },
            ]
        } else {
            Vec::new()
        };
        drop(inner);

        self.emit(events);
        Ok(())
    }

    fn increase_chain_height(
        &self,
        inner: &mut Inner,
        block: &Block,
    ) -> Result<bool, EngineError> {
        let height = block.header.height;
        let (change_type, version_height) = self.change_type(inner, height + 1);

        let notify = match change_type {
            ChangeType::UpdateNext => {
                self.update_next_arbitrators(inner, version_height)?;
                true
            }
            ChangeType::NormalChange => {
                self.clearing_dpos_reward(inner, block, true)?;
                self.change_current_arbitrators(inner);
                self.update_next_arbitrators(inner, height + 1)?;
                true
            }
            ChangeType::None => {
                self.accumulate_reward(inner, block);
                inner.committee.duty_index += 1;
                false
            }
        };

        // Whatever evidence was expected in this block has now been checked
        // by the host; the expectation window closes with the block.
        inner.committee.illegal_payload_hashes.clear();
        Ok(notify)
    }

    fn change_type(&self, inner: &Inner, height: Height) -> (ChangeType, Height) {
        let h1 = self.params.crc_only_dpos_height;
        let h2 = self.params.public_dpos_height;
        let offset = self.params.pre_connect_offset;

        if height == h1.saturating_sub(offset) {
            return (ChangeType::UpdateNext, h1);
        }
        if height == h1 {
            return (ChangeType::NormalChange, h1);
        }
        if height == h2.saturating_sub(offset) {
            return (ChangeType::UpdateNext, h2);
        }
        if height == h2 {
            return (ChangeType::NormalChange, h2);
        }

        let committee = &inner.committee;
        if height > h2
            && !committee.current_arbitrators.is_empty()
            && committee.duty_index == committee.current_arbitrators.len() - 1
        {
            return (ChangeType::NormalChange, height);
        }
        (ChangeType::None, height)
    }

    // ── rotation ──────────────────────────────────────────────────────────

    fn update_next_arbitrators(&self, inner: &mut Inner, height: Height) -> Result<(), EngineError> {
        let Inner { state, committee, degradation } = &mut *inner;

        if degradation.emergency_elapsed(height, self.params.emergency_duration) {
            degradation.leave_emergency();
        } else {
            let recovered = state.voted_producers().len() >= self.params.general_arbiters;
            degradation.try_leave_understaffed(recovered);
        }

        let mut next: Vec<PublicKey> = self.crc_node_keys.iter().copied().collect();
        let mut next_candidates = Vec::new();

        if !degradation.is_emergency() && !degradation.is_understaffed() {
            let mut voted = state.voted_producers();
            voted.sort_by(|a, b| {
                b.votes
                    .cmp(&a.votes)
                    .then_with(|| a.node_key().0.cmp(&b.node_key().0))
            });

            match self.normal_arbitrators(height, self.params.general_arbiters, &voted) {
                Ok(elected) => {
                    next.extend(elected);
                    next_candidates =
                        self.candidate_arbitrators(height, self.params.general_arbiters, &voted);
                }
                Err(EngineError::InsufficientProducer { .. }) => {
                    warn!(height, "insufficient producers, degrading to CRC-only committee");
                    degradation.try_set_understaffed(height);
                }
                Err(e) => return Err(e),
            }
        }

        committee.next_arbitrators = next;
        committee.next_candidates = next_candidates;
        self.update_next_owner_hashes(state, committee, height)?;
        Ok(())
    }

    /// Version-aware elected slate. From H2 on: top-`count` voted producers,
    /// `InsufficientProducer` when the pool is short. [H1, H2): nobody; CRC
    /// alone. Before H1: the origin signers.
    fn normal_arbitrators(
        &self,
        height: Height,
        count: usize,
        voted: &[Producer],
    ) -> Result<Vec<PublicKey>, EngineError> {
        if height >= self.params.public_dpos_height {
            if voted.len() < count {
                return Err(EngineError::InsufficientProducer { height });
            }
            return Ok(voted.iter().take(count).map(|p| p.node_key()).collect());
        }
        if height >= self.params.crc_only_dpos_height {
            return Ok(legacy::normal_arbiters_v1());
        }
        Ok(legacy::normal_arbiters_v0(&self.origin_arbiters))
    }

    fn candidate_arbitrators(
        &self,
        height: Height,
        start: usize,
        voted: &[Producer],
    ) -> Vec<PublicKey> {
        if height < self.params.public_dpos_height || voted.len() <= start {
            return Vec::new();
        }
        voted[start..]
            .iter()
            .take(self.params.candidate_arbiters)
            .map(|p| p.node_key())
            .collect()
    }

    fn update_next_owner_hashes(
        &self,
        state: &State,
        committee: &mut CommitteeState,
        height: Height,
    ) -> Result<(), EngineError> {
        let mut hashes = Vec::with_capacity(committee.next_arbitrators.len());
        for node_key in &committee.next_arbitrators {
            if self.crc_node_keys.contains(node_key) {
                hashes.push(standard_program_hash(node_key));
                continue;
            }
            let producer = state.get_producer(node_key).ok_or_else(|| {
                EngineError::ProducerNotFound {
                    height,
                    key: node_key.to_string(),
                }
            })?;
            hashes.push(standard_program_hash(&producer.owner_key()));
        }
        committee.next_owner_hashes = hashes;

        let mut candidate_hashes = Vec::with_capacity(committee.next_candidates.len());
        for node_key in &committee.next_candidates {
            if self.crc_node_keys.contains(node_key) {
                continue;
            }
            let producer = state.get_producer(node_key).ok_or_else(|| {
                EngineError::ProducerNotFound {
                    height,
                    key: node_key.to_string(),
                }
            })?;
            candidate_hashes.push(standard_program_hash(&producer.owner_key()));
        }
        committee.next_candidate_owner_hashes = candidate_hashes;
        Ok(())
    }

    fn change_current_arbitrators(&self, inner: &mut Inner) {
        let Inner { state, committee, .. } = &mut *inner;

        committee.current_arbitrators = committee.next_arbitrators.clone();
        committee.current_candidates = committee.next_candidates.clone();
        committee.current_owner_hashes = committee.next_owner_hashes.clone();
        committee.candidate_owner_hashes = committee.next_candidate_owner_hashes.clone();
        // Lexicographic order canonicalizes on-duty rotation across nodes.
        committee.current_arbitrators.sort();
        committee.duty_index = 0;

        // Freeze the vote weights the new round settles against.
        committee.owner_votes_in_round.clear();
        committee.total_votes_in_round = Fixed64::ZERO;
        let members: Vec<PublicKey> = committee
            .current_arbitrators
            .iter()
            .chain(committee.current_candidates.iter())
            .copied()
            .collect();
        for node_key in &members {
            if self.crc_node_keys.contains(node_key) {
                continue;
            }
            let Some(producer) = state.get_producer(node_key) else {
                warn!(node = %node_key, "round snapshot: producer disappeared, counting zero votes");
                continue;
            };
            let hash = standard_program_hash(&producer.owner_key());
            committee.owner_votes_in_round.insert(hash, producer.votes());
            committee.total_votes_in_round += producer.votes();
        }
        info!(
            arbiters = committee.current_arbitrators.len(),
            candidates = committee.current_candidates.len(),
            total_votes = %committee.total_votes_in_round,
            "committee changed"
        );
    }

    // ── reward ledger ─────────────────────────────────────────────────────

    fn accumulate_reward(&self, inner: &mut Inner, block: &Block) {
        if block.header.height <= self.params.public_dpos_height {
            return;
        }
        let committee = &mut inner.committee;
        let share = rewards::block_dpos_share(block, self.params.reward_per_block);
        committee.accumulative_reward += share;
        committee.arbiters_round_reward.clear();
        committee.final_round_change = Fixed64::ZERO;
    }

    fn clearing_dpos_reward(
        &self,
        inner: &mut Inner,
        block: &Block,
        smooth: bool,
    ) -> Result<(), EngineError> {
        let committee = &mut inner.committee;
        let height = block.header.height;
        if height == committee.clearing_height {
            return Ok(());
        }

        let mut share = rewards::block_dpos_share(block, self.params.reward_per_block);
        if height + 1 <= self.params.public_dpos_height {
            committee.accumulative_reward = share;
            return Ok(());
        }

        if smooth {
            committee.accumulative_reward += share;
            share = Fixed64::ZERO;
        }

        let ctx = RoundContext {
            current_owner_hashes: &committee.current_owner_hashes,
            candidate_owner_hashes: &committee.candidate_owner_hashes,
            owner_votes: &committee.owner_votes_in_round,
            total_votes: committee.total_votes_in_round,
            crc_hashes: &self.crc_program_hashes,
            crc_address: self.crc_address,
        };
        let (payouts, change) = rewards::distribute(committee.accumulative_reward, &ctx, height)?;
        info!(
            height,
            reward = %committee.accumulative_reward,
            change = %change,
            payees = payouts.len(),
            "dpos reward settled"
        );
        committee.arbiters_round_reward = payouts;
        committee.final_round_change = change;
        committee.accumulative_reward = share;
        committee.clearing_height = height;
        Ok(())
    }

    // ── special payloads and evidence ─────────────────────────────────────

    /// Applies a payload broadcast between blocks and forces a committee
    /// change. The evidence hash becomes expected-in-next-block; see
    /// [`check_dpos_illegal_tx`](Self::check_dpos_illegal_tx).
    pub fn process_special_payload(
        &self,
        payload: &TxPayload,
        height: Height,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        match payload {
            TxPayload::IllegalBlocks(p) => {
                inner.committee.illegal_payload_hashes.insert(p.hash());
            }
            TxPayload::IllegalProposals(p) => {
                inner.committee.illegal_payload_hashes.insert(p.hash());
            }
            TxPayload::InactiveArbitrators(p) => {
                if inner.state.data.special_tx_hashes.contains(&p.hash()) {
                    debug!(height, "duplicated inactive-arbitrators payload");
                    return Ok(());
                }
                inner.degradation.set_emergency(height);
            }
            _ => return Err(EngineError::InvalidSpecialPayload),
        }

        inner.state.process_special_payload(payload)?;
        let events = self.force_change_locked(&mut inner, height)?;
        drop(inner);

        self.emit(events);
        self.dump_info(height);
        Ok(())
    }

    /// Validates that `block` embeds a transaction for every evidence payload
    /// announced since the previous block.
    pub fn check_dpos_illegal_tx(&self, block: &Block) -> Result<(), EngineError> {
        let pending: Vec<Hash32> = {
            let inner = self.inner.lock();
            inner.committee.illegal_payload_hashes.iter().copied().collect()
        };
        if pending.is_empty() {
            return Ok(());
        }

        let embedded: BTreeSet<Hash32> = block
            .txs
            .iter()
            .filter_map(|tx| match &tx.payload {
                TxPayload::IllegalBlocks(p) => Some(p.hash()),
                TxPayload::IllegalProposals(p) => Some(p.hash()),
                _ => None,
            })
            .collect();

        for hash in pending {
            if !embedded.contains(&hash) {
                return Err(EngineError::ExpectedIllegalTxAbsent {
                    height: block.header.height,
                });
            }
        }
        Ok(())
    }

    /// Settles the pending reward and installs a freshly elected committee at
    /// `height`, outside the regular rotation schedule.
    pub fn force_change(&self, height: Height) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let events = self.force_change_locked(&mut inner, height)?;
        drop(inner);

        self.emit(events);
        self.dump_info(height);
        Ok(())
    }

    fn force_change_locked(
        &self,
        inner: &mut Inner,
        height: Height,
    ) -> Result<Vec<Event>, EngineError> {
        let block = (self.best_block)()?;
        self.clearing_dpos_reward(inner, &block, false)?;
        self.update_next_arbitrators(inner, height + 1)?;
        self.change_current_arbitrators(inner);
        Ok(vec![
            Event::PeersNeedReconnect(self.need_connect_locked(inner)),
            Event::CommitteeChanged { height },
        ])
    }

    // ── rollback ──────────────────────────────────────────────────────────

    /// Rewinds the engine to `height`. May cross at most one committee epoch
    /// in a single call; deeper reorgs must be replayed from a snapshot.
    pub fn rollback_to(&self, height: Height) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let tip = inner.state.height();
        if height > tip {
            return Err(EngineError::InvalidRollback {
                height,
                context: format!("tip is {tip}"),
            });
        }
        if height == tip {
            return Ok(());
        }

        inner.state.rollback_to(height)?;
        inner.degradation.rollback_to(height);

        let offset = (tip - height) as usize;
        let old_duty = inner.committee.duty_index;
        let events = if old_duty == 0 || old_duty < offset {
            // The rollback crossed the last committee change: re-elect from
            // the rewound registry, then place the duty pointer back inside
            // the previous epoch.
            let events = self.force_change_locked(&mut inner, height)?;
            let n = inner.committee.current_arbitrators.len();
            let new_duty = (n + inner.committee.duty_index) as i64 - offset as i64;
            if new_duty < 0 {
                return Err(EngineError::RollbackTooDeep { height });
            }
            inner.committee.duty_index = new_duty as usize;
            events
        } else {
            inner.committee.duty_index = old_duty - offset;
            Vec::new()
        };
        drop(inner);

        self.emit(events);
        Ok(())
    }

    /// Read-only registry snapshot as of `height`.
    pub fn snapshot_at(&self, height: Height) -> Result<StateData, EngineError> {
        self.inner.lock().state.snapshot_at(height)
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn get_arbitrators(&self) -> Vec<PublicKey> {
        self.inner.lock().committee.current_arbitrators.clone()
    }

    pub fn get_candidates(&self) -> Vec<PublicKey> {
        self.inner.lock().committee.current_candidates.clone()
    }

    pub fn get_next_arbitrators(&self) -> Vec<PublicKey> {
        self.inner.lock().committee.next_arbitrators.clone()
    }

    pub fn get_next_candidates(&self) -> Vec<PublicKey> {
        self.inner.lock().committee.next_candidates.clone()
    }

    pub fn get_crc_arbiters(&self) -> Vec<PublicKey> {
        self.crc_arbiters.clone()
    }

    pub fn is_crc_arbitrator(&self, pk: &PublicKey) -> bool {
        // CRC config is immutable after construction; no lock needed.
        self.crc_node_keys.contains(pk)
    }

    pub fn get_crc_producer(&self, pk: &PublicKey) -> Option<Producer> {
        self.crc_producers.get(pk).cloned()
    }

    pub fn is_arbitrator(&self, pk: &PublicKey) -> bool {
        self.inner.lock().committee.current_arbitrators.contains(pk)
    }

    pub fn is_active_producer(&self, pk: &PublicKey) -> bool {
        self.inner.lock().state.is_active_producer(pk)
    }

    pub fn is_disabled_producer(&self, pk: &PublicKey) -> bool {
        let inner = self.inner.lock();
        inner.state.is_inactive_producer(pk)
            || inner.state.is_illegal_producer(pk)
            || inner.state.is_canceled_producer(pk)
    }

    pub fn get_duty_index(&self) -> usize {
        self.inner.lock().committee.duty_index
    }

    pub fn get_duty_index_by_height(&self, height: Height) -> usize {
        let inner = self.inner.lock();
        let n = inner.committee.current_arbitrators.len();
        if n == 0 {
            return 0;
        }
        if height + 1 >= self.params.crc_only_dpos_height {
            inner.committee.duty_index % n
        } else {
            height as usize % n
        }
    }

    pub fn get_on_duty_arbitrator(&self) -> Option<PublicKey> {
        self.next_on_duty_arbitrator((self.best_height)() + 1, 0)
    }

    pub fn get_next_on_duty_arbitrator(&self, offset: u32) -> Option<PublicKey> {
        self.next_on_duty_arbitrator((self.best_height)() + 1, offset)
    }

    fn next_on_duty_arbitrator(&self, height: Height, offset: u32) -> Option<PublicKey> {
        if height >= self.params.crc_only_dpos_height {
            let inner = self.inner.lock();
            let arbiters = &inner.committee.current_arbitrators;
            if arbiters.is_empty() {
                return None;
            }
            let index = (inner.committee.duty_index + offset as usize) % arbiters.len();
            return Some(arbiters[index]);
        }
        legacy::on_duty_v0(height, offset, &self.origin_arbiters)
    }

    pub fn get_on_duty_cross_chain_arbitrator(&self) -> Option<PublicKey> {
        let height = (self.best_height)();
        if height + 1 < self.params.crc_only_dpos_height {
            return self.get_on_duty_arbitrator();
        }
        if self.crc_arbiters.is_empty() {
            return None;
        }
        // Sort a copy; the configured order stays observable elsewhere.
        let mut crc = self.crc_arbiters.clone();
        crc.sort();
        let index = (height + 1 - self.params.crc_only_dpos_height) as usize % crc.len();
        Some(crc[index])
    }

    pub fn get_cross_chain_arbiters(&self) -> Vec<PublicKey> {
        if (self.best_height)() + 1 < self.params.crc_only_dpos_height {
            return self.get_arbitrators();
        }
        self.get_crc_arbiters()
    }

    pub fn get_cross_chain_arbiters_count(&self) -> usize {
        if (self.best_height)() + 1 < self.params.crc_only_dpos_height {
            return self.origin_arbiters.len();
        }
        self.crc_arbiters.len()
    }

    pub fn get_cross_chain_arbiters_majority_count(&self) -> usize {
        self.get_cross_chain_arbiters_count() * 2 / 3
    }

    pub fn get_arbiters_count(&self) -> usize {
        self.inner.lock().committee.current_arbitrators.len()
    }

    pub fn get_arbiters_majority_count(&self) -> usize {
        self.get_arbiters_count() * 2 / 3
    }

    pub fn has_arbiters_majority_count(&self, num: usize) -> bool {
        num > self.get_arbiters_majority_count()
    }

    pub fn has_arbiters_minority_count(&self, num: usize) -> bool {
        let count = self.get_arbiters_count();
        num >= count - self.get_arbiters_majority_count()
    }

    pub fn get_arbiters_round_reward(&self) -> BTreeMap<ProgramHash, Fixed64> {
        self.inner.lock().committee.arbiters_round_reward.clone()
    }

    pub fn get_final_round_change(&self) -> Fixed64 {
        self.inner.lock().committee.final_round_change
    }

    /// Peers the host should hold connections to: CRC plus the current and
    /// next committees, deduplicated. Empty before the pre-connect window of
    /// H1 opens.
    pub fn get_need_connect_arbiters(&self) -> Vec<PublicKey> {
        self.need_connect_locked(&self.inner.lock())
    }

    fn need_connect_locked(&self, inner: &Inner) -> Vec<PublicKey> {
        let height = inner.state.height() + 1;
        let h1 = self.params.crc_only_dpos_height;
        if height < h1.saturating_sub(self.params.pre_connect_offset) {
            return Vec::new();
        }

        let mut peers: BTreeSet<PublicKey> = self.crc_node_keys.clone();
        peers.extend(inner.committee.current_arbitrators.iter().copied());
        peers.extend(inner.committee.next_arbitrators.iter().copied());
        peers.into_iter().collect()
    }

    /// Runs a read-only closure against the producer registry.
    pub fn with_state<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Logs the committee tables; chatty at change points, debug otherwise.
    pub fn dump_info(&self, height: Height) {
        let inner = self.inner.lock();
        let (change_type, _) = self.change_type(&inner, height);
        let committee = &inner.committee;

        let mut table = String::new();
        let on_duty = committee
            .current_arbitrators
            .get(committee.duty_index % committee.current_arbitrators.len().max(1))
            .copied();
        let _ = writeln!(table, "CURRENT ARBITERS (duty index {}):", committee.duty_index);
        for (i, pk) in committee.current_arbitrators.iter().enumerate() {
            let _ = writeln!(table, "  {:<3} {} onduty={}", i + 1, pk, Some(*pk) == on_duty);
        }
        let _ = writeln!(table, "NEXT ARBITERS:");
        for (i, pk) in committee.next_arbitrators.iter().enumerate() {
            let _ = writeln!(table, "  {:<3} {}", i + 1, pk);
        }
        let _ = writeln!(table, "CURRENT CANDIDATES:");
        for (i, pk) in committee.current_candidates.iter().enumerate() {
            let _ = writeln!(table, "  {:<3} {}", i + 1, pk);
        }
        let _ = writeln!(table, "NEXT CANDIDATES:");
        for (i, pk) in committee.next_candidates.iter().enumerate() {
            let _ = writeln!(table, "  {:<3} {}", i + 1, pk);
        }

        match change_type {
            ChangeType::None => debug!(height, "\n{table}"),
            _ => info!(height, "\n{table}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_is_floor_two_thirds() {
        for (n, expect) in [(1usize, 0usize), (2, 1), (3, 2), (4, 2), (5, 3), (12, 8), (36, 24)] {
            assert_eq!(n * 2 / 3, expect);
        }
    }
}
