//! Bounded journal of reversible state mutations, keyed by block height.
//!
//! Every mutation of the producer registry is expressed as an
//! (execute, rollback) closure pair. Handlers stage pairs while a block is
//! being interpreted; `commit` runs the staged executes and seals them into a
//! frame for that height. `rollback_to` pops frames in reverse insertion
//! order, running the rollbacks. Frames beyond the configured capacity are
//! pruned from the tail; seeking past the pruned horizon fails with
//! `OverflowHorizon`.
//!
//! The closures capture owned values only and operate on any `StateData`, so
//! an undo replay into a clone yields a read-only snapshot of an earlier
//! height without disturbing the live journal.

use std::collections::VecDeque;

use crate::error::EngineError;
use crate::state::StateData;
use crate::types::Height;

pub type Mutation = Box<dyn Fn(&mut StateData) + Send + Sync>;

struct Change {
    execute: Mutation,
    rollback: Mutation,
}

struct HeightFrame {
    height: Height,
    changes: Vec<Change>,
}

pub struct ChangeLog {
    height: Height,
    frames: VecDeque<HeightFrame>,
    staged: Vec<Change>,
    capacity: usize,
}

impl ChangeLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            height: 0,
            frames: VecDeque::new(),
            staged: Vec::new(),
            capacity,
        }
    }

    /// Height of the most recently committed frame.
    pub fn height(&self) -> Height {
        self.height
    }

    /// Lowest height a rollback or seek may target. The journal refuses to
    /// unwind its oldest retained frame, so this is one above the start of
    /// the retained window.
    pub fn oldest_reachable(&self) -> Height {
        (self.height as i64 - self.frames.len() as i64 + 1).max(0) as Height
    }

    /// Stages a reversible mutation for the frame currently being built.
    pub fn append(&mut self, execute: Mutation, rollback: Mutation) {
        self.staged.push(Change { execute, rollback });
    }

    /// Drops everything staged since the last commit. Called when a handler
    /// fails mid-block so no partial mutation escapes.
    pub fn discard(&mut self) {
        self.staged.clear();
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Executes the staged mutations against `data` and seals them as the
    /// frame for `height`. An empty frame still advances the tip, so every
    /// processed block costs exactly one rollback step.
    pub fn commit(&mut self, height: Height, data: &mut StateData) {
        let changes = std::mem::take(&mut self.staged);
        for change in &changes {
            (change.execute)(data);
        }
        self.frames.push_back(HeightFrame { height, changes });
        self.height = height;

        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    /// Undoes all frames above `height`, in reverse insertion order.
    pub fn rollback_to(&mut self, height: Height, data: &mut StateData) -> Result<(), EngineError> {
        if height > self.height {
            return Err(EngineError::InvalidRollback {
                height,
                context: format!("tip is {}", self.height),
            });
        }
        if height == self.height {
            return Ok(());
        }
        if height < self.oldest_reachable() {
            return Err(EngineError::OverflowHorizon {
                height,
                oldest: self.oldest_reachable(),
            });
        }

        while self.frames.back().map_or(false, |f| f.height > height) {
            if let Some(frame) = self.frames.pop_back() {
                for change in frame.changes.iter().rev() {
                    (change.rollback)(data);
                }
            }
        }
        self.height = height;
        Ok(())
    }

    /// Undoes frames at `height` and above without a horizon check.
    ///
    /// Used when a block arrives for a height that already carries a
    /// provisional frame (a special payload committed between blocks): the
    /// provisional effects are discarded before the block's own transactions
    /// are interpreted, so evidence the block does not embed evaporates.
    pub fn rollback_provisional(&mut self, height: Height, data: &mut StateData) {
        if self.height < height {
            return;
        }
        while self.frames.back().map_or(false, |f| f.height >= height) {
            if let Some(frame) = self.frames.pop_back() {
                for change in frame.changes.iter().rev() {
                    (change.rollback)(data);
                }
            }
        }
        self.height = height.saturating_sub(1);
    }

    /// Replays undo closures into `data` (a clone of the live state) until it
    /// reflects `height`, without touching the retained frames.
    pub fn replay_undo_into(
        &self,
        height: Height,
        data: &mut StateData,
    ) -> Result<(), EngineError> {
        if height > self.height {
            return Err(EngineError::InvalidRollback {
                height,
                context: format!("tip is {}", self.height),
            });
        }
        if height < self.height && height < self.oldest_reachable() {
            return Err(EngineError::OverflowHorizon {
                height,
                oldest: self.oldest_reachable(),
            });
        }

        for frame in self.frames.iter().rev() {
            if frame.height <= height {
                break;
            }
            for change in frame.changes.iter().rev() {
                (change.rollback)(data);
            }
        }
        Ok(())
    }
}
