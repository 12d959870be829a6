//! Degradation controller: tracks how healthy the producer pool is and
//! whether committee election may run at full strength.
//!
//! Normal:       elected producers fill the committee as usual.
//! Understaffed: too few voted producers to elect a full committee; the
//!               CRC arbiters carry the chain until the pool recovers.
//! Emergency:    the network accepted an inactive-arbitrators accusation;
//!               election is suspended for a fixed number of blocks.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::Height;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationState {
    Normal,
    Understaffed,
    Emergency,
}

#[derive(Clone, Debug)]
pub struct Degradation {
    state: DegradationState,
    understaffed_since: Height,
    emergency_since: Height,
}

impl Degradation {
    pub fn new() -> Self {
        Self {
            state: DegradationState::Normal,
            understaffed_since: 0,
            emergency_since: 0,
        }
    }

    pub fn state(&self) -> DegradationState {
        self.state
    }

    pub fn is_understaffed(&self) -> bool {
        self.state == DegradationState::Understaffed
    }

    pub fn is_emergency(&self) -> bool {
        self.state == DegradationState::Emergency
    }

    /// Called when committee selection comes up short. Emergency outranks
    /// understaffed and is left through its own timer.
    pub fn try_set_understaffed(&mut self, height: Height) {
        if self.state == DegradationState::Normal {
            warn!(height, "producer pool understaffed, degrading to CRC-only committee");
            self.state = DegradationState::Understaffed;
            self.understaffed_since = height;
        }
    }

    /// Leaves understaffed mode once the caller has verified the pool
    /// recovered.
    pub fn try_leave_understaffed(&mut self, recovered: bool) {
        if self.state == DegradationState::Understaffed && recovered {
            info!(since = self.understaffed_since, "leaving understaffed mode");
            self.state = DegradationState::Normal;
            self.understaffed_since = 0;
        }
    }

    /// Enters emergency mode when an inactive-arbitrators payload is
    /// accepted.
    pub fn set_emergency(&mut self, height: Height) {
        warn!(height, "inactive arbitrators accepted, entering emergency mode");
        self.state = DegradationState::Emergency;
        self.emergency_since = height;
    }

    /// True once the emergency window has fully elapsed at `height`.
    pub fn emergency_elapsed(&self, height: Height, emergency_duration: Height) -> bool {
        self.state == DegradationState::Emergency
            && height >= self.emergency_since + emergency_duration
    }

    pub fn leave_emergency(&mut self) {
        if self.state == DegradationState::Emergency {
            info!(since = self.emergency_since, "leaving emergency mode");
            self.state = DegradationState::Normal;
            self.emergency_since = 0;
        }
    }

    /// Rewinds mode flips that happened above `height`.
    pub fn rollback_to(&mut self, height: Height) {
        match self.state {
            DegradationState::Understaffed if self.understaffed_since > height => {
                self.state = DegradationState::Normal;
                self.understaffed_since = 0;
            }
            DegradationState::Emergency if self.emergency_since > height => {
                self.state = DegradationState::Normal;
                self.emergency_since = 0;
            }
            _ => {}
        }
    }
}

impl Default for Degradation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn understaffed_round_trip() {
        let mut d = Degradation::new();
        assert_eq!(d.state(), DegradationState::Normal);

        d.try_set_understaffed(10);
        assert!(d.is_understaffed());

        d.try_leave_understaffed(false);
        assert!(d.is_understaffed());
        d.try_leave_understaffed(true);
        assert_eq!(d.state(), DegradationState::Normal);
    }

    #[test]
    fn emergency_outranks_understaffed() {
        let mut d = Degradation::new();
        d.set_emergency(20);
        d.try_set_understaffed(21);
        assert!(d.is_emergency());
    }

    #[test]
    fn emergency_window() {
        let mut d = Degradation::new();
        d.set_emergency(100);
        assert!(!d.emergency_elapsed(150, 100));
        assert!(d.emergency_elapsed(200, 100));
        d.leave_emergency();
        assert_eq!(d.state(), DegradationState::Normal);
    }

    #[test]
    fn rollback_reverts_recent_flips() {
        let mut d = Degradation::new();
        d.try_set_understaffed(50);
        d.rollback_to(49);
        assert_eq!(d.state(), DegradationState::Normal);

        d.set_emergency(80);
        d.rollback_to(80);
        assert!(d.is_emergency());
        d.rollback_to(79);
        assert_eq!(d.state(), DegradationState::Normal);
    }
}
