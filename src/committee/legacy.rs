//! Versioned alternatives of committee selection and duty rotation kept for
//! replay of pre-checkpoint history. These are not a separate layer: the
//! committee manager picks the variant matching the height being processed.
//!
//! v0 covers [0, H1): the fixed origin signers take turns by height.
//! v1 covers [H1, H2): only the CRC arbiters sign, so the elected slate is
//! empty.

use crate::crypto::PublicKey;
use crate::types::Height;

/// Duty rotation before H1: index straight off the height, no duty pointer.
pub fn on_duty_v0(height: Height, offset: u32, arbiters: &[PublicKey]) -> Option<PublicKey> {
    if arbiters.is_empty() {
        return None;
    }
    let index = (height as usize + offset as usize) % arbiters.len();
    Some(arbiters[index])
}

/// Elected slate before H1: the origin signers verbatim.
pub fn normal_arbiters_v0(origin_arbiters: &[PublicKey]) -> Vec<PublicKey> {
    origin_arbiters.to_vec()
}

/// Elected slate in [H1, H2): nobody; the CRC arbiters alone carry the
/// committee.
pub fn normal_arbiters_v1() -> Vec<PublicKey> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: u8) -> Vec<PublicKey> {
        (0..n).map(|i| PublicKey([i; 33])).collect()
    }

    #[test]
    fn v0_duty_cycles_by_height() {
        let arbiters = keys(3);
        assert_eq!(on_duty_v0(0, 0, &arbiters), Some(arbiters[0]));
        assert_eq!(on_duty_v0(1, 0, &arbiters), Some(arbiters[1]));
        assert_eq!(on_duty_v0(2, 0, &arbiters), Some(arbiters[2]));
        assert_eq!(on_duty_v0(3, 0, &arbiters), Some(arbiters[0]));
        assert_eq!(on_duty_v0(1, 2, &arbiters), Some(arbiters[0]));
    }

    #[test]
    fn v0_duty_empty_set() {
        assert_eq!(on_duty_v0(5, 0, &[]), None);
    }

    #[test]
    fn v1_slate_is_empty() {
        assert!(normal_arbiters_v1().is_empty());
    }
}
