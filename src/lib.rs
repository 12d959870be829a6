//! Deterministic DPoS arbitrator state engine.
//!
//! Driven by the chain's linear block stream, the engine maintains the set of
//! registered producers and their lifecycle, the rotating committee of
//! block-signing arbitrators, the per-round DPoS reward ledger, and a change
//! journal that makes the whole projection rollback-safe across reorgs.
//! Blocks are assumed to be already validated; the engine only interprets
//! their effect on committee state. Byte-identical determinism across nodes
//! is the correctness bar: identical config plus an identical block stream
//! must yield identical answers from every query.

pub mod committee;
pub mod config;
pub mod countdown;
pub mod crypto;
pub mod error;
pub mod events;
pub mod state;
pub mod types;

pub use committee::Arbitrators;
pub use config::ChainParams;
pub use countdown::ViewChangeCountdown;
pub use error::EngineError;
pub use events::{Event, Notifier};
pub use state::{Producer, ProducerStatus, State};
