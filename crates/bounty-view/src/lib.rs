//! Bountyboard View: the merged, incrementally refreshed bounty list
//!
//! [`BountyAggregator`] owns the board view and implements
//! [`bounty_core::BoardObserver`] so writers can tell it what changed.
//! [`MyBounties`] projects the connected creator's slice of it.

pub mod aggregator;
pub mod projection;

pub use aggregator::{BoardStats, BountyAggregator};
pub use projection::{compute_stats, filter_by_creator, BountyDetail, MyBounties, MyBountyStats};
