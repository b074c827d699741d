//! Validator statistics for a Chainflip validator.
//!
//! [`ValidatorMonitor`] pulls version, state, bond, reputation, penalties and
//! witnessed chain heights from the Chainflip GraphQL indexers and the
//! validator's own node, publishes them as gauges and raises incidents.
//! [`ValidatorNode`] probes the validator's State Chain node.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod amount;
mod error;
mod monitor;
mod node;
pub mod queries;
mod stats;

pub use amount::{format_thousands, to_tokens};
pub use error::{Error, Result};
pub use monitor::{
    DEFAULT_CACHE_URL, DEFAULT_PROCESSOR_URL, DEFAULT_REPUTATION_FLOOR, ValidatorMonitor,
    ValidatorMonitorOptions,
};
pub use node::{VALIDATOR_CHAIN, ValidatorNode, ValidatorNodeOptions};
pub use stats::{
    INITIAL_LOOKBACK_BLOCKS, OBSERVATION_WINDOW_BLOCKS, PenaltyWindow, ReputationDistribution,
    latest_observations, majority_version, median, penalties_by_reason, tracked_chain,
};
