//! Liveness and sync probes for the chain nodes a validator operates.
//!
//! Every node is a [`ChainProbe`]. [`RpcNode`] covers the generic JSON-RPC
//! chains, parameterised by a [`ChainFamily`] dialect and a sync tolerance.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod chain;
mod error;
mod family;
mod node;
mod probe;

pub use chain::Chain;
pub use error::{Error, Result};
pub use family::{ChainFamily, SyncState};
pub use node::{RpcNode, RpcNodeOptions};
pub use probe::{ChainProbe, is_behind};
