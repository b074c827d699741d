//! Heartbeat and incident lifecycle against the Better Stack on-call service.
//!
//! [`BetterStack`] is a thin client over the REST API; [`AlertController`]
//! layers the idempotent list-or-create heartbeats, the hysteresis-gated
//! incidents and the retention cleanup on top of it.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod client;
mod controller;
mod error;
mod hysteresis;
mod types;

pub use client::{BetterStack, DEFAULT_BASE_URL, IncidentFilter};
pub use controller::{AlertController, AlertControllerOptions, DEFAULT_INCIDENT_RETENTION};
pub use error::{Error, Result};
pub use hysteresis::Hysteresis;
pub use types::{
    Heartbeat, HeartbeatAttributes, HeartbeatGroup, HeartbeatGroupAttributes, HeartbeatSettings,
    HeartbeatType, Incident, IncidentAttributes, IncidentCategory,
};
