use std::fmt;

use serde::Deserialize;

/// Kind of heartbeat a node reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeartbeatType {
    /// The node answers its health check.
    Health,
    /// The node keeps up with the chain tip.
    SyncStatus,
    /// The node runs the network's majority software version.
    Version,
}

impl HeartbeatType {
    /// Returns the display name used in heartbeat titles.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::SyncStatus => "Sync Status",
            Self::Version => "Version",
        }
    }
}

impl fmt::Display for HeartbeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of incident a node can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IncidentCategory {
    /// The node process restarted.
    Restart,
    /// The validator's reputation fell below the floor.
    Reputation,
    /// The validator was penalized.
    Penalty,
}

impl IncidentCategory {
    /// Returns the display name used in incident titles.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Restart => "Restart",
            Self::Reputation => "Reputation",
            Self::Penalty => "Penalty",
        }
    }
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heartbeat resource of the on-call service.
#[derive(Clone, Debug, Deserialize)]
pub struct Heartbeat {
    /// Resource identifier
    pub id: String,

    /// Resource attributes
    pub attributes: HeartbeatAttributes,
}

/// Attributes of a [`Heartbeat`].
#[derive(Clone, Debug, Deserialize)]
pub struct HeartbeatAttributes {
    /// Title of the heartbeat
    pub name: String,

    /// URL to GET for a ping
    pub url: String,

    /// Expected ping interval in seconds
    #[serde(default)]
    pub period: Option<u64>,

    /// Grace period in seconds before an expired heartbeat alerts
    #[serde(default)]
    pub grace: Option<u64>,

    /// Current status as reported by the service
    #[serde(default)]
    pub status: Option<String>,
}

/// Heartbeat group resource of the on-call service.
#[derive(Clone, Debug, Deserialize)]
pub struct HeartbeatGroup {
    /// Resource identifier
    pub id: String,

    /// Resource attributes
    pub attributes: HeartbeatGroupAttributes,
}

/// Attributes of a [`HeartbeatGroup`].
#[derive(Clone, Debug, Deserialize)]
pub struct HeartbeatGroupAttributes {
    /// Title of the group
    pub name: String,
}

/// Incident resource of the on-call service.
#[derive(Clone, Debug, Deserialize)]
pub struct Incident {
    /// Resource identifier
    pub id: String,

    /// Resource attributes
    pub attributes: IncidentAttributes,
}

impl Incident {
    /// Whether the incident has been resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.attributes.resolved_at.is_some()
    }
}

/// Attributes of an [`Incident`].
#[derive(Clone, Debug, Deserialize)]
pub struct IncidentAttributes {
    /// Title of the incident
    pub name: String,

    /// Cause or summary text
    #[serde(default)]
    pub cause: Option<String>,

    /// RFC 3339 start timestamp
    #[serde(default)]
    pub started_at: String,

    /// RFC 3339 resolution timestamp, unset while open
    #[serde(default)]
    pub resolved_at: Option<String>,
}

/// Ping cadence of newly created heartbeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatSettings {
    /// Expected ping interval in seconds
    pub period: u64,

    /// Seconds after a missed ping before the service alerts
    pub grace: u64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            period: 60,
            grace: 300,
        }
    }
}

/// Envelope of every list endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub data: Vec<T>,

    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

/// Envelope of every single-resource response.
#[derive(Debug, Deserialize)]
pub(crate) struct Single<T> {
    pub data: T,
}
