use std::collections::HashMap;
use std::fmt::Display;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::{BetterStack, IncidentFilter};
use crate::error::Result;
use crate::hysteresis::Hysteresis;
use crate::types::{Heartbeat, HeartbeatSettings, HeartbeatType, IncidentCategory};

/// Number of incidents the periodic cleanup keeps.
pub const DEFAULT_INCIDENT_RETENTION: usize = 100;

/// Options for configuring an [`AlertController`].
#[derive(Clone, Debug)]
pub struct AlertControllerOptions {
    /// Address of the monitored validator; its last four characters tag every
    /// heartbeat and incident title.
    pub node_address: String,

    /// Cadence of newly created heartbeats.
    pub heartbeat_settings: HeartbeatSettings,

    /// Re-triggering rules.
    pub hysteresis: Hysteresis,
}

/// Owns the heartbeat and incident lifecycle against the on-call service.
///
/// Without a client (non-production) every operation is a no-op.
pub struct AlertController {
    client: Option<BetterStack>,
    heartbeat_settings: HeartbeatSettings,
    hysteresis: Hysteresis,
    suffix: String,
    /// Value that triggered the last incident, by incident title.
    thresholds: Mutex<HashMap<String, f64>>,
}

impl AlertController {
    /// Creates a controller that talks to the on-call service.
    #[must_use]
    pub fn new(client: BetterStack, options: AlertControllerOptions) -> Self {
        Self::build(Some(client), options)
    }

    /// Creates a controller whose operations are all no-ops.
    #[must_use]
    pub fn disabled(options: AlertControllerOptions) -> Self {
        Self::build(None, options)
    }

    fn build(client: Option<BetterStack>, options: AlertControllerOptions) -> Self {
        let chars = options.node_address.chars().collect::<Vec<_>>();
        let suffix = chars[chars.len().saturating_sub(4)..].iter().collect();

        Self {
            client,
            heartbeat_settings: options.heartbeat_settings,
            hysteresis: options.hysteresis,
            suffix,
            thresholds: Mutex::new(HashMap::new()),
        }
    }

    /// Whether calls reach the on-call service.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Title of the heartbeat or incident `label` of node `name`.
    #[must_use]
    pub fn identity(&self, name: &str, label: impl Display) -> String {
        format!("{} {} ({})", name, label, self.suffix)
    }

    /// Title of the heartbeat group of node `name`.
    #[must_use]
    pub fn group_identity(&self, name: &str) -> String {
        format!("{} ({})", name, self.suffix)
    }

    /// Creates the missing heartbeats of a node, in the given order.
    pub async fn init_heartbeats(&self, name: &str, types: &[HeartbeatType]) {
        let Some(client) = &self.client else {
            return;
        };

        let existing = match client.heartbeats().await {
            Ok(heartbeats) => heartbeats,
            Err(e) => {
                error!("failed to list heartbeats: {}", e);
                return;
            }
        };

        for kind in types {
            let identity = self.identity(name, kind);

            if existing
                .iter()
                .any(|heartbeat| heartbeat.attributes.name == identity)
            {
                debug!("heartbeat already created: '{}'", identity);
                continue;
            }

            if let Err(e) = self.create_heartbeat(client, name, &identity).await {
                error!("failed to create heartbeat '{}': {}", identity, e);
            }
        }
    }

    /// Looks up the heartbeat of a node, creating it (and its group) if absent.
    ///
    /// Returns `None` when alerting is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if an on-call response cannot be decoded.
    pub async fn ensure_heartbeat(&self, name: &str, kind: HeartbeatType) -> Result<Option<Heartbeat>> {
        let Some(client) = &self.client else {
            return Ok(None);
        };

        let identity = self.identity(name, kind);

        if let Some(heartbeat) = client.find_heartbeat(&identity).await? {
            return Ok(Some(heartbeat));
        }

        Ok(Some(self.create_heartbeat(client, name, &identity).await?))
    }

    /// Pings the heartbeat of a node. Failures are logged only: a missed ping
    /// surfaces on the on-call side once the heartbeat expires.
    pub async fn send_heartbeat(&self, name: &str, kind: HeartbeatType) {
        let Some(client) = &self.client else {
            return;
        };

        let heartbeat = match self.ensure_heartbeat(name, kind).await {
            Ok(Some(heartbeat)) => heartbeat,
            Ok(None) => return,
            Err(e) => {
                error!("failed to look up heartbeat '{}': {}", self.identity(name, kind), e);
                return;
            }
        };

        match client.ping(&heartbeat.attributes.url).await {
            Ok(status) if status.is_success() => {
                info!("Heartbeat:{} ❤️", heartbeat.attributes.name);
            }
            Ok(status) => {
                error!(
                    "heartbeat '{}': HTTP status code: {}",
                    heartbeat.attributes.name, status
                );
            }
            Err(e) => error!("heartbeat '{}': {}", heartbeat.attributes.name, e),
        }
    }

    /// Opens an incident if `value` passes the hysteresis rule for `category`.
    ///
    /// Returns whether an incident was created. The trigger value is only
    /// remembered when one was.
    pub async fn raise(
        &self,
        name: &str,
        category: IncidentCategory,
        value: f64,
        summary: &str,
    ) -> bool {
        let Some(client) = &self.client else {
            debug!("alerting disabled, not raising {} incident: {}", category, summary);
            return false;
        };

        let identity = self.identity(name, category);
        let previous = self.thresholds.lock().get(&identity).copied();

        if !self.hysteresis.should_trigger(category, value, previous) {
            debug!(
                "'{}' not re-triggered: value = {}, previous trigger = {:?}",
                identity, value, previous
            );
            return false;
        }

        match client.create_incident(&identity, summary).await {
            Ok(incident) => {
                warn!("opened incident '{}' ({}): {}", identity, incident.id, summary);
                self.thresholds.lock().insert(identity, value);
                true
            }
            Err(e) => {
                error!("failed to open incident '{}': {}", identity, e);
                false
            }
        }
    }

    /// Resolves every open incident of `category` for node `name`.
    ///
    /// Returns the number of incidents resolved; zero when none was open.
    pub async fn resolve(&self, name: &str, category: IncidentCategory) -> usize {
        let Some(client) = &self.client else {
            return 0;
        };

        let identity = self.identity(name, category);
        let incidents = match client
            .incidents(&IncidentFilter::unresolved(identity.as_str()), false)
            .await
        {
            Ok(incidents) => incidents,
            Err(e) => {
                error!("failed to list incidents '{}': {}", identity, e);
                return 0;
            }
        };

        let mut resolved = 0;
        for incident in incidents {
            match client.resolve_incident(&incident.id).await {
                Ok(()) => resolved += 1,
                Err(e) => error!("failed to resolve incident {}: {}", incident.id, e),
            }
        }

        if resolved > 0 {
            info!("resolved {} incident(s) '{}'", resolved, identity);
        }

        resolved
    }

    /// Deletes every incident except the `keep` most recent ones.
    ///
    /// Returns the number of incidents deleted.
    pub async fn cleanup(&self, keep: usize) -> usize {
        let Some(client) = &self.client else {
            return 0;
        };

        let incidents = match client.incidents(&IncidentFilter::any(), false).await {
            Ok(incidents) => incidents,
            Err(e) => {
                error!("failed to list incidents for cleanup: {}", e);
                return 0;
            }
        };

        // Oldest first, so everything before the last `keep` goes.
        let stale = incidents.len().saturating_sub(keep);

        let mut deleted = 0;
        for incident in &incidents[..stale] {
            match client.delete_incident(&incident.id).await {
                Ok(()) => deleted += 1,
                Err(e) => error!("failed to delete incident {}: {}", incident.id, e),
            }
        }

        if deleted > 0 {
            info!("cleaned up {} incidents", deleted);
        }

        deleted
    }

    /// Deletes every heartbeat, heartbeat group and incident of the account.
    ///
    /// # Errors
    ///
    /// Returns an error if an on-call response cannot be decoded.
    pub async fn purge(&self) -> Result<()> {
        let Some(client) = &self.client else {
            warn!("alerting disabled, nothing to purge");
            return Ok(());
        };

        for heartbeat in client.heartbeats().await? {
            info!("deleting heartbeat: '{}'", heartbeat.attributes.name);
            client.delete_heartbeat(&heartbeat.id).await?;
        }

        for group in client.heartbeat_groups().await? {
            info!("deleting heartbeat group: '{}'", group.attributes.name);
            client.delete_heartbeat_group(&group.id).await?;
        }

        for incident in client.incidents(&IncidentFilter::any(), false).await? {
            client.delete_incident(&incident.id).await?;
        }

        Ok(())
    }

    async fn create_heartbeat(
        &self,
        client: &BetterStack,
        name: &str,
        identity: &str,
    ) -> Result<Heartbeat> {
        let group_identity = self.group_identity(name);

        let group = match client.find_heartbeat_group(&group_identity).await? {
            Some(group) => group,
            None => {
                info!("creating new heartbeat group: '{}'", group_identity);
                client.create_heartbeat_group(&group_identity).await?
            }
        };

        info!("creating new heartbeat: '{}'", identity);
        client
            .create_heartbeat(identity, &group.id, self.heartbeat_settings)
            .await
    }
}
