use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use vigil_rpc::{Method, RetryingClient, StatusCode};

use crate::error::Result;
use crate::types::{Heartbeat, HeartbeatGroup, HeartbeatSettings, Incident, Page, Single};

/// Better Stack Uptime API root.
pub const DEFAULT_BASE_URL: &str = "https://uptime.betterstack.com/api/v2";

/// Page size requested for incident listings.
const INCIDENTS_PER_PAGE: usize = 50;

/// Criteria an incident must meet to be returned by a listing.
#[derive(Clone, Debug, Default)]
pub struct IncidentFilter {
    /// Exact title to match
    pub title: Option<String>,

    /// Required resolution state
    pub resolved: Option<bool>,
}

impl IncidentFilter {
    /// Matches every incident.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            title: None,
            resolved: None,
        }
    }

    /// Matches the unresolved incidents titled `title`.
    #[must_use]
    pub fn unresolved(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            resolved: Some(false),
        }
    }

    fn matches(&self, incident: &Incident) -> bool {
        let title_matches = self
            .title
            .as_ref()
            .is_none_or(|title| incident.attributes.name == *title);
        let resolved_matches = self
            .resolved
            .is_none_or(|resolved| incident.is_resolved() == resolved);

        title_matches && resolved_matches
    }
}

/// Client for the Better Stack Uptime REST API.
///
/// Every request goes through a [`RetryingClient`], so calls only return once
/// the service accepted them.
#[derive(Clone, Debug)]
pub struct BetterStack {
    base_url: String,
    requester_email: String,
    transport: RetryingClient,
}

impl BetterStack {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        base_url: &str,
        requester_email: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let transport = RetryingClient::new(api_key, timeout)?;

        Ok(Self::with_transport(transport, base_url, requester_email))
    }

    /// Creates a client on top of an existing transport.
    #[must_use]
    pub fn with_transport(transport: RetryingClient, base_url: &str, requester_email: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            requester_email: requester_email.to_string(),
            transport,
        }
    }

    /// Lists every heartbeat.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be decoded.
    pub async fn heartbeats(&self) -> Result<Vec<Heartbeat>> {
        self.list(self.url("heartbeats"), |_: &Heartbeat| true, false)
            .await
    }

    /// Finds the heartbeat titled `name`, stopping at the first page with a match.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be decoded.
    pub async fn find_heartbeat(&self, name: &str) -> Result<Option<Heartbeat>> {
        let heartbeats = self
            .list(
                self.url("heartbeats"),
                |heartbeat: &Heartbeat| heartbeat.attributes.name == name,
                true,
            )
            .await?;

        Ok(heartbeats.into_iter().next())
    }

    /// Creates a heartbeat inside the group `group_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn create_heartbeat(
        &self,
        name: &str,
        group_id: &str,
        settings: HeartbeatSettings,
    ) -> Result<Heartbeat> {
        let body = json!({
            "name": name,
            "period": settings.period,
            "grace": settings.grace,
            "heartbeat_group_id": group_id,
            "email": false,
            "push": true
        });

        let response = self
            .transport
            .send(Method::POST, &self.url("heartbeats"), Some(&body))
            .await?;

        Ok(serde_json::from_value::<Single<Heartbeat>>(response)?.data)
    }

    /// Deletes a heartbeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn delete_heartbeat(&self, id: &str) -> Result<()> {
        self.transport
            .send(Method::DELETE, &self.url(&format!("heartbeats/{id}")), None)
            .await?;

        Ok(())
    }

    /// Lists every heartbeat group.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be decoded.
    pub async fn heartbeat_groups(&self) -> Result<Vec<HeartbeatGroup>> {
        self.list(self.url("heartbeat-groups"), |_: &HeartbeatGroup| true, false)
            .await
    }

    /// Finds the heartbeat group titled `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be decoded.
    pub async fn find_heartbeat_group(&self, name: &str) -> Result<Option<HeartbeatGroup>> {
        let groups = self
            .list(
                self.url("heartbeat-groups"),
                |group: &HeartbeatGroup| group.attributes.name == name,
                true,
            )
            .await?;

        Ok(groups.into_iter().next())
    }

    /// Creates a heartbeat group.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn create_heartbeat_group(&self, name: &str) -> Result<HeartbeatGroup> {
        let body = json!({ "name": name });

        let response = self
            .transport
            .send(Method::POST, &self.url("heartbeat-groups"), Some(&body))
            .await?;

        Ok(serde_json::from_value::<Single<HeartbeatGroup>>(response)?.data)
    }

    /// Deletes a heartbeat group.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn delete_heartbeat_group(&self, id: &str) -> Result<()> {
        self.transport
            .send(
                Method::DELETE,
                &self.url(&format!("heartbeat-groups/{id}")),
                None,
            )
            .await?;

        Ok(())
    }

    /// Lists the incidents matching `filter`, oldest first.
    ///
    /// With `return_early` the listing stops at the first page that yields a
    /// match instead of walking every page.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be decoded.
    pub async fn incidents(&self, filter: &IncidentFilter, return_early: bool) -> Result<Vec<Incident>> {
        let first_page = self.url(&format!(
            "incidents?per_page={INCIDENTS_PER_PAGE}&from=1970-01-01&to={}",
            Utc::now().format("%Y-%m-%d")
        ));

        debug!(
            "listing incidents: title={:?}, resolved={:?}, return_early={}",
            filter.title, filter.resolved, return_early
        );

        let mut incidents: Vec<Incident> = self
            .list(
                first_page,
                |incident: &Incident| filter.matches(incident),
                return_early,
            )
            .await?;
        incidents.sort_by(|a, b| a.attributes.started_at.cmp(&b.attributes.started_at));

        Ok(incidents)
    }

    /// Opens an incident.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn create_incident(&self, name: &str, summary: &str) -> Result<Incident> {
        let body = json!({
            "requester_email": self.requester_email,
            "name": name,
            "summary": summary,
            "email": false,
            "push": true
        });

        let response = self
            .transport
            .send(Method::POST, &self.url("incidents"), Some(&body))
            .await?;

        Ok(serde_json::from_value::<Single<Incident>>(response)?.data)
    }

    /// Marks an incident resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn resolve_incident(&self, id: &str) -> Result<()> {
        debug!("resolving incident: {}", id);

        self.transport
            .send(
                Method::POST,
                &self.url(&format!("incidents/{id}/resolve")),
                None,
            )
            .await?;

        Ok(())
    }

    /// Deletes an incident.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be decoded.
    pub async fn delete_incident(&self, id: &str) -> Result<()> {
        debug!("deleting incident: {}", id);

        self.transport
            .send(Method::DELETE, &self.url(&format!("incidents/{id}")), None)
            .await?;

        Ok(())
    }

    /// Pings a heartbeat URL once.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    pub async fn ping(&self, url: &str) -> Result<StatusCode> {
        Ok(self.transport.get_once(url).await?)
    }

    /// Walks a paginated listing, collecting the items accepted by `matches`.
    async fn list<T, F>(&self, first_page: String, matches: F, return_early: bool) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut items = Vec::new();
        let mut next_page = Some(first_page);

        while let Some(url) = next_page.take() {
            let response = self.transport.send(Method::GET, &url, None).await?;
            let page: Page<T> = serde_json::from_value(response)?;

            items.extend(page.data.into_iter().filter(|item| matches(item)));

            if return_early && !items.is_empty() {
                break;
            }
            next_page = page.pagination.next;
        }

        Ok(items)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}
