use async_trait::async_trait;
use vigil_oncall::HeartbeatType;

/// A node whose liveness and sync status the monitor checks every cycle.
///
/// Both checks are side-effecting: they write gauges and send the matching
/// heartbeat when they pass.
#[async_trait]
pub trait ChainProbe
where
    Self: Send + Sync + 'static,
{
    /// Name used for metric labels and alert titles.
    fn name(&self) -> &str;

    /// Heartbeats the node reports, in creation order.
    fn heartbeats(&self) -> &'static [HeartbeatType];

    /// Whether the node answers its health check.
    async fn is_up(&self) -> bool;

    /// Whether the node keeps up with the chain tip.
    async fn is_synced(&self) -> bool;
}

/// Whether a node at height `node` trails `reference` by more than
/// `tolerance` blocks.
///
/// An unavailable reference never counts as behind, so a flaky public
/// endpoint cannot fail the check on its own.
#[must_use]
pub fn is_behind(node: u64, reference: Option<u64>, tolerance: u64) -> bool {
    reference.is_some_and(|reference| node < reference.saturating_sub(tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_bounds_the_lag() {
        assert!(is_behind(998, Some(1000), 1));
        assert!(!is_behind(998, Some(1000), 2));
        assert!(!is_behind(999, Some(1000), 1));
        assert!(!is_behind(1005, Some(1000), 0));
    }

    #[test]
    fn test_missing_reference_fails_open() {
        assert!(!is_behind(0, None, 0));
        assert!(!is_behind(998, None, 1));
    }

    #[test]
    fn test_reference_below_tolerance_never_behind() {
        assert!(!is_behind(0, Some(5), 10));
    }
}
