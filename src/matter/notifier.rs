//! Cluster change notifier for live Matter subscription updates.
//!
//! When the vent reports a new position, subscribed controllers must learn
//! about it without polling. The attribute store signals every notifier
//! watching the changed cluster.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use super::ids::EndpointId;

/// Wakes whoever watches one cluster on one endpoint.
///
/// Cloning shares the underlying signal, so the store keeps one clone and the
/// watcher awaits the other.
#[derive(Clone)]
pub struct ClusterNotifier {
    signal: Arc<Signal<CriticalSectionRawMutex, ()>>,
    endpoint_id: EndpointId,
    cluster_id: u32,
}

impl ClusterNotifier {
    pub fn new(endpoint_id: EndpointId, cluster_id: u32) -> Self {
        Self {
            signal: Arc::new(Signal::new()),
            endpoint_id,
            cluster_id,
        }
    }

    /// Get the endpoint ID this notifier is configured for.
    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint_id
    }

    /// Get the cluster ID this notifier is configured for.
    pub fn cluster_id(&self) -> u32 {
        self.cluster_id
    }

    pub fn matches(&self, endpoint_id: EndpointId, cluster_id: u32) -> bool {
        self.endpoint_id == endpoint_id && self.cluster_id == cluster_id
    }

    /// Notify that this cluster's data changed. Non-blocking.
    pub fn notify(&self) {
        self.signal.signal(());
    }

    /// Wait for the next change notification.
    pub async fn changed(&self) {
        self.signal.wait().await
    }

    #[cfg(test)]
    pub(crate) fn take_pending(&self) -> bool {
        self.signal.try_take().is_some()
    }
}
