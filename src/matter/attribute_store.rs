//! Attribute store shared by the bridge and the Matter cluster handlers.
//!
//! Holds the current value of every attribute the vent exposes, keyed by
//! endpoint / cluster / attribute. Each cluster carries a version counter that
//! cluster handlers compare against to bump their `Dataver`, and any
//! [`ClusterNotifier`] watching the cluster is signalled on change.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;

use super::ids::{
    BasicInformationAttribute, ClusterId, EndpointId, IdentifyAttribute, WindowCoveringAttribute,
};
use super::notifier::ClusterNotifier;

/// A value held in the attribute store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    U8(u8),
    U16(u16),
    /// Nullable 8-bit value (`None` = null)
    NullableU8(Option<u8>),
    /// Nullable 16-bit value (`None` = null)
    NullableU16(Option<u16>),
    CharString(String),
}

impl AttrValue {
    /// The raw 16-bit payload, if the value is a non-null 16-bit integer.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            AttrValue::U16(v) | AttrValue::NullableU16(Some(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            AttrValue::U8(v) | AttrValue::NullableU8(Some(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::CharString(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::NullableU8(None) | AttrValue::NullableU16(None))
    }

    fn same_type(&self, other: &AttrValue) -> bool {
        use AttrValue::*;
        matches!(
            (self, other),
            (U8(_), U8(_))
                | (U16(_), U16(_))
                | (NullableU8(_), NullableU8(_))
                | (NullableU16(_), NullableU16(_))
                | (CharString(_), CharString(_))
        )
    }
}

/// Fully qualified attribute path.
///
/// Cluster and attribute ids stay raw so that paths for clusters the bridge
/// does not model can still be routed and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub endpoint_id: EndpointId,
    pub cluster_id: u32,
    pub attribute_id: u32,
}

impl AttributePath {
    pub const fn new(endpoint_id: EndpointId, cluster_id: u32, attribute_id: u32) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            attribute_id,
        }
    }

    pub const fn window_covering(endpoint_id: EndpointId, attr: WindowCoveringAttribute) -> Self {
        Self::new(endpoint_id, ClusterId::WindowCovering as u32, attr as u32)
    }

    pub const fn basic_information(
        endpoint_id: EndpointId,
        attr: BasicInformationAttribute,
    ) -> Self {
        Self::new(endpoint_id, ClusterId::BasicInformation as u32, attr as u32)
    }

    pub const fn identify(endpoint_id: EndpointId, attr: IdentifyAttribute) -> Self {
        Self::new(endpoint_id, ClusterId::Identify as u32, attr as u32)
    }

    pub fn cluster(&self) -> Option<ClusterId> {
        ClusterId::from_repr(self.cluster_id)
    }
}

/// Attribute store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("cluster {cluster_id:#06x} is not present on endpoint {endpoint_id}")]
    UnsupportedCluster {
        endpoint_id: EndpointId,
        cluster_id: u32,
    },

    #[error("value type does not match attribute {attribute_id:#06x}")]
    TypeMismatch { attribute_id: u32 },
}

/// Thread-safe attribute storage.
#[derive(Default)]
pub struct AttributeStore {
    clusters: RwLock<HashSet<(EndpointId, u32)>>,
    values: RwLock<HashMap<AttributePath, AttrValue>>,
    versions: RwLock<HashMap<(EndpointId, u32), u32>>,
    watchers: RwLock<Vec<ClusterNotifier>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a cluster as present on an endpoint.
    pub fn declare_cluster(&self, endpoint_id: EndpointId, cluster_id: u32) {
        self.clusters.write().insert((endpoint_id, cluster_id));
    }

    pub fn has_cluster(&self, endpoint_id: EndpointId, cluster_id: u32) -> bool {
        self.clusters.read().contains(&(endpoint_id, cluster_id))
    }

    /// Seed an attribute with its initial value without notifying watchers.
    pub fn init_value(&self, path: AttributePath, value: AttrValue) -> Result<(), StoreError> {
        self.check_cluster(&path)?;
        self.values.write().insert(path, value);
        Ok(())
    }

    /// Write an attribute. Bumps the cluster version and notifies watchers
    /// only when the stored value actually changes.
    pub fn set(&self, path: AttributePath, value: AttrValue) -> Result<(), StoreError> {
        self.check_cluster(&path)?;

        {
            let mut values = self.values.write();
            if let Some(existing) = values.get(&path) {
                if !existing.same_type(&value) {
                    return Err(StoreError::TypeMismatch {
                        attribute_id: path.attribute_id,
                    });
                }
                if *existing == value {
                    return Ok(());
                }
            }
            values.insert(path, value);
        }

        *self
            .versions
            .write()
            .entry((path.endpoint_id, path.cluster_id))
            .or_insert(0) += 1;

        for watcher in self.watchers.read().iter() {
            if watcher.matches(path.endpoint_id, path.cluster_id) {
                watcher.notify();
            }
        }
        Ok(())
    }

    pub fn get(&self, path: &AttributePath) -> Option<AttrValue> {
        self.values.read().get(path).cloned()
    }

    /// Change counter of one cluster instance (0 until its first change).
    pub fn cluster_version(&self, endpoint_id: EndpointId, cluster_id: u32) -> u32 {
        self.versions
            .read()
            .get(&(endpoint_id, cluster_id))
            .copied()
            .unwrap_or(0)
    }

    /// Register a watcher for changes to one cluster instance.
    pub fn watch(&self, endpoint_id: EndpointId, cluster_id: u32) -> ClusterNotifier {
        let notifier = ClusterNotifier::new(endpoint_id, cluster_id);
        self.watchers.write().push(notifier.clone());
        notifier
    }

    fn check_cluster(&self, path: &AttributePath) -> Result<(), StoreError> {
        if self.has_cluster(path.endpoint_id, path.cluster_id) {
            Ok(())
        } else {
            Err(StoreError::UnsupportedCluster {
                endpoint_id: path.endpoint_id,
                cluster_id: path.cluster_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WC: u32 = ClusterId::WindowCovering as u32;

    fn store_with_window_covering() -> AttributeStore {
        let store = AttributeStore::new();
        store.declare_cluster(1, WC);
        store
            .init_value(
                AttributePath::window_covering(
                    1,
                    WindowCoveringAttribute::CurrentPositionLiftPercent100ths,
                ),
                AttrValue::NullableU16(None),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_set_and_get() {
        let store = store_with_window_covering();
        let path = AttributePath::window_covering(
            1,
            WindowCoveringAttribute::CurrentPositionLiftPercent100ths,
        );
        assert!(store.get(&path).unwrap().is_null());

        store.set(path, AttrValue::NullableU16(Some(2500))).unwrap();
        assert_eq!(store.get(&path).unwrap().as_u16(), Some(2500));
    }

    #[test]
    fn test_missing_cluster_rejected() {
        let store = AttributeStore::new();
        let path = AttributePath::basic_information(0, BasicInformationAttribute::VendorName);
        assert_eq!(
            store.set(path, AttrValue::CharString("SmartVent".into())),
            Err(StoreError::UnsupportedCluster {
                endpoint_id: 0,
                cluster_id: ClusterId::BasicInformation as u32,
            })
        );
        assert!(store.get(&path).is_none());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let store = store_with_window_covering();
        let path = AttributePath::window_covering(
            1,
            WindowCoveringAttribute::CurrentPositionLiftPercent100ths,
        );
        assert!(matches!(
            store.set(path, AttrValue::U8(3)),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_version_bumps_only_on_change() {
        let store = store_with_window_covering();
        let path = AttributePath::window_covering(
            1,
            WindowCoveringAttribute::CurrentPositionLiftPercent100ths,
        );
        assert_eq!(store.cluster_version(1, WC), 0);

        store.set(path, AttrValue::NullableU16(Some(100))).unwrap();
        assert_eq!(store.cluster_version(1, WC), 1);

        store.set(path, AttrValue::NullableU16(Some(100))).unwrap();
        assert_eq!(store.cluster_version(1, WC), 1);

        store.set(path, AttrValue::NullableU16(Some(200))).unwrap();
        assert_eq!(store.cluster_version(1, WC), 2);
    }

    #[test]
    fn test_watchers_notified_for_their_cluster_only() {
        let store = store_with_window_covering();
        store.declare_cluster(0, ClusterId::BasicInformation as u32);
        let wc_watch = store.watch(1, WC);
        let basic_watch = store.watch(0, ClusterId::BasicInformation as u32);

        store
            .set(
                AttributePath::window_covering(1, WindowCoveringAttribute::OperationalStatus),
                AttrValue::U8(1),
            )
            .unwrap();

        assert!(wc_watch.take_pending());
        assert!(!basic_watch.take_pending());
    }

    #[test]
    fn test_unknown_cluster_path() {
        let path = AttributePath::new(1, 0x0006, 0x0000);
        assert_eq!(path.cluster(), None);
        assert_eq!(
            AttributePath::window_covering(1, WindowCoveringAttribute::Mode).cluster(),
            Some(ClusterId::WindowCovering)
        );
    }
}
