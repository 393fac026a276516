//! rs-matter cluster handlers backed by the shared [`AttributeStore`].
//!
//! Handlers read attribute values straight from the store and route controller
//! writes and commands through the registered [`PlatformEvents`] sink before
//! committing them, so the bridge sees every change as a pre-update.

use std::sync::atomic::{AtomicU32, Ordering};

use rs_matter::dm::Dataver;
use rs_matter::error::{Error, ErrorCode};
use rs_matter::tlv::{TLVTag, TLVWrite};

use super::attribute_store::{AttrValue, AttributePath, AttributeStore};
use super::ids::EndpointId;
use super::platform::{PlatformEvents, UpdatePhase};

pub mod identify;
pub mod window_covering;

pub use identify::IdentifyHandler;
pub use window_covering::WindowCoveringHandler;

/// Sync dataver with store version changes.
///
/// Call at the start of `read_impl()`. When the cluster's store version has
/// moved since the last read, the dataver is bumped so subscribers pick up the
/// new values.
pub fn sync_dataver_with_store(
    store: &AttributeStore,
    endpoint_id: EndpointId,
    cluster_id: u32,
    last_version: &AtomicU32,
    dataver: &Dataver,
) {
    let current = store.cluster_version(endpoint_id, cluster_id);
    let last = last_version.swap(current, Ordering::SeqCst);
    if current != last {
        dataver.changed();
    }
}

/// Encode a stored value as TLV.
pub(crate) fn encode_value<W: TLVWrite>(
    tw: &mut W,
    tag: &TLVTag,
    value: &AttrValue,
) -> Result<(), Error> {
    match value {
        AttrValue::U8(v) | AttrValue::NullableU8(Some(v)) => tw.u8(tag, *v),
        AttrValue::U16(v) | AttrValue::NullableU16(Some(v)) => tw.u16(tag, *v),
        AttrValue::NullableU8(None) | AttrValue::NullableU16(None) => tw.null(tag),
        AttrValue::CharString(s) => tw.utf8(tag, s),
    }
}

/// Run a controller-originated change through the event sink and commit it.
///
/// A pre-update veto fails the interaction and leaves the store untouched.
pub(crate) fn commit_controller_write(
    store: &AttributeStore,
    events: &dyn PlatformEvents,
    path: AttributePath,
    value: AttrValue,
) -> Result<(), Error> {
    events
        .on_attribute_update(UpdatePhase::PreUpdate, path, &value)
        .map_err(|e| {
            log::warn!("[Matter] Write to {:?} rejected: {}", path, e);
            Error::new(ErrorCode::Failure)
        })?;

    store.set(path, value.clone()).map_err(|e| {
        log::warn!("[Matter] Failed to commit {:?}: {}", path, e);
        Error::new(ErrorCode::Failure)
    })?;

    if let Err(e) = events.on_attribute_update(UpdatePhase::PostUpdate, path, &value) {
        log::debug!("[Matter] Post-update hook for {:?} failed: {}", path, e);
    }
    Ok(())
}
