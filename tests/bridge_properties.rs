//! End-to-end behaviour of the vent bridge against the simulated stack.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use vent_matter_bridge::bridge::{BridgeConfig, Callbacks, ReportObserver, VentBridge};
use vent_matter_bridge::error::BridgeError;
use vent_matter_bridge::identity::{Eui64, FixedIdentity, HardwareIdentity};
use vent_matter_bridge::matter::ids::{
    ClusterId, IdentifyAttribute, OperationalStatus, WindowCoveringAttribute,
};
use vent_matter_bridge::matter::platform::{IdentifyEvent, MatterPlatform, PlatformError};
use vent_matter_bridge::matter::simulated::SimulatedPlatform;
use vent_matter_bridge::matter::{AttrValue, AttributePath};

#[derive(Default)]
struct Recorder {
    positions: Mutex<Vec<u16>>,
    identifies: Mutex<Vec<u16>>,
}

impl Recorder {
    fn callbacks(self: &Arc<Self>) -> Callbacks {
        let positions = self.clone();
        let identifies = self.clone();
        Callbacks::new()
            .on_position(move |p| positions.positions.lock().push(p))
            .on_identify(move |d| identifies.identifies.lock().push(d))
    }
}

fn identity() -> FixedIdentity {
    FixedIdentity(Eui64([0x60, 0x55, 0xf9, 0xff, 0xfe, 0x12, 0x3a, 0xbc]))
}

fn started_bridge(callbacks: Callbacks) -> VentBridge<SimulatedPlatform> {
    let bridge = VentBridge::new(
        Arc::new(SimulatedPlatform::default()),
        BridgeConfig::default(),
    );
    bridge.init(callbacks, &identity()).unwrap();
    bridge.start().unwrap();
    bridge
}

fn target_path(endpoint_id: u16) -> AttributePath {
    AttributePath::window_covering(
        endpoint_id,
        WindowCoveringAttribute::TargetPositionLiftPercent100ths,
    )
}

fn read(bridge: &VentBridge<SimulatedPlatform>, attr: WindowCoveringAttribute) -> AttrValue {
    let ep = bridge.endpoint_id().unwrap();
    bridge
        .platform()
        .read_attribute(&AttributePath::window_covering(ep, attr))
        .unwrap()
}

struct UnreadableIdentity;

impl HardwareIdentity for UnreadableIdentity {
    fn eui64(&self) -> vent_matter_bridge::error::Result<Eui64> {
        Err(BridgeError::InvalidIdentity("interface has no link-layer address".into()))
    }
}

#[test]
fn test_failed_init_does_not_dispatch_controller_writes() {
    let recorder = Arc::new(Recorder::default());
    let bridge = VentBridge::new(
        Arc::new(SimulatedPlatform::default()),
        BridgeConfig::default(),
    );

    assert!(bridge.init(recorder.callbacks(), &UnreadableIdentity).is_err());
    assert_eq!(bridge.endpoint_id(), None);

    let _ = bridge
        .platform()
        .controller_write(target_path(1), AttrValue::NullableU16(Some(5000)));
    bridge.platform().trigger_identify(1, IdentifyEvent::Stop);

    assert!(recorder.positions.lock().is_empty());
    assert!(recorder.identifies.lock().is_empty());
    let mut buf = [0xAAu8; 16];
    assert!(bridge.pairing_code(&mut buf).is_err());
}

#[test]
fn test_every_target_write_yields_one_position_callback() {
    let recorder = Arc::new(Recorder::default());
    let bridge = started_bridge(recorder.callbacks());
    let ep = bridge.endpoint_id().unwrap();

    for p in 0..=10_000u16 {
        recorder.positions.lock().clear();
        bridge
            .platform()
            .controller_write(target_path(ep), AttrValue::NullableU16(Some(p)))
            .unwrap();
        assert_eq!(*recorder.positions.lock(), vec![p]);
    }
    assert!(recorder.identifies.lock().is_empty());
}

#[test]
fn test_repeated_target_write_is_delivered_each_time() {
    let recorder = Arc::new(Recorder::default());
    let bridge = started_bridge(recorder.callbacks());
    let ep = bridge.endpoint_id().unwrap();

    for _ in 0..3 {
        bridge
            .platform()
            .controller_write(target_path(ep), AttrValue::NullableU16(Some(2500)))
            .unwrap();
    }
    assert_eq!(*recorder.positions.lock(), vec![2500, 2500, 2500]);
}

#[test]
fn test_other_attributes_and_endpoints_do_not_trigger_callback() {
    let recorder = Arc::new(Recorder::default());
    let bridge = started_bridge(recorder.callbacks());
    let ep = bridge.endpoint_id().unwrap();
    let platform = bridge.platform();

    platform
        .controller_write(
            AttributePath::window_covering(ep, WindowCoveringAttribute::Mode),
            AttrValue::U8(1),
        )
        .unwrap();
    platform
        .controller_write(
            AttributePath::identify(ep, IdentifyAttribute::IdentifyTime),
            AttrValue::U16(5),
        )
        .unwrap();

    // No window covering on the root endpoint: rejected by the stack.
    assert!(
        platform
            .controller_write(target_path(0), AttrValue::NullableU16(Some(100)))
            .is_err()
    );

    // Null target clears the attribute but is not a movement request.
    platform
        .controller_write(target_path(ep), AttrValue::NullableU16(None))
        .unwrap();

    assert!(recorder.positions.lock().is_empty());
}

#[test]
fn test_reported_position_reads_back() {
    let bridge = started_bridge(Callbacks::new());

    for v in [0u16, 1, 4250, 9999, 10_000] {
        bridge.report_position(v);
        assert_eq!(
            read(&bridge, WindowCoveringAttribute::CurrentPositionLiftPercent100ths),
            AttrValue::NullableU16(Some(v))
        );
        assert_eq!(
            read(&bridge, WindowCoveringAttribute::CurrentPositionLiftPercentage),
            AttrValue::NullableU8(Some((v / 100) as u8))
        );
    }
}

#[test]
fn test_out_of_range_position_is_clamped() {
    let bridge = started_bridge(Callbacks::new());
    bridge.report_position(12_345);
    assert_eq!(
        read(&bridge, WindowCoveringAttribute::CurrentPositionLiftPercent100ths),
        AttrValue::NullableU16(Some(10_000))
    );
}

#[test]
fn test_operational_status_sequence() {
    let bridge = started_bridge(Callbacks::new());
    let status = |b: &VentBridge<SimulatedPlatform>| {
        let byte = read(b, WindowCoveringAttribute::OperationalStatus)
            .as_u8()
            .unwrap();
        OperationalStatus::from_byte(byte)
    };

    bridge.report_operational_status(0);
    assert_eq!(status(&bridge), OperationalStatus::Stopped);

    bridge.report_operational_status(1);
    bridge.report_operational_status(1);
    assert!(status(&bridge).is_moving());

    bridge.report_operational_status(0);
    bridge.report_operational_status(0);
    assert_eq!(status(&bridge), OperationalStatus::Stopped);
}

#[test]
fn test_identical_reports_do_not_bump_cluster_version() {
    let bridge = started_bridge(Callbacks::new());
    let ep = bridge.endpoint_id().unwrap();
    let version = || {
        bridge
            .platform()
            .store()
            .cluster_version(ep, ClusterId::WindowCovering as u32)
    };

    bridge.report_position(5000);
    let after_first = version();
    bridge.report_position(5000);
    assert_eq!(version(), after_first);
}

#[test]
fn test_identify_start_then_stop() {
    let recorder = Arc::new(Recorder::default());
    let bridge = started_bridge(recorder.callbacks());
    let ep = bridge.endpoint_id().unwrap();

    bridge.platform().trigger_identify(
        ep,
        IdentifyEvent::Start {
            effect_id: 0,
            effect_variant: 0,
        },
    );
    bridge.platform().trigger_identify(ep, IdentifyEvent::Stop);

    assert_eq!(*recorder.identifies.lock(), vec![10, 0]);
    assert!(recorder.positions.lock().is_empty());
}

#[test]
fn test_pairing_code_on_empty_buffer() {
    let bridge = started_bridge(Callbacks::new());
    let mut buf: [u8; 0] = [];
    assert!(matches!(
        bridge.pairing_code(&mut buf),
        Err(BridgeError::EmptyBuffer)
    ));
    assert!(matches!(
        bridge.qr_payload(&mut buf),
        Err(BridgeError::EmptyBuffer)
    ));
}

#[test]
fn test_pairing_code_truncates_and_succeeds() {
    let bridge = started_bridge(Callbacks::new());
    let full = bridge.pairing_code_string().unwrap();
    assert_eq!(full.len(), 11);

    let mut buf = [0xAAu8; 5];
    let written = bridge.pairing_code(&mut buf).unwrap();
    assert_eq!(written, 4);
    assert_eq!(&buf[..4], &full.as_bytes()[..4]);
    assert_eq!(buf[4], 0);

    let mut buf = [0xAAu8; 64];
    let written = bridge.qr_payload(&mut buf).unwrap();
    assert!(buf[..written].starts_with(b"MT:"));
    assert_eq!(buf[written], 0);
}

#[test]
fn test_commissioned_flips_with_fabrics() {
    let bridge = started_bridge(Callbacks::new());
    assert!(!bridge.is_commissioned());

    bridge.platform().add_fabric();
    assert!(bridge.is_commissioned());

    bridge.platform().remove_fabric();
    assert!(!bridge.is_commissioned());
}

#[test]
fn test_discriminator_is_deterministic() {
    let a = started_bridge(Callbacks::new());
    let b = started_bridge(Callbacks::new());
    assert_eq!(a.discriminator(), Some(0xABC));
    assert_eq!(a.discriminator(), b.discriminator());
    assert_eq!(a.pairing_info().unwrap().discriminator, 0xABC);
}

#[test]
fn test_writes_without_position_callback_are_absorbed() {
    let recorder = Arc::new(Recorder::default());
    let identifies = recorder.clone();
    let bridge = started_bridge(
        Callbacks::new().on_identify(move |d| identifies.identifies.lock().push(d)),
    );
    let ep = bridge.endpoint_id().unwrap();

    bridge
        .platform()
        .controller_write(target_path(ep), AttrValue::NullableU16(Some(3000)))
        .unwrap();
    assert_eq!(
        bridge.platform().read_attribute(&target_path(ep)),
        Some(AttrValue::NullableU16(Some(3000)))
    );
    assert!(recorder.identifies.lock().is_empty());
}

struct CountingObserver(AtomicUsize);

impl ReportObserver for CountingObserver {
    fn report_failed(&self, _path: AttributePath, _error: &PlatformError) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_report_observer_sees_rejected_reports() {
    let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
    let bridge = VentBridge::new(
        Arc::new(SimulatedPlatform::default()),
        BridgeConfig::default(),
    )
    .with_report_observer(observer.clone());
    bridge.init(Callbacks::new(), &identity()).unwrap();

    // Reporter bound to an endpoint that has no window covering.
    let platform: Arc<dyn MatterPlatform> = bridge.platform().clone();
    let reporter = vent_matter_bridge::bridge::StateReporter::new(
        platform,
        7,
        Some(observer.clone()),
    );
    reporter.report_operational_status(1);
    assert_eq!(observer.0.load(Ordering::SeqCst), 1);

    // The bridge's own reporter targets a valid endpoint.
    bridge.report_operational_status(1);
    assert_eq!(observer.0.load(Ordering::SeqCst), 1);
}
