//! rs-matter backed platform.
//!
//! Runs the Matter stack over IP on a dedicated thread: UDP transport, built-in
//! mDNS responder, exchange responder, data model and persistence. Cluster
//! handlers read and write the same [`AttributeStore`] the bridge uses.

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use embassy_futures::select::{Either, select, select4};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use rs_matter::dm::IMBuffer;
use rs_matter::dm::clusters::desc::{self, ClusterHandler as _};
use rs_matter::dm::clusters::net_comm::NetworkType;
use rs_matter::dm::devices::test::TEST_DEV_ATT;
use rs_matter::dm::endpoints;
use rs_matter::dm::subscriptions::DefaultSubscriptions;
use rs_matter::dm::{
    Async, AsyncHandler, AsyncMetadata, DataModel, Dataver, EmptyHandler, Endpoint, EpClMatcher,
    Node,
};
use rs_matter::error::{Error, ErrorCode};
use rs_matter::pairing::DiscoveryCapabilities;
use rs_matter::persist::{NO_NETWORKS, Psm};
use rs_matter::respond::DefaultResponder;
use rs_matter::transport::network::mdns::builtin::{BuiltinMdnsResponder, Host};
use rs_matter::transport::network::mdns::{
    MDNS_IPV4_BROADCAST_ADDR, MDNS_IPV6_BROADCAST_ADDR, MDNS_SOCKET_DEFAULT_BIND_ADDR,
};
use rs_matter::utils::init::InitMaybeUninit;
use rs_matter::utils::select::Coalesce;
use rs_matter::utils::storage::pooled::PooledBuffers;
use rs_matter::{BasicCommData, MATTER_PORT, Matter, clusters, devices};
use socket2::{Domain, Protocol, Socket, Type};
use static_cell::StaticCell;

use super::attribute_store::{AttrValue, AttributePath, AttributeStore};
use super::clusters::{IdentifyHandler, WindowCoveringHandler};
use super::device_info::DeviceDetails;
use super::device_types::DEV_TYPE_WINDOW_COVERING;
use super::ids::{BasicInformationAttribute, ClusterId, EndpointId, ROOT_ENDPOINT_ID};
use super::netif::{FilteredNetifs, detect_interface, interface_addresses, interface_index};
use super::platform::{
    CommissioningData, MatterPlatform, PlatformError, PlatformEvents, StartConfig,
    WindowCoveringConfig, seed_window_covering,
};
use crate::config::MatterConfig;

/// Endpoint hosting the window covering. Fixed by the node layout.
pub const WINDOW_COVERING_ENDPOINT_ID: EndpointId = 1;

/// Commissioning window opened on an uncommissioned node (15 minutes).
const COMM_WINDOW_TIMEOUT_SECS: u16 = 900;

/// How often the commissioned flag is mirrored from the stack.
const COMMISSIONING_POLL: Duration = Duration::from_millis(250);

/// Static cells for Matter resources (required for 'static lifetime)
static MATTER: StaticCell<Matter> = StaticCell::new();
static BUFFERS: StaticCell<PooledBuffers<10, NoopRawMutex, IMBuffer>> = StaticCell::new();
static SUBSCRIPTIONS: StaticCell<DefaultSubscriptions> = StaticCell::new();
static PSM: StaticCell<Psm<4096>> = StaticCell::new();

/// Static hostname storage for mDNS (needs 'static lifetime for Host struct)
static HOSTNAME: OnceLock<String> = OnceLock::new();

const PERSIST_DIR: &str = ".config/vent-matter-bridge";
const PERSIST_FILE: &str = "matter.bin";

/// Default location of the persisted fabric table.
pub fn default_persist_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PERSIST_DIR)
        .join(PERSIST_FILE)
}

const NODE: Node<'static> = Node {
    id: 0,
    endpoints: &[
        endpoints::root_endpoint(NetworkType::Ethernet),
        Endpoint {
            id: WINDOW_COVERING_ENDPOINT_ID,
            device_types: devices!(DEV_TYPE_WINDOW_COVERING),
            clusters: clusters!(
                desc::DescHandler::CLUSTER,
                WindowCoveringHandler::CLUSTER,
                IdentifyHandler::CLUSTER
            ),
        },
    ],
};

fn dm_handler<'a>(
    matter: &'a Matter<'a>,
    netifs: &'a FilteredNetifs,
    window_covering: &'a WindowCoveringHandler,
    identify: &'a IdentifyHandler,
) -> impl AsyncMetadata + AsyncHandler + 'a {
    (
        NODE,
        endpoints::with_eth(
            &(),
            netifs,
            matter.rand(),
            endpoints::with_sys(
                &false,
                matter.rand(),
                EmptyHandler
                    .chain(
                        EpClMatcher::new(
                            Some(WINDOW_COVERING_ENDPOINT_ID),
                            Some(desc::DescHandler::CLUSTER.id),
                        ),
                        Async(desc::DescHandler::new(Dataver::new_rand(matter.rand())).adapt()),
                    )
                    .chain(
                        EpClMatcher::new(
                            Some(WINDOW_COVERING_ENDPOINT_ID),
                            Some(WindowCoveringHandler::CLUSTER.id),
                        ),
                        Async(window_covering),
                    )
                    .chain(
                        EpClMatcher::new(
                            Some(WINDOW_COVERING_ENDPOINT_ID),
                            Some(IdentifyHandler::CLUSTER.id),
                        ),
                        Async(identify),
                    ),
            ),
        ),
    )
}

type ResetSignal = Signal<CriticalSectionRawMutex, ()>;

/// Production [`MatterPlatform`] over rs-matter.
pub struct RsMatterPlatform {
    config: MatterConfig,
    persist_path: PathBuf,
    store: Arc<AttributeStore>,
    events: RwLock<Option<Arc<dyn PlatformEvents>>>,
    endpoint: Mutex<Option<EndpointId>>,
    commissioned: Arc<AtomicBool>,
    reset: Arc<ResetSignal>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RsMatterPlatform {
    pub fn new(config: MatterConfig) -> Self {
        Self::with_persist_path(config, default_persist_path())
    }

    pub fn with_persist_path(config: MatterConfig, persist_path: PathBuf) -> Self {
        let store = Arc::new(AttributeStore::new());
        store.declare_cluster(ROOT_ENDPOINT_ID, ClusterId::BasicInformation as u32);

        let basic_info = |attr| AttributePath::basic_information(ROOT_ENDPOINT_ID, attr);
        let seeded = [
            (
                basic_info(BasicInformationAttribute::VendorName),
                AttrValue::CharString(config.vendor_name.clone()),
            ),
            (
                basic_info(BasicInformationAttribute::VendorId),
                AttrValue::U16(config.vendor_id),
            ),
            (
                basic_info(BasicInformationAttribute::ProductName),
                AttrValue::CharString(config.product_name.clone()),
            ),
            (
                basic_info(BasicInformationAttribute::ProductId),
                AttrValue::U16(config.product_id),
            ),
        ];
        for (path, value) in seeded {
            if let Err(e) = store.init_value(path, value) {
                warn!("[Matter] Failed to seed {:?}: {}", path, e);
            }
        }

        Self {
            config,
            persist_path,
            store,
            events: RwLock::new(None),
            endpoint: Mutex::new(None),
            commissioned: Arc::new(AtomicBool::new(false)),
            reset: Arc::new(Signal::new()),
            thread: Mutex::new(None),
        }
    }

    pub fn persist_path(&self) -> &Path {
        &self.persist_path
    }

    /// Whether the stack thread has been spawned and is still running.
    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn basic_info_string(&self, attr: BasicInformationAttribute, fallback: &str) -> String {
        self.store
            .get(&AttributePath::basic_information(ROOT_ENDPOINT_ID, attr))
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| fallback.to_owned())
    }
}

impl MatterPlatform for RsMatterPlatform {
    fn create_node(&self, events: Arc<dyn PlatformEvents>) -> Result<(), PlatformError> {
        let mut slot = self.events.write();
        if slot.is_some() {
            return Err(PlatformError::NodeCreation("node already created".into()));
        }
        *slot = Some(events);
        info!("[Matter] Node created");
        Ok(())
    }

    fn create_window_covering_endpoint(
        &self,
        config: &WindowCoveringConfig,
    ) -> Result<EndpointId, PlatformError> {
        if self.events.read().is_none() {
            return Err(PlatformError::NotReady);
        }
        let mut endpoint = self.endpoint.lock();
        if endpoint.is_some() {
            return Err(PlatformError::EndpointCreation(
                "only one window covering endpoint is supported".into(),
            ));
        }
        seed_window_covering(&self.store, WINDOW_COVERING_ENDPOINT_ID, config)?;
        *endpoint = Some(WINDOW_COVERING_ENDPOINT_ID);
        Ok(WINDOW_COVERING_ENDPOINT_ID)
    }

    fn store(&self) -> &AttributeStore {
        &self.store
    }

    fn fabric_count(&self) -> usize {
        // rs-matter does not expose the fabric table size, only whether any
        // fabric is present.
        usize::from(self.commissioned.load(Ordering::SeqCst))
    }

    fn commissioning_data(&self) -> Result<CommissioningData, PlatformError> {
        Ok(CommissioningData {
            vendor_id: self.config.vendor_id,
            product_id: self.config.product_id,
            passcode: self.config.passcode,
        })
    }

    fn start(&self, config: &StartConfig) -> Result<(), PlatformError> {
        let events = self.events.read().clone().ok_or(PlatformError::NotReady)?;
        let endpoint_id = (*self.endpoint.lock()).ok_or(PlatformError::NotReady)?;

        if config.radio.radio_queue_depth == 0 || config.radio.task_queue_depth == 0 {
            return Err(PlatformError::Start("queue depths must be non-zero".into()));
        }

        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Err(PlatformError::Start("stack already running".into()));
        }

        let interface = match &self.config.interface {
            Some(name) => name.clone(),
            None => detect_interface()
                .ok_or_else(|| PlatformError::Start("no usable network interface".into()))?,
        };

        let details = DeviceDetails {
            vendor_id: self.config.vendor_id,
            product_id: self.config.product_id,
            vendor_name: self
                .basic_info_string(BasicInformationAttribute::VendorName, &self.config.vendor_name),
            product_name: self.basic_info_string(
                BasicInformationAttribute::ProductName,
                &self.config.product_name,
            ),
            serial_no: DeviceDetails::serial_for(config.discriminator),
        };

        let run = StackRun {
            interface,
            details,
            comm: BasicCommData {
                password: self.config.passcode,
                discriminator: config.discriminator,
            },
            persist_path: self.persist_path.clone(),
            store: self.store.clone(),
            events,
            endpoint_id,
            commissioned: self.commissioned.clone(),
            reset: self.reset.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("matter-stack".into())
            .stack_size(550 * 1024) // 550KB stack for Matter operations (matches rs-matter examples)
            .spawn(move || {
                if let Err(e) = futures_lite::future::block_on(run.run()) {
                    error!("[Matter] Stack error: {:?}", e);
                }
                info!("[Matter] Stack stopped");
            })
            .map_err(|e| PlatformError::Start(e.to_string()))?;

        *thread = Some(handle);
        Ok(())
    }

    fn schedule_factory_reset(&self) {
        if !self.is_running() {
            info!("[Matter] Factory reset will run when the stack starts");
        }
        self.reset.signal(());
    }
}

/// Everything the stack thread owns.
struct StackRun {
    interface: String,
    details: DeviceDetails,
    comm: BasicCommData,
    persist_path: PathBuf,
    store: Arc<AttributeStore>,
    events: Arc<dyn PlatformEvents>,
    endpoint_id: EndpointId,
    commissioned: Arc<AtomicBool>,
    reset: Arc<ResetSignal>,
}

fn udp_socket(bind_addr: SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_only_v6(false)?;
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr.into())?;
    Ok(socket)
}

impl StackRun {
    async fn run(self) -> Result<(), Error> {
        info!("[Matter] Initializing stack on '{}'", self.interface);

        let discriminator = self.comm.discriminator;
        let interface_name: &'static str = Box::leak(self.interface.into_boxed_str());
        let interface_index = interface_index(interface_name)?;
        let Some(addrs) = interface_addresses(interface_name)? else {
            error!("[Matter] Interface '{}' not found", interface_name);
            return Err(ErrorCode::MdnsError.into());
        };
        let Some(&ipv4_addr) = addrs.ipv4.first() else {
            error!("[Matter] No IPv4 address on interface '{}'", interface_name);
            return Err(ErrorCode::MdnsError.into());
        };
        let ipv6_addr = addrs.ipv6.first().copied().unwrap_or(Ipv6Addr::UNSPECIFIED);
        info!(
            "[Matter] Using interface '{}' (index {}) with {} and {}",
            interface_name, interface_index, ipv4_addr, ipv6_addr
        );

        let matter = MATTER.uninit().init_with(Matter::init(
            self.details.leak(),
            self.comm,
            &TEST_DEV_ATT,
            rs_matter::utils::epoch::sys_epoch,
            rs_matter::utils::rand::sys_rand,
            MATTER_PORT,
        ));
        matter.initialize_transport_buffers()?;

        // Bind to the advertised IPv6 address so replies leave from the same
        // source address the controller targeted.
        let bind_addr = SocketAddr::new(IpAddr::V6(ipv6_addr), MATTER_PORT);
        let socket = udp_socket(bind_addr)
            .and_then(|s| async_io::Async::<UdpSocket>::new(s.into()))
            .map_err(|e| {
                error!("[Matter] Failed to bind UDP socket to {:?}: {}", bind_addr, e);
                ErrorCode::StdIoError
            })?;
        info!("[Matter] UDP socket bound to {:?}", bind_addr);

        if let Some(parent) = self.persist_path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            error!("[Matter] Failed to create persistence directory {:?}: {}", parent, e);
        }
        let psm = PSM.uninit().init_with(Psm::init());
        if let Err(e) = psm.load(&self.persist_path, matter, NO_NETWORKS) {
            warn!(
                "[Matter] Failed to load persisted state from {:?}: {:?}",
                self.persist_path, e
            );
        }

        self.commissioned
            .store(matter.is_commissioned(), Ordering::SeqCst);
        if matter.is_commissioned() {
            info!("[Matter] Already commissioned, commissioning window stays closed");
        } else {
            info!(
                "[Matter] Opening commissioning window for {} seconds (discriminator {})",
                COMM_WINDOW_TIMEOUT_SECS, discriminator
            );
            matter.open_basic_comm_window(COMM_WINDOW_TIMEOUT_SECS)?;
            if let Err(e) = matter.print_standard_qr_text(DiscoveryCapabilities::IP) {
                warn!("[Matter] Failed to print QR text: {:?}", e);
            }
        }

        let buffers = BUFFERS.uninit().init_with(PooledBuffers::init(0));
        let subscriptions = SUBSCRIPTIONS
            .uninit()
            .init_with(DefaultSubscriptions::init());

        let netifs = FilteredNetifs::new(interface_name);
        let window_covering = WindowCoveringHandler::new(
            Dataver::new_rand(matter.rand()),
            self.endpoint_id,
            self.store.clone(),
            self.events.clone(),
        );
        let identify = IdentifyHandler::new(
            Dataver::new_rand(matter.rand()),
            self.endpoint_id,
            self.store.clone(),
            self.events.clone(),
        );

        let handler = dm_handler(matter, &netifs, &window_covering, &identify);
        let dm = DataModel::new(matter, buffers, subscriptions, handler);
        let responder = DefaultResponder::new(&dm);

        let mut transport = pin!(matter.run(&socket, &socket));

        let mdns_socket = udp_socket(MDNS_SOCKET_DEFAULT_BIND_ADDR)
            .and_then(|s| async_io::Async::<UdpSocket>::new_nonblocking(s.into()))
            .map_err(|e| {
                error!("[Matter] Failed to bind mDNS socket: {}", e);
                ErrorCode::MdnsError
            })?;
        mdns_socket
            .get_ref()
            .join_multicast_v6(&MDNS_IPV6_BROADCAST_ADDR, interface_index)
            .and_then(|()| {
                mdns_socket
                    .get_ref()
                    .join_multicast_v4(&MDNS_IPV4_BROADCAST_ADDR, &ipv4_addr)
            })
            .map_err(|e| {
                error!("[Matter] Failed to join mDNS multicast groups: {}", e);
                ErrorCode::MdnsError
            })?;

        let hostname =
            HOSTNAME.get_or_init(|| gethostname::gethostname().to_string_lossy().into_owned());
        let host = Host {
            id: 0,
            hostname,
            ip: ipv4_addr.octets().into(),
            ipv6: ipv6_addr.octets().into(),
        };
        let mdns_responder = BuiltinMdnsResponder::new(matter);
        let mut mdns = pin!(mdns_responder.run(
            &mdns_socket,
            &mdns_socket,
            &host,
            Some(ipv4_addr.octets().into()),
            Some(interface_index),
        ));

        let mut respond = pin!(responder.run::<4, 4>());
        let mut dm_job = pin!(dm.run());
        let mut persist = pin!(psm.run(&self.persist_path, matter, NO_NETWORKS));
        let mut changes = pin!(forward_changes(&self.store, subscriptions, self.endpoint_id));
        let mut supervisor = pin!(supervise(
            matter,
            &self.commissioned,
            &self.reset,
            &self.persist_path
        ));

        info!("[Matter] Stack running, waiting for controllers");

        select4(
            &mut transport,
            &mut mdns,
            select(&mut respond, &mut dm_job).coalesce(),
            select(
                &mut persist,
                select(&mut changes, &mut supervisor).coalesce(),
            )
            .coalesce(),
        )
        .coalesce()
        .await
    }
}

/// Push store changes on the window-covering endpoint to subscribers.
async fn forward_changes(
    store: &AttributeStore,
    subscriptions: &DefaultSubscriptions,
    endpoint_id: EndpointId,
) -> Result<(), Error> {
    let window_covering = store.watch(endpoint_id, ClusterId::WindowCovering as u32);
    let identify = store.watch(endpoint_id, ClusterId::Identify as u32);

    loop {
        let cluster = match select(window_covering.changed(), identify.changed()).await {
            Either::First(()) => window_covering.cluster_id(),
            Either::Second(()) => identify.cluster_id(),
        };
        subscriptions.notify_cluster_changed(endpoint_id, cluster);
    }
}

/// Mirror the commissioned flag and handle factory reset requests.
///
/// A reset wipes the fabric table and its persisted copy, then ends the stack.
async fn supervise(
    matter: &Matter<'_>,
    commissioned: &AtomicBool,
    reset: &ResetSignal,
    persist_path: &Path,
) -> Result<(), Error> {
    loop {
        commissioned.store(matter.is_commissioned(), Ordering::SeqCst);

        if let Either::First(()) = select(reset.wait(), Timer::after(COMMISSIONING_POLL)).await {
            info!("[Matter] Factory reset: removing all fabrics");
            matter.reset_persist(true);
            if let Err(e) = fs::remove_file(persist_path)
                && e.kind() != io::ErrorKind::NotFound
            {
                warn!("[Matter] Failed to remove {:?}: {}", persist_path, e);
            }
            commissioned.store(false, Ordering::SeqCst);
            return Ok(());
        }
    }
}
