//! Network interface selection for the Matter transport.
//!
//! The stack advertises and binds to a single interface. `UnixNetifs` would
//! report every interface on the host, including addresses that do not route
//! to the controller, so diagnostics are filtered to the chosen one.

use std::ffi::CString;
use std::net::{Ipv4Addr, Ipv6Addr};

use log::{debug, warn};
use nix::ifaddrs::getifaddrs;
use nix::net::if_::{InterfaceFlags, if_nametoindex};
use nix::sys::socket::{AddressFamily, SockaddrLike};

use rs_matter::dm::clusters::gen_diag::{InterfaceTypeEnum, NetifDiag, NetifInfo};
use rs_matter::dm::networks::NetChangeNotif;
use rs_matter::error::{Error, ErrorCode};

/// Addresses assigned to one interface.
#[derive(Debug, Default, Clone)]
pub struct InterfaceAddresses {
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub hw_addr: [u8; 8],
    pub operational: bool,
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80
}

/// Collect the addresses of `interface_name`. Link-local IPv6 is skipped.
///
/// Returns `None` when the interface does not exist.
pub fn interface_addresses(interface_name: &str) -> Result<Option<InterfaceAddresses>, Error> {
    let addrs = getifaddrs().map_err(|e| {
        warn!("[Matter] Failed to list interfaces: {:?}", e);
        ErrorCode::MdnsError
    })?;

    let mut found = false;
    let mut result = InterfaceAddresses::default();

    for ifaddr in addrs {
        if ifaddr.interface_name != interface_name {
            continue;
        }
        found = true;

        if ifaddr.flags.contains(InterfaceFlags::IFF_RUNNING) {
            result.operational = true;
        }

        let Some(addr) = ifaddr.address else {
            continue;
        };
        match addr.family() {
            Some(AddressFamily::Inet) => {
                if let Some(sockaddr) = addr.as_sockaddr_in() {
                    result.ipv4.push(sockaddr.ip());
                }
            }
            Some(AddressFamily::Inet6) => {
                if let Some(sockaddr) = addr.as_sockaddr_in6()
                    && !is_link_local(&sockaddr.ip())
                {
                    result.ipv6.push(sockaddr.ip());
                }
            }
            Some(AddressFamily::Packet) => {
                if let Some(link_addr) = addr.as_link_addr()
                    && let Some(mac) = link_addr.addr()
                {
                    let len = mac.len().min(8);
                    result.hw_addr[..len].copy_from_slice(&mac[..len]);
                }
            }
            _ => {}
        }
    }

    Ok(found.then_some(result))
}

/// Kernel index of `interface_name`.
pub fn interface_index(interface_name: &str) -> Result<u32, Error> {
    let cname = CString::new(interface_name).map_err(|_| {
        warn!("[Matter] Invalid interface name: {}", interface_name);
        Error::from(ErrorCode::MdnsError)
    })?;
    if_nametoindex(cname.as_c_str()).map_err(|e| {
        warn!(
            "[Matter] Failed to get index for interface '{}': {:?}",
            interface_name, e
        );
        Error::from(ErrorCode::MdnsError)
    })
}

/// First running, non-loopback interface with an IPv4 address.
pub fn detect_interface() -> Option<String> {
    let addrs = getifaddrs().ok()?;
    for ifaddr in addrs {
        let flags = ifaddr.flags;
        if flags.contains(InterfaceFlags::IFF_LOOPBACK)
            || !flags.contains(InterfaceFlags::IFF_UP)
            || !flags.contains(InterfaceFlags::IFF_RUNNING)
        {
            continue;
        }
        if ifaddr
            .address
            .is_some_and(|a| a.family() == Some(AddressFamily::Inet))
        {
            debug!("[Matter] Auto-detected interface '{}'", ifaddr.interface_name);
            return Some(ifaddr.interface_name);
        }
    }
    None
}

/// Network diagnostics restricted to one interface.
#[derive(Clone, Copy)]
pub struct FilteredNetifs {
    interface_name: &'static str,
}

impl FilteredNetifs {
    pub const fn new(interface_name: &'static str) -> Self {
        Self { interface_name }
    }

    pub fn interface_name(&self) -> &'static str {
        self.interface_name
    }
}

impl NetifDiag for FilteredNetifs {
    fn netifs(&self, f: &mut dyn FnMut(&NetifInfo) -> Result<(), Error>) -> Result<(), Error> {
        let Some(addrs) = interface_addresses(self.interface_name)? else {
            warn!(
                "[Matter] Interface '{}' not found for diagnostics",
                self.interface_name
            );
            return Ok(());
        };
        let netif_index = interface_index(self.interface_name).unwrap_or(0);

        let info = NetifInfo {
            name: self.interface_name,
            operational: addrs.operational,
            offprem_svc_reachable_ipv4: None,
            offprem_svc_reachable_ipv6: None,
            hw_addr: &addrs.hw_addr,
            ipv4_addrs: &addrs.ipv4,
            ipv6_addrs: &addrs.ipv6,
            netif_type: InterfaceTypeEnum::Ethernet,
            netif_index,
        };

        f(&info)
    }
}

impl NetChangeNotif for FilteredNetifs {
    async fn wait_changed(&self) {
        // Address changes are not tracked.
        core::future::pending().await
    }
}
