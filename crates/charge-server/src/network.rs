//! Network identity resolution.
//!
//! Participants join from their phones, so the big screen must advertise an
//! address they can reach. Resolution happens once at startup:
//!
//! 1. `server.advertised_address` from config, if set
//! 2. otherwise the best-scoring local IPv4 interface address, falling back
//!    to the outbound route address when interfaces cannot be listed
//! 3. otherwise `127.0.0.1`
//!
//! The public URL, if configured, is passed through unchanged.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use charge_core::config::ServerSection;
use charge_types::NetworkIdentity;
use tracing::{debug, info, warn};

/// Remote used only to select the outbound interface. No packet is sent.
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// Interface name fragments that indicate a virtual adapter.
const VIRTUAL_MARKERS: [&str; 6] = [
    "virtualbox",
    "vmware",
    "vethernet",
    "hyper-v",
    "loopback",
    "nat",
];

/// A local address and the interface it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCandidate {
    /// Interface name (may be empty when unknown).
    pub interface: String,
    /// The IPv4 address.
    pub address: Ipv4Addr,
}

/// Rank a candidate. Higher is better.
///
/// Physical Wi-Fi and Ethernet adapters on private ranges win; link-local
/// and virtual adapters lose.
pub fn score_candidate(candidate: &AddressCandidate) -> i32 {
    let name = candidate.interface.to_lowercase();
    let address = candidate.address;
    let mut score: i32 = 0;

    if address.is_link_local() {
        score = score.saturating_sub(1000);
    }
    if address.is_private() {
        score = score.saturating_add(50);
    }
    if name.contains("wi-fi") || name.contains("wlan") {
        score = score.saturating_add(200);
    }
    if name.contains("ethernet") {
        score = score.saturating_add(150);
    }
    if VIRTUAL_MARKERS.iter().any(|marker| name.contains(marker)) {
        score = score.saturating_sub(200);
    }
    score
}

/// The highest-scoring candidate's address. Ties keep the earlier one.
pub fn pick_best(candidates: &[AddressCandidate]) -> Option<Ipv4Addr> {
    candidates
        .iter()
        .filter(|c| !c.address.is_loopback() && !c.address.is_unspecified())
        .rev()
        .max_by_key(|c| score_candidate(c))
        .map(|c| c.address)
}

/// The IPv4 address the OS would use for outbound traffic.
pub fn outbound_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(ROUTE_PROBE).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    }
}

/// Keep the non-loopback IPv4 entries of `(interface, address)` pairs.
pub fn ipv4_candidates<I>(interfaces: I) -> Vec<AddressCandidate>
where
    I: IntoIterator<Item = (String, IpAddr)>,
{
    interfaces
        .into_iter()
        .filter_map(|(interface, ip)| match ip {
            IpAddr::V4(address) if !address.is_loopback() => {
                Some(AddressCandidate { interface, address })
            }
            _ => None,
        })
        .collect()
}

/// IPv4 addresses of every non-loopback interface on this host.
pub fn interface_candidates() -> Vec<AddressCandidate> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => ipv4_candidates(
            interfaces
                .into_iter()
                .map(|iface| {
                    let ip = iface.ip();
                    (iface.name, ip)
                }),
        ),
        Err(e) => {
            warn!(error = %e, "Could not list network interfaces");
            Vec::new()
        }
    }
}

/// Local address candidates, named by interface where possible.
///
/// When no interface can be listed the outbound route address is the only
/// candidate, with an empty interface name.
pub fn local_candidates() -> Vec<AddressCandidate> {
    let candidates = interface_candidates();
    if !candidates.is_empty() {
        return candidates;
    }
    outbound_ipv4()
        .map(|address| AddressCandidate {
            interface: String::new(),
            address,
        })
        .into_iter()
        .collect()
}

/// Resolve the identity advertised in every `init` payload.
pub fn resolve_identity(server: &ServerSection) -> NetworkIdentity {
    let server_ip = server.advertised_address.clone().unwrap_or_else(|| {
        let candidates = local_candidates();
        debug!(count = candidates.len(), "Local address candidates");
        pick_best(&candidates).map_or_else(|| String::from("127.0.0.1"), |ip| ip.to_string())
    });

    let identity = NetworkIdentity {
        server_ip,
        port: server.port,
        public_url: server.public_url.clone(),
    };
    info!(
        server_ip = identity.server_ip,
        public_url = identity.public_url.as_deref().unwrap_or("-"),
        "Network identity resolved"
    );
    identity
}
