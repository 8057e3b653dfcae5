//! Network routing information
//!
//! A [`Route`] describes one entry of the system routing table; the
//! [`Router`] trait is implemented by platform backends that enumerate
//! them. Selection ([`route_to`]) is pure and platform-independent: longest
//! prefix wins, the default route is the fallback, and routes bound to a
//! loopback interface are not considered.

use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;

use wirepack_core::{MacAddr, Result};

/// Interface flag bit marking a loopback device.
pub const IFF_LOOPBACK: u32 = 0x8;

/// The outbound interface a route points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: Option<MacAddr>,
    pub flags: u32,
    pub addrs: Vec<IpNetwork>,
}

impl Interface {
    pub fn is_loopback(&self) -> bool {
        self.flags & IFF_LOOPBACK != 0
    }
}

/// One routing table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Matches any destination; used when nothing more specific does.
    pub default: bool,
    pub src_net: Option<IpNetwork>,
    pub dst_net: Option<IpNetwork>,
    pub gateway: Option<IpAddr>,
    pub iface: Option<Interface>,
    pub pref_src: Option<IpAddr>,
}

impl Route {
    fn is_loopback(&self) -> bool {
        self.iface.as_ref().is_some_and(Interface::is_loopback)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if self.default {
            parts.push("default".to_string());
        } else if let Some(dst) = &self.dst_net {
            parts.push(dst.to_string());
        }

        if let Some(src) = &self.src_net {
            parts.push(format!("from {src}"));
        }

        if let Some(gateway) = &self.gateway {
            parts.push(format!("via {gateway}"));
        }

        if let Some(iface) = &self.iface {
            parts.push(format!("dev {}", iface.name));
        }

        if let Some(pref_src) = &self.pref_src {
            parts.push(format!("src {pref_src}"));
        }

        f.write_str(&parts.join(" "))
    }
}

/// A provider of routing information. Platform backends implement
/// [`routes`](Router::routes); selection comes for free.
pub trait Router {
    /// All routes currently known to the system.
    fn routes(&self) -> Result<Vec<Route>>;

    /// The route packets to `dst` would take, if any.
    fn route_to(&self, dst: IpAddr) -> Result<Option<Route>> {
        Ok(route_to(&self.routes()?, dst).cloned())
    }
}

/// Select the route for `dst` out of `routes`: the most specific containing
/// destination network wins; a default route (bound to a non-loopback
/// interface) is the fallback. Routes through loopback interfaces are
/// skipped entirely.
pub fn route_to(routes: &[Route], dst: IpAddr) -> Option<&Route> {
    let mut default: Option<&Route> = None;
    let mut best: Option<(&Route, u8)> = None;

    for route in routes {
        if route.is_loopback() {
            continue;
        }

        if route.default {
            default = default.or(Some(route));
            continue;
        }

        let Some(dst_net) = route.dst_net else {
            continue;
        };

        if !dst_net.contains(dst) {
            continue;
        }

        let more_specific = match best {
            Some((_, prefix)) => dst_net.prefix() > prefix,
            None => true,
        };

        if more_specific {
            best = Some((route, dst_net.prefix()));
        }
    }

    best.map(|(route, _)| route).or(default)
}
