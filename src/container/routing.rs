use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use indexmap::IndexMap;
use ipnet::Ipv4Net;

/// Gateway subnet of one tenant VLAN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSubnet {
    /// Owning client, i.e. the IP-VRF the SVI lands in
    pub vrf: String,
    pub subnet: Ipv4Net,
}

/// Routing and overlay parameters for one switch
#[derive(Debug, Clone)]
pub struct RoutingInfo {
    pub router_id: Ipv4Addr,
    /// Subinterfaces of the default network instance, e.g. `ethernet-1/19.0`
    pub interfaces: Vec<String>,
    pub area: Ipv4Addr,
    pub asn: u32,
    pub route_reflector: bool,
    /// Peer switch name -> loopback
    pub evpn_peers: IndexMap<String, Ipv4Addr>,
    /// Client name -> client id
    pub clients: IndexMap<String, u32>,
    /// Tenant network name -> vlan id
    pub vlans: IndexMap<String, u16>,
    pub subnets: BTreeMap<u16, TenantSubnet>,
}

impl Default for RoutingInfo {
    fn default() -> Self {
        Self {
            router_id: Ipv4Addr::UNSPECIFIED,
            interfaces: Vec::new(),
            area: Ipv4Addr::UNSPECIFIED,
            asn: 0,
            route_reflector: false,
            evpn_peers: IndexMap::new(),
            clients: IndexMap::new(),
            vlans: IndexMap::new(),
            subnets: BTreeMap::new(),
        }
    }
}

impl RoutingInfo {
    /// vlan id -> tenant network name
    pub fn reverse_vlan(&self) -> HashMap<u16, &str> {
        self.vlans
            .iter()
            .map(|(name, vlan)| (*vlan, name.as_str()))
            .collect()
    }

    pub fn add_interface(&mut self, name: String) {
        if !self.interfaces.contains(&name) {
            self.interfaces.push(name);
        }
    }
}
