//! SR Linux configuration tree as sent over JSON-RPC.
//!
//! Top-level containers and augmentations from another YANG module carry their module
//! prefix; everything else uses plain kebab-case member names. Unset members are omitted.

use std::net::Ipv4Addr;

use indexmap::IndexMap;
use ipnet::Ipv4Net;
use serde::{Serialize, Serializer};

/// Keyed YANG list: built by name, serialized as a plain array in insertion order
fn list_values<S, V>(map: &IndexMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_seq(map.values())
}

/// Presence container
#[derive(Debug, Clone, Default, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Enable,
    Disable,
}

impl From<bool> for AdminState {
    fn from(up: bool) -> Self {
        if up {
            AdminState::Enable
        } else {
            AdminState::Disable
        }
    }
}

/// Root of the replaced tree
#[derive(Debug, Default, Serialize)]
pub struct Device {
    #[serde(
        rename = "srl_nokia-network-instance:network-instance",
        serialize_with = "list_values",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub network_instances: IndexMap<String, NetworkInstance>,

    #[serde(
        rename = "srl_nokia-tunnel-interfaces:tunnel-interface",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tunnel_interfaces: Vec<TunnelInterface>,

    #[serde(
        rename = "srl_nokia-interfaces:interface",
        serialize_with = "list_values",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub interfaces: IndexMap<String, Interface>,

    #[serde(
        rename = "srl_nokia-routing-policy:routing-policy",
        skip_serializing_if = "Option::is_none"
    )]
    pub routing_policy: Option<RoutingPolicy>,

    #[serde(rename = "srl_nokia-system:system", skip_serializing_if = "Option::is_none")]
    pub system: Option<System>,
}

// ---- interfaces ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interface {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub admin_state: AdminState,
    #[serde(
        rename = "srl_nokia-interfaces-vlans:vlan-tagging",
        skip_serializing_if = "Option::is_none"
    )]
    pub vlan_tagging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethernet: Option<Ethernet>,
    #[serde(rename = "srl_nokia-interfaces-lag:lag", skip_serializing_if = "Option::is_none")]
    pub lag: Option<Lag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subinterface: Vec<Subinterface>,
}

impl Interface {
    pub fn new(name: impl Into<String>, admin_state: AdminState) -> Self {
        Self {
            name: name.into(),
            description: None,
            admin_state,
            vlan_tagging: None,
            mtu: None,
            ethernet: None,
            lag: None,
            subinterface: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Ethernet {
    #[serde(rename = "srl_nokia-interfaces-lag:aggregate-id")]
    pub aggregate_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Lag {
    pub lag_type: String,
    pub lacp_fallback_mode: String,
    #[serde(rename = "srl_nokia-lacp:lacp")]
    pub lacp: Lacp,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Lacp {
    pub lacp_mode: String,
    pub interval: String,
    pub system_id_mac: String,
    pub admin_key: u32,
    pub system_priority: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Subinterface {
    pub index: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state: Option<AdminState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Ipv4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6>,
    #[serde(rename = "srl_nokia-interfaces-vlans:vlan", skip_serializing_if = "Option::is_none")]
    pub vlan: Option<Vlan>,
    #[serde(
        rename = "srl_nokia-interfaces-nbr-virtual-ip-discovery:anycast-gw",
        skip_serializing_if = "Option::is_none"
    )]
    pub anycast_gw: Option<Empty>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv4 {
    pub admin_state: AdminState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(
        rename = "srl_nokia-interfaces-ip-dhcp:dhcp-client",
        skip_serializing_if = "Option::is_none"
    )]
    pub dhcp_client: Option<Empty>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv6 {
    pub admin_state: AdminState,
    #[serde(
        rename = "srl_nokia-interfaces-ip-dhcp:dhcp-client",
        skip_serializing_if = "Option::is_none"
    )]
    pub dhcp_client: Option<Empty>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Address {
    pub ip_prefix: Ipv4Net,
    #[serde(
        rename = "srl_nokia-interfaces-nbr-virtual-ip-discovery:anycast-gw",
        skip_serializing_if = "Option::is_none"
    )]
    pub anycast_gw: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vlan {
    pub encap: Encap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Encap {
    pub single_tagged: SingleTagged,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SingleTagged {
    pub vlan_id: u16,
}

// ---- tunnels ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TunnelInterface {
    pub name: String,
    #[serde(rename = "srl_nokia-tunnel-interfaces-vxlan-interface:vxlan-interface")]
    pub vxlan_interface: Vec<VxlanInterface>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VxlanInterface {
    pub index: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub ingress: Ingress,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ingress {
    pub vni: u32,
}

// ---- network instances ----

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkInstance {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state: Option<AdminState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_id: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interface: Vec<Member>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vxlan_interface: Vec<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Protocols>,
}

/// Interface reference inside a network instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub name: String,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Protocols {
    #[serde(rename = "srl_nokia-linux:linux", skip_serializing_if = "Option::is_none")]
    pub linux: Option<Linux>,
    #[serde(rename = "srl_nokia-ospf:ospf", skip_serializing_if = "Option::is_none")]
    pub ospf: Option<Ospf>,
    #[serde(rename = "srl_nokia-bgp:bgp", skip_serializing_if = "Option::is_none")]
    pub bgp: Option<Bgp>,
    #[serde(rename = "srl_nokia-bgp-evpn:bgp-evpn", skip_serializing_if = "Option::is_none")]
    pub bgp_evpn: Option<BgpEvpn>,
    #[serde(rename = "srl_nokia-bgp-vpn:bgp-vpn", skip_serializing_if = "Option::is_none")]
    pub bgp_vpn: Option<BgpVpn>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Linux {
    pub import_routes: bool,
    pub export_routes: bool,
    pub export_neighbors: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ospf {
    pub instance: Vec<OspfInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OspfInstance {
    pub name: String,
    pub admin_state: AdminState,
    pub router_id: Ipv4Addr,
    pub version: String,
    pub max_ecmp_paths: u8,
    pub area: Vec<OspfArea>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OspfArea {
    pub area_id: Ipv4Addr,
    pub interface: Vec<OspfInterface>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OspfInterface {
    pub interface_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Bgp {
    pub admin_state: AdminState,
    pub router_id: Ipv4Addr,
    pub autonomous_system: u32,
    pub afi_safi: Vec<AfiSafi>,
    pub group: Vec<BgpGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub neighbor: Vec<BgpNeighbor>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AfiSafi {
    pub afi_safi_name: String,
    pub admin_state: AdminState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evpn: Option<Empty>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BgpGroup {
    pub group_name: String,
    pub description: String,
    pub next_hop_self: bool,
    pub peer_as: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_reflector: Option<RouteReflector>,
    pub export_policy: Vec<String>,
    pub import_policy: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteReflector {
    pub client: bool,
    pub cluster_id: Ipv4Addr,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BgpNeighbor {
    pub peer_address: Ipv4Addr,
    pub description: String,
    pub peer_group: String,
    pub transport: Transport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Transport {
    pub local_address: Ipv4Addr,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BgpEvpn {
    pub bgp_instance: Vec<EvpnInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EvpnInstance {
    pub id: u8,
    pub admin_state: AdminState,
    pub vxlan_interface: String,
    pub evi: u32,
    pub ecmp: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BgpVpn {
    pub bgp_instance: Vec<VpnInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VpnInstance {
    pub id: u8,
    pub route_target: RouteTarget,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteTarget {
    pub export_rt: String,
    pub import_rt: String,
}

// ---- routing policy ----

#[derive(Debug, Clone, Serialize)]
pub struct RoutingPolicy {
    pub policy: Vec<Policy>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Policy {
    pub name: String,
    pub default_action: DefaultAction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DefaultAction {
    pub policy_result: String,
}

// ---- system ----

/// Only the members owned by the fabric; the rest of `system` stays device-managed
#[derive(Debug, Clone, Default, Serialize)]
pub struct System {
    #[serde(rename = "srl_nokia-system-network-instance:network-instance")]
    pub network_instance: SystemNetworkInstance,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemNetworkInstance {
    pub protocols: SystemProtocols,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemProtocols {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evpn: Option<SystemEvpn>,
    #[serde(
        rename = "srl_nokia-system-network-instance-bgp-vpn:bgp-vpn",
        skip_serializing_if = "Option::is_none"
    )]
    pub bgp_vpn: Option<SystemBgpVpn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEvpn {
    #[serde(rename = "srl_nokia-system-network-instance-bgp-evpn-ethernet-segments:ethernet-segments")]
    pub ethernet_segments: EthernetSegments,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EthernetSegments {
    pub bgp_instance: Vec<SegmentInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SegmentInstance {
    pub id: u8,
    pub ethernet_segment: Vec<EthernetSegment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EthernetSegment {
    pub name: String,
    pub admin_state: AdminState,
    pub esi: String,
    pub multi_homing_mode: String,
    pub interface: Vec<SegmentInterface>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SegmentInterface {
    pub ethernet_interface: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemBgpVpn {
    pub bgp_instance: Vec<InstanceId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceId {
    pub id: u8,
}
