//! Tenant overlay: MAC-VRFs per VLAN, IP-VRFs per client, anycast gateway SVIs.

use super::base::is_vlan_capable;
use super::model::*;
use super::{instance_mut, interface_mut, tunnel_mut, EncodeStep, TUNNEL_NAME};
use crate::container::SwitchContainer;
use crate::error::ComputeError;
use crate::models::SwitchKind;
use crate::pipeline::TemplateRegistry;

pub const IRB_INTERFACE: &str = "irb0";
/// Client VNIs sit above the VLAN range
pub const CLIENT_VNI_OFFSET: u32 = 10000;

const EVPN_ECMP: u8 = 4;

pub fn register(registry: &mut TemplateRegistry<EncodeStep>) {
    let group = SwitchKind::Srlinux.as_str();
    registry
        .register(group, "layer2_instances", layer2_instances)
        .register(group, "layer2_tunnels", layer2_tunnels)
        .register(group, "layer2_subinterfaces", layer2_subinterfaces)
        .register(group, "layer2_members", layer2_members)
        .register(group, "layer3_instances", layer3_instances)
        .register(group, "layer3_tunnels", layer3_tunnels)
        .register(group, "layer3_subinterfaces", layer3_subinterfaces)
        .register(group, "irb_mapping", irb_mapping)
        .register(group, "anycast_gateway", anycast_gateway);
}

pub fn client_vni(client_id: u32) -> u32 {
    client_id + CLIENT_VNI_OFFSET
}

pub fn mac_vrf_name(network: &str) -> String {
    format!("VLAN_{}", network.to_uppercase())
}

pub fn ip_vrf_name(client: &str) -> String {
    format!("CLIENT_{}", client.to_uppercase())
}

fn route_target(asn: u32, id: u32) -> String {
    format!("target:{}:{}", asn, id)
}

fn tunnel_member(vni: u32) -> String {
    format!("{}.{}", TUNNEL_NAME, vni)
}

fn irb_member(vlan_id: u16) -> String {
    format!("{}.{}", IRB_INTERFACE, vlan_id)
}

/// bgp-evpn and bgp-vpn for one EVPN instance
fn evpn_protocols(asn: u32, vni: u32) -> Protocols {
    let rt = route_target(asn, vni);
    Protocols {
        bgp_evpn: Some(BgpEvpn {
            bgp_instance: vec![EvpnInstance {
                id: 1,
                admin_state: AdminState::Enable,
                vxlan_interface: tunnel_member(vni),
                evi: vni,
                ecmp: EVPN_ECMP,
            }],
        }),
        bgp_vpn: Some(BgpVpn {
            bgp_instance: vec![VpnInstance {
                id: 1,
                route_target: RouteTarget {
                    export_rt: rt.clone(),
                    import_rt: rt,
                },
            }],
        }),
        ..Default::default()
    }
}

fn layer2_instances(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let router = &container.router;
    for (network, vlan_id) in &router.vlans {
        let name = mac_vrf_name(network);
        let vni = u32::from(*vlan_id);
        device.network_instances.insert(
            name.clone(),
            NetworkInstance {
                name,
                kind: Some("mac-vrf".to_string()),
                admin_state: Some(AdminState::Enable),
                interface: vec![Member::new(irb_member(*vlan_id))],
                vxlan_interface: vec![Member::new(tunnel_member(vni))],
                protocols: Some(evpn_protocols(router.asn, vni)),
                ..Default::default()
            },
        );
    }
    Ok(())
}

fn layer2_tunnels(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let tunnel = tunnel_mut(device)?;
    for vlan_id in container.router.vlans.values() {
        let vni = u32::from(*vlan_id);
        tunnel.vxlan_interface.push(VxlanInterface {
            index: vni,
            kind: "bridged".to_string(),
            ingress: Ingress { vni },
        });
    }
    Ok(())
}

fn layer2_subinterfaces(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    for iface in container.interfaces.iter().filter(|i| !i.vlans.is_empty()) {
        let encoded = interface_mut(device, &iface.name)?;
        for vlan_id in &iface.vlans {
            encoded.subinterface.push(Subinterface {
                index: u32::from(*vlan_id),
                kind: Some("bridged".to_string()),
                admin_state: Some(AdminState::Enable),
                vlan: Some(Vlan {
                    encap: Encap {
                        single_tagged: SingleTagged { vlan_id: *vlan_id },
                    },
                }),
                ..Default::default()
            });
        }
    }
    Ok(())
}

fn layer2_members(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let networks = container.router.reverse_vlan();
    for iface in container.interfaces.iter() {
        for vlan_id in &iface.vlans {
            let network = networks
                .get(vlan_id)
                .ok_or(ComputeError::UnknownVlan(*vlan_id))?;
            instance_mut(device, &mac_vrf_name(network))?
                .interface
                .push(Member::new(format!("{}.{}", iface.name, vlan_id)));
        }
    }
    Ok(())
}

fn layer3_instances(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let router = &container.router;
    for (client, client_id) in &router.clients {
        let name = ip_vrf_name(client);
        let vni = client_vni(*client_id);
        device.network_instances.insert(
            name.clone(),
            NetworkInstance {
                name,
                kind: Some("ip-vrf".to_string()),
                admin_state: Some(AdminState::Enable),
                vxlan_interface: vec![Member::new(tunnel_member(vni))],
                protocols: Some(evpn_protocols(router.asn, vni)),
                ..Default::default()
            },
        );
    }
    Ok(())
}

fn layer3_tunnels(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let tunnel = tunnel_mut(device)?;
    for client_id in container.router.clients.values() {
        let vni = client_vni(*client_id);
        tunnel.vxlan_interface.push(VxlanInterface {
            index: vni,
            kind: "routed".to_string(),
            ingress: Ingress { vni },
        });
    }
    Ok(())
}

fn layer3_subinterfaces(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    for iface in container.interfaces.iter().filter(|i| !i.ips.is_empty()) {
        let encoded = interface_mut(device, &iface.name)?;
        if is_vlan_capable(&iface.name) {
            encoded.vlan_tagging = Some(false);
        }
        for (index, prefix) in &iface.ips {
            encoded.subinterface.push(Subinterface {
                index: *index,
                admin_state: Some(AdminState::Enable),
                ipv4: Some(Ipv4 {
                    admin_state: AdminState::Enable,
                    address: vec![Address {
                        ip_prefix: *prefix,
                        anycast_gw: None,
                    }],
                    dhcp_client: None,
                }),
                ..Default::default()
            });
        }
    }
    Ok(())
}

fn irb_mapping(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    for (vlan_id, subnet) in &container.router.subnets {
        instance_mut(device, &ip_vrf_name(&subnet.vrf))?
            .interface
            .push(Member::new(irb_member(*vlan_id)));
    }
    Ok(())
}

fn anycast_gateway(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let subnets = &container.router.subnets;
    if subnets.is_empty() {
        return Ok(());
    }

    let networks = container.router.reverse_vlan();
    let mut irb = Interface::new(IRB_INTERFACE, AdminState::Enable);
    for (vlan_id, subnet) in subnets {
        let network = networks
            .get(vlan_id)
            .ok_or(ComputeError::UnknownVlan(*vlan_id))?;
        irb.subinterface.push(Subinterface {
            index: u32::from(*vlan_id),
            description: Some(format!("SVI {}", network.to_uppercase())),
            admin_state: Some(AdminState::Enable),
            ipv4: Some(Ipv4 {
                admin_state: AdminState::Enable,
                address: vec![Address {
                    ip_prefix: subnet.subnet,
                    anycast_gw: Some(true),
                }],
                dhcp_client: None,
            }),
            anycast_gw: Some(Empty {}),
            ..Default::default()
        });
    }
    device.interfaces.insert(IRB_INTERFACE.to_string(), irb);
    Ok(())
}
