//! Fabric plumbing: interfaces, LAGs, default/mgmt instances, underlay and overlay.

use super::model::*;
use super::{instance_mut, interface_mut, EncodeStep, TUNNEL_NAME};
use crate::container::interface::{lag_name, LOOPBACK_NAME};
use crate::container::SwitchContainer;
use crate::error::ComputeError;
use crate::models::SwitchKind;
use crate::pipeline::TemplateRegistry;

pub const DEFAULT_INSTANCE: &str = "default";
pub const MGMT_INSTANCE: &str = "mgmt";
pub const MGMT_INTERFACE: &str = "mgmt0";
pub const UNDERLAY_INSTANCE: &str = "EVPN-UNDERLAY";
pub const OVERLAY_GROUP: &str = "EVPN_OVERLAY";
pub const POLICY_ALL: &str = "all";

const OSPF_MAX_ECMP: u8 = 4;

pub fn register(registry: &mut TemplateRegistry<EncodeStep>) {
    let group = SwitchKind::Srlinux.as_str();
    registry
        .register(group, "prepare", prepare)
        .register(group, "base_instances", base_instances)
        .register(group, "underlay", underlay)
        .register(group, "overlay", overlay)
        .register(group, "management_interface", management_interface)
        .register(group, "base_interfaces", base_interfaces)
        .register(group, "lag_members", lag_members)
        .register(group, "lag_parents", lag_parents)
        .register(group, "routing_policy", routing_policy);
}

/// Interfaces that carry the `vlan-tagging` leaf
pub fn is_vlan_capable(name: &str) -> bool {
    name.starts_with("ethernet-") || name.starts_with("lag")
}

fn prepare(_: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    device.tunnel_interfaces = vec![TunnelInterface {
        name: TUNNEL_NAME.to_string(),
        vxlan_interface: Vec::new(),
    }];
    device.interfaces.clear();
    device.network_instances.clear();
    device.system = None;
    Ok(())
}

fn base_instances(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let router = &container.router;
    device.network_instances.insert(
        DEFAULT_INSTANCE.to_string(),
        NetworkInstance {
            name: DEFAULT_INSTANCE.to_string(),
            router_id: Some(router.router_id),
            interface: router.interfaces.iter().map(Member::new).collect(),
            protocols: Some(Protocols::default()),
            ..Default::default()
        },
    );

    device.network_instances.insert(
        MGMT_INSTANCE.to_string(),
        NetworkInstance {
            name: MGMT_INSTANCE.to_string(),
            kind: Some("ip-vrf".to_string()),
            admin_state: Some(AdminState::Enable),
            description: Some("Management network instance".to_string()),
            interface: vec![Member::new(format!("{}.0", MGMT_INTERFACE))],
            protocols: Some(Protocols {
                linux: Some(Linux {
                    import_routes: true,
                    export_routes: true,
                    export_neighbors: true,
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    Ok(())
}

fn default_protocols(device: &mut Device) -> Result<&mut Protocols, ComputeError> {
    Ok(instance_mut(device, DEFAULT_INSTANCE)?
        .protocols
        .get_or_insert_with(Protocols::default))
}

fn underlay(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let router = &container.router;
    let loopback = format!("{}.0", LOOPBACK_NAME);
    let interface = router
        .interfaces
        .iter()
        .map(|name| {
            if *name == loopback {
                OspfInterface {
                    interface_name: name.clone(),
                    interface_type: None,
                    passive: Some(true),
                }
            } else {
                OspfInterface {
                    interface_name: name.clone(),
                    interface_type: Some("point-to-point".to_string()),
                    passive: None,
                }
            }
        })
        .collect();

    default_protocols(device)?.ospf = Some(Ospf {
        instance: vec![OspfInstance {
            name: UNDERLAY_INSTANCE.to_string(),
            admin_state: AdminState::Enable,
            router_id: router.router_id,
            version: "ospf-v2".to_string(),
            max_ecmp_paths: OSPF_MAX_ECMP,
            area: vec![OspfArea {
                area_id: router.area,
                interface,
            }],
        }],
    });
    Ok(())
}

fn overlay(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let router = &container.router;
    // a route reflector peers with leaves, everybody else with spines
    let peer_role = if router.route_reflector { "LEAF" } else { "SPINE" };
    let neighbor = router
        .evpn_peers
        .iter()
        .map(|(name, address)| BgpNeighbor {
            peer_address: *address,
            description: format!("{} {}", peer_role, name),
            peer_group: OVERLAY_GROUP.to_string(),
            transport: Transport {
                local_address: router.router_id,
            },
        })
        .collect();

    default_protocols(device)?.bgp = Some(Bgp {
        admin_state: AdminState::Enable,
        router_id: router.router_id,
        autonomous_system: router.asn,
        afi_safi: vec![AfiSafi {
            afi_safi_name: "evpn".to_string(),
            admin_state: AdminState::Enable,
            evpn: Some(Empty {}),
        }],
        group: vec![BgpGroup {
            group_name: OVERLAY_GROUP.to_string(),
            description: "EVPN overlay".to_string(),
            next_hop_self: true,
            peer_as: router.asn,
            route_reflector: router.route_reflector.then(|| RouteReflector {
                client: true,
                cluster_id: router.area,
            }),
            export_policy: vec![POLICY_ALL.to_string()],
            import_policy: vec![POLICY_ALL.to_string()],
        }],
        neighbor,
    });
    Ok(())
}

fn management_interface(_: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let mut mgmt = Interface::new(MGMT_INTERFACE, AdminState::Enable);
    mgmt.subinterface.push(Subinterface {
        index: 0,
        admin_state: Some(AdminState::Enable),
        ipv4: Some(Ipv4 {
            admin_state: AdminState::Enable,
            address: Vec::new(),
            dhcp_client: Some(Empty {}),
        }),
        ipv6: Some(Ipv6 {
            admin_state: AdminState::Enable,
            dhcp_client: Some(Empty {}),
        }),
        ..Default::default()
    });
    device.interfaces.insert(MGMT_INTERFACE.to_string(), mgmt);
    Ok(())
}

fn base_interfaces(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    for iface in container.interfaces.iter() {
        let mut encoded = Interface::new(iface.name.clone(), iface.admin_state.into());
        encoded.description = (!iface.description.is_empty()).then(|| iface.description.clone());
        encoded.vlan_tagging = is_vlan_capable(&iface.name).then_some(true);
        encoded.mtu = iface.explicit_mtu();
        device.interfaces.insert(iface.name.clone(), encoded);
    }
    Ok(())
}

fn lag_members(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    for (lag_id, members) in container.interfaces.lags() {
        for member in members {
            let encoded = interface_mut(device, member)?;
            encoded.admin_state = AdminState::Enable;
            encoded.vlan_tagging = None;
            encoded.ethernet = Some(Ethernet {
                aggregate_id: lag_name(*lag_id),
            });
        }
    }
    Ok(())
}

fn lag_parents(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    for lag_id in container.interfaces.lags().keys() {
        interface_mut(device, &lag_name(*lag_id))?.lag = Some(Lag {
            lag_type: "lacp".to_string(),
            lacp_fallback_mode: "static".to_string(),
            lacp: Lacp {
                lacp_mode: "ACTIVE".to_string(),
                interval: "FAST".to_string(),
                system_id_mac: container.system_id.clone(),
                admin_key: *lag_id,
                system_priority: *lag_id,
            },
        });
    }
    Ok(())
}

fn routing_policy(_: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    device.routing_policy = Some(RoutingPolicy {
        policy: vec![Policy {
            name: POLICY_ALL.to_string(),
            default_action: DefaultAction {
                policy_result: "accept".to_string(),
            },
        }],
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_capable_names() {
        assert!(is_vlan_capable("ethernet-1/1"));
        assert!(is_vlan_capable("lag3"));
        assert!(!is_vlan_capable("system0"));
        assert!(!is_vlan_capable("irb0"));
        assert!(!is_vlan_capable("mgmt0"));
    }

    #[test]
    fn test_missing_lag_parent_is_an_error() {
        let mut container = SwitchContainer::new(4);
        container.interfaces.add_lag_member(2, "ethernet-1/2");
        let mut device = Device::default();
        base_interfaces(&container, &mut device).unwrap();
        lag_members(&container, &mut device).unwrap();
        let err = lag_parents(&container, &mut device).unwrap_err();
        assert!(matches!(err, ComputeError::UnknownInterface(name) if name == "lag2"));
    }

    #[test]
    fn test_overlay_needs_default_instance() {
        let container = SwitchContainer::new(2);
        let mut device = Device::default();
        let err = overlay(&container, &mut device).unwrap_err();
        assert!(matches!(err, ComputeError::UnknownNetworkInstance(_)));
    }
}
