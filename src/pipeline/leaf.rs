//! Leaf templates: spine uplinks, loopback, tenant maps and access ports.

use std::collections::BTreeSet;

use super::{install_loopback, uplink_number, ComputeContext, ComputeStep, TemplateRegistry};
use crate::container::interface::{lag_name, physical_name, FABRIC_MTU};
use crate::container::{InterfaceKind, TenantSubnet};
use crate::error::ComputeError;
use crate::models::{SwitchRole, TemplateId, Topology};
use crate::utils::format_mac;

pub fn register(registry: &mut TemplateRegistry<ComputeStep>) {
    let group = SwitchRole::Leaf.as_str();
    registry
        .register(group, "spine_uplinks", spine_uplinks)
        .register(group, "loopback", loopback)
        .register(group, "tenant_networks", tenant_networks)
        .register(group, "lacp_system_id", lacp_system_id)
        .register(group, "access_ports", access_ports);
}

/// LACP system id shared by a redundant leaf pair.
///
/// Locally administered MAC built from the fabric id and the pair's even leaf index, so
/// leaves `2k` and `2k + 1` always agree.
pub fn lacp_system_id_for(fabric_id: u32, leaf_index: usize) -> String {
    let pair = (leaf_index & !1) as u32;
    let [_, _, f_hi, f_lo] = fabric_id.to_be_bytes();
    let [_, _, p_hi, p_lo] = pair.to_be_bytes();
    format_mac([0x02, f_hi, f_lo, 0x00, p_hi, p_lo])
}

/// Sorted, deduplicated VLANs reachable through a template
pub fn template_vlans(topology: &Topology, template: TemplateId) -> Vec<u16> {
    topology
        .template(template)
        .clients
        .iter()
        .flat_map(|c| topology.client(*c).networks.iter().map(|n| n.vlan_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn spine_uplinks(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let fabric = ctx.fabric;
    let planner = ctx.planner;
    let leaf_index = ctx.switch.position();
    let physical = ctx.container.interfaces.physical_count();
    let spine_count = fabric.spines.len();

    if spine_count > physical {
        return Err(ComputeError::PortExhausted {
            required: spine_count,
            available: physical,
        });
    }

    for (spine_index, spine) in fabric.spines.iter().enumerate() {
        let link = planner.link(spine_index, leaf_index)?;
        let port_name = physical_name(uplink_number(physical, spine_count, spine_index)?);

        let port = ctx.container.interfaces.get_mut(&port_name)?;
        port.description = format!("{} {}", spine.name, physical_name(leaf_index + 1));
        port.admin_state = true;
        port.kind = InterfaceKind::L3;
        port.ips.insert(0, link.leaf);
        port.mtu = FABRIC_MTU;

        let router = &mut ctx.container.router;
        router.add_interface(format!("{}.0", port_name));
        router
            .evpn_peers
            .insert(spine.name.clone(), planner.spine_loopback(spine_index)?);
    }
    Ok(())
}

fn loopback(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let address = ctx.planner.leaf_loopback(ctx.switch.position())?;
    install_loopback(&mut ctx.container, address);
    Ok(())
}

fn tenant_networks(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let topology = ctx.topology;
    let fabric = ctx.fabric;
    let switch = ctx.switch;
    let router = &mut ctx.container.router;

    for (_, port_id) in switch.ports() {
        let template = topology.template(fabric.port(port_id).template);
        for client_id in &template.clients {
            let client = topology.client(*client_id);
            router.clients.insert(client.name.clone(), client.id);

            for network in &client.networks {
                let name = client.network_name(network);
                if let Some((owner, _)) = router
                    .vlans
                    .iter()
                    .find(|(owner, vlan)| **vlan == network.vlan_id && **owner != name)
                {
                    return Err(ComputeError::VlanCollision {
                        vlan_id: network.vlan_id,
                        first: owner.clone(),
                        second: name,
                    });
                }
                router.vlans.insert(name, network.vlan_id);
                router.subnets.insert(
                    network.vlan_id,
                    TenantSubnet {
                        vrf: client.name.clone(),
                        subnet: network.subnet,
                    },
                );
            }
        }
    }
    Ok(())
}

fn lacp_system_id(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    ctx.container.system_id = lacp_system_id_for(ctx.fabric.id, ctx.switch.position());
    Ok(())
}

fn access_ports(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let topology = ctx.topology;
    let fabric = ctx.fabric;
    let physical = ctx.container.interfaces.physical_count();
    let first_uplink = uplink_number(physical, fabric.spines.len(), 0)?;
    let switch = ctx.switch;

    for (iface, port_id) in switch.ports() {
        let port = fabric.port(port_id);
        let number = iface as usize;
        if number == 0 || number > physical {
            return Err(ComputeError::PortConflict {
                iface,
                reason: format!("the interface range 1-{}", physical),
            });
        }
        if number >= first_uplink {
            return Err(ComputeError::PortConflict {
                iface,
                reason: "a spine uplink".to_string(),
            });
        }

        let vlans = template_vlans(topology, port.template);
        let member_name = physical_name(number);
        let interfaces = &mut ctx.container.interfaces;

        let member = interfaces.get_mut(&member_name)?;
        member.description = port.description.clone();
        member.admin_state = true;

        let access = if port.is_multi_homed() {
            interfaces.add_lag_member(iface, &member_name);
            interfaces.ensure(&lag_name(iface))
        } else {
            interfaces.get_mut(&member_name)?
        };
        access.description = port.description.clone();
        access.admin_state = true;
        access.kind = InterfaceKind::L2;
        access.vlans = vlans;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_shares_system_id() {
        assert_eq!(lacp_system_id_for(1, 0), lacp_system_id_for(1, 1));
        assert_eq!(lacp_system_id_for(1, 2), lacp_system_id_for(1, 3));
        assert_ne!(lacp_system_id_for(1, 1), lacp_system_id_for(1, 2));
        assert_ne!(lacp_system_id_for(1, 0), lacp_system_id_for(2, 0));
    }

    #[test]
    fn test_system_id_format() {
        assert_eq!(lacp_system_id_for(1, 0), "02:00:01:00:00:00");
        assert_eq!(lacp_system_id_for(300, 5), "02:01:2c:00:00:04");
    }
}
