//! Spine templates: route reflection, leaf downlinks and loopback.

use super::{install_loopback, uplink_number, ComputeContext, ComputeStep, TemplateRegistry};
use crate::container::interface::{physical_name, FABRIC_MTU};
use crate::container::InterfaceKind;
use crate::error::ComputeError;
use crate::models::SwitchRole;

pub fn register(registry: &mut TemplateRegistry<ComputeStep>) {
    let group = SwitchRole::Spine.as_str();
    registry
        .register(group, "route_reflector", route_reflector)
        .register(group, "leaf_downlinks", leaf_downlinks)
        .register(group, "loopback", loopback);
}

fn route_reflector(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    ctx.container.router.route_reflector = true;
    Ok(())
}

/// Downlink to leaf `j` is front-panel port `j + 1`
fn leaf_downlinks(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let fabric = ctx.fabric;
    let planner = ctx.planner;
    let spine_index = ctx.switch.position();
    let spine_count = fabric.spines.len();
    let physical = ctx.container.interfaces.physical_count();

    let required = fabric.leaves.len().max(spine_count);
    if required > physical {
        return Err(ComputeError::PortExhausted {
            required,
            available: physical,
        });
    }

    for (leaf_index, leaf) in fabric.leaves.iter().enumerate() {
        let link = planner.link(spine_index, leaf_index)?;
        let port_name = physical_name(leaf_index + 1);

        let port = ctx.container.interfaces.get_mut(&port_name)?;
        port.description = format!(
            "{} {}",
            leaf.name,
            physical_name(uplink_number(physical, spine_count, spine_index)?)
        );
        port.admin_state = true;
        port.kind = InterfaceKind::L3;
        port.ips.insert(0, link.spine);
        port.mtu = FABRIC_MTU;

        let router = &mut ctx.container.router;
        router.add_interface(format!("{}.0", port_name));
        router
            .evpn_peers
            .insert(leaf.name.clone(), planner.leaf_loopback(leaf_index)?);
    }
    Ok(())
}

fn loopback(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let address = ctx.planner.spine_loopback(ctx.switch.position())?;
    install_loopback(&mut ctx.container, address);
    ctx.container.router.route_reflector = true;
    Ok(())
}
