//! Baseline applied to every switch before its role templates.

use std::net::Ipv4Addr;

use super::{ComputeContext, ComputeStep, TemplateRegistry, COMMON_GROUP};
use crate::error::ComputeError;

pub const BASE_ASN: u32 = 65100;

/// Fabric ASN: 65100 plus the fabric id's hundreds
pub fn fabric_asn(fabric_id: u32) -> u32 {
    BASE_ASN + fabric_id / 100
}

pub fn register(registry: &mut TemplateRegistry<ComputeStep>) {
    registry
        .register(COMMON_GROUP, "shutdown_interfaces", shutdown_interfaces)
        .register(COMMON_GROUP, "routing_identity", routing_identity)
        .register(COMMON_GROUP, "credentials", credentials);
}

fn shutdown_interfaces(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    ctx.container.interfaces.shutdown_all();
    Ok(())
}

fn routing_identity(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    let fabric_id = ctx.fabric.id;
    ctx.container.router.area = Ipv4Addr::from(fabric_id);
    ctx.container.router.asn = fabric_asn(fabric_id);
    Ok(())
}

fn credentials(ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
    ctx.container.credentials = ctx.switch.credentials.clone();
    ctx.container.address = Some(ctx.switch.address);
    Ok(())
}
