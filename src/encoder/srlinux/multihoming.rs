//! EVPN multihoming: one all-active ethernet segment per LAG.
//!
//! Both leaves of a redundant pair derive the same LACP system id, so they also derive
//! the same ESI for a shared LAG and advertise it as one segment.

use super::model::*;
use super::EncodeStep;
use crate::container::interface::lag_name;
use crate::container::SwitchContainer;
use crate::error::ComputeError;
use crate::models::SwitchKind;
use crate::pipeline::TemplateRegistry;

const BGP_INSTANCE: u8 = 1;

pub fn register(registry: &mut TemplateRegistry<EncodeStep>) {
    let group = SwitchKind::Srlinux.as_str();
    registry
        .register(group, "ethernet_segments", ethernet_segments)
        .register(group, "system_bgp_vpn", system_bgp_vpn);
}

/// `<system id>:42:42:<lag hi>:<lag lo>`, ten bytes
pub fn ethernet_segment_id(system_id: &str, lag_id: u32) -> String {
    format!("{}:42:42:{:02x}:{:02x}", system_id, (lag_id >> 8) & 0xff, lag_id & 0xff)
}

fn ethernet_segments(container: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    let lags = container.interfaces.lags();
    if lags.is_empty() {
        return Ok(());
    }

    let segments = lags
        .keys()
        .map(|lag_id| EthernetSegment {
            name: lag_name(*lag_id),
            admin_state: AdminState::Enable,
            esi: ethernet_segment_id(&container.system_id, *lag_id),
            multi_homing_mode: "all-active".to_string(),
            interface: vec![SegmentInterface {
                ethernet_interface: lag_name(*lag_id),
            }],
        })
        .collect();

    let system = device.system.get_or_insert_with(System::default);
    system.network_instance.protocols.evpn = Some(SystemEvpn {
        ethernet_segments: EthernetSegments {
            bgp_instance: vec![SegmentInstance {
                id: BGP_INSTANCE,
                ethernet_segment: segments,
            }],
        },
    });
    Ok(())
}

/// Segments are advertised through the system bgp-vpn instance
fn system_bgp_vpn(_: &SwitchContainer, device: &mut Device) -> Result<(), ComputeError> {
    if let Some(system) = device.system.as_mut() {
        system.network_instance.protocols.bgp_vpn = Some(SystemBgpVpn {
            bgp_instance: vec![InstanceId { id: BGP_INSTANCE }],
        });
    }
    Ok(())
}
