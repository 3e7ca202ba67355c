//! Nokia SR Linux encoder.
//!
//! Runs the `srlinux` step group over an empty [`model::Device`] and serializes the
//! result. Interfaces and network instances are built in name-keyed maps so later steps
//! can attach subinterfaces and members to what earlier steps created.

pub mod base;
pub mod model;
pub mod multihoming;
pub mod tenant;

use super::{to_document, ConfigDocument, SchemaEncoder};
use crate::container::SwitchContainer;
use crate::error::ComputeError;
use crate::models::SwitchKind;
use crate::pipeline::TemplateRegistry;
use model::{Device, Interface, NetworkInstance, TunnelInterface};

pub const TUNNEL_NAME: &str = "vxlan1";

pub type EncodeStep = fn(&SwitchContainer, &mut Device) -> Result<(), ComputeError>;

pub struct SrlinuxEncoder {
    registry: TemplateRegistry<EncodeStep>,
}

impl SrlinuxEncoder {
    pub fn new() -> Self {
        let mut registry = TemplateRegistry::new();
        base::register(&mut registry);
        multihoming::register(&mut registry);
        tenant::register(&mut registry);
        Self { registry }
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.registry.step_names(&[SwitchKind::Srlinux.as_str()])
    }

    /// Wire tree for one switch, before serialization
    pub fn build(&self, container: &SwitchContainer) -> Result<Device, ComputeError> {
        let mut device = Device::default();
        for step in self.registry.group(SwitchKind::Srlinux.as_str()) {
            tracing::trace!(step = step.name, "running srlinux step");
            (step.run)(container, &mut device)?;
        }
        Ok(device)
    }
}

impl Default for SrlinuxEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaEncoder for SrlinuxEncoder {
    fn kind(&self) -> SwitchKind {
        SwitchKind::Srlinux
    }

    fn encode(&self, container: &SwitchContainer) -> Result<ConfigDocument, ComputeError> {
        to_document(&self.build(container)?)
    }
}

pub(crate) fn interface_mut<'d>(device: &'d mut Device, name: &str) -> Result<&'d mut Interface, ComputeError> {
    device
        .interfaces
        .get_mut(name)
        .ok_or_else(|| ComputeError::UnknownInterface(name.to_string()))
}

pub(crate) fn instance_mut<'d>(
    device: &'d mut Device,
    name: &str,
) -> Result<&'d mut NetworkInstance, ComputeError> {
    device
        .network_instances
        .get_mut(name)
        .ok_or_else(|| ComputeError::UnknownNetworkInstance(name.to_string()))
}

pub(crate) fn tunnel_mut(device: &mut Device) -> Result<&mut TunnelInterface, ComputeError> {
    device
        .tunnel_interfaces
        .iter_mut()
        .find(|t| t.name == TUNNEL_NAME)
        .ok_or_else(|| ComputeError::UnknownInterface(TUNNEL_NAME.to_string()))
}
