//! Ordered template pipeline.
//!
//! A group name ("common", "leaf", "spine", a vendor kind) maps to an ordered list of
//! steps. Steps are registered once, by the `register` function of each template module,
//! and run in registration order: later steps may read what earlier ones wrote.

pub mod common;
pub mod leaf;
pub mod spine;

use std::fmt;
use std::net::Ipv4Addr;

use indexmap::IndexMap;
use ipnet::Ipv4Net;

use crate::container::interface::LOOPBACK_NAME;
use crate::container::{InterfaceKind, SwitchContainer};
use crate::error::ComputeError;
use crate::models::{Fabric, Switch, Topology};
use crate::planner::AddressPlanner;

pub const COMMON_GROUP: &str = "common";

/// One registered step of a group
#[derive(Clone, Copy)]
pub struct NamedStep<S> {
    pub name: &'static str,
    pub run: S,
}

impl<S> fmt::Debug for NamedStep<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Group name -> ordered steps. Read-only once built.
pub struct TemplateRegistry<S> {
    groups: IndexMap<&'static str, Vec<NamedStep<S>>>,
}

impl<S: Copy> TemplateRegistry<S> {
    pub fn new() -> Self {
        Self { groups: IndexMap::new() }
    }

    pub fn register(&mut self, group: &'static str, name: &'static str, run: S) -> &mut Self {
        self.groups.entry(group).or_default().push(NamedStep { name, run });
        self
    }

    /// Steps of one group; an unknown group has none
    pub fn group(&self, group: &str) -> &[NamedStep<S>] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concatenation of the groups' steps, in the group order given
    pub fn resolve(&self, groups: &[&str]) -> Vec<NamedStep<S>> {
        groups
            .iter()
            .flat_map(|g| self.group(g).iter().copied())
            .collect()
    }

    pub fn step_names(&self, groups: &[&str]) -> Vec<&'static str> {
        self.resolve(groups).iter().map(|s| s.name).collect()
    }
}

impl<S: Copy> Default for TemplateRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for TemplateRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.groups.iter().map(|(g, steps)| (g, steps)))
            .finish()
    }
}

/// Everything a compute step may look at, plus the container it fills
pub struct ComputeContext<'a> {
    pub topology: &'a Topology,
    pub fabric: &'a Fabric,
    pub switch: &'a Switch,
    pub planner: AddressPlanner<'a>,
    pub container: SwitchContainer,
}

pub type ComputeStep = fn(&mut ComputeContext<'_>) -> Result<(), ComputeError>;

impl TemplateRegistry<ComputeStep> {
    /// Registry with the built-in common, leaf and spine templates
    pub fn standard() -> Self {
        let mut registry = Self::new();
        common::register(&mut registry);
        leaf::register(&mut registry);
        spine::register(&mut registry);
        registry
    }

    /// Run the switch's groups, in order, against the context's container
    pub fn run(&self, ctx: &mut ComputeContext<'_>) -> Result<(), ComputeError> {
        let groups = groups_for(ctx.switch);
        for step in self.resolve(&groups) {
            tracing::trace!(switch = %ctx.switch.name, step = step.name, "running compute step");
            (step.run)(ctx)?;
        }
        Ok(())
    }
}

/// Groups applied to a switch: the common baseline, then its role
pub fn groups_for(switch: &Switch) -> [&'static str; 2] {
    [COMMON_GROUP, switch.role.as_str()]
}

/// Front-panel number (1-based) of the uplink towards spine `spine_index`.
/// Uplinks occupy the top `spine_count` ports.
pub fn uplink_number(physical_count: usize, spine_count: usize, spine_index: usize) -> Result<usize, ComputeError> {
    physical_count
        .checked_sub(spine_count)
        .map(|first| first + spine_index + 1)
        .ok_or(ComputeError::PortExhausted {
            required: spine_count,
            available: physical_count,
        })
}

/// Create `system0` with the switch loopback and make it the router id
pub(crate) fn install_loopback(container: &mut SwitchContainer, loopback: Ipv4Addr) {
    let iface = container.interfaces.ensure(LOOPBACK_NAME);
    iface.admin_state = true;
    iface.kind = InterfaceKind::L3;
    iface.description = "EVPN TEP/OSPF loopback".to_string();
    iface.ips.insert(0, Ipv4Net::from(loopback));

    container.router.router_id = loopback;
    container.router.add_interface(format!("{}.0", LOOPBACK_NAME));
}

#[cfg(test)]
mod tests {
    use super::*;

    type Trace = Vec<&'static str>;
    type TraceStep = fn(&mut Trace);

    fn first(t: &mut Trace) {
        t.push("first");
    }
    fn second(t: &mut Trace) {
        t.push("second");
    }
    fn third(t: &mut Trace) {
        t.push("third");
    }

    #[test]
    fn test_groups_run_in_given_order() {
        let mut registry: TemplateRegistry<TraceStep> = TemplateRegistry::new();
        registry
            .register("leaf", "second", second)
            .register("common", "first", first)
            .register("leaf", "third", third);

        let mut trace = Vec::new();
        for step in registry.resolve(&["common", "leaf"]) {
            (step.run)(&mut trace);
        }
        assert_eq!(trace, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let registry: TemplateRegistry<TraceStep> = TemplateRegistry::new();
        assert!(registry.group("dci").is_empty());
        assert!(registry.resolve(&["common", "dci"]).is_empty());
    }

    #[test]
    fn test_standard_registration_order() {
        let registry = TemplateRegistry::<ComputeStep>::standard();
        assert_eq!(
            registry.step_names(&["common", "leaf"]),
            vec![
                "shutdown_interfaces",
                "routing_identity",
                "credentials",
                "spine_uplinks",
                "loopback",
                "tenant_networks",
                "lacp_system_id",
                "access_ports",
            ]
        );
        assert_eq!(
            registry.step_names(&["common", "spine"]),
            vec![
                "shutdown_interfaces",
                "routing_identity",
                "credentials",
                "route_reflector",
                "leaf_downlinks",
                "loopback",
            ]
        );
    }

    #[test]
    fn test_uplinks_sit_at_the_top() {
        assert_eq!(uplink_number(20, 2, 0).unwrap(), 19);
        assert_eq!(uplink_number(20, 2, 1).unwrap(), 20);
        assert_eq!(uplink_number(20, 1, 0).unwrap(), 20);
        assert_eq!(uplink_number(3, 3, 2).unwrap(), 3);
    }

    #[test]
    fn test_more_spines_than_ports() {
        assert!(matches!(
            uplink_number(2, 3, 0),
            Err(ComputeError::PortExhausted { required: 3, available: 2 })
        ));
    }
}
