//! Fabric compute engine: runs the template pipeline for every selected switch and
//! hands the resulting container to the switch kind's encoder.

use crate::container::SwitchContainer;
use crate::encoder::{ConfigDocument, Encoders};
use crate::error::ComputeError;
use crate::models::{Fabric, Switch, Topology};
use crate::pipeline::{ComputeContext, ComputeStep, TemplateRegistry};
use crate::planner::AddressPlanner;

/// Result of one compute run. Both lists follow compute order.
#[derive(Debug, Default)]
pub struct ComputeOutcome<'t> {
    pub computed: Vec<(&'t Switch, ConfigDocument)>,
    pub failed: Vec<(&'t Switch, ComputeError)>,
}

impl ComputeOutcome<'_> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct FabricCompute<'t> {
    topology: &'t Topology,
    registry: &'t TemplateRegistry<ComputeStep>,
    encoders: &'t Encoders,
    interface_count: usize,
}

impl<'t> FabricCompute<'t> {
    pub fn new(
        topology: &'t Topology,
        registry: &'t TemplateRegistry<ComputeStep>,
        encoders: &'t Encoders,
        interface_count: usize,
    ) -> Self {
        Self {
            topology,
            registry,
            encoders,
            interface_count,
        }
    }

    /// Compute every switch named in `allowed` (all switches when empty).
    ///
    /// Fabrics in model order, leaves before spines. A switch failure is recorded and the
    /// run moves on. A failure caused by the fabric's pools fails the whole fabric: no
    /// document of it is returned, so a partial fabric is never pushed to devices.
    pub fn compute_all(&self, allowed: &[String]) -> ComputeOutcome<'t> {
        let mut outcome = ComputeOutcome::default();
        let selected = |s: &Switch| allowed.is_empty() || allowed.iter().any(|n| *n == s.name);

        for fabric in &self.topology.fabrics {
            let switches: Vec<&'t Switch> = fabric.switches().filter(|s| selected(*s)).collect();
            if switches.is_empty() {
                continue;
            }

            let planner = match AddressPlanner::new(fabric) {
                Ok(planner) => planner,
                Err(e) => {
                    tracing::error!(fabric = fabric.id, error = %e, "Fabric cannot be addressed");
                    outcome.failed.extend(switches.into_iter().map(|s| (s, e.clone())));
                    continue;
                }
            };
            self.compute_fabric(fabric, planner, switches, &mut outcome);
        }

        tracing::info!(
            computed = outcome.computed.len(),
            failed = outcome.failed.len(),
            "Compute run finished"
        );
        outcome
    }

    fn compute_fabric(
        &self,
        fabric: &'t Fabric,
        planner: AddressPlanner<'t>,
        switches: Vec<&'t Switch>,
        outcome: &mut ComputeOutcome<'t>,
    ) {
        let mut results = Vec::with_capacity(switches.len());
        let mut aborted = false;

        for switch in switches {
            if aborted {
                results.push((switch, Err(ComputeError::FabricAborted(fabric.id))));
                continue;
            }

            let span = tracing::info_span!("compute", switch = %switch.name, role = %switch.role);
            let _enter = span.enter();

            let result = self
                .run_pipeline(fabric, switch, planner)
                .and_then(|container| self.encoders.for_kind(switch.kind).encode(&container));
            match &result {
                Ok(document) => tracing::debug!(sections = document.len(), "Computed configuration"),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compute configuration");
                    if e.is_fabric_fatal() {
                        tracing::warn!(fabric = fabric.id, "Dropping every switch of fabric");
                        aborted = true;
                    }
                }
            }
            results.push((switch, result));
        }

        for (switch, result) in results {
            match result {
                Ok(document) if !aborted => outcome.computed.push((switch, document)),
                Ok(_) => outcome.failed.push((switch, ComputeError::FabricAborted(fabric.id))),
                Err(e) => outcome.failed.push((switch, e)),
            }
        }
    }

    pub fn compute_switch(&self, fabric: &'t Fabric, switch: &'t Switch) -> Result<ConfigDocument, ComputeError> {
        let container = self.build_container(fabric, switch)?;
        self.encoders.for_kind(switch.kind).encode(&container)
    }

    /// Run the switch's pipeline on a fresh container
    pub fn build_container(&self, fabric: &'t Fabric, switch: &'t Switch) -> Result<SwitchContainer, ComputeError> {
        self.run_pipeline(fabric, switch, AddressPlanner::new(fabric)?)
    }

    fn run_pipeline(
        &self,
        fabric: &'t Fabric,
        switch: &'t Switch,
        planner: AddressPlanner<'t>,
    ) -> Result<SwitchContainer, ComputeError> {
        let mut ctx = ComputeContext {
            topology: self.topology,
            fabric,
            switch,
            planner,
            container: SwitchContainer::new(self.interface_count),
        };
        self.registry.run(&mut ctx)?;
        Ok(ctx.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::InterfaceKind;
    use crate::loader::fixtures::{sample_topology, two_fabric_topology};
    use crate::models::PortId;
    use std::net::Ipv4Addr;

    const PORTS: usize = 20;

    fn container_of(topology: &Topology, name: &str) -> Result<SwitchContainer, ComputeError> {
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(topology, &registry, &encoders, PORTS);
        let switch = topology.find_switch(name).unwrap();
        engine.build_container(topology.fabric(switch.fabric_id()), switch)
    }

    fn ip_of(container: &SwitchContainer, iface: &str) -> String {
        container.interfaces.get(iface).unwrap().ips[&0].to_string()
    }

    #[test]
    fn test_first_leaf_addressing() {
        let topology = sample_topology();
        let leaf = container_of(&topology, "leaf1").unwrap();

        // spine1 uplink is the first of the two top ports
        assert_eq!(ip_of(&leaf, "ethernet-1/19"), "10.0.0.0/31");
        // spine2 owns the second half of the link pool
        assert_eq!(ip_of(&leaf, "ethernet-1/20"), "10.0.0.128/31");
        assert_eq!(ip_of(&leaf, "system0"), "10.255.0.33/32");
        assert_eq!(leaf.router.router_id, Ipv4Addr::new(10, 255, 0, 33));

        let uplink = leaf.interfaces.get("ethernet-1/19").unwrap();
        assert!(uplink.admin_state);
        assert_eq!(uplink.kind, InterfaceKind::L3);
        assert_eq!(uplink.mtu, 9000);
        assert_eq!(uplink.description, "spine1 ethernet-1/1");
    }

    #[test]
    fn test_link_ends_agree() {
        let topology = sample_topology();
        for (j, leaf_name) in ["leaf1", "leaf2", "leaf3", "leaf4"].iter().enumerate() {
            let leaf = container_of(&topology, leaf_name).unwrap();
            for (i, spine_name) in ["spine1", "spine2"].iter().enumerate() {
                let spine = container_of(&topology, spine_name).unwrap();
                let leaf_end = leaf.interfaces.get(&format!("ethernet-1/{}", 19 + i)).unwrap().ips[&0];
                let spine_end = spine.interfaces.get(&format!("ethernet-1/{}", j + 1)).unwrap().ips[&0];
                assert_eq!(leaf_end.trunc(), spine_end.trunc());
                assert_ne!(leaf_end.addr(), spine_end.addr());
                assert_eq!(spine.router.evpn_peers[*leaf_name], leaf.router.router_id);
                assert_eq!(leaf.router.evpn_peers[*spine_name], spine.router.router_id);
            }
        }
    }

    #[test]
    fn test_spine_container() {
        let topology = sample_topology();
        let spine = container_of(&topology, "spine2").unwrap();
        assert!(spine.router.route_reflector);
        assert_eq!(spine.router.router_id, Ipv4Addr::new(10, 255, 0, 2));
        assert_eq!(ip_of(&spine, "ethernet-1/1"), "10.0.0.129/31");
        assert_eq!(spine.interfaces.get("ethernet-1/1").unwrap().description, "leaf1 ethernet-1/20");
        assert_eq!(
            spine.router.interfaces,
            vec!["ethernet-1/1.0", "ethernet-1/2.0", "ethernet-1/3.0", "ethernet-1/4.0", "system0.0"]
        );
        // unused ports stay down
        assert!(!spine.interfaces.get("ethernet-1/5").unwrap().admin_state);
        assert!(spine.router.vlans.is_empty());
    }

    #[test]
    fn test_routing_identity() {
        let topology = sample_topology();
        let leaf = container_of(&topology, "leaf2").unwrap();
        assert_eq!(leaf.router.asn, 65100);
        assert_eq!(leaf.router.area, Ipv4Addr::new(0, 0, 0, 1));
        assert!(!leaf.router.route_reflector);
        assert_eq!(leaf.credentials.username, "admin");
        assert_eq!(leaf.address, Some(Ipv4Addr::new(172, 20, 0, 12)));
    }

    #[test]
    fn test_dual_homed_port_builds_lag_on_both_leaves() {
        let topology = sample_topology();
        let leaf1 = container_of(&topology, "leaf1").unwrap();
        let leaf2 = container_of(&topology, "leaf2").unwrap();

        for leaf in [&leaf1, &leaf2] {
            assert_eq!(leaf.interfaces.lags()[&1], vec!["ethernet-1/1".to_string()]);
            let lag = leaf.interfaces.get("lag1").unwrap();
            assert_eq!(lag.kind, InterfaceKind::L2);
            assert_eq!(lag.vlans, vec![100, 101]);
            assert!(leaf.interfaces.get("ethernet-1/1").unwrap().admin_state);
        }
        assert_eq!(leaf1.system_id, leaf2.system_id);

        let leaf3 = container_of(&topology, "leaf3").unwrap();
        assert_ne!(leaf3.system_id, leaf1.system_id);
    }

    #[test]
    fn test_single_homed_port_and_tenants() {
        let topology = sample_topology();
        let leaf = container_of(&topology, "leaf3").unwrap();

        assert!(leaf.interfaces.lags().is_empty());
        let access = leaf.interfaces.get("ethernet-1/2").unwrap();
        assert_eq!(access.kind, InterfaceKind::L2);
        assert_eq!(access.vlans, vec![100, 101, 200]);
        assert_eq!(access.description, "esx-01");

        assert_eq!(leaf.router.clients["acme"], 1);
        assert_eq!(leaf.router.clients["globex"], 2);
        assert_eq!(leaf.router.vlans["GLOBEX_APP"], 200);
        assert_eq!(leaf.router.subnets[&200].vrf, "globex");
        assert_eq!(leaf.router.subnets[&200].subnet.to_string(), "10.200.0.1/24");
        assert_eq!(leaf.router.reverse_vlan()[&100], "ACME_WEB");
    }

    #[test]
    fn test_leaf_without_ports_has_no_tenants() {
        let topology = sample_topology();
        let leaf = container_of(&topology, "leaf4").unwrap();
        assert!(leaf.router.clients.is_empty());
        assert!(leaf.router.subnets.is_empty());
    }

    #[test]
    fn test_port_on_uplink_is_rejected() {
        let mut topology = sample_topology();
        topology.fabrics[0].leaves[2].ports.insert(19, PortId(1));
        let err = container_of(&topology, "leaf3").unwrap_err();
        assert!(matches!(err, ComputeError::PortConflict { iface: 19, .. }));
    }

    #[test]
    fn test_port_out_of_range_is_rejected() {
        let mut topology = sample_topology();
        topology.fabrics[0].leaves[2].ports.insert(48, PortId(1));
        let err = container_of(&topology, "leaf3").unwrap_err();
        assert!(matches!(err, ComputeError::PortConflict { iface: 48, .. }));
    }

    #[test]
    fn test_filter_selects_one_leaf() {
        let topology = sample_topology();
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, PORTS);

        let outcome = engine.compute_all(&["leaf3".to_string()]);
        assert!(outcome.is_complete());
        assert_eq!(outcome.computed.len(), 1);
        assert_eq!(outcome.computed[0].0.name, "leaf3");
    }

    #[test]
    fn test_compute_order() {
        let topology = sample_topology();
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, PORTS);

        let names: Vec<&str> = engine
            .compute_all(&[])
            .computed
            .iter()
            .map(|(s, _)| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["leaf1", "leaf2", "leaf3", "leaf4", "spine1", "spine2"]);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let topology = sample_topology();
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, PORTS);

        let render = |outcome: ComputeOutcome| -> Vec<String> {
            outcome
                .computed
                .iter()
                .map(|(_, doc)| serde_json::to_string(doc).unwrap())
                .collect()
        };
        assert_eq!(render(engine.compute_all(&[])), render(engine.compute_all(&[])));
    }

    #[test]
    fn test_exhausted_pool_aborts_fabric() {
        let mut topology = sample_topology();
        // two /31 per spine: leaf3 no longer fits
        topology.fabrics[0].pool.links = "10.0.0.0/29".parse().unwrap();
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, PORTS);

        let outcome = engine.compute_all(&[]);
        assert!(outcome.computed.is_empty());
        assert_eq!(outcome.failed.len(), 6);
        assert!(outcome
            .failed
            .iter()
            .all(|(_, e)| matches!(e, ComputeError::AddressExhausted { required: 8, available: 4, .. })));

        // a filtered run over the same fabric fails the same way
        let outcome = engine.compute_all(&["leaf1".to_string()]);
        assert!(outcome.computed.is_empty());
        assert_eq!(outcome.failed[0].0.name, "leaf1");
    }

    #[test]
    fn test_exhausted_fabric_leaves_other_fabrics_alone() {
        let topology = two_fabric_topology();
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, PORTS);

        let outcome = engine.compute_all(&[]);
        let computed: Vec<&str> = outcome.computed.iter().map(|(s, _)| s.name.as_str()).collect();
        let failed: Vec<&str> = outcome.failed.iter().map(|(s, _)| s.name.as_str()).collect();
        assert_eq!(computed, vec!["dc2-leaf1", "dc2-spine1"]);
        assert_eq!(failed, vec!["dc1-leaf1", "dc1-leaf2", "dc1-leaf3", "dc1-spine1"]);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_more_spines_than_ports_fails_each_switch() {
        let mut topology = sample_topology();
        let extra = topology.fabrics[0].spines[1].clone();
        topology.fabrics[0].spines.push(extra);
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, 2);

        let outcome = engine.compute_all(&[]);
        assert!(outcome.computed.is_empty());
        assert_eq!(outcome.failed.len(), 7);
        assert!(outcome
            .failed
            .iter()
            .all(|(_, e)| matches!(e, ComputeError::PortExhausted { .. })));
    }

    #[test]
    fn test_switch_failure_does_not_stop_others() {
        let mut topology = sample_topology();
        topology.fabrics[0].leaves[0].ports.insert(20, PortId(1));
        let registry = TemplateRegistry::standard();
        let encoders = Encoders::standard();
        let engine = FabricCompute::new(&topology, &registry, &encoders, PORTS);

        let outcome = engine.compute_all(&[]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0.name, "leaf1");
        assert_eq!(outcome.computed.len(), 5);
    }
}
