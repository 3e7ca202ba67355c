//! YAML topology loader.
//!
//! Parses the declarative fabric description and resolves every name reference into the
//! index-based [`Topology`] model. All validation happens here, before any compute.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::path::Path;

use indexmap::IndexMap;
use ipnet::Ipv4Net;
use serde::Deserialize;

use crate::error::LoadError;
use crate::models::{
    AddressPool, Client, ClientId, ClientNetwork, Credentials, Fabric, FabricId, InterfaceTemplate,
    Port, PortId, Switch, SwitchKind, SwitchRole, TemplateId, TemplateKind, Topology,
};
use crate::utils::is_valid_hostname;

#[derive(Debug, Deserialize)]
struct RawTopology {
    #[serde(default)]
    default: Credentials,
    #[serde(default)]
    fabrics: Vec<RawFabric>,
    #[serde(default)]
    clients: IndexMap<String, RawClient>,
    #[serde(default)]
    templates: Vec<RawTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawFabric {
    id: u32,
    site: String,
    pool: AddressPool,
    #[serde(default)]
    spines: Vec<RawSwitch>,
    #[serde(default, alias = "lifs")]
    leaves: Vec<RawLeaf>,
    #[serde(default)]
    ports: Vec<RawPort>,
}

#[derive(Debug, Deserialize)]
struct RawSwitch {
    name: String,
    kind: SwitchKind,
    address: Ipv4Addr,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct RawLeaf {
    id: u32,
    #[serde(flatten)]
    switch: RawSwitch,
}

/// `sw: 3` for a single leaf, `sw: [1, 2]` for a redundant pair
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum LeafRef {
    Single(u32),
    Pair([u32; 2]),
}

impl LeafRef {
    fn ids(self) -> (u32, u32) {
        match self {
            LeafRef::Single(id) => (id, id),
            LeafRef::Pair([a, b]) => (a, b),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPort {
    #[serde(rename = "if")]
    iface: u32,
    sw: LeafRef,
    tpl: String,
    #[serde(default)]
    desc: String,
}

#[derive(Debug, Deserialize)]
struct RawClient {
    id: u32,
    #[serde(default)]
    networks: IndexMap<String, RawNetwork>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    vlan_id: u16,
    subnet: Ipv4Net,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    name: String,
    /// Checked against the known attachment types; nothing downstream depends on it
    #[serde(rename = "type")]
    #[allow(dead_code)]
    kind: TemplateKind,
    #[serde(default)]
    clients: Vec<String>,
}

/// Read and resolve a topology file
pub fn load(path: impl AsRef<Path>) -> Result<Topology, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let topology = load_str(&text)?;
    tracing::info!(
        path = %path.display(),
        fabrics = topology.fabrics.len(),
        switches = topology.switches().count(),
        "Loaded topology"
    );
    Ok(topology)
}

/// Resolve a topology from YAML text
pub fn load_str(text: &str) -> Result<Topology, LoadError> {
    let raw: RawTopology = serde_yaml::from_str(text)?;

    let clients = resolve_clients(raw.clients)?;
    let templates = resolve_templates(raw.templates, &clients)?;

    let mut seen_names = HashSet::new();
    let fabrics = raw
        .fabrics
        .into_iter()
        .enumerate()
        .map(|(index, fabric)| {
            resolve_fabric(
                FabricId(index),
                fabric,
                &raw.default,
                &templates,
                &mut seen_names,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Topology {
        defaults: raw.default,
        fabrics,
        clients,
        templates,
    })
}

fn resolve_clients(raw: IndexMap<String, RawClient>) -> Result<Vec<Client>, LoadError> {
    let mut clients = Vec::with_capacity(raw.len());
    let mut vlans: HashMap<u16, String> = HashMap::new();

    for (index, (name, client)) in raw.into_iter().enumerate() {
        let mut resolved = Client {
            id: client.id,
            name,
            networks: Vec::with_capacity(client.networks.len()),
        };
        for (network_name, network) in client.networks {
            let network = ClientNetwork {
                name: network_name,
                vlan_id: network.vlan_id,
                subnet: network.subnet,
                client: ClientId(index),
            };
            let qualified = resolved.network_name(&network);
            if let Some(first) = vlans.insert(network.vlan_id, qualified.clone()) {
                return Err(LoadError::DuplicateVlan {
                    vlan_id: network.vlan_id,
                    first,
                    second: qualified,
                });
            }
            resolved.networks.push(network);
        }
        clients.push(resolved);
    }
    Ok(clients)
}

fn resolve_templates(raw: Vec<RawTemplate>, clients: &[Client]) -> Result<Vec<InterfaceTemplate>, LoadError> {
    raw.into_iter()
        .map(|template| {
            let resolved = template
                .clients
                .iter()
                .map(|name| {
                    clients
                        .iter()
                        .position(|c| c.name == *name)
                        .map(ClientId)
                        .ok_or_else(|| LoadError::UnknownClient {
                            template: template.name.clone(),
                            client: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(InterfaceTemplate {
                name: template.name,
                clients: resolved,
            })
        })
        .collect()
}

fn resolve_switch(
    raw: RawSwitch,
    role: SwitchRole,
    leaf_id: Option<u32>,
    fabric: FabricId,
    position: usize,
    defaults: &Credentials,
    seen_names: &mut HashSet<String>,
) -> Result<Switch, LoadError> {
    if !is_valid_hostname(&raw.name) {
        return Err(LoadError::InvalidSwitchName(raw.name));
    }
    if !seen_names.insert(raw.name.clone()) {
        return Err(LoadError::DuplicateSwitch(raw.name));
    }

    let credentials = Credentials {
        username: if raw.username.is_empty() {
            defaults.username.clone()
        } else {
            raw.username
        },
        password: if raw.password.is_empty() {
            defaults.password.clone()
        } else {
            raw.password
        },
    };

    Ok(Switch {
        name: raw.name,
        kind: raw.kind,
        address: raw.address,
        credentials,
        role,
        leaf_id,
        fabric,
        position,
        ports: Default::default(),
    })
}

fn resolve_fabric(
    id: FabricId,
    raw: RawFabric,
    defaults: &Credentials,
    templates: &[InterfaceTemplate],
    seen_names: &mut HashSet<String>,
) -> Result<Fabric, LoadError> {
    let spines = raw
        .spines
        .into_iter()
        .enumerate()
        .map(|(position, spine)| {
            resolve_switch(spine, SwitchRole::Spine, None, id, position, defaults, seen_names)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut leaf_positions: HashMap<u32, usize> = HashMap::new();
    let mut leaves = Vec::with_capacity(raw.leaves.len());
    for (position, leaf) in raw.leaves.into_iter().enumerate() {
        if leaf_positions.insert(leaf.id, position).is_some() {
            return Err(LoadError::DuplicateLeafId {
                fabric: raw.id,
                leaf_id: leaf.id,
            });
        }
        leaves.push(resolve_switch(
            leaf.switch,
            SwitchRole::Leaf,
            Some(leaf.id),
            id,
            position,
            defaults,
            seen_names,
        )?);
    }

    let mut ports = Vec::with_capacity(raw.ports.len());
    let mut bound: HashSet<(u32, u32)> = HashSet::new();
    for (index, port) in raw.ports.into_iter().enumerate() {
        let (first, second) = port.sw.ids();
        let claimed = if first == second { vec![first] } else { vec![first, second] };
        for leaf_id in claimed {
            if !bound.insert((leaf_id, port.iface)) {
                return Err(LoadError::DuplicatePort {
                    fabric: raw.id,
                    switch: leaf_id,
                    iface: port.iface,
                });
            }
        }

        let position_of = |leaf_id: u32| {
            leaf_positions
                .get(&leaf_id)
                .copied()
                .ok_or(LoadError::UnknownLeaf {
                    fabric: raw.id,
                    iface: port.iface,
                    leaf_id,
                })
        };
        let (a, b) = (position_of(first)?, position_of(second)?);
        let members = (a.min(b), a.max(b));
        if members.0 != members.1 && (members.0 % 2 != 0 || members.1 != members.0 + 1) {
            return Err(LoadError::UnpairedLag {
                fabric: raw.id,
                iface: port.iface,
                first: leaves[members.0].name.clone(),
                second: leaves[members.1].name.clone(),
            });
        }

        let template = templates
            .iter()
            .position(|t| t.name == port.tpl)
            .map(TemplateId)
            .ok_or_else(|| LoadError::UnknownTemplate {
                fabric: raw.id,
                iface: port.iface,
                template: port.tpl.clone(),
            })?;

        let port_id = PortId(index);
        leaves[members.0].ports.insert(port.iface, port_id);
        leaves[members.1].ports.insert(port.iface, port_id);
        ports.push(Port {
            iface: port.iface,
            members,
            template,
            description: port.desc,
        });
    }

    Ok(Fabric {
        id: raw.id,
        site: raw.site,
        spines,
        leaves,
        pool: raw.pool,
        ports,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::{sample_topology, SAMPLE_TOPOLOGY};
    use super::*;

    fn load_err(text: &str) -> LoadError {
        load_str(text).unwrap_err()
    }

    const MINIMAL: &str = r#"
default: {username: admin, password: secret}
clients:
  acme:
    id: 1
    networks:
      web: {vlan_id: 100, subnet: 10.100.0.1/24}
templates:
  - {name: esx, type: esx, clients: [acme]}
fabrics:
  - id: 7
    site: lab
    pool: {loopbacks: 10.255.0.0/24, links: 10.0.0.0/24}
    spines:
      - {name: spine1, kind: srlinux, address: 10.1.0.1, username: ops}
    leaves:
      - {id: 1, name: leaf1, kind: srlinux, address: 10.1.0.11}
      - {id: 2, name: leaf2, kind: srlinux, address: 10.1.0.12, password: other}
      - {id: 3, name: leaf3, kind: srlinux, address: 10.1.0.13}
    ports: PORTS
"#;

    fn with_ports(ports: &str) -> String {
        MINIMAL.replace("PORTS", ports)
    }

    #[test]
    fn test_sample_topology() {
        let topology = sample_topology();
        assert_eq!(topology.fabrics.len(), 1);
        let fabric = &topology.fabrics[0];
        assert_eq!(fabric.id, 1);
        assert_eq!(fabric.site, "dc1");
        assert_eq!(fabric.spines.len(), 2);
        assert_eq!(fabric.leaves.len(), 4);
        assert_eq!(fabric.pool.links.to_string(), "10.0.0.0/24");

        let acme = &topology.clients[0];
        let names: Vec<String> = acme.networks.iter().map(|n| acme.network_name(n)).collect();
        assert_eq!(names, vec!["ACME_WEB", "ACME_DB"]);
        assert_eq!(topology.template(TemplateId(1)).clients, vec![ClientId(0), ClientId(1)]);
    }

    #[test]
    fn test_ports_bind_both_leaves() {
        let topology = sample_topology();
        let fabric = &topology.fabrics[0];
        let leaf1: Vec<_> = fabric.leaves[0].ports().collect();
        let leaf2: Vec<_> = fabric.leaves[1].ports().collect();
        assert_eq!(leaf1, vec![(1, PortId(0))]);
        assert_eq!(leaf1, leaf2);
        assert_eq!(fabric.port(PortId(0)).members, (0, 1));
        assert!(fabric.port(PortId(0)).is_multi_homed());
        assert_eq!(fabric.leaves[2].ports().collect::<Vec<_>>(), vec![(2, PortId(1))]);
        assert!(!fabric.port(PortId(1)).is_multi_homed());
        assert_eq!(fabric.leaves[3].ports().count(), 0);
    }

    #[test]
    fn test_switch_identity() {
        let topology = sample_topology();
        let leaf = topology.find_switch("leaf2").unwrap();
        assert_eq!(leaf.role, SwitchRole::Leaf);
        assert_eq!(leaf.leaf_id, Some(2));
        assert_eq!(leaf.position(), 1);
        assert_eq!(leaf.address, Ipv4Addr::new(172, 20, 0, 12));
        let spine = topology.find_switch("spine2").unwrap();
        assert_eq!(spine.role, SwitchRole::Spine);
        assert_eq!(spine.position(), 1);
        assert_eq!(spine.leaf_id, None);
    }

    #[test]
    fn test_default_credentials_propagate() {
        let topology = load_str(&with_ports("[]")).unwrap();
        let spine = topology.find_switch("spine1").unwrap();
        assert_eq!(spine.credentials.username, "ops");
        assert_eq!(spine.credentials.password, "secret");
        let leaf2 = topology.find_switch("leaf2").unwrap();
        assert_eq!(leaf2.credentials.username, "admin");
        assert_eq!(leaf2.credentials.password, "other");
        assert!(SAMPLE_TOPOLOGY.contains("lifs:"));
        assert_eq!(topology.fabrics[0].leaves.len(), 3);
    }

    #[test]
    fn test_reversed_pair_is_normalized() {
        let topology = load_str(&with_ports("[{if: 4, sw: [2, 1], tpl: esx, desc: host}]")).unwrap();
        assert_eq!(topology.fabrics[0].ports[0].members, (0, 1));
    }

    #[test]
    fn test_duplicate_port() {
        let err = load_err(&with_ports(
            "[{if: 4, sw: [1, 2], tpl: esx}, {if: 4, sw: 2, tpl: esx}]",
        ));
        assert!(matches!(err, LoadError::DuplicatePort { fabric: 7, switch: 2, iface: 4 }));
    }

    #[test]
    fn test_unknown_references() {
        let err = load_err(&with_ports("[{if: 4, sw: 9, tpl: esx}]"));
        assert!(matches!(err, LoadError::UnknownLeaf { leaf_id: 9, .. }));

        let err = load_err(&with_ports("[{if: 4, sw: 1, tpl: nas}]"));
        assert!(matches!(err, LoadError::UnknownTemplate { template, .. } if template == "nas"));

        let err = load_err(&MINIMAL.replace("clients: [acme]", "clients: [initech]").replace("PORTS", "[]"));
        assert!(matches!(err, LoadError::UnknownClient { client, .. } if client == "initech"));
    }

    #[test]
    fn test_unpaired_lag() {
        let err = load_err(&with_ports("[{if: 4, sw: [2, 3], tpl: esx}]"));
        assert!(matches!(
            err,
            LoadError::UnpairedLag { first, second, .. } if first == "leaf2" && second == "leaf3"
        ));
    }

    #[test]
    fn test_duplicate_switches() {
        let text = with_ports("[]").replace("name: leaf3", "name: leaf1");
        assert!(matches!(load_err(&text), LoadError::DuplicateSwitch(name) if name == "leaf1"));

        let text = with_ports("[]").replace("{id: 3,", "{id: 2,");
        assert!(matches!(load_err(&text), LoadError::DuplicateLeafId { fabric: 7, leaf_id: 2 }));

        let text = with_ports("[]").replace("name: leaf3", "name: \"leaf 3\"");
        assert!(matches!(load_err(&text), LoadError::InvalidSwitchName(_)));
    }

    #[test]
    fn test_duplicate_vlan() {
        let text = with_ports("[]").replace(
            "templates:",
            "  globex:\n    id: 2\n    networks:\n      app: {vlan_id: 100, subnet: 10.200.0.1/24}\ntemplates:",
        );
        assert!(matches!(
            load_err(&text),
            LoadError::DuplicateVlan { vlan_id: 100, first, second } if first == "ACME_WEB" && second == "GLOBEX_APP"
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let text = with_ports("[]").replace("name: leaf3, kind: srlinux", "name: leaf3, kind: eos");
        assert!(matches!(load_err(&text), LoadError::Parse(_)));
    }

    #[test]
    fn test_unknown_template_type_is_rejected() {
        let text = with_ports("[]").replace("type: esx", "type: router");
        assert!(matches!(load_err(&text), LoadError::Parse(_)));
        assert!(load_str(&with_ports("[]").replace("type: esx", "type: appliance")).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = load("/nonexistent/topology.yaml").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
