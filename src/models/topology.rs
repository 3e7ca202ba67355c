use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// Role a switch plays inside a fabric. Doubles as the pipeline group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchRole {
    Leaf,
    Spine,
}

impl SwitchRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchRole::Leaf => "leaf",
            SwitchRole::Spine => "spine",
        }
    }
}

impl fmt::Display for SwitchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device operating system. Unknown kinds are rejected when the topology is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchKind {
    Srlinux,
}

impl SwitchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchKind::Srlinux => "srlinux",
        }
    }
}

impl fmt::Display for SwitchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login used by the device client
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FabricId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub usize);

/// Switch belonging to a fabric.
///
/// The fabric link is an index into [`Topology::fabrics`]; the port map is filled by the
/// loader and never changes afterwards.
#[derive(Debug, Clone)]
pub struct Switch {
    pub name: String,
    pub kind: SwitchKind,
    pub address: Ipv4Addr,
    pub credentials: Credentials,
    pub role: SwitchRole,
    /// Numeric id used by port declarations (leaves only)
    pub leaf_id: Option<u32>,
    pub(crate) fabric: FabricId,
    pub(crate) position: usize,
    pub(crate) ports: BTreeMap<u32, PortId>,
}

impl Switch {
    pub fn fabric_id(&self) -> FabricId {
        self.fabric
    }

    /// Index of this switch within its fabric's leaf or spine list
    pub fn position(&self) -> usize {
        self.position
    }

    /// Ports occupying a physical interface of this switch, by interface index
    pub fn ports(&self) -> impl Iterator<Item = (u32, PortId)> + '_ {
        self.ports.iter().map(|(iface, id)| (*iface, *id))
    }
}

/// IP resources carved by the address planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPool {
    pub loopbacks: Ipv4Net,
    pub links: Ipv4Net,
}

/// Physical attachment on one leaf, or on both leaves of a redundant pair
#[derive(Debug, Clone)]
pub struct Port {
    pub iface: u32,
    /// Leaf positions bound by this port; equal for a single-homed port
    pub members: (usize, usize),
    pub template: TemplateId,
    pub description: String,
}

impl Port {
    pub fn is_multi_homed(&self) -> bool {
        self.members.0 != self.members.1
    }
}

#[derive(Debug, Clone)]
pub struct Fabric {
    pub id: u32,
    pub site: String,
    pub spines: Vec<Switch>,
    pub leaves: Vec<Switch>,
    pub pool: AddressPool,
    pub ports: Vec<Port>,
}

impl Fabric {
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    /// Leaves first, then spines, each in declaration order
    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.leaves.iter().chain(self.spines.iter())
    }
}

/// Port profile naming the tenants reachable behind it
/// Attachment type declared by a template. Validated on load only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Appliance,
    Esx,
}

#[derive(Debug, Clone)]
pub struct InterfaceTemplate {
    pub name: String,
    pub clients: Vec<ClientId>,
}

#[derive(Debug, Clone)]
pub struct ClientNetwork {
    pub name: String,
    pub vlan_id: u16,
    /// Gateway address with the network prefix length
    pub subnet: Ipv4Net,
    pub client: ClientId,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub id: u32,
    pub name: String,
    pub networks: Vec<ClientNetwork>,
}

impl Client {
    /// Tenant-scoped network name, e.g. `ACME_WEB`
    pub fn network_name(&self, network: &ClientNetwork) -> String {
        format!("{}_{}", self.name.to_uppercase(), network.name.to_uppercase())
    }
}

/// Fully resolved fabric description. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct Topology {
    pub defaults: Credentials,
    pub fabrics: Vec<Fabric>,
    pub clients: Vec<Client>,
    pub templates: Vec<InterfaceTemplate>,
}

impl Topology {
    pub fn fabric(&self, id: FabricId) -> &Fabric {
        &self.fabrics[id.0]
    }

    pub fn client(&self, id: ClientId) -> &Client {
        &self.clients[id.0]
    }

    pub fn template(&self, id: TemplateId) -> &InterfaceTemplate {
        &self.templates[id.0]
    }

    /// Every switch of every fabric, in compute order
    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.fabrics.iter().flat_map(|f| f.switches())
    }

    pub fn find_switch(&self, name: &str) -> Option<&Switch> {
        self.switches().find(|s| s.name == name)
    }
}
