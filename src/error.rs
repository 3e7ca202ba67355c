use ipnet::Ipv4Net;
use thiserror::Error;

/// Topology could not be turned into a resolved model. Fatal before any compute.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read topology {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid topology document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("fabric {fabric}: port ({switch}, {iface}) already defined")]
    DuplicatePort { fabric: u32, switch: u32, iface: u32 },

    #[error("fabric {fabric}: port {iface} references unknown leaf id {leaf_id}")]
    UnknownLeaf { fabric: u32, iface: u32, leaf_id: u32 },

    #[error("fabric {fabric}: port {iface} references unknown template '{template}'")]
    UnknownTemplate { fabric: u32, iface: u32, template: String },

    #[error("template '{template}' references unknown client '{client}'")]
    UnknownClient { template: String, client: String },

    #[error("switch name '{0}' is declared more than once")]
    DuplicateSwitch(String),

    #[error("fabric {fabric}: leaf id {leaf_id} is declared more than once")]
    DuplicateLeafId { fabric: u32, leaf_id: u32 },

    #[error("vlan {vlan_id} is used by both {first} and {second}")]
    DuplicateVlan { vlan_id: u16, first: String, second: String },

    #[error("invalid switch name '{0}'")]
    InvalidSwitchName(String),

    #[error("fabric {fabric}: port {iface} joins leaves {first} and {second} which are not a redundant pair")]
    UnpairedLag { fabric: u32, iface: u32, first: String, second: String },
}

/// A switch's configuration could not be computed. No partial document is produced.
#[derive(Debug, Clone, Error)]
pub enum ComputeError {
    #[error("insufficient address space in {pool} for {purpose}: need {required}, have {available}")]
    AddressExhausted {
        pool: Ipv4Net,
        purpose: &'static str,
        required: u64,
        available: u64,
    },

    #[error("fabric has {count} spines; loopback layout supports at most {max}")]
    TooManySpines { count: usize, max: usize },

    #[error("fabric has no spines")]
    NoSpines,

    #[error("cannot split {pool} into /{prefix} subnets")]
    InvalidPrefix { pool: Ipv4Net, prefix: u8 },

    #[error("interface {0} does not exist")]
    UnknownInterface(String),

    #[error("need {required} physical interfaces, switch has {available}")]
    PortExhausted { required: usize, available: usize },

    #[error("port {iface} conflicts with {reason}")]
    PortConflict { iface: u32, reason: String },

    #[error("vlan {vlan_id} is claimed by both {first} and {second}")]
    VlanCollision { vlan_id: u16, first: String, second: String },

    #[error("network instance {0} does not exist")]
    UnknownNetworkInstance(String),

    #[error("vlan {0} is not mapped to a tenant network")]
    UnknownVlan(u16),

    #[error("failed to encode configuration: {0}")]
    Encode(String),

    #[error("aborted after an earlier failure in fabric {0}")]
    FabricAborted(u32),
}

impl ComputeError {
    /// Errors caused by the fabric's pools rather than by one switch
    pub fn is_fabric_fatal(&self) -> bool {
        matches!(
            self,
            ComputeError::AddressExhausted { .. }
                | ComputeError::TooManySpines { .. }
                | ComputeError::NoSpines
                | ComputeError::InvalidPrefix { .. }
        )
    }
}
