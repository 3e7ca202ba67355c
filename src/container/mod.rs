//! Vendor-neutral working state accumulated by the compute pipeline for one switch.

pub mod interface;
pub mod routing;

use std::net::Ipv4Addr;

pub use interface::{Interface, InterfaceKind, InterfaceSet};
pub use routing::{RoutingInfo, TenantSubnet};

use crate::models::Credentials;

#[derive(Debug, Clone)]
pub struct SwitchContainer {
    pub interfaces: InterfaceSet,
    pub router: RoutingInfo,
    /// LACP system id shared by both members of a redundant leaf pair
    pub system_id: String,
    pub credentials: Credentials,
    pub address: Option<Ipv4Addr>,
}

impl SwitchContainer {
    pub fn new(physical_count: usize) -> Self {
        Self {
            interfaces: InterfaceSet::new(physical_count),
            router: RoutingInfo::default(),
            system_id: String::new(),
            credentials: Credentials::default(),
            address: None,
        }
    }
}
