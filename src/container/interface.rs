use std::collections::BTreeMap;

use indexmap::IndexMap;
use ipnet::Ipv4Net;

use crate::error::ComputeError;

pub const DEFAULT_MTU: u16 = 1500;
pub const FABRIC_MTU: u16 = 9000;
pub const LOOPBACK_NAME: &str = "system0";

/// Name of the n-th (1-based) front-panel port
pub fn physical_name(number: usize) -> String {
    format!("ethernet-1/{}", number)
}

pub fn lag_name(lag_id: u32) -> String {
    format!("lag{}", lag_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterfaceKind {
    L2,
    L3,
    #[default]
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub description: String,
    pub admin_state: bool,
    pub kind: InterfaceKind,
    /// Addresses keyed by subinterface index
    pub ips: BTreeMap<u32, Ipv4Net>,
    pub vlans: Vec<u16>,
    pub mtu: u16,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            admin_state: false,
            kind: InterfaceKind::Undefined,
            ips: BTreeMap::new(),
            vlans: Vec::new(),
            mtu: DEFAULT_MTU,
        }
    }

    /// MTU to emit, `None` when it is the platform default
    pub fn explicit_mtu(&self) -> Option<u16> {
        (self.mtu != DEFAULT_MTU).then_some(self.mtu)
    }
}

/// Every interface of a switch plus LAG membership
#[derive(Debug, Clone)]
pub struct InterfaceSet {
    interfaces: IndexMap<String, Interface>,
    lags: BTreeMap<u32, Vec<String>>,
    physical_count: usize,
}

impl InterfaceSet {
    /// Front-panel ports `ethernet-1/1..=count`, all in their default state
    pub fn new(physical_count: usize) -> Self {
        let interfaces = (1..=physical_count)
            .map(|n| {
                let name = physical_name(n);
                (name.clone(), Interface::new(name))
            })
            .collect();
        Self {
            interfaces,
            lags: BTreeMap::new(),
            physical_count,
        }
    }

    pub fn physical_count(&self) -> usize {
        self.physical_count
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Interface, ComputeError> {
        self.interfaces
            .get_mut(name)
            .ok_or_else(|| ComputeError::UnknownInterface(name.to_string()))
    }

    /// Add a logical interface, or return the existing one with that name
    pub fn ensure(&mut self, name: &str) -> &mut Interface {
        self.interfaces
            .entry(name.to_string())
            .or_insert_with(|| Interface::new(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Safe baseline: every interface administratively down
    pub fn shutdown_all(&mut self) {
        for iface in self.interfaces.values_mut() {
            iface.admin_state = false;
        }
    }

    pub fn add_lag_member(&mut self, lag_id: u32, member: &str) {
        let members = self.lags.entry(lag_id).or_default();
        if !members.iter().any(|m| m == member) {
            members.push(member.to_string());
        }
    }

    pub fn lags(&self) -> &BTreeMap<u32, Vec<String>> {
        &self.lags
    }
}
