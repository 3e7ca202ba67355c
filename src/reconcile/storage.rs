use std::sync::{Arc, OnceLock};

use regex_lite::Regex;
use serde_json::Value;

use super::report::SwitchReport;
use crate::device::DeviceClient;
use crate::encoder::ConfigDocument;

/// YANG module prefixes removed from anything shown to the operator
const NAMESPACES: &[&str] = &[
    "srl_nokia-interfaces-ip-dhcp:",
    "srl_nokia-interfaces-lag:",
    "srl_nokia-interfaces-nbr-virtual-ip-discovery:",
    "srl_nokia-interfaces-vlans:",
    "srl_nokia-interfaces:",
    "srl_nokia-lacp:",
    "srl_nokia-network-instance:",
    "srl_nokia-linux:",
    "srl_nokia-ospf:",
    "srl_nokia-bgp-evpn:",
    "srl_nokia-bgp-vpn:",
    "srl_nokia-bgp:",
    "srl_nokia-tunnel-interfaces-vxlan-interface:",
    "srl_nokia-tunnel-interfaces:",
    "srl_nokia-routing-policy:",
    "srl_nokia-system-network-instance-bgp-evpn-ethernet-segments:",
    "srl_nokia-system-network-instance-bgp-vpn:",
    "srl_nokia-system-network-instance:",
    "srl_nokia-system-banner:",
    "srl_nokia-system:",
    "srl_nokia-aaa:",
    "srl_nokia-ssh:",
    "srl_nokia-snmp:",
    "srl_nokia-logging:",
    "srl_nokia-tls:",
    "srl_nokia-json-rpc:",
    "srl_nokia-netconf-server:",
    "srl_nokia-dns:",
    "srl_nokia-grpc:",
    "srl_nokia-acl:",
    "srl_nokia-openconfig:",
];

fn namespace_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let alternation = NAMESPACES
                .iter()
                .map(|ns| regex_lite::escape(ns))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&alternation).ok()
        })
        .as_ref()
}

/// Drop the known module prefixes from JSON or diff text
pub fn strip_namespaces(text: &str) -> String {
    match namespace_pattern() {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Top-level containers the device shares with the fabric. The computed members are
/// overlaid on the running container instead of replacing it.
const SHARED_CONTAINERS: &[&str] = &["srl_nokia-system:system"];

/// Overlay `target` on `base` by top-level key. Keys only in `base` pass through untouched.
pub fn merge(base: &ConfigDocument, target: &ConfigDocument) -> ConfigDocument {
    let mut merged = base.clone();
    for (key, value) in target {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Per-switch state carried through the reconciliation stages
pub struct SwitchStorage {
    pub(crate) name: String,
    target: ConfigDocument,
    base: ConfigDocument,
    pub(crate) client: Option<Arc<dyn DeviceClient>>,
    pub(crate) report: SwitchReport,
}

impl SwitchStorage {
    pub fn new(name: impl Into<String>, target: ConfigDocument) -> Self {
        let name = name.into();
        Self {
            report: SwitchReport::new(name.clone()),
            name,
            target,
            base: ConfigDocument::new(),
            client: None,
        }
    }

    pub fn set_base(&mut self, base: ConfigDocument) {
        self.base = base;
    }

    /// Document sent to the device
    pub fn merged(&self) -> ConfigDocument {
        let mut target = self.target.clone();
        for key in SHARED_CONTAINERS {
            let overlaid = match (self.base.get(*key), target.get(*key)) {
                (Some(Value::Object(running)), Some(Value::Object(computed))) => merge(running, computed),
                _ => continue,
            };
            target.insert(key.to_string(), Value::Object(overlaid));
        }
        merge(&self.base, &target)
    }

    /// Computed target as pretty JSON without module prefixes
    pub fn rendered_target(&self) -> Result<String, serde_json::Error> {
        let text = serde_json::to_string_pretty(&Value::Object(self.target.clone()))?;
        Ok(strip_namespaces(&text))
    }

    /// Client for later stages; none once the switch could not be reached
    pub(crate) fn active_client(&self) -> Option<Arc<dyn DeviceClient>> {
        if self.report.collect.is_failed() {
            None
        } else {
            self.client.clone()
        }
    }
}
