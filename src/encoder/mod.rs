//! Vendor schema encoders: working container in, wire document out.

pub mod srlinux;

use serde_json::Value;

use crate::container::SwitchContainer;
use crate::error::ComputeError;
use crate::models::SwitchKind;

pub use srlinux::SrlinuxEncoder;

/// Top-level vendor-namespaced key -> subtree, in emission order
pub type ConfigDocument = serde_json::Map<String, Value>;

pub trait SchemaEncoder: Send + Sync {
    fn kind(&self) -> SwitchKind;

    /// Deterministic: the same container always yields the same document
    fn encode(&self, container: &SwitchContainer) -> Result<ConfigDocument, ComputeError>;
}

/// One encoder per supported switch kind
pub struct Encoders {
    srlinux: SrlinuxEncoder,
}

impl Encoders {
    pub fn standard() -> Self {
        Self {
            srlinux: SrlinuxEncoder::new(),
        }
    }

    pub fn for_kind(&self, kind: SwitchKind) -> &dyn SchemaEncoder {
        match kind {
            SwitchKind::Srlinux => &self.srlinux,
        }
    }
}

impl Default for Encoders {
    fn default() -> Self {
        Self::standard()
    }
}

/// Serialize a wire struct into a document; anything but an object is an encoder bug
pub(crate) fn to_document<T: serde::Serialize>(tree: &T) -> Result<ConfigDocument, ComputeError> {
    match serde_json::to_value(tree) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ComputeError::Encode(format!(
            "expected an object at the document root, got {}",
            other
        ))),
        Err(e) => Err(ComputeError::Encode(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_dispatch() {
        let encoders = Encoders::standard();
        assert_eq!(encoders.for_kind(SwitchKind::Srlinux).kind(), SwitchKind::Srlinux);
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let err = to_document(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, ComputeError::Encode(_)));
    }
}
