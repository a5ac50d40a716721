// 📄 Vehicle Document - One Fleetio API record
//
// A thin wrapper over the raw JSON object. `id` is the only field we
// require; everything else is optional and read through tolerant
// accessors, so a sparse or partially-filled record never errors.

use anyhow::{bail, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::coerce::coerce_int;

/// A single vehicle record as returned by the Fleetio API.
#[derive(Debug, Clone)]
pub struct VehicleDocument {
    root: Value,
    fleetio_id: i64,
}

impl VehicleDocument {
    /// Wrap a raw JSON value. The document must be an object carrying an
    /// `id` convertible to an integer; anything else is rejected here so
    /// downstream extraction never has to re-check.
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            bail!("vehicle document is not a JSON object");
        }
        let fleetio_id = match coerce_int(root.get("id")) {
            Some(id) => id,
            None => bail!("vehicle document has no usable `id` field"),
        };
        Ok(VehicleDocument { root, fleetio_id })
    }

    /// The Fleetio identifier - the stable dedup key for reconciliation.
    pub fn fleetio_id(&self) -> i64 {
        self.fleetio_id
    }

    /// Top-level field access.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Field under the `custom_fields` sub-document. A missing or
    /// malformed sub-document reads as empty, never as an error.
    pub fn custom_field(&self, key: &str) -> Option<&Value> {
        self.nested_field("custom_fields", key)
    }

    /// Field under the `specs` sub-document, same tolerance.
    pub fn spec_field(&self, key: &str) -> Option<&Value> {
        self.nested_field("specs", key)
    }

    fn nested_field(&self, group: &str, key: &str) -> Option<&Value> {
        self.root.get(group)?.as_object()?.get(key)
    }

    /// SHA-256 hex digest of the serialized document. Recorded in the
    /// audit log so a created row can be traced back to the exact payload
    /// that produced it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.root.to_string());
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_object_with_id() {
        assert!(VehicleDocument::from_value(json!({"id": 42})).is_ok());
        assert!(VehicleDocument::from_value(json!({"id": "42"})).is_ok());
        assert!(VehicleDocument::from_value(json!({"name": "BUS-1"})).is_err());
        assert!(VehicleDocument::from_value(json!({"id": "not a number"})).is_err());
        assert!(VehicleDocument::from_value(json!([1, 2, 3])).is_err());
        assert!(VehicleDocument::from_value(json!("id: 42")).is_err());
    }

    #[test]
    fn test_fleetio_id_coerces_like_any_scalar() {
        let doc = VehicleDocument::from_value(json!({"id": "42"})).unwrap();
        assert_eq!(doc.fleetio_id(), 42);
    }

    #[test]
    fn test_nested_access_tolerates_missing_subdocuments() {
        let doc = VehicleDocument::from_value(json!({"id": 1})).unwrap();
        assert!(doc.custom_field("ac_units").is_none());
        assert!(doc.spec_field("body_type").is_none());

        // Sub-document present but not an object: same answer, no panic.
        let doc =
            VehicleDocument::from_value(json!({"id": 1, "custom_fields": "oops"})).unwrap();
        assert!(doc.custom_field("ac_units").is_none());
    }

    #[test]
    fn test_nested_access_reads_present_values() {
        let doc = VehicleDocument::from_value(json!({
            "id": 1,
            "custom_fields": {"ac_units": "2"},
            "specs": {"body_type": "Conventional"}
        }))
        .unwrap();

        assert_eq!(doc.custom_field("ac_units"), Some(&json!("2")));
        assert_eq!(doc.spec_field("body_type"), Some(&json!("Conventional")));
        assert!(doc.custom_field("missing").is_none());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let doc = VehicleDocument::from_value(json!({"id": 1, "name": "BUS-1"})).unwrap();
        let a = doc.fingerprint();
        let b = doc.fingerprint();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64, "SHA-256 hash should be 64 hex characters");
    }
}
