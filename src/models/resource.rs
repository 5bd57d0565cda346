//! Resource interning (spec §3, §4.3 step 1): stable attributes describing a
//! telemetry producer, identified by a content hash over its sorted attributes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::attribute::Attributes;

/// A content-addressed reference to an interned `Resource`.
pub type ResourceRef = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub attributes: Attributes,
}

impl Resource {
    pub fn service_name(&self) -> Option<&str> {
        match self.attributes.get("service.name") {
            Some(crate::models::attribute::AttrValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Stable content hash over the sorted attribute set. `Attributes` is a
    /// `BTreeMap` so iteration order is already deterministic.
    pub fn content_hash(&self) -> ResourceRef {
        let mut hasher = Sha256::new();
        for (k, v) in &self.attributes {
            hasher.update(k.as_bytes());
            hasher.update([0u8]);
            hasher.update(v.as_display().as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        u64::from_be_bytes(digest[0..8].try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_attributes_hash_identically_regardless_of_insertion_order() {
        let mut a = Attributes::new();
        a.insert("service.name".into(), crate::models::attribute::AttrValue::String("x".into()));
        a.insert("host.name".into(), crate::models::attribute::AttrValue::String("h".into()));

        let mut b = Attributes::new();
        b.insert("host.name".into(), crate::models::attribute::AttrValue::String("h".into()));
        b.insert("service.name".into(), crate::models::attribute::AttrValue::String("x".into()));

        assert_eq!(Resource { attributes: a }.content_hash(), Resource { attributes: b }.content_hash());
    }
}
