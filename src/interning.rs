//! Shared Resource/Scope interning tables (spec §3 Ownership): written by the
//! Normalizer, read by the Aggregation Engine and Query API. Backed by
//! `dashmap` rather than a single `RwLock<HashMap>` so independent keys don't
//! contend, matching the fine-grained-locking requirement of spec §5.

use dashmap::DashMap;
use std::sync::Arc;

use crate::models::resource::{Resource, ResourceRef};
use crate::models::scope::{Scope, ScopeRef};

#[derive(Clone, Default)]
pub struct Interner {
    resources: Arc<DashMap<ResourceRef, Resource>>,
    scopes: Arc<DashMap<ScopeRef, Scope>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_resource(&self, resource: Resource) -> ResourceRef {
        let key = resource.content_hash();
        self.resources.entry(key).or_insert(resource);
        key
    }

    pub fn get_resource(&self, key: ResourceRef) -> Option<Resource> {
        self.resources.get(&key).map(|r| r.clone())
    }

    pub fn intern_scope(&self, scope: Scope) -> ScopeRef {
        let key = scope.content_hash();
        self.scopes.entry(key).or_insert(scope);
        key
    }

    pub fn get_scope(&self, key: ScopeRef) -> Option<Scope> {
        self.scopes.get(&key).map(|s| s.clone())
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Resolve a resource's `service.name` attribute, used throughout the
    /// Aggregation Engine and Query API to group records by service.
    pub fn service_name_of(&self, resource_ref: ResourceRef) -> Option<String> {
        self.get_resource(resource_ref).and_then(|r| r.service_name().map(str::to_string))
    }

    /// All resource refs whose `service.name` equals `name` (spec §4.5
    /// percentile fallback to spanmetrics-style histograms keyed by resource).
    pub fn resource_refs_for_service(&self, name: &str) -> Vec<ResourceRef> {
        self.resources
            .iter()
            .filter(|e| e.value().service_name() == Some(name))
            .map(|e| *e.key())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::{AttrValue, Attributes};

    #[test]
    fn interning_is_idempotent() {
        let interner = Interner::new();
        let mut attrs = Attributes::new();
        attrs.insert("service.name".into(), AttrValue::String("svc".into()));
        let r1 = interner.intern_resource(Resource { attributes: attrs.clone() });
        let r2 = interner.intern_resource(Resource { attributes: attrs });
        assert_eq!(r1, r2);
        assert_eq!(interner.resource_count(), 1);
    }
}
