//! OTLP → internal record normalization (spec §4.3). One submodule per
//! signal; each batch is admitted atomically (spec §4.3 "Ordering").

pub mod logs;
pub mod metrics;
pub mod spans;

use crate::interning::Interner;
use crate::models::resource::Resource;
use crate::models::scope::{Scope, ScopeRef};
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::resource::v1::Resource as OtlpResource;

use crate::models::attribute::attributes_from_otlp;
use crate::models::resource::ResourceRef;

/// Intern step 1 of spec §4.3: content-hash the resource's sorted attributes.
pub fn intern_resource(interner: &Interner, resource: Option<&OtlpResource>) -> (ResourceRef, usize) {
    let (attrs, dropped) = resource.map(|r| attributes_from_otlp(&r.attributes)).unwrap_or_default();
    (interner.intern_resource(Resource { attributes: attrs }), dropped)
}

/// Intern step 2: instrumentation scope identity (name, version).
pub fn intern_scope(interner: &Interner, scope: Option<&InstrumentationScope>) -> ScopeRef {
    let scope = match scope {
        Some(s) => Scope { name: s.name.clone(), version: s.version.clone() },
        None => Scope::default(),
    };
    interner.intern_scope(scope)
}

/// Outcome of normalizing one OTLP batch: how many records were admitted vs.
/// rejected, surfaced back to the ingestion endpoint for its response
/// counters (spec §4.4).
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizeOutcome {
    pub accepted: usize,
    pub rejected: usize,
}
