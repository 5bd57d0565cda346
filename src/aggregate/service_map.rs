//! Service Map: node/edge inference from parent→child span relationships
//! (spec §4.5).

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::interning::Interner;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeType {
    Client,
    Server,
    External,
    Messaging,
    Isolated,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceMapNode {
    pub name: String,
    pub node_type: NodeType,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceMapEdge {
    pub from: String,
    pub to: String,
    pub call_count: u64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ServiceMap {
    pub nodes: Vec<ServiceMapNode>,
    pub edges: Vec<ServiceMapEdge>,
}

/// Builds the Service Map by streaming the span index once, resolving each
/// span's parent via the store's keyed span lookup (spec §4.5: "edge A → B
/// exists if there is a span in service B whose parent span ... belongs to
/// service A"). Self-service spans are excluded per spec §9.
pub fn service_map(store: &Store, interner: &Interner, self_service_name: &str, limit: usize) -> ServiceMap {
    let mut edges: HashMap<(String, String), u64> = HashMap::new();
    let mut messaging: HashSet<String> = HashSet::new();
    let mut all_services: HashSet<String> = HashSet::new();

    store.for_each_span(|span| {
        let Some(child_service) = interner.service_name_of(span.resource_ref) else { return };
        if child_service == self_service_name {
            return;
        }
        all_services.insert(child_service.clone());

        if let Some(crate::models::attribute::AttrValue::String(system)) = span.attributes.get("messaging.system") {
            let _ = system;
            messaging.insert(child_service.clone());
        }

        let Some(parent_id) = span.parent_span_id else { return };
        let Some(parent) = store.get_span(span.trace_id, parent_id) else { return };
        let Some(parent_service) = interner.service_name_of(parent.resource_ref) else { return };
        if parent_service == self_service_name || parent_service == child_service {
            return;
        }
        *edges.entry((parent_service, child_service)).or_insert(0) += 1;
    });

    let mut incoming: HashSet<&str> = HashSet::new();
    let mut outgoing: HashSet<&str> = HashSet::new();
    for (from, to) in edges.keys() {
        outgoing.insert(from.as_str());
        incoming.insert(to.as_str());
    }

    let mut nodes: Vec<ServiceMapNode> = all_services
        .iter()
        .map(|name| {
            let node_type = if messaging.contains(name) {
                NodeType::Messaging
            } else {
                match (incoming.contains(name.as_str()), outgoing.contains(name.as_str())) {
                    (false, true) => NodeType::Client,
                    (true, false) => NodeType::External,
                    (true, true) => NodeType::Server,
                    (false, false) => NodeType::Isolated,
                }
            };
            ServiceMapNode { name: name.clone(), node_type }
        })
        .collect();
    nodes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut edges: Vec<ServiceMapEdge> = edges
        .into_iter()
        .map(|((from, to), call_count)| ServiceMapEdge { from, to, call_count })
        .collect();
    edges.sort_by(|a, b| b.call_count.cmp(&a.call_count));
    edges.truncate(limit);

    ServiceMap { nodes, edges }
}
