//! Agent registry and pending-config slots (spec §4.7). Exclusively owned
//! by the OpAMP control plane; uses a read/write-shaped API backed by
//! `dashmap` so status reads never block message handlers (spec §5).

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::models::agent::{AgentState, AgentStatus};

fn now_ns() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<DashMap<Vec<u8>, AgentState>>,
    /// Pending config per instance id: last-write-wins (spec §5).
    pending: Arc<DashMap<Vec<u8>, String>>,
    default_config: Arc<RwLock<Option<String>>>,
    hash_seq: Arc<AtomicI64>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            default_config: Arc::new(RwLock::new(None)),
            hash_seq: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn upsert(&self, instance_id: Vec<u8>, agent_type: String, agent_version: String, effective_config: Option<String>) {
        let now = now_ns();
        self.agents
            .entry(instance_id.clone())
            .and_modify(|a| {
                a.status = AgentStatus::Connected;
                a.last_seen_ns = now;
                if !agent_type.is_empty() {
                    a.agent_type = agent_type.clone();
                }
                if !agent_version.is_empty() {
                    a.agent_version = agent_version.clone();
                }
                if effective_config.is_some() {
                    a.effective_config = effective_config.clone();
                }
            })
            .or_insert_with(|| AgentState {
                instance_id,
                agent_type,
                agent_version,
                effective_config,
                status: AgentStatus::Connected,
                last_seen_ns: now,
            });
    }

    pub fn mark_disconnected(&self, instance_id: &[u8]) {
        if let Some(mut agent) = self.agents.get_mut(instance_id) {
            agent.status = AgentStatus::Disconnected;
        }
    }

    /// Sweeps agents whose last message predates `heartbeat_interval_ns` and
    /// marks them disconnected (spec §5: "a missed heartbeat interval
    /// transitions the agent to disconnected").
    pub fn reap_missed_heartbeats(&self, heartbeat_interval_ns: i64) {
        let now = now_ns();
        for mut agent in self.agents.iter_mut() {
            if agent.status == AgentStatus::Connected && now - agent.last_seen_ns > heartbeat_interval_ns {
                agent.status = AgentStatus::Disconnected;
            }
        }
    }

    /// Pops the pending config for `instance_id`, if any, returning the
    /// config body plus a push-unique hash (spec §4.7: "a hash that is
    /// unique per push, e.g. nanosecond timestamp").
    pub fn take_pending(&self, instance_id: &[u8]) -> Option<(String, Vec<u8>)> {
        let (_, config) = self.pending.remove(instance_id)?;
        let seq = self.hash_seq.fetch_add(1, Ordering::Relaxed);
        let hash = format!("{}-{seq}", now_ns()).into_bytes();
        Some((config, hash))
    }

    pub fn push_to_all_connected(&self, config: String) {
        for agent in self.agents.iter() {
            if agent.status == AgentStatus::Connected {
                self.pending.insert(agent.instance_id.clone(), config.clone());
            }
        }
    }

    pub fn push_to_one(&self, instance_id: &[u8], config: String) -> Result<(), Error> {
        if !self.agents.contains_key(instance_id) {
            return Err(Error::NotFound(format!(
                "no agent with instance_id {}",
                crate::ids::hex_encode(instance_id)
            )));
        }
        self.pending.insert(instance_id.to_vec(), config);
        Ok(())
    }

    pub fn list(&self) -> Vec<AgentState> {
        let mut agents: Vec<AgentState> = self.agents.iter().map(|e| e.value().clone()).collect();
        agents.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        agents
    }

    pub async fn set_default_config(&self, config: String) {
        *self.default_config.write().await = Some(config);
    }

    pub async fn default_config(&self) -> Option<String> {
        self.default_config.read().await.clone()
    }

    /// The effective config for `instance_id` if connected, or the server's
    /// current default (spec §4.7 `GET /config`).
    pub async fn effective_config(&self, instance_id: Option<&[u8]>) -> Option<String> {
        if let Some(id) = instance_id {
            if let Some(agent) = self.agents.get(id) {
                if agent.effective_config.is_some() {
                    return agent.effective_config.clone();
                }
            }
        }
        self.default_config().await
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Superficial YAML validation (spec §4.7, §9 open question: deeper schema
/// validation is out of scope for the core).
pub fn validate_collector_config(yaml: &str) -> Result<(), Error> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| Error::InvalidInput(format!("invalid YAML: {e}")))?;
    let mapping = value
        .as_mapping()
        .ok_or_else(|| Error::InvalidInput("config must be a YAML mapping".into()))?;
    for key in ["receivers", "exporters", "service"] {
        if !mapping.contains_key(key) {
            return Err(Error::InvalidInput(format!("config missing required key `{key}`")));
        }
    }
    Ok(())
}

pub fn spawn_heartbeat_reaper(registry: AgentRegistry, heartbeat_interval_seconds: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(heartbeat_interval_seconds));
        loop {
            ticker.tick().await;
            registry.reap_missed_heartbeats((heartbeat_interval_seconds * 1_000_000_000) as i64);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_yaml_missing_required_keys() {
        assert!(validate_collector_config("receivers: {}\nexporters: {}\n").is_err());
        assert!(validate_collector_config("receivers: {}\nexporters: {}\nservice: {}\n").is_ok());
    }

    #[tokio::test]
    async fn pending_config_push_is_idempotent_in_shape_but_unique_in_hash() {
        let registry = AgentRegistry::new();
        registry.upsert(vec![1, 2, 3], "collector".into(), "1.0".into(), None);
        registry.push_to_one(&[1, 2, 3], "receivers: {}".into()).unwrap();
        let (config1, hash1) = registry.take_pending(&[1, 2, 3]).unwrap();

        registry.push_to_one(&[1, 2, 3], "receivers: {}".into()).unwrap();
        let (config2, hash2) = registry.take_pending(&[1, 2, 3]).unwrap();

        assert_eq!(config1, config2);
        assert_ne!(hash1, hash2);
    }
}
