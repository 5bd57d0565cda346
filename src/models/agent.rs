//! OpAMP agent state (spec §3, §4.7). Exclusively owned by the control plane.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub instance_id: Vec<u8>,
    pub agent_type: String,
    pub agent_version: String,
    pub effective_config: Option<String>,
    pub status: AgentStatus,
    pub last_seen_ns: i64,
}

impl AgentState {
    pub fn instance_id_hex(&self) -> String {
        crate::ids::hex_encode(&self.instance_id)
    }
}
