//! Instrumentation scope interning (spec §3, §4.3 step 2).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type ScopeRef = u64;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Scope {
    pub name: String,
    pub version: String,
}

impl Scope {
    pub fn content_hash(&self) -> ScopeRef {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.version.as_bytes());
        let digest = hasher.finalize();
        u64::from_be_bytes(digest[0..8].try_into().unwrap())
    }
}
