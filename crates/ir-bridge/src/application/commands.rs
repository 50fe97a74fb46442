//! Named command table shared between the registry and every device.

use std::sync::Arc;

use indexmap::IndexMap;
use ir_core::CanonicalPacket;
use parking_lot::RwLock;

/// Command name → decoded packet, in insertion order.
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct CommandTable(Arc<RwLock<IndexMap<String, CanonicalPacket>>>);

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `packet` under `name`, returning the packet it replaced.
    ///
    /// Re-registering keeps the name's original position.
    pub fn insert(&self, name: &str, packet: CanonicalPacket) -> Option<CanonicalPacket> {
        self.0.write().insert(name.to_string(), packet)
    }

    pub fn get(&self, name: &str) -> Option<CanonicalPacket> {
        self.0.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Copy of every entry, in insertion order.
    pub fn snapshot(&self) -> Vec<(String, CanonicalPacket)> {
        self.0
            .read()
            .iter()
            .map(|(name, packet)| (name.clone(), packet.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}
