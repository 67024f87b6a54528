use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use palettecraft_lib::dto::BlockStateEntry;
use tokio::fs;

use crate::chunk::BlockState;
use crate::err::{Result, StorageError};

pub const AIR: &str = "minecraft:air";

/// Read-only view of the global block palette: maps runtime identities to the
/// stable name and metadata pairs used in persisted storages.
pub trait BlockRegistry: Send + Sync {
    fn identity_for(&self, name: &str, val: i16) -> Option<BlockState>;

    fn name_and_metadata_for(&self, identity: BlockState) -> Option<(&str, i16)>;

    fn default_air_identity(&self) -> BlockState;
}

/// Registry backed by an ordered list of block states. A state's runtime
/// identity is its position in the list.
#[derive(Debug, Clone)]
pub struct GlobalBlockPalette {
    states: Vec<BlockStateEntry>,
    state_to_id: HashMap<(String, i16), BlockState>,
    air: BlockState,
}

impl GlobalBlockPalette {
    pub fn from_entries(states: Vec<BlockStateEntry>) -> Result<Self> {
        let mut state_to_id = HashMap::with_capacity(states.len());
        for (id, state) in states.iter().enumerate() {
            let key = (state.name.clone(), state.val);
            if state_to_id.insert(key, id as BlockState).is_some() {
                return Err(StorageError::Registry(format!(
                    "duplicate block state {}:{}",
                    state.name, state.val
                )));
            }
        }
        let air = state_to_id
            .get(&(AIR.to_string(), 0))
            .copied()
            .unwrap_or(0);
        debug!("Global block palette has {} states, air = {air}", states.len());
        Ok(Self {
            states,
            state_to_id,
            air,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let states: Vec<BlockStateEntry> = serde_json::from_str(json)
            .map_err(|e| StorageError::Registry(format!("invalid block palette json: {e}")))?;
        Self::from_entries(states)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).await?;
        let registry = Self::from_json_str(&json)?;
        info!(
            "Loaded {} block states from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl BlockRegistry for GlobalBlockPalette {
    fn identity_for(&self, name: &str, val: i16) -> Option<BlockState> {
        self.state_to_id.get(&(name.to_string(), val)).copied()
    }

    fn name_and_metadata_for(&self, identity: BlockState) -> Option<(&str, i16)> {
        self.states
            .get(identity as usize)
            .map(|state| (state.name.as_str(), state.val))
    }

    fn default_air_identity(&self) -> BlockState {
        self.air
    }
}
