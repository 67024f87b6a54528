use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use crate::chunk::BlockState;
use crate::err::{Result, StorageError};

/// Deduplicated, append-only list of block states. A state's position is the
/// code stored for it in the bit array.
#[derive(Clone, Default)]
pub struct Palette {
    entries: Vec<BlockState>,
    state_to_id: HashMap<BlockState, u32>,
}

impl Palette {
    pub(crate) fn with_first(state: BlockState) -> Self {
        let mut palette = Self {
            entries: Vec::with_capacity(16),
            state_to_id: HashMap::with_capacity(16),
        };
        palette.push(state);
        palette
    }

    /// Builds a palette from decoded entries. A state listed twice is rejected.
    pub(crate) fn from_entries(entries: Vec<BlockState>) -> Result<Self> {
        let mut state_to_id = HashMap::with_capacity(entries.len());
        for (id, state) in entries.iter().enumerate() {
            if let Some(&first) = state_to_id.get(state) {
                return Err(StorageError::DuplicatePaletteEntry {
                    identity: *state,
                    first,
                    second: id as u32,
                });
            }
            state_to_id.insert(*state, id as u32);
        }
        Ok(Self {
            entries,
            state_to_id,
        })
    }

    pub fn index_of(&self, state: BlockState) -> Option<u32> {
        self.state_to_id.get(&state).copied()
    }

    /// Appends `state` and returns its code. Callers check membership first.
    pub(crate) fn push(&mut self, state: BlockState) -> u32 {
        let id = self.entries.len() as u32;
        self.entries.push(state);
        self.state_to_id.entry(state).or_insert(id);
        id
    }

    pub fn get(&self, id: u32) -> Option<BlockState> {
        self.entries.get(id as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[BlockState] {
        &self.entries
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Palette {}

impl Debug for Palette {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.entries)
    }
}
