use serde::{Deserialize, Serialize};

/// A persisted block identity: the stable name plus its metadata value.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct BlockStateEntry {
    pub name: String,
    #[serde(default)]
    pub val: i16,
}

impl BlockStateEntry {
    pub fn new(name: impl Into<String>, val: i16) -> Self {
        Self {
            name: name.into(),
            val,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct PaletteSlot {
    pub code: u32,
    pub identity: u32,
    pub block: Option<BlockStateEntry>,
    pub count: usize,
}

/// JSON-friendly report of one decoded section.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct SectionSummary {
    pub kind: String,
    pub bits_per_entry: u8,
    pub words: usize,
    pub empty: bool,
    pub palette: Vec<PaletteSlot>,
}
