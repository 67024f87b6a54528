pub mod chunk;
pub mod config;
pub mod err;
pub mod nbt;
pub mod protocol_types;
pub mod registry;
pub mod report;

pub use chunk::{BitArrayVersion, BlockState, PaletteKind, PalettedBlockStorage};
pub use err::{Result, StorageError};
pub use registry::{BlockRegistry, GlobalBlockPalette};
