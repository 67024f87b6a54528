mod bit_array;
mod codec;
mod palette;
mod storage;
mod version;

pub use bit_array::BitArray;
pub use codec::{PaletteEncoding, PaletteKind, StorageHeader};
pub use palette::Palette;
pub use storage::PalettedBlockStorage;
pub use version::BitArrayVersion;

/// Identity of a block state as the storage sees it: a runtime id, or a
/// legacy full id for cache storages.
pub type BlockState = u32;

pub const SECTION_EDGE: usize = 16;
pub const SECTION_SIZE: usize = SECTION_EDGE * SECTION_EDGE * SECTION_EDGE;

/// Flat index of a cell inside a section, in the XZY order Bedrock uses.
pub fn block_index(x: usize, y: usize, z: usize) -> Option<usize> {
    if x >= SECTION_EDGE || y >= SECTION_EDGE || z >= SECTION_EDGE {
        None
    } else {
        Some((x << 8) | (z << 4) | y)
    }
}
