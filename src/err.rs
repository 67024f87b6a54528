use std::io;

use thiserror::Error;

use crate::chunk::{BitArrayVersion, BlockState};

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("index {index} is outside of the section (size {size})")]
    IndexOutOfBounds { index: usize, size: usize },
    #[error("code {code} does not fit in {version:?} (max {max})")]
    CodeOutOfRange {
        code: u32,
        version: BitArrayVersion,
        max: u32,
    },
    #[error("unable to set block runtime ID: {identity}, palette: {palette:?}: {source}")]
    InvalidBlock {
        identity: BlockState,
        palette: Vec<BlockState>,
        #[source]
        source: Box<StorageError>,
    },
    #[error("palette is full at {version:?}, cannot add block {identity}")]
    PaletteFull {
        identity: BlockState,
        version: BitArrayVersion,
    },
    #[error("expected {expected} words for {version:?}, got {received}")]
    WordCountMismatch {
        version: BitArrayVersion,
        expected: usize,
        received: usize,
    },
    #[error("invalid palette header byte {0:#04x}")]
    InvalidHeader(u8),
    #[error("palette code {code} has no entry (palette length {palette_len})")]
    DanglingCode { code: u32, palette_len: usize },
    #[error("palette of {len} entries does not fit in {version:?}")]
    PaletteTooLarge {
        len: usize,
        version: BitArrayVersion,
    },
    #[error("block {identity} appears twice in the palette, at {first} and {second}")]
    DuplicatePaletteEntry {
        identity: BlockState,
        first: u32,
        second: u32,
    },
    #[error("block {0} is not known to the block palette")]
    UnknownBlock(BlockState),
    #[error("block state {name}:{val} is not known to the block palette")]
    UnknownBlockState { name: String, val: i16 },
    #[error("NBT error: {0}")]
    Nbt(String),
    #[error("registry error: {0}")]
    Registry(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Any(String),
}

impl StorageError {
    /// Errors that come from a caller breaking the storage contract rather than
    /// from bad input data or the sink.
    pub fn is_contract_violation(&self) -> bool {
        match self {
            StorageError::IndexOutOfBounds { .. } => true,
            StorageError::CodeOutOfRange { .. } => true,
            StorageError::InvalidBlock { .. } => true,
            StorageError::PaletteFull { .. } => true,
            StorageError::WordCountMismatch { .. } => false,
            StorageError::InvalidHeader(_) => false,
            StorageError::DanglingCode { .. } => false,
            StorageError::PaletteTooLarge { .. } => false,
            StorageError::DuplicatePaletteEntry { .. } => false,
            StorageError::UnknownBlock(_) => false,
            StorageError::UnknownBlockState { .. } => false,
            StorageError::Nbt(_) => false,
            StorageError::Registry(_) => false,
            StorageError::Io(_) => false,
            StorageError::Any(_) => false,
        }
    }
}

impl From<String> for StorageError {
    fn from(s: String) -> Self {
        StorageError::Any(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_block_names_identity_and_palette() {
        let err = StorageError::InvalidBlock {
            identity: 42,
            palette: vec![0, 7],
            source: Box::new(StorageError::CodeOutOfRange {
                code: 2,
                version: BitArrayVersion::V1,
                max: 1,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("[0, 7]"));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn io_is_not_contract_violation() {
        let err: StorageError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(!err.is_contract_violation());
    }
}
