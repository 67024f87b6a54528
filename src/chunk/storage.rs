use log::{debug, trace, warn};

use crate::chunk::{BitArray, BitArrayVersion, BlockState, Palette, SECTION_SIZE};
use crate::err::{Result, StorageError};
use crate::registry::BlockRegistry;

/// Block states of one 16x16x16 section: a palette of distinct states plus a
/// `BitArray` of codes into it, widened on demand as the palette grows.
///
/// Not synchronised. Whoever owns the section mutates it; anything that needs
/// to work on it concurrently takes a [`copy`](Self::copy) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedBlockStorage {
    palette: Palette,
    bit_array: BitArray,
}

impl PalettedBlockStorage {
    pub fn new(registry: &dyn BlockRegistry) -> Self {
        Self::with_version(BitArrayVersion::narrowest(), registry)
    }

    /// Air is at the start of every palette.
    pub fn with_version(version: BitArrayVersion, registry: &dyn BlockRegistry) -> Self {
        Self {
            palette: Palette::with_first(registry.default_air_identity()),
            bit_array: BitArray::new(version),
        }
    }

    pub fn new_cache() -> Self {
        Self::with_version_cache(BitArrayVersion::narrowest())
    }

    /// Cache storages are always written before they are read, so code 0 maps
    /// to a placeholder identity 0 instead of air. Entries are still runtime
    /// identities and resolve through the registry when persisted.
    pub fn with_version_cache(version: BitArrayVersion) -> Self {
        Self {
            palette: Palette::with_first(0),
            bit_array: BitArray::new(version),
        }
    }

    pub(crate) fn from_parts(bit_array: BitArray, palette: Palette) -> Self {
        Self { palette, bit_array }
    }

    pub fn set_block(&mut self, index: usize, state: BlockState) -> Result<()> {
        if index >= SECTION_SIZE {
            return Err(StorageError::IndexOutOfBounds {
                index,
                size: SECTION_SIZE,
            });
        }
        let id = self.id_for(state)?;
        self.bit_array
            .set(index, id)
            .map_err(|e| StorageError::InvalidBlock {
                identity: state,
                palette: self.palette.as_slice().to_vec(),
                source: Box::new(e),
            })
    }

    pub fn get_block(&self, index: usize) -> Result<BlockState> {
        let code = self.bit_array.get(index)?;
        self.palette
            .get(code)
            .ok_or(StorageError::DanglingCode {
                code,
                palette_len: self.palette.len(),
            })
    }

    /// The raw palette code stored at `index`.
    pub fn get_code(&self, index: usize) -> Result<u32> {
        self.bit_array.get(index)
    }

    /// A single-entry palette with every word zero. A section that had a block
    /// placed and then removed again keeps the extra palette entry and is not
    /// reported empty.
    pub fn is_empty(&self) -> bool {
        self.palette.len() == 1 && self.bit_array.is_zeroed()
    }

    /// Independent snapshot: neither side sees the other's later writes.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn version(&self) -> BitArrayVersion {
        self.bit_array.version()
    }

    pub fn palette(&self) -> &[BlockState] {
        self.palette.as_slice()
    }

    pub fn words(&self) -> &[u32] {
        self.bit_array.words()
    }

    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.bit_array.codes()
    }

    fn on_resize(&mut self, version: BitArrayVersion) -> Result<()> {
        debug!(
            "Promoting section storage {:?} -> {:?} at palette size {}",
            self.bit_array.version(),
            version,
            self.palette.len()
        );
        self.bit_array = self.bit_array.resized(version)?;
        Ok(())
    }

    fn id_for(&mut self, state: BlockState) -> Result<u32> {
        if let Some(id) = self.palette.index_of(state) {
            return Ok(id);
        }

        let id = self.palette.len() as u32;
        let current = self.bit_array.version();
        let mut version = current;
        while id > version.max_entry_value() {
            match version.next() {
                Some(next) => version = next,
                None => {
                    warn!(
                        "Section palette is full ({} entries), rejecting block {state}",
                        self.palette.len()
                    );
                    return Err(StorageError::PaletteFull {
                        identity: state,
                        version: current,
                    });
                }
            }
        }
        if version != current {
            self.on_resize(version)?;
        }
        trace!("Palette code {id} -> block {state}");
        Ok(self.palette.push(state))
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    struct FakeRegistry;

    impl BlockRegistry for FakeRegistry {
        fn identity_for(&self, _name: &str, _val: i16) -> Option<BlockState> {
            None
        }

        fn name_and_metadata_for(&self, _identity: BlockState) -> Option<(&str, i16)> {
            None
        }

        fn default_air_identity(&self) -> BlockState {
            134
        }
    }

    const AIR: BlockState = 134;
    const A: BlockState = 1;
    const B: BlockState = 2;

    #[test]
    fn fresh_storage_is_empty_air() {
        let storage = PalettedBlockStorage::new(&FakeRegistry);
        assert!(storage.is_empty());
        assert_eq!(storage.version(), BitArrayVersion::V1);
        assert_eq!(storage.palette(), &[AIR]);
        for i in [0, 100, 4095] {
            assert_eq!(storage.get_block(i).unwrap(), AIR);
        }
    }

    #[test]
    fn set_block_get_block() {
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        storage.set_block(0, A).unwrap();
        storage.set_block(1, B).unwrap();
        storage.set_block(2, A).unwrap();
        assert_eq!(storage.palette(), &[AIR, A, B]);
        let codes: Vec<u32> = (0..3).map(|i| storage.get_code(i).unwrap()).collect();
        assert_eq!(codes, vec![1, 2, 1]);
        assert_eq!(storage.get_block(1).unwrap(), B);
        assert_eq!(storage.get_block(3).unwrap(), AIR);
        assert!(!storage.is_empty());
    }

    #[test]
    fn same_block_twice_does_not_grow_palette() {
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        storage.set_block(10, A).unwrap();
        storage.set_block(20, A).unwrap();
        assert_eq!(storage.palette().len(), 2);
        assert_eq!(storage.get_code(10).unwrap(), storage.get_code(20).unwrap());
    }

    #[test]
    fn promotes_before_third_entry() {
        let mut storage = PalettedBlockStorage::with_version(BitArrayVersion::V1, &FakeRegistry);
        storage.set_block(0, A).unwrap();
        assert_eq!(storage.version(), BitArrayVersion::V1);
        storage.set_block(1, B).unwrap();
        assert_eq!(storage.version(), BitArrayVersion::V2);
        assert_eq!(storage.get_block(0).unwrap(), A);
        assert_eq!(storage.get_block(1).unwrap(), B);
        assert_eq!(storage.get_block(2).unwrap(), AIR);
    }

    #[test]
    fn width_is_monotonic() {
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        let mut last = storage.version();
        for i in 0..300u32 {
            storage.set_block(i as usize, 1000 + i).unwrap();
            assert!(storage.version() >= last);
            last = storage.version();
        }
        assert_eq!(storage.version(), BitArrayVersion::V16);
        // overwriting everything with air keeps the width
        for i in 0..300 {
            storage.set_block(i, AIR).unwrap();
        }
        assert_eq!(storage.version(), BitArrayVersion::V16);
    }

    #[test]
    fn random_fill_round_trips() {
        let mut rng = StdRng::seed_from_u64(4096);
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        let mut expected = vec![AIR; SECTION_SIZE];
        for _ in 0..20_000 {
            let index = rng.gen_range(0..SECTION_SIZE);
            let state = rng.gen_range(0..40);
            storage.set_block(index, state).unwrap();
            expected[index] = state;
        }
        for (index, state) in expected.iter().enumerate() {
            assert_eq!(storage.get_block(index).unwrap(), *state);
        }
    }

    #[test]
    fn reset_to_air_is_not_empty() {
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        storage.set_block(7, A).unwrap();
        assert!(!storage.is_empty());
        storage.set_block(7, AIR).unwrap();
        assert!(storage.words().iter().all(|&w| w == 0));
        assert!(!storage.is_empty());
    }

    #[test]
    fn copy_is_isolated() {
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        storage.set_block(0, A).unwrap();
        let mut copy = storage.copy();
        copy.set_block(0, B).unwrap();
        copy.set_block(1, A).unwrap();
        storage.set_block(2, 99).unwrap();

        assert_eq!(storage.get_block(0).unwrap(), A);
        assert_eq!(storage.get_block(1).unwrap(), AIR);
        assert_eq!(copy.get_block(0).unwrap(), B);
        assert_eq!(copy.get_block(2).unwrap(), AIR);
        assert_eq!(storage.palette(), &[AIR, A, 99]);
        assert_eq!(copy.palette(), &[AIR, A, B]);
    }

    #[test]
    fn cache_mode_placeholder() {
        let mut storage = PalettedBlockStorage::new_cache();
        assert_eq!(storage.palette(), &[0]);
        assert!(storage.is_empty());
        storage.set_block(0, 16).unwrap();
        assert_eq!(storage.palette(), &[0, 16]);
        assert_eq!(storage.get_block(0).unwrap(), 16);
    }

    #[test]
    fn out_of_bounds_leaves_palette_alone() {
        let mut storage = PalettedBlockStorage::new(&FakeRegistry);
        assert!(matches!(
            storage.set_block(SECTION_SIZE, A),
            Err(StorageError::IndexOutOfBounds { index: 4096, .. })
        ));
        assert_eq!(storage.palette(), &[AIR]);
        assert!(matches!(
            storage.get_block(SECTION_SIZE),
            Err(StorageError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn promotes_past_several_versions_at_once() {
        // a palette already longer than its version allows, as a decoder
        // could hand over
        let palette = Palette::from_entries(vec![AIR, A, B, 3, 4]).unwrap();
        let mut storage =
            PalettedBlockStorage::from_parts(BitArray::new(BitArrayVersion::V1), palette);

        storage.set_block(0, 7).unwrap();
        assert_eq!(storage.version(), BitArrayVersion::V3);
        assert_eq!(storage.palette(), &[AIR, A, B, 3, 4, 7]);
        assert_eq!(storage.get_code(0).unwrap(), 5);
        assert_eq!(storage.get_block(0).unwrap(), 7);
        assert_eq!(storage.get_block(1).unwrap(), AIR);

        storage.set_block(1, 7).unwrap();
        assert_eq!(storage.palette().len(), 6);
    }

    #[test]
    fn full_palette_is_rejected() {
        let mut storage = PalettedBlockStorage::with_version(BitArrayVersion::V16, &FakeRegistry);
        // palette already holds air, so 65535 more states fill every code
        for state in 0..65535u32 {
            storage.set_block(0, 200_000 + state).unwrap();
        }
        assert_eq!(storage.palette().len(), 65536);
        let before = storage.clone();

        let err = storage.set_block(1, 1).unwrap_err();
        assert!(matches!(
            err,
            StorageError::PaletteFull {
                identity: 1,
                version: BitArrayVersion::V16
            }
        ));
        assert_eq!(storage, before);

        // states already in the palette can still be placed
        storage.set_block(1, 200_000).unwrap();
        assert_eq!(storage.get_block(1).unwrap(), 200_000);
    }
}
