use palettecraft_lib::dto::{BlockStateEntry, PaletteSlot, SectionSummary};

use crate::chunk::{PaletteKind, PalettedBlockStorage};
use crate::registry::BlockRegistry;

/// Describes a section for humans and tooling: its layout plus how many cells
/// use each palette entry.
pub fn summarize(
    storage: &PalettedBlockStorage,
    kind: PaletteKind,
    registry: &dyn BlockRegistry,
) -> SectionSummary {
    let mut counts = vec![0usize; storage.palette().len()];
    for code in storage.codes() {
        if let Some(count) = counts.get_mut(code as usize) {
            *count += 1;
        }
    }

    let palette = storage
        .palette()
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(code, (&identity, count))| PaletteSlot {
            code: code as u32,
            identity,
            block: registry
                .name_and_metadata_for(identity)
                .map(|(name, val)| BlockStateEntry::new(name, val)),
            count,
        })
        .collect();

    SectionSummary {
        kind: format!("{kind:?}").to_lowercase(),
        bits_per_entry: storage.version().id(),
        words: storage.words().len(),
        empty: storage.is_empty(),
        palette,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registry::GlobalBlockPalette;

    #[test]
    fn counts_cells_per_entry() {
        let registry = GlobalBlockPalette::from_entries(vec![
            BlockStateEntry::new("minecraft:air", 0),
            BlockStateEntry::new("minecraft:stone", 0),
        ])
        .unwrap();
        let mut storage = PalettedBlockStorage::new(&registry);
        storage.set_block(0, 1).unwrap();
        storage.set_block(1, 1).unwrap();
        storage.set_block(2, 9).unwrap();

        let summary = summarize(&storage, PaletteKind::Runtime, &registry);
        assert_eq!(summary.kind, "runtime");
        assert_eq!(summary.bits_per_entry, 2);
        assert_eq!(summary.words, 256);
        assert!(!summary.empty);
        assert_eq!(summary.palette.len(), 3);
        assert_eq!(summary.palette[0].count, 4093);
        assert_eq!(summary.palette[1].count, 2);
        assert_eq!(
            summary.palette[1].block,
            Some(BlockStateEntry::new("minecraft:stone", 0))
        );
        assert_eq!(summary.palette[2].block, None);
    }
}
