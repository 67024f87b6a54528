/// Packing layouts for a `BitArray`, narrowest first. The discriminant is the id
/// written in the storage header and equals the bits per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitArrayVersion {
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
    V6 = 6,
    V8 = 8,
    V16 = 16,
}

impl BitArrayVersion {
    pub const ALL: [BitArrayVersion; 8] = [
        BitArrayVersion::V1,
        BitArrayVersion::V2,
        BitArrayVersion::V3,
        BitArrayVersion::V4,
        BitArrayVersion::V5,
        BitArrayVersion::V6,
        BitArrayVersion::V8,
        BitArrayVersion::V16,
    ];

    pub const WORD_BITS: u32 = 32;

    pub fn narrowest() -> Self {
        BitArrayVersion::V1
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.id() == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn entries_per_word(self) -> usize {
        (Self::WORD_BITS / self.bits()) as usize
    }

    pub fn max_entry_value(self) -> u32 {
        (1 << self.bits()) - 1
    }

    /// Whether the top bits of each word are left unused.
    pub fn is_padded(self) -> bool {
        Self::WORD_BITS % self.bits() != 0
    }

    pub fn word_count(self, size: usize) -> usize {
        size.div_ceil(self.entries_per_word())
    }

    pub fn next(self) -> Option<Self> {
        match self {
            BitArrayVersion::V1 => Some(BitArrayVersion::V2),
            BitArrayVersion::V2 => Some(BitArrayVersion::V3),
            BitArrayVersion::V3 => Some(BitArrayVersion::V4),
            BitArrayVersion::V4 => Some(BitArrayVersion::V5),
            BitArrayVersion::V5 => Some(BitArrayVersion::V6),
            BitArrayVersion::V6 => Some(BitArrayVersion::V8),
            BitArrayVersion::V8 => Some(BitArrayVersion::V16),
            BitArrayVersion::V16 => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunk::SECTION_SIZE;

    #[test]
    fn chain_is_strictly_widening() {
        let mut version = BitArrayVersion::narrowest();
        let mut seen = vec![version];
        while let Some(next) = version.next() {
            assert!(next.bits() > version.bits());
            assert!(next.max_entry_value() > version.max_entry_value());
            version = next;
            seen.push(version);
        }
        assert_eq!(seen, BitArrayVersion::ALL);
        assert_eq!(version, BitArrayVersion::V16);
    }

    #[test]
    fn word_counts() {
        let counts: Vec<usize> = BitArrayVersion::ALL
            .iter()
            .map(|v| v.word_count(SECTION_SIZE))
            .collect();
        assert_eq!(counts, vec![128, 256, 410, 512, 683, 820, 1024, 2048]);
    }

    #[test]
    fn padded_versions() {
        let padded: Vec<BitArrayVersion> = BitArrayVersion::ALL
            .into_iter()
            .filter(|v| v.is_padded())
            .collect();
        assert_eq!(
            padded,
            vec![BitArrayVersion::V3, BitArrayVersion::V5, BitArrayVersion::V6]
        );
    }

    #[test]
    fn ids_round_trip() {
        for version in BitArrayVersion::ALL {
            assert_eq!(BitArrayVersion::from_id(version.id()), Some(version));
        }
        assert_eq!(BitArrayVersion::from_id(7), None);
        assert_eq!(BitArrayVersion::from_id(0), None);
        assert_eq!(BitArrayVersion::V16.max_entry_value(), 65535);
    }
}
