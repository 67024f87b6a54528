use std::fmt::{Debug, Formatter};

use crate::chunk::{BitArrayVersion, SECTION_SIZE};
use crate::err::{Result, StorageError};

/// 4096 small codes packed into 32-bit words at a fixed `BitArrayVersion`.
///
/// Entry `i` lives in word `i / entries_per_word`, starting at bit
/// `(i % entries_per_word) * bits` from the least significant end. Padded
/// versions leave the top bits of every word zero.
#[derive(Clone, PartialEq, Eq)]
pub struct BitArray {
    version: BitArrayVersion,
    words: Box<[u32]>,
}

impl BitArray {
    pub fn new(version: BitArrayVersion) -> Self {
        Self {
            version,
            words: vec![0u32; version.word_count(SECTION_SIZE)].into_boxed_slice(),
        }
    }

    /// Wraps decoded words. Padding bits of padded versions are cleared, as
    /// is everything past the last entry, so they never read back as data.
    pub fn from_words(version: BitArrayVersion, mut words: Vec<u32>) -> Result<Self> {
        let expected = version.word_count(SECTION_SIZE);
        if words.len() != expected {
            return Err(StorageError::WordCountMismatch {
                version,
                expected,
                received: words.len(),
            });
        }
        let per_word = version.entries_per_word();
        let used_mask = |entries: usize| match entries as u32 * version.bits() {
            32 => u32::MAX,
            used => (1u32 << used) - 1,
        };
        let full = used_mask(per_word);
        for word in words.iter_mut() {
            *word &= full;
        }
        let tail = SECTION_SIZE % per_word;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= used_mask(tail);
            }
        }
        Ok(Self {
            version,
            words: words.into_boxed_slice(),
        })
    }

    #[inline]
    fn locate(&self, index: usize) -> Result<(usize, u32)> {
        if index >= SECTION_SIZE {
            return Err(StorageError::IndexOutOfBounds {
                index,
                size: SECTION_SIZE,
            });
        }
        let per_word = self.version.entries_per_word();
        let offset = (index % per_word) as u32 * self.version.bits();
        Ok((index / per_word, offset))
    }

    pub fn get(&self, index: usize) -> Result<u32> {
        let (word, offset) = self.locate(index)?;
        Ok((self.words[word] >> offset) & self.version.max_entry_value())
    }

    pub fn set(&mut self, index: usize, code: u32) -> Result<()> {
        let max = self.version.max_entry_value();
        if code > max {
            return Err(StorageError::CodeOutOfRange {
                code,
                version: self.version,
                max,
            });
        }
        let (word, offset) = self.locate(index)?;
        let word = &mut self.words[word];
        *word = (*word & !(max << offset)) | (code << offset);
        Ok(())
    }

    /// Re-packs every code into a fresh array at `version`.
    ///
    /// Codes wider than the target version are rejected, so this only widens in
    /// practice.
    pub fn resized(&self, version: BitArrayVersion) -> Result<Self> {
        let mut resized = BitArray::new(version);
        for (index, code) in self.codes().enumerate() {
            resized.set(index, code)?;
        }
        Ok(resized)
    }

    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        let bits = self.version.bits();
        let mask = self.version.max_entry_value();
        let per_word = self.version.entries_per_word();
        self.words
            .iter()
            .flat_map(move |&word| (0..per_word as u32).map(move |k| (word >> (k * bits)) & mask))
            .take(SECTION_SIZE)
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn version(&self) -> BitArrayVersion {
        self.version
    }

    pub fn is_zeroed(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }
}

impl Debug for BitArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitArray({:?}, {} words)", self.version, self.words.len())
    }
}
