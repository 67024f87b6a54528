use async_trait::async_trait;
use log::trace;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::chunk::{BitArray, BitArrayVersion, BlockState, Palette, PalettedBlockStorage, SECTION_SIZE};
use crate::err::{Result, StorageError};
use crate::nbt::{self, Flavor, NbtCompound, NbtTag};
use crate::protocol_types::primitives::{read_words, write_words, SizedVec, VarInt};
use crate::protocol_types::traits::{ReadProt, SizedProt, WriteProt};
use crate::registry::BlockRegistry;

/// How palette entries are represented, carried in the low bit of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteKind {
    /// Runtime ids as varints. Network form.
    Runtime,
    /// Name + metadata compounds. Cache/disk form.
    Persisted,
}

impl PaletteKind {
    fn bit(self) -> u8 {
        match self {
            PaletteKind::Runtime => 1,
            PaletteKind::Persisted => 0,
        }
    }
}

/// Palette encoding together with what it needs to resolve entries.
#[derive(Clone, Copy)]
pub enum PaletteEncoding<'a> {
    Runtime,
    Persisted(&'a dyn BlockRegistry),
}

impl PaletteEncoding<'_> {
    pub fn kind(&self) -> PaletteKind {
        match self {
            PaletteEncoding::Runtime => PaletteKind::Runtime,
            PaletteEncoding::Persisted(_) => PaletteKind::Persisted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageHeader {
    pub version: BitArrayVersion,
    pub kind: PaletteKind,
}

impl StorageHeader {
    pub fn to_byte(self) -> u8 {
        (self.version.id() << 1) | self.kind.bit()
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        let version = BitArrayVersion::from_id(byte >> 1).ok_or(StorageError::InvalidHeader(byte))?;
        let kind = if byte & 1 == 1 {
            PaletteKind::Runtime
        } else {
            PaletteKind::Persisted
        };
        Ok(Self { version, kind })
    }
}

#[async_trait]
impl WriteProt for StorageHeader {
    async fn write(&self, stream: &mut (impl AsyncWrite + Unpin + Send)) -> Result<()> {
        self.to_byte().write(stream).await
    }
}

#[async_trait]
impl ReadProt for StorageHeader {
    async fn read(stream: &mut (impl AsyncRead + Unpin + Send)) -> Result<Self>
    where
        Self: Sized,
    {
        Self::from_byte(u8::read(stream).await?)
    }
}

impl SizedProt for StorageHeader {
    fn prot_size(&self) -> usize {
        1
    }
}

fn block_tag(registry: &dyn BlockRegistry, state: BlockState) -> Result<NbtCompound> {
    let (name, val) = registry
        .name_and_metadata_for(state)
        .ok_or(StorageError::UnknownBlock(state))?;
    let mut tag = NbtCompound::new();
    tag.insert("name", NbtTag::String(name.to_string()));
    tag.insert("val", NbtTag::Short(val));
    Ok(tag)
}

impl PalettedBlockStorage {
    fn header(&self, kind: PaletteKind) -> StorageHeader {
        StorageHeader {
            version: self.version(),
            kind,
        }
    }

    /// Serialises the storage with the given palette encoding. The whole record
    /// is assembled in memory first, so an unresolvable palette entry never
    /// leaves a truncated record in `stream`.
    pub async fn write_with(
        &self,
        stream: &mut (impl AsyncWrite + Unpin + Send),
        encoding: PaletteEncoding<'_>,
    ) -> Result<()> {
        let mut buf: Vec<u8> = Vec::with_capacity(self.prot_size());
        self.header(encoding.kind()).write(&mut buf).await?;
        write_words(&mut buf, self.words()).await?;

        match encoding {
            PaletteEncoding::Runtime => {
                let palette: SizedVec<VarInt> = self
                    .palette()
                    .iter()
                    .map(|&state| VarInt::from(state))
                    .collect::<Vec<_>>()
                    .into();
                palette.write(&mut buf).await?;
            }
            PaletteEncoding::Persisted(registry) => {
                VarInt::from(self.palette().len()).write(&mut buf).await?;
                let mut tags = Vec::new();
                for &state in self.palette() {
                    nbt::write_named(&mut tags, "", &block_tag(registry, state)?, Flavor::Network)?;
                }
                buf.extend_from_slice(&tags);
            }
        }

        stream.write_all(&buf).await?;
        Ok(())
    }

    /// Network form: runtime ids on the wire.
    pub async fn write_network(&self, stream: &mut (impl AsyncWrite + Unpin + Send)) -> Result<()> {
        self.write_with(stream, PaletteEncoding::Runtime).await
    }

    /// Cache form: palette entries resolved to name + metadata through `registry`.
    pub async fn write_persisted(
        &self,
        stream: &mut (impl AsyncWrite + Unpin + Send),
        registry: &dyn BlockRegistry,
    ) -> Result<()> {
        self.write_with(stream, PaletteEncoding::Persisted(registry))
            .await
    }

    /// Reads a storage in either form, branching on the header's palette kind.
    /// Persisted entries are mapped back to runtime ids through `registry`.
    pub async fn read(
        stream: &mut (impl AsyncRead + Unpin + Send),
        registry: &dyn BlockRegistry,
    ) -> Result<(PaletteKind, Self)> {
        let header = StorageHeader::read(stream).await?;
        let words = read_words(stream, header.version.word_count(SECTION_SIZE)).await?;
        let bit_array = BitArray::from_words(header.version, words)?;

        let entries: Vec<BlockState> = match header.kind {
            PaletteKind::Runtime => SizedVec::<VarInt>::read(stream)
                .await?
                .vec
                .into_iter()
                .map(|id| id.value)
                .collect(),
            PaletteKind::Persisted => {
                let len = VarInt::read(stream).await?.value as usize;
                let mut entries = Vec::with_capacity(len.min(SECTION_SIZE));
                for _ in 0..len {
                    let (_, tag) = nbt::read_named(stream, Flavor::Network).await?;
                    let name = tag.get_str("name")?;
                    let val = tag.get_short("val")?;
                    let state = registry.identity_for(name, val).ok_or_else(|| {
                        StorageError::UnknownBlockState {
                            name: name.to_string(),
                            val,
                        }
                    })?;
                    entries.push(state);
                }
                entries
            }
        };

        if entries.is_empty() {
            return Err(StorageError::DanglingCode {
                code: 0,
                palette_len: 0,
            });
        }
        if entries.len() > header.version.max_entry_value() as usize + 1 {
            return Err(StorageError::PaletteTooLarge {
                len: entries.len(),
                version: header.version,
            });
        }
        if let Some(code) = bit_array.codes().find(|&code| code as usize >= entries.len()) {
            return Err(StorageError::DanglingCode {
                code,
                palette_len: entries.len(),
            });
        }
        trace!(
            "Read {:?} section storage at {:?} with {} palette entries",
            header.kind,
            header.version,
            entries.len()
        );
        Ok((
            header.kind,
            PalettedBlockStorage::from_parts(bit_array, Palette::from_entries(entries)?),
        ))
    }
}

/// Size of the network form.
impl SizedProt for PalettedBlockStorage {
    fn prot_size(&self) -> usize {
        1 + self.words().len() * 4
            + VarInt::from(self.palette().len()).prot_size()
            + self
                .palette()
                .iter()
                .map(|&state| VarInt::from(state).prot_size())
                .sum::<usize>()
    }
}

/// Writes the network form.
#[async_trait]
impl WriteProt for PalettedBlockStorage {
    async fn write(&self, stream: &mut (impl AsyncWrite + Unpin + Send)) -> Result<()> {
        self.write_network(stream).await
    }
}
