//! Little-endian NBT, the tagged tree format Bedrock uses for persisted block
//! states. Only the tag kinds a palette needs are supported.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::err::{Result, StorageError};
use crate::protocol_types::primitives::VarInt;
use crate::protocol_types::traits::ReadProt;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;

const MAX_DEPTH: usize = 512;

/// How lengths and wide integers are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Fixed-width little-endian fields, u16 string lengths. Used on disk.
    LittleEndian,
    /// Little-endian, but string lengths are unsigned varints and ints/longs
    /// are zigzag varints. Used on the network and in the chunk cache.
    Network,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    String(String),
    List(NbtList),
    Compound(NbtCompound),
}

impl NbtTag {
    fn id(&self) -> u8 {
        match self {
            NbtTag::Byte(_) => TAG_BYTE,
            NbtTag::Short(_) => TAG_SHORT,
            NbtTag::Int(_) => TAG_INT,
            NbtTag::Long(_) => TAG_LONG,
            NbtTag::String(_) => TAG_STRING,
            NbtTag::List(_) => TAG_LIST,
            NbtTag::Compound(_) => TAG_COMPOUND,
        }
    }
}

/// A list of tags sharing one element type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtList {
    tags: Vec<NbtTag>,
}

impl NbtList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: NbtTag) -> Result<()> {
        if let Some(first) = self.tags.first() {
            if first.id() != tag.id() {
                return Err(StorageError::Nbt(format!(
                    "list holds tag type {}, got {}",
                    first.id(),
                    tag.id()
                )));
            }
        }
        self.tags.push(tag);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NbtTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Named tags in insertion order, so encoding the same compound is stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    entries: Vec<(String, NbtTag)>,
}

impl NbtCompound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tag: NbtTag) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, value)) => *value = tag,
            None => self.entries.push((name, tag)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NbtTag> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tag)| tag)
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(NbtTag::String(value)) => Ok(value),
            Some(other) => Err(StorageError::Nbt(format!(
                "tag {name} is type {}, expected string",
                other.id()
            ))),
            None => Err(StorageError::Nbt(format!("missing tag {name}"))),
        }
    }

    pub fn get_short(&self, name: &str) -> Result<i16> {
        match self.get(name) {
            Some(NbtTag::Short(value)) => Ok(*value),
            // some writers widen the metadata value
            Some(NbtTag::Byte(value)) => Ok(*value as i16),
            Some(NbtTag::Int(value)) => i16::try_from(*value)
                .map_err(|_| StorageError::Nbt(format!("tag {name} out of range: {value}"))),
            Some(other) => Err(StorageError::Nbt(format!(
                "tag {name} is type {}, expected short",
                other.id()
            ))),
            None => Err(StorageError::Nbt(format!("missing tag {name}"))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn zigzag32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

fn unzigzag32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

fn zigzag64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn put_var_u64(buf: &mut Vec<u8>, mut x: u64) {
    loop {
        let mut temp = (x & 0x7f) as u8;
        x >>= 7;
        if x != 0 {
            temp |= 0x80;
        }
        buf.push(temp);
        if x == 0 {
            break;
        }
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize, flavor: Flavor) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| StorageError::Nbt(format!("length {len} too big")))?;
    put_int(buf, len, flavor);
    Ok(())
}

fn put_int(buf: &mut Vec<u8>, v: i32, flavor: Flavor) {
    match flavor {
        Flavor::LittleEndian => buf.extend_from_slice(&v.to_le_bytes()),
        Flavor::Network => VarInt::from(zigzag32(v)).encode(buf),
    }
}

fn put_string(buf: &mut Vec<u8>, s: &str, flavor: Flavor) -> Result<()> {
    match flavor {
        Flavor::LittleEndian => {
            let len = u16::try_from(s.len())
                .map_err(|_| StorageError::Nbt(format!("string of {} bytes too long", s.len())))?;
            buf.extend_from_slice(&len.to_le_bytes());
        }
        Flavor::Network => VarInt::from(s.len()).encode(buf),
    }
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn put_payload(buf: &mut Vec<u8>, tag: &NbtTag, flavor: Flavor) -> Result<()> {
    match tag {
        NbtTag::Byte(v) => buf.push(*v as u8),
        NbtTag::Short(v) => buf.extend_from_slice(&v.to_le_bytes()),
        NbtTag::Int(v) => put_int(buf, *v, flavor),
        NbtTag::Long(v) => match flavor {
            Flavor::LittleEndian => buf.extend_from_slice(&v.to_le_bytes()),
            Flavor::Network => put_var_u64(buf, zigzag64(*v)),
        },
        NbtTag::String(v) => put_string(buf, v, flavor)?,
        NbtTag::List(list) => {
            buf.push(list.tags.first().map_or(TAG_END, NbtTag::id));
            put_len(buf, list.len(), flavor)?;
            for tag in list.iter() {
                put_payload(buf, tag, flavor)?;
            }
        }
        NbtTag::Compound(compound) => put_compound(buf, compound, flavor)?,
    }
    Ok(())
}

fn put_compound(buf: &mut Vec<u8>, compound: &NbtCompound, flavor: Flavor) -> Result<()> {
    for (name, tag) in &compound.entries {
        buf.push(tag.id());
        put_string(buf, name, flavor)?;
        put_payload(buf, tag, flavor)?;
    }
    buf.push(TAG_END);
    Ok(())
}

/// Appends a root compound with the given name to `buf`.
pub fn write_named(
    buf: &mut Vec<u8>,
    name: &str,
    compound: &NbtCompound,
    flavor: Flavor,
) -> Result<()> {
    buf.push(TAG_COMPOUND);
    put_string(buf, name, flavor)?;
    put_compound(buf, compound, flavor)
}

async fn read_var_u64(stream: &mut (impl AsyncRead + Unpin + Send)) -> Result<u64> {
    let mut value = 0u64;
    let mut pos = 0u32;
    loop {
        let byte = stream.read_u8().await?;
        // the tenth byte only has room for the top bit
        if pos == 63 && byte > 1 {
            return Err(StorageError::Nbt("VarLong is too big".into()));
        }
        value |= ((byte & 0x7f) as u64) << pos;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        pos += 7;
        if pos >= 64 {
            return Err(StorageError::Nbt("VarLong is too big".into()));
        }
    }
}

async fn read_int<R: AsyncRead + Unpin + Send>(stream: &mut R, flavor: Flavor) -> Result<i32> {
    Ok(match flavor {
        Flavor::LittleEndian => stream.read_i32_le().await?,
        Flavor::Network => unzigzag32(VarInt::read(stream).await?.value),
    })
}

async fn read_string<R: AsyncRead + Unpin + Send>(stream: &mut R, flavor: Flavor) -> Result<String> {
    let len = match flavor {
        Flavor::LittleEndian => stream.read_u16_le().await? as usize,
        Flavor::Network => VarInt::read(stream).await?.value as usize,
    };
    if len > i16::MAX as usize * 4 {
        return Err(StorageError::Nbt(format!("string too long: {len} B")));
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    String::from_utf8(buf).map_err(|e| StorageError::Nbt(format!("UTF8 error: {e}")))
}

fn read_payload<'a, R: AsyncRead + Unpin + Send>(
    stream: &'a mut R,
    id: u8,
    flavor: Flavor,
    depth: usize,
) -> Pin<Box<dyn Future<Output = Result<NbtTag>> + Send + 'a>> {
    Box::pin(async move {
        if depth > MAX_DEPTH {
            return Err(StorageError::Nbt("tag nesting too deep".into()));
        }
        Ok(match id {
            TAG_BYTE => NbtTag::Byte(stream.read_i8().await?),
            TAG_SHORT => NbtTag::Short(stream.read_i16_le().await?),
            TAG_INT => NbtTag::Int(read_int(stream, flavor).await?),
            TAG_LONG => NbtTag::Long(match flavor {
                Flavor::LittleEndian => stream.read_i64_le().await?,
                Flavor::Network => unzigzag64(read_var_u64(stream).await?),
            }),
            TAG_STRING => NbtTag::String(read_string(stream, flavor).await?),
            TAG_LIST => {
                let element = stream.read_u8().await?;
                let len = read_int(stream, flavor).await?;
                let mut list = NbtList::new();
                if element != TAG_END {
                    for _ in 0..len.max(0) {
                        list.push(read_payload(stream, element, flavor, depth + 1).await?)?;
                    }
                } else if len > 0 {
                    return Err(StorageError::Nbt("non-empty list of end tags".into()));
                }
                NbtTag::List(list)
            }
            TAG_COMPOUND => {
                let mut compound = NbtCompound::new();
                loop {
                    let id = stream.read_u8().await?;
                    if id == TAG_END {
                        break;
                    }
                    let name = read_string(stream, flavor).await?;
                    let tag = read_payload(stream, id, flavor, depth + 1).await?;
                    compound.insert(name, tag);
                }
                NbtTag::Compound(compound)
            }
            other => return Err(StorageError::Nbt(format!("unsupported tag type {other}"))),
        })
    })
}

/// Reads one root compound and its name.
pub async fn read_named<R: AsyncRead + Unpin + Send>(
    stream: &mut R,
    flavor: Flavor,
) -> Result<(String, NbtCompound)> {
    let id = stream.read_u8().await?;
    if id != TAG_COMPOUND {
        return Err(StorageError::Nbt(format!(
            "expected a root compound, got tag type {id}"
        )));
    }
    let name = read_string(stream, flavor).await?;
    match read_payload(stream, id, flavor, 0).await? {
        NbtTag::Compound(compound) => Ok((name, compound)),
        _ => Err(StorageError::Nbt("root tag is not a compound".into())),
    }
}
