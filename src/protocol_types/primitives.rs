use std::fmt::{Debug, Display, Formatter};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::err::Result;
use crate::protocol_types::traits::{ReadProt, SizedProt, WriteProt};

const SEGMENT_BITS: u8 = 0x7f;
const CONTINUE_BIT: u8 = 0x80;

// Fixed-width integers are little-endian on the Bedrock wire and in the cache.

/// Unsigned LEB128 varint.
#[derive(Ord, PartialOrd, Eq, PartialEq, Hash, Clone, Copy, Default)]
pub struct VarInt {
    pub value: u32,
}

impl From<usize> for VarInt {
    fn from(value: usize) -> Self {
        Self {
            value: value as u32,
        }
    }
}

impl From<u32> for VarInt {
    fn from(value: u32) -> Self {
        Self { value }
    }
}

impl Display for VarInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Debug for VarInt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[async_trait]
impl ReadProt for VarInt {
    async fn read(stream: &mut (impl AsyncRead + Unpin + Send)) -> Result<Self> {
        let mut value: u32 = 0;
        let mut pos: u32 = 0;
        loop {
            let current_byte = stream.read_u8().await?;
            value |= ((current_byte & SEGMENT_BITS) as u32) << pos;
            if current_byte & CONTINUE_BIT == 0 {
                return Ok(Self { value });
            }
            pos += 7;
            if pos >= 32 {
                return Err(String::from("VarInt is too big").into());
            }
        }
    }
}

impl SizedProt for VarInt {
    fn prot_size(&self) -> usize {
        let mut x = self.value;
        let mut count = 0;
        loop {
            x >>= 7;
            count += 1;

            if x == 0 {
                break count;
            }
        }
    }
}

#[async_trait]
impl WriteProt for VarInt {
    async fn write(&self, stream: &mut (impl AsyncWrite + Unpin + Send)) -> Result<()> {
        let mut buf = Vec::with_capacity(5);
        self.encode(&mut buf);
        stream.write_all(&buf).await?;
        Ok(())
    }
}

impl VarInt {
    /// Appends the encoded form to an in-memory buffer.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut x = self.value;
        loop {
            let mut temp = (x & 0b0111_1111) as u8;
            x >>= 7;
            if x != 0 {
                temp |= 0b1000_0000;
            }
            buf.push(temp);
            if x == 0 {
                break;
            }
        }
    }
}

#[async_trait]
impl ReadProt for u8 {
    async fn read(stream: &mut (impl AsyncRead + Unpin + Send)) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(stream.read_u8().await?)
    }
}

#[async_trait]
impl WriteProt for u8 {
    async fn write(&self, stream: &mut (impl AsyncWrite + Unpin + Send)) -> Result<()> {
        stream.write_all(&[*self]).await?;
        Ok(())
    }
}

impl SizedProt for u8 {
    fn prot_size(&self) -> usize {
        1
    }
}

/// A sequence announced by its element count as a `VarInt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedVec<T>
where
    T: Send + Sync,
{
    pub vec: Vec<T>,
}

impl<T> From<Vec<T>> for SizedVec<T>
where
    T: Send + Sync,
{
    fn from(value: Vec<T>) -> Self {
        Self { vec: value }
    }
}

#[async_trait]
impl<T> WriteProt for SizedVec<T>
where
    T: WriteProt + Sync + Send,
{
    async fn write(&self, stream: &mut (impl AsyncWrite + Unpin + Send)) -> Result<()> {
        VarInt::from(self.vec.len()).write(stream).await?;
        for item in &self.vec {
            item.write(stream).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T> ReadProt for SizedVec<T>
where
    T: ReadProt + Sync + Send,
{
    async fn read(stream: &mut (impl AsyncRead + Unpin + Send)) -> Result<Self>
    where
        Self: Sized,
    {
        let len = VarInt::read(stream).await?.value as usize;
        // a length prefix is untrusted input, don't let it drive the allocation
        let mut vec = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            vec.push(T::read(stream).await?);
        }
        Ok(Self { vec })
    }
}

impl<T> SizedProt for SizedVec<T>
where
    T: SizedProt + Send + Sync,
{
    fn prot_size(&self) -> usize {
        VarInt::from(self.vec.len()).prot_size()
            + self.vec.iter().map(|x| x.prot_size()).sum::<usize>()
    }
}

/// Reads exactly `count` little-endian words.
pub async fn read_words(
    stream: &mut (impl AsyncRead + Unpin + Send),
    count: usize,
) -> Result<Vec<u32>> {
    let mut bytes = vec![0u8; count * 4];
    stream.read_exact(&mut bytes).await?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Writes words as one contiguous little-endian block.
pub async fn write_words(
    stream: &mut (impl AsyncWrite + Unpin + Send),
    words: &[u32],
) -> Result<()> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    stream.write_all(&bytes).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{read_words, write_words, SizedVec, VarInt};
    use crate::err::Result;
    use crate::protocol_types::traits::{ReadProt, SizedProt, WriteProt};

    #[tokio::test]
    async fn varint_0() -> Result<()> {
        let mut buf: Vec<u8> = vec![];
        VarInt { value: 0 }.write(&mut buf).await?;
        assert_eq!(buf, vec![0]);
        Ok(())
    }

    #[tokio::test]
    async fn varint_127() -> Result<()> {
        let mut buf: Vec<u8> = vec![];
        VarInt { value: 127 }.write(&mut buf).await?;
        assert_eq!(buf, vec![127]);
        Ok(())
    }

    #[tokio::test]
    async fn varint_128() -> Result<()> {
        let mut buf: Vec<u8> = vec![];
        VarInt { value: 128 }.write(&mut buf).await?;
        assert_eq!(buf, vec![128, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn varint_25565() -> Result<()> {
        let mut buf: Vec<u8> = vec![];
        VarInt { value: 25565 }.write(&mut buf).await?;
        assert_eq!(buf, vec![221, 199, 1]);
        assert_eq!(VarInt { value: 25565 }.prot_size(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn varint_max() -> Result<()> {
        let mut buf: Vec<u8> = vec![];
        VarInt { value: u32::MAX }.write(&mut buf).await?;
        assert_eq!(buf, vec![255, 255, 255, 255, 15]);
        let read = VarInt::read(&mut buf.as_slice()).await?;
        assert_eq!(read.value, u32::MAX);
        Ok(())
    }

    #[tokio::test]
    async fn varint_too_big() {
        let buf = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert!(VarInt::read(&mut &buf[..]).await.is_err());
    }

    #[tokio::test]
    async fn varint_truncated() {
        let buf = [0x80u8];
        assert!(VarInt::read(&mut &buf[..]).await.is_err());
    }

    #[tokio::test]
    async fn words_are_little_endian() -> Result<()> {
        let mut buf: Vec<u8> = vec![];
        write_words(&mut buf, &[0x0403_0201, 0xdead_beef]).await?;
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        let words = read_words(&mut buf.as_slice(), 2).await?;
        assert_eq!(words, vec![0x0403_0201, 0xdead_beef]);
        Ok(())
    }

    #[tokio::test]
    async fn sized_vec_counts_elements() -> Result<()> {
        let vec: SizedVec<VarInt> = vec![VarInt::from(1u32), VarInt::from(300u32)].into();
        let mut buf: Vec<u8> = vec![];
        vec.write(&mut buf).await?;
        assert_eq!(buf, vec![2, 1, 172, 2]);
        assert_eq!(vec.prot_size(), buf.len());
        let read = SizedVec::<VarInt>::read(&mut buf.as_slice()).await?;
        assert_eq!(read, vec);
        Ok(())
    }
}
