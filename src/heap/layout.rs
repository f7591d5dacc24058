//! On-disk region layout
//!
//! 区域的磁盘布局
//!
//! ```text
//! ┌──────────────────────────────────────────────┐ 0
//! │ Header (32 bytes)                            │
//! │  0..8   signature  "HEAPREGN"                │
//! │  8..16  free pointer                         │
//! │ 16..24  region size                          │
//! │ 24..32  region index                         │
//! ├──────────────────────────────────────────────┤ 32
//! │ Block data, growing upward                   │
//! │                  ...                         │
//! │ Block list, growing downward                 │
//! │  entry n-1 (offset, size)                    │
//! │  ...                                         │
//! │  entry 0   (offset, size)                    │
//! ├──────────────────────────────────────────────┤ size - 8
//! │ Next free block id                           │
//! └──────────────────────────────────────────────┘ size
//! ```
//!
//! All integers are little-endian u64.
//!
//! 所有整数均为小端 u64。

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Magic bytes at the start of every region
///
/// 每个区域开头的魔数
pub const SIGNATURE: &[u8; 8] = b"HEAPREGN";

/// Fixed header size in bytes
///
/// 固定的头部大小（字节）
pub const HEADER_SIZE: u64 = 32;

pub const FREE_POINTER_OFFSET: u64 = 8;
pub const REGION_SIZE_OFFSET: u64 = 16;
pub const REGION_INDEX_OFFSET: u64 = 24;

/// Bytes at the tail of the region holding the next-free-block-id counter
///
/// 区域末尾存放下一个空闲块 ID 计数器的字节数
pub const BLOCK_LIST_HEADER_SIZE: u64 = 8;

/// Size of one block-list entry: `(offset, size)`
///
/// 单个块列表条目的大小：`(offset, size)`
pub const ENTRY_SIZE: u64 = 16;

/// Number of block-list slots a region can ever hold
///
/// 单个区域最多可容纳的块列表槽位数
pub const MAX_BLOCKS_PER_REGION: u64 = 1 << 16;

/// Smallest region that can hold a one-byte block
///
/// 能容纳一个单字节块的最小区域
pub const MIN_REGION_SIZE: u64 = HEADER_SIZE + BLOCK_LIST_HEADER_SIZE + ENTRY_SIZE + 8;

/// Region header as stored in the first 32 bytes
///
/// 存储在前 32 字节中的区域头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHeader {
    pub signature: [u8; 8],
    pub free_pointer: u64,
    pub region_size: u64,
    pub region_index: u64,
}

impl RegionHeader {
    /// Header of a freshly created, empty region
    ///
    /// 新建空区域的头部
    pub fn new(region_index: u64, region_size: u64) -> Self {
        Self {
            signature: *SIGNATURE,
            free_pointer: HEADER_SIZE,
            region_size,
            region_index,
        }
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        &self.signature == SIGNATURE
    }

    /// Decode a header from any reader positioned at its first byte
    ///
    /// 从定位在头部首字节的读取器解码头部
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut signature = [0u8; 8];
        reader.read_exact(&mut signature)?;
        let free_pointer = reader.read_u64::<LittleEndian>()?;
        let region_size = reader.read_u64::<LittleEndian>()?;
        let region_index = reader.read_u64::<LittleEndian>()?;

        Ok(Self {
            signature,
            free_pointer,
            region_size,
            region_index,
        })
    }

    /// Encode the header into exactly [`HEADER_SIZE`] bytes
    ///
    /// 将头部编码为恰好 [`HEADER_SIZE`] 字节
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        let free_pointer = FREE_POINTER_OFFSET as usize;
        let region_size = REGION_SIZE_OFFSET as usize;
        let region_index = REGION_INDEX_OFFSET as usize;

        buf[..free_pointer].copy_from_slice(&self.signature);
        LittleEndian::write_u64(&mut buf[free_pointer..region_size], self.free_pointer);
        LittleEndian::write_u64(&mut buf[region_size..region_index], self.region_size);
        LittleEndian::write_u64(&mut buf[region_index..], self.region_index);
        buf
    }
}

/// One block-list slot
///
/// 单个块列表槽位
///
/// `(0, 0)` means "never allocated" or "freed"; both are equally invalid.
///
/// `(0, 0)` 表示“从未分配”或“已释放”，两者同样无效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockEntry {
    pub offset: u64,
    pub size: u64,
}

impl BlockEntry {
    pub const SENTINEL: BlockEntry = BlockEntry { offset: 0, size: 0 };

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.offset == 0 && self.size == 0
    }

    #[inline]
    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            offset: LittleEndian::read_u64(&bytes[0..8]),
            size: LittleEndian::read_u64(&bytes[8..16]),
        }
    }

    #[inline]
    pub fn encode(&self) -> [u8; ENTRY_SIZE as usize] {
        let mut buf = [0u8; ENTRY_SIZE as usize];
        LittleEndian::write_u64(&mut buf[0..8], self.offset);
        LittleEndian::write_u64(&mut buf[8..16], self.size);
        buf
    }
}

/// Byte offset of the next-free-block-id counter
///
/// 下一个空闲块 ID 计数器的字节偏移
#[inline]
pub fn next_id_offset(region_size: u64) -> u64 {
    region_size - BLOCK_LIST_HEADER_SIZE
}

/// Byte offset of the block-list entry for `block_index`
///
/// Entry `i` occupies `[size - 8 - 16(i+1), size - 8 - 16i)`.
///
/// `block_index` 对应块列表条目的字节偏移。
/// 条目 `i` 占据 `[size - 8 - 16(i+1), size - 8 - 16i)`。
#[inline]
pub fn entry_offset(region_size: u64, block_index: u64) -> u64 {
    region_size - BLOCK_LIST_HEADER_SIZE - ENTRY_SIZE * (block_index + 1)
}

/// Largest block an empty region of `region_size` bytes can hold
///
/// 大小为 `region_size` 的空区域可容纳的最大块
#[inline]
pub fn empty_capacity(region_size: u64) -> u64 {
    region_size.saturating_sub(HEADER_SIZE + BLOCK_LIST_HEADER_SIZE + ENTRY_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_is_bit_exact() {
        let header = RegionHeader::new(3, 1024 * 1024);
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..8], b"HEAPREGN");
        assert_eq!(&bytes[8..16], &32u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &(1024u64 * 1024).to_le_bytes());
        assert_eq!(&bytes[24..32], &3u64.to_le_bytes());

        let decoded = RegionHeader::read_from(&mut Cursor::new(&bytes[..])).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.has_valid_signature());
    }

    #[test]
    fn test_short_header_fails() {
        let err = RegionHeader::read_from(&mut Cursor::new(&b"HEAPREGN"[..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_entry_positions() {
        let size = 1024;
        assert_eq!(next_id_offset(size), 1016);
        assert_eq!(entry_offset(size, 0), 1000);
        assert_eq!(entry_offset(size, 1), 984);
    }

    #[test]
    fn test_sentinel_entry() {
        assert!(BlockEntry::SENTINEL.is_sentinel());
        assert!(BlockEntry::decode(&[0u8; 16]).is_sentinel());

        let entry = BlockEntry { offset: 32, size: 100 };
        assert!(!entry.is_sentinel());
        assert_eq!(BlockEntry::decode(&entry.encode()), entry);
    }

    #[test]
    fn test_empty_capacity() {
        assert_eq!(empty_capacity(1024 * 1024), 1024 * 1024 - 56);
        assert_eq!(empty_capacity(10), 0);
    }
}
