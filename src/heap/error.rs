//! Error types for vheap
//!
//! vheap 的错误类型

use std::fmt;
use std::io;

/// Error type for heap operations
///
/// 堆操作的错误类型
#[derive(Debug)]
pub enum Error {
    /// I/O error from the backing file or the mapping
    ///
    /// 底层文件或内存映射的 I/O 错误
    Io(io::Error),

    /// A region lacks room for the requested block
    ///
    /// Recoverable at the heap level: the next region is tried, or a new one
    /// is appended.
    ///
    /// 区域剩余空间不足。在堆层面可恢复：尝试下一个区域或追加新区域。
    OutOfMemory {
        requested: u64,
        available: u64,
    },

    /// The request cannot fit in a region even when that region is empty
    ///
    /// 即使区域为空也无法容纳该请求
    BlockTooLarge {
        requested: u64,
        capacity: u64,
    },

    /// Region header magic does not read `HEAPREGN`
    ///
    /// 区域头签名不是 `HEAPREGN`
    InvalidSignature {
        offset: u64,
        found: [u8; 8],
    },

    /// Block index does not fit the 16-bit field of a [`BlockId`](super::BlockId)
    ///
    /// 块索引超出 16 位字段范围
    InvalidBlockIndex(u64),

    /// Region index does not fit the 48-bit field of a [`BlockId`](super::BlockId)
    ///
    /// 区域索引超出 48 位字段范围
    InvalidRegionIndex(u64),

    /// Stored region size is too small, misaligned, or runs past end of file
    ///
    /// 存储的区域大小过小、未对齐或超出文件末尾
    InvalidRegionSize {
        offset: u64,
        size: u64,
    },

    /// Stored region index differs from the region's position in the file
    ///
    /// 存储的区域索引与其在文件中的位置不一致
    RegionIndexMismatch {
        offset: u64,
        expected: u64,
        found: u64,
    },

    /// Mutation attempted on a heap opened read-only
    ///
    /// 在只读打开的堆上尝试修改
    ReadOnly,

    /// Write runs past the end of a block
    ///
    /// 写入超出块末尾
    WriteExceedsBlock {
        offset: u64,
        len: usize,
        block_size: u64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::OutOfMemory { requested, available } => write!(
                f,
                "Out of memory: requested {} bytes, {} available / 内存不足：请求 {} 字节，可用 {} 字节",
                requested, available, requested, available
            ),
            Error::BlockTooLarge { requested, capacity } => write!(
                f,
                "Block size {} exceeds region capacity {} / 块大小 {} 超出区域容量 {}",
                requested, capacity, requested, capacity
            ),
            Error::InvalidSignature { offset, found } => write!(
                f,
                "Invalid region signature {:?} at offset {} / 偏移 {} 处区域签名无效",
                found, offset, offset
            ),
            Error::InvalidBlockIndex(index) => {
                write!(f, "Block index {} cannot be > 65535 / 块索引 {} 不能大于 65535", index, index)
            }
            Error::InvalidRegionIndex(index) => {
                write!(f, "Region index {} exceeds 48 bits / 区域索引 {} 超出 48 位", index, index)
            }
            Error::InvalidRegionSize { offset, size } => write!(
                f,
                "Invalid region size {} at offset {} / 偏移 {} 处区域大小 {} 无效",
                size, offset, offset, size
            ),
            Error::RegionIndexMismatch { offset, expected, found } => write!(
                f,
                "Region at offset {} has index {}, expected {} / 偏移 {} 处区域索引为 {}，应为 {}",
                offset, found, expected, offset, found, expected
            ),
            Error::ReadOnly => write!(f, "Heap is opened read-only / 堆以只读方式打开"),
            Error::WriteExceedsBlock { offset, len, block_size } => write!(
                f,
                "Write of {} bytes at {} exceeds block size {} / 在 {} 处写入 {} 字节超出块大小 {}",
                len, offset, block_size, offset, len, block_size
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Convert from io::Error to Error
///
/// 从 io::Error 转换到 Error
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Convert from Error to io::Error for compatibility
///
/// 从 Error 转换到 io::Error 以保持兼容性
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(io_err) => io_err,
            Error::OutOfMemory { .. } | Error::BlockTooLarge { .. } => {
                io::Error::new(io::ErrorKind::OutOfMemory, err.to_string())
            }
            Error::InvalidSignature { .. }
            | Error::InvalidRegionSize { .. }
            | Error::RegionIndexMismatch { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err.to_string())
            }
            Error::ReadOnly => io::Error::new(io::ErrorKind::PermissionDenied, err.to_string()),
            Error::InvalidBlockIndex(_)
            | Error::InvalidRegionIndex(_)
            | Error::WriteExceedsBlock { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
            }
        }
    }
}

/// Result type alias using our custom Error type
///
/// 使用自定义 Error 类型的 Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;
