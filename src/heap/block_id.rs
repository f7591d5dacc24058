//! Packed block identifiers
//!
//! 打包的块标识符

use super::error::{Error, Result};
use std::fmt;

/// Number of bits holding the intra-region block index
///
/// 区域内块索引所占位数
pub const BLOCK_INDEX_BITS: u32 = 16;

/// Largest block index a [`BlockId`] can carry
///
/// [`BlockId`] 可携带的最大块索引
pub const MAX_BLOCK_INDEX: u64 = (1 << BLOCK_INDEX_BITS) - 1;

/// Largest region index a [`BlockId`] can carry
///
/// [`BlockId`] 可携带的最大区域索引
pub const MAX_REGION_INDEX: u64 = u64::MAX >> BLOCK_INDEX_BITS;

/// Stable identifier of a block: `(region << 16) | block`
///
/// 块的稳定标识符：`(region << 16) | block`
///
/// Identifiers survive process restarts, so they can be stored inside other
/// blocks (e.g. as child pointers of an index structure).
///
/// 标识符在进程重启后保持不变，可以存储在其他块中（例如索引结构的子节点指针）。
///
/// The derived ordering matches lexicographic `(region, block)` ordering.
///
/// 派生的排序与 `(region, block)` 字典序一致。
///
/// # Examples
///
/// ```
/// use vheap::BlockId;
///
/// let id = BlockId::new(3, 7).unwrap();
/// assert_eq!(id.region_index(), 3);
/// assert_eq!(id.block_index(), 7);
/// assert_eq!(id.as_u64(), (3 << 16) | 7);
///
/// assert!(BlockId::new(0, 65536).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(u64);

impl BlockId {
    /// Pack a region index and a block index
    ///
    /// 打包区域索引与块索引
    ///
    /// # Errors
    /// - `InvalidBlockIndex` if `block` is greater than 65535
    /// - `InvalidRegionIndex` if `region` does not fit in 48 bits
    ///
    /// # Errors
    /// - 如果 `block` 大于 65535，返回 `InvalidBlockIndex`
    /// - 如果 `region` 超出 48 位，返回 `InvalidRegionIndex`
    #[inline]
    pub fn new(region: u64, block: u64) -> Result<Self> {
        if block > MAX_BLOCK_INDEX {
            return Err(Error::InvalidBlockIndex(block));
        }
        if region > MAX_REGION_INDEX {
            return Err(Error::InvalidRegionIndex(region));
        }
        Ok(Self((region << BLOCK_INDEX_BITS) | block))
    }

    /// Rebuild an identifier from its raw persisted value
    ///
    /// 从持久化的原始值重建标识符
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw packed value, suitable for persisting
    ///
    /// 打包后的原始值，可用于持久化
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn region_index(self) -> u64 {
        self.0 >> BLOCK_INDEX_BITS
    }

    #[inline]
    pub const fn block_index(self) -> u64 {
        self.0 & MAX_BLOCK_INDEX
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId{{Region: {}, Block: {}}}", self.region_index(), self.block_index())
    }
}

impl From<BlockId> for u64 {
    #[inline]
    fn from(id: BlockId) -> Self {
        id.0
    }
}
