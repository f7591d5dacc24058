//! Block view type
//!
//! 块视图类型

use super::block_id::BlockId;
use super::error::{Error, Result};
use super::mapping::RegionMap;
use std::fmt;
use std::sync::Arc;

/// A sized byte range inside a region's data area
///
/// 区域数据区内的一段有大小的字节范围
///
/// A `Block` is a view: the bytes live in the region's shared mapping, which
/// the block keeps alive through a reference count. Blocks are produced by
/// [`Heap::allocate`](super::Heap::allocate), [`Heap::get_block`](super::Heap::get_block)
/// and [`Heap::list_blocks`](super::Heap::list_blocks); they cannot be built
/// by hand, so their ranges never overlap another live block's range.
///
/// `Block` 是一个视图：字节存放在区域的共享映射中，块通过引用计数保持映射存活。
/// 块只能由 [`Heap::allocate`](super::Heap::allocate)、
/// [`Heap::get_block`](super::Heap::get_block) 和
/// [`Heap::list_blocks`](super::Heap::list_blocks) 产生，不能手动构造，
/// 因此其范围不会与其他有效块重叠。
///
/// # Examples
///
/// ```
/// # use vheap::{Heap, Result};
/// # use tempfile::tempdir;
/// # fn main() -> Result<()> {
/// # let dir = tempdir()?;
/// # let path = dir.path().join("blocks.heap");
/// # use std::num::NonZeroU64;
/// let mut heap = Heap::open_for_update(&path, NonZeroU64::new(1).unwrap())?;
///
/// let block = heap.allocate(NonZeroU64::new(11).unwrap())?;
/// block.write_at(0, b"hello world")?;
/// assert_eq!(block.to_vec()?, b"hello world");
/// assert_eq!(block.size(), 11);
/// assert_eq!(block.offset(), 32);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Block {
    map: Arc<RegionMap>,
    id: BlockId,
    offset: u64,
    size: u64,
}

impl Block {
    /// Internal constructor (crate-visible only, no validation)
    ///
    /// 内部构造函数（仅 crate 内可见，不进行验证）
    #[inline]
    pub(crate) fn new(map: Arc<RegionMap>, id: BlockId, offset: u64, size: u64) -> Self {
        Self { map, id, offset, size }
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Size of the block in bytes
    ///
    /// 块大小（字节）
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Offset of the block from the start of its region
    ///
    /// 块相对于所在区域起点的偏移
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the block's region is mapped writable
    ///
    /// 块所在区域是否以可写方式映射
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.map.is_writable()
    }

    /// Borrow the block's bytes directly from the mapping
    ///
    /// 直接从映射借用块字节
    ///
    /// Use [`read_at`](Self::read_at) or [`to_vec`](Self::to_vec) for a copy.
    ///
    /// 需要副本时使用 [`read_at`](Self::read_at) 或 [`to_vec`](Self::to_vec)。
    ///
    /// # Safety
    ///
    /// The caller must ensure no view of the same id (this one, a clone, or one
    /// from `get_block`/`list_blocks`, in this or another process) writes the
    /// block while the slice is alive.
    ///
    /// # Safety
    ///
    /// 调用者需要确保切片存活期间，同一 ID 的任何视图（本视图、克隆，或本进程及其他进程中
    /// 来自 `get_block`/`list_blocks` 的视图）都不会写入该块。
    #[inline]
    pub unsafe fn bytes(&self) -> &[u8] {
        unsafe { self.map.slice(self.offset, self.size) }
    }

    /// Mutable access to the block's bytes
    ///
    /// 对块字节的可变访问
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - The heap was opened for update
    /// - No other `Block` view of the same id (from `get_block`, `list_blocks`,
    ///   or a clone) is reading or writing while the slice is alive
    ///
    /// # Safety
    ///
    /// 调用者需要确保：
    /// - 堆以可写方式打开
    /// - 切片存活期间，同一 ID 的其他 `Block` 视图（来自 `get_block`、`list_blocks`
    ///   或克隆）不会读写
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub unsafe fn bytes_mut(&self) -> &mut [u8] {
        unsafe { self.map.slice_mut(self.offset, self.size) }
    }

    /// Write `data` at `pos` bytes into the block
    ///
    /// 在块内 `pos` 字节处写入 `data`
    ///
    /// # Errors
    /// - `ReadOnly` if the heap was opened read-only
    /// - `WriteExceedsBlock` if `pos + data.len()` exceeds the block size
    ///
    /// # Errors
    /// - 堆以只读方式打开时返回 `ReadOnly`
    /// - `pos + data.len()` 超出块大小时返回 `WriteExceedsBlock`
    pub fn write_at(&self, pos: u64, data: &[u8]) -> Result<()> {
        if !self.map.is_writable() {
            return Err(Error::ReadOnly);
        }
        let fits = pos
            .checked_add(data.len() as u64)
            .is_some_and(|end| end <= self.size);
        if !fits {
            return Err(Error::WriteExceedsBlock {
                offset: pos,
                len: data.len(),
                block_size: self.size,
            });
        }

        // Safety: writable, in bounds of this block's exclusive range
        unsafe { self.map.write_bytes(self.offset + pos, data) };
        Ok(())
    }

    /// Copy bytes from `pos` into `buf`
    ///
    /// 从块内 `pos` 字节处复制到 `buf`
    ///
    /// # Returns
    /// Number of bytes actually read; 0 if `pos` is at or past the end
    ///
    /// # 返回值
    /// 实际读取的字节数；`pos` 位于或超出末尾时返回 0
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if pos >= self.size {
            return Ok(0);
        }
        let len = ((self.size - pos) as usize).min(buf.len());

        // Safety: in bounds of this block's range; copies without borrowing the mapping
        unsafe { self.map.read_bytes(self.offset + pos, &mut buf[..len]) };
        Ok(len)
    }

    /// Copy the block's bytes into a new Vec
    ///
    /// 将块字节复制到新的 Vec
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size as usize];
        self.read_at(0, &mut buf)?;
        Ok(buf)
    }

    /// Flush the block's bytes to disk asynchronously
    ///
    /// 异步刷新块字节到磁盘
    pub fn flush(&self) -> Result<()> {
        self.map.flush_range(self.offset, self.size)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .finish()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block{{Id: {}, Size: {}, Offset: {}}}", self.id, self.size, self.offset)
    }
}
