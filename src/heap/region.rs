//! One fixed-size mapped segment of the heap file
//!
//! 堆文件中固定大小的一个映射段

use super::block::Block;
use super::block_id::BlockId;
use super::error::{Error, Result};
use super::layout::{
    BLOCK_LIST_HEADER_SIZE, BlockEntry, ENTRY_SIZE, HEADER_SIZE, MAX_BLOCKS_PER_REGION,
    MIN_REGION_SIZE, RegionHeader, empty_capacity, entry_offset,
};
use super::mapping::RegionMap;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::num::NonZeroU64;
use std::sync::Arc;

/// A mapped region: header, data area growing up, block list growing down
///
/// 已映射的区域：头部、向上增长的数据区、向下增长的块列表
///
/// All bookkeeping lives inside the mapped bytes, so every process mapping the
/// same file sees the same state. A single writer is assumed; readers only
/// trust block-list entries below the counter they loaded.
///
/// 所有记账信息都存放在映射字节中，因此映射同一文件的所有进程看到相同的状态。
/// 假设只有一个写入者；读取者只信任低于其加载到的计数器值的块列表条目。
#[derive(Debug)]
pub(crate) struct Region {
    index: u64,
    file_offset: u64,
    map: Arc<RegionMap>,
}

impl Region {
    /// Append a new, empty region of `size` bytes at the end of `file`
    ///
    /// 在 `file` 末尾追加一个大小为 `size` 字节的新空区域
    pub(crate) fn create(file: &File, index: u64, size: u64) -> Result<Self> {
        if size < MIN_REGION_SIZE || size % 8 != 0 {
            return Err(Error::InvalidRegionSize { offset: 0, size });
        }
        BlockId::new(index, 0)?;

        let file_offset = file.metadata()?.len();
        let end = file_offset
            .checked_add(size)
            .ok_or(Error::InvalidRegionSize { offset: file_offset, size })?;
        file.set_len(end)?;

        let map = RegionMap::map(file, file_offset, size, true)?;

        // Header first, then the counter; a crash in between leaves a region
        // whose counter reads 0 from the zero-filled extension.
        let header = RegionHeader::new(index, size);
        unsafe { map.write_bytes(0, &header.to_bytes()) };
        map.set_next_block_id(0);

        tracing::debug!(region = index, file_offset, size, "appended region");

        Ok(Self {
            index,
            file_offset,
            map: Arc::new(map),
        })
    }

    /// Reopen the region whose header starts at `file_offset`
    ///
    /// 重新打开头部位于 `file_offset` 的区域
    ///
    /// # Errors
    /// - `InvalidSignature` if the magic bytes are not `HEAPREGN`
    /// - `InvalidRegionSize` if the stored size is too small, misaligned, or
    ///   runs past the end of the file
    ///
    /// # Errors
    /// - 魔数不是 `HEAPREGN` 时返回 `InvalidSignature`
    /// - 存储的大小过小、未对齐或超出文件末尾时返回 `InvalidRegionSize`
    pub(crate) fn reopen(file: &File, writable: bool, file_offset: u64) -> Result<Self> {
        let mut reader = file;
        reader.seek(SeekFrom::Start(file_offset))?;
        let header = RegionHeader::read_from(&mut reader)?;

        if !header.has_valid_signature() {
            return Err(Error::InvalidSignature {
                offset: file_offset,
                found: header.signature,
            });
        }

        let size = header.region_size;
        let file_len = file.metadata()?.len();
        let fits = file_offset
            .checked_add(size)
            .is_some_and(|end| end <= file_len);
        if size < MIN_REGION_SIZE || size % 8 != 0 || !fits {
            return Err(Error::InvalidRegionSize {
                offset: file_offset,
                size,
            });
        }

        let map = RegionMap::map(file, file_offset, size, writable)?;

        tracing::debug!(
            region = header.region_index,
            file_offset,
            size,
            writable,
            "reopened region"
        );

        Ok(Self {
            index: header.region_index,
            file_offset,
            map: Arc::new(map),
        })
    }

    #[inline]
    pub(crate) fn index(&self) -> u64 {
        self.index
    }

    #[inline]
    pub(crate) fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Region size in bytes, including header and block list
    ///
    /// 区域大小（字节），包含头部和块列表
    #[inline]
    pub(crate) fn size(&self) -> u64 {
        self.map.len()
    }

    /// Number of block-list slots ever handed out
    ///
    /// 已分配过的块列表槽位数
    #[inline]
    pub(crate) fn next_block_id(&self) -> u64 {
        self.map.next_block_id()
    }

    /// Bytes left between the free pointer and the block list
    ///
    /// 空闲指针与块列表之间的剩余字节
    ///
    /// Recomputed on each call since both ends move. Reports 0 once every block
    /// index of the region is used.
    ///
    /// 每次调用都重新计算，因为两端都会移动。区域的所有块索引用尽后返回 0。
    pub(crate) fn available(&self) -> u64 {
        let next_id = self.next_block_id();
        if next_id >= MAX_BLOCKS_PER_REGION {
            return 0;
        }
        self.size()
            .saturating_sub(self.map.free_pointer())
            .saturating_sub(BLOCK_LIST_HEADER_SIZE + ENTRY_SIZE * next_id)
    }

    /// Largest block this region could hold if it were empty
    ///
    /// 如果区域为空，可容纳的最大块
    #[inline]
    pub(crate) fn capacity(&self) -> u64 {
        empty_capacity(self.size())
    }

    /// Allocate `size` bytes in this region
    ///
    /// 在本区域中分配 `size` 字节
    ///
    /// Write order: entry, then free pointer, then counter. The counter is the
    /// only thing that makes the slot visible, so a crash in between leaks the
    /// bytes but never exposes a torn block.
    ///
    /// 写入顺序：先条目，再空闲指针，最后计数器。计数器是唯一让槽位可见的信号，
    /// 因此中途崩溃只会泄漏字节，而不会暴露不完整的块。
    ///
    /// # Errors
    /// - `ReadOnly` if the region is mapped read-only
    /// - `BlockTooLarge` if the block cannot fit even in an empty region
    /// - `OutOfMemory` if the block does not fit in the space left
    ///
    /// # Errors
    /// - 区域以只读映射时返回 `ReadOnly`
    /// - 即使区域为空也放不下时返回 `BlockTooLarge`
    /// - 剩余空间不足时返回 `OutOfMemory`
    pub(crate) fn allocate(&self, size: NonZeroU64) -> Result<Block> {
        let size = size.get();
        if !self.map.is_writable() {
            return Err(Error::ReadOnly);
        }

        let capacity = self.capacity();
        if size > capacity {
            return Err(Error::BlockTooLarge {
                requested: size,
                capacity,
            });
        }

        // The new entry takes ENTRY_SIZE bytes off the list end as well
        let available = self.available();
        if size.saturating_add(ENTRY_SIZE) > available {
            return Err(Error::OutOfMemory {
                requested: size,
                available: available.saturating_sub(ENTRY_SIZE),
            });
        }

        let offset = self.map.free_pointer();
        let block_index = self.next_block_id();
        let id = BlockId::new(self.index, block_index)?;

        self.write_entry(block_index, BlockEntry { offset, size });
        self.map.set_free_pointer(offset + size);
        self.map.set_next_block_id(block_index + 1);

        tracing::trace!(%id, offset, size, "allocated block");

        Ok(Block::new(Arc::clone(&self.map), id, offset, size))
    }

    /// Free `block`, reclaiming its space only if it is the last one allocated
    ///
    /// 释放 `block`，仅当它是最后分配的块时回收其空间
    ///
    /// Returns `false` if the slot is already the sentinel, outside the live
    /// range, or now describes a different block (a stale view whose slot was
    /// reclaimed and reused).
    ///
    /// 如果槽位已是哨兵、超出有效范围，或现在描述的是另一个块（槽位被回收并复用后的
    /// 过期视图），返回 `false`。
    pub(crate) fn free(&self, block: &Block) -> bool {
        if !self.map.is_writable() {
            tracing::warn!(id = %block.id(), "free refused on read-only region");
            return false;
        }

        let block_index = block.id().block_index();
        let next_id = self.published();
        if block.id().region_index() != self.index || block_index >= next_id {
            return false;
        }

        let entry = self.read_entry(block_index);
        if entry.is_sentinel() || entry.offset != block.offset() || entry.size != block.size() {
            return false;
        }

        self.write_entry(block_index, BlockEntry::SENTINEL);

        // Last slot: wind the free pointer and counter back
        if block_index + 1 == next_id {
            self.map.set_free_pointer(entry.offset);
            self.map.set_next_block_id(block_index);
        }

        tracing::trace!(id = %block.id(), reclaimed = block_index + 1 == next_id, "freed block");

        true
    }

    /// Look up a live block by id
    ///
    /// 按 ID 查找有效块
    pub(crate) fn get_block(&self, id: BlockId) -> Option<Block> {
        if id.region_index() != self.index {
            return None;
        }
        if id.block_index() >= self.published() {
            return None;
        }
        self.block_at(id.block_index())
    }

    /// All live blocks in ascending block-index order
    ///
    /// 按块索引升序排列的所有有效块
    ///
    /// The counter is loaded once up front; blocks published after that are not
    /// included. Calling again re-derives the list from current state.
    ///
    /// 计数器只在开始时加载一次；之后发布的块不包含在内。再次调用会根据当前状态重新生成。
    pub(crate) fn list_blocks(&self) -> impl Iterator<Item = Block> + '_ {
        (0..self.published()).filter_map(move |block_index| self.block_at(block_index))
    }

    /// Flush the whole region synchronously
    ///
    /// 同步刷新整个区域
    pub(crate) fn flush(&self) -> Result<()> {
        self.map.flush()
    }

    /// Flush the whole region asynchronously
    ///
    /// 异步刷新整个区域
    pub(crate) fn flush_async(&self) -> Result<()> {
        self.map.flush_async()
    }

    // Internal helpers

    /// Counter value clamped to the slots the region can physically hold
    fn published(&self) -> u64 {
        let slots = (self.size() - HEADER_SIZE - BLOCK_LIST_HEADER_SIZE) / ENTRY_SIZE;
        self.next_block_id().min(MAX_BLOCKS_PER_REGION).min(slots)
    }

    fn block_at(&self, block_index: u64) -> Option<Block> {
        let entry = self.read_entry(block_index);
        if entry.is_sentinel() {
            return None;
        }
        let end = entry.offset.checked_add(entry.size)?;
        if entry.offset < HEADER_SIZE || end > entry_offset(self.size(), block_index) {
            tracing::warn!(
                region = self.index,
                block_index,
                offset = entry.offset,
                size = entry.size,
                "block entry outside data area"
            );
            return None;
        }
        let id = BlockId::new(self.index, block_index).ok()?;
        Some(Block::new(Arc::clone(&self.map), id, entry.offset, entry.size))
    }

    fn read_entry(&self, block_index: u64) -> BlockEntry {
        let at = entry_offset(self.size(), block_index);
        // Safety: entry lies within the block list, below the counter
        BlockEntry::decode(unsafe { self.map.slice(at, ENTRY_SIZE) })
    }

    fn write_entry(&self, block_index: u64, entry: BlockEntry) {
        let at = entry_offset(self.size(), block_index);
        // Safety: single writer; the slot is either unpublished or owned by `entry`
        unsafe { self.map.write_bytes(at, &entry.encode()) };
    }
}
