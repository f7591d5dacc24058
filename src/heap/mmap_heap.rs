//! Growable heap of mapped regions
//!
//! 由映射区域组成的可增长堆

use super::block::Block;
use super::block_id::BlockId;
use super::config::HeapConfig;
use super::error::{Error, Result};
use super::layout::empty_capacity;
use super::region::Region;
use std::fs::{File, OpenOptions};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

/// Persistent memory-mapped block heap
///
/// 持久化的内存映射块堆
///
/// A single growable file holding fixed-size regions, each carrying its own
/// header, data area and block list. Blocks are addressed by a [`BlockId`] that
/// stays valid across process restarts.
///
/// 单个可增长文件，包含若干固定大小的区域，每个区域都有自己的头部、数据区和块列表。
/// 块通过 [`BlockId`] 寻址，该 ID 在进程重启后依然有效。
///
/// # Concurrency
///
/// There are no locks. One process opens the file with
/// [`open_for_update`](Self::open_for_update); any number of others may
/// [`open`](Self::open) it read-only at the same time and observe new blocks in
/// regions they have mapped. Regions appended after a reader opened the file are
/// not seen until that reader reopens it. Running two writers on the same file
/// is not supported.
///
/// # 并发
///
/// 没有任何锁。一个进程通过 [`open_for_update`](Self::open_for_update) 打开文件；
/// 其他任意数量的进程可以同时以只读方式 [`open`](Self::open)，并能看到已映射区域中的新块。
/// 读取者打开文件之后追加的区域，在重新打开之前不可见。不支持两个写入者操作同一文件。
///
/// # Examples
///
/// ```
/// # use vheap::{Heap, Result};
/// # use tempfile::tempdir;
/// # fn main() -> Result<()> {
/// # let dir = tempdir()?;
/// # let path = dir.path().join("index.heap");
/// # use std::num::NonZeroU64;
/// let mut heap = Heap::open_for_update(&path, NonZeroU64::new(1).unwrap())?;
/// let block = heap.allocate(NonZeroU64::new(5).unwrap())?;
/// block.write_at(0, b"hello")?;
/// let id = block.id();
/// heap.close()?;
///
/// // Identifiers survive reopening
/// // 标识符在重新打开后依然有效
/// let heap = Heap::open(&path)?;
/// assert_eq!(heap.get_block(id).unwrap().to_vec()?, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Heap {
    file: File,
    path: PathBuf,
    regions: Vec<Region>,
    config: HeapConfig,
    writable: bool,
}

impl Heap {
    /// Open or create a heap for reading and writing
    ///
    /// 以读写方式打开或创建堆
    ///
    /// An empty file gets region 0 of `region_size_mb` MiB; otherwise every
    /// existing region is mapped writable. `region_size_mb` is the base size
    /// for regions appended later.
    ///
    /// 空文件会创建大小为 `region_size_mb` MiB 的 0 号区域；否则所有已有区域以可写方式映射。
    /// `region_size_mb` 是之后追加区域的基础大小。
    pub fn open_for_update(path: impl AsRef<Path>, region_size_mb: NonZeroU64) -> Result<Self> {
        let config = HeapConfig::default().with_region_size_mb(region_size_mb);
        Self::open_with_config(path, &config)
    }

    /// Open or create a heap for reading and writing with an explicit configuration
    ///
    /// 使用显式配置以读写方式打开或创建堆
    pub fn open_with_config(path: impl AsRef<Path>, config: &HeapConfig) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let regions = if file.metadata()?.len() == 0 {
            vec![Region::create(&file, 0, config.region_size())?]
        } else {
            scan_regions(&file, true)?
        };

        tracing::info!(
            path = %path.display(),
            regions = regions.len(),
            region_size = config.region_size(),
            "opened heap for update"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            regions,
            config: config.clone(),
            writable: true,
        })
    }

    /// Open an existing heap read-only
    ///
    /// 以只读方式打开已有的堆
    ///
    /// Regions present at open time are mapped read-only. Blocks allocated later
    /// by a writer inside those regions become visible; regions appended later
    /// do not.
    ///
    /// 打开时已存在的区域以只读方式映射。写入者之后在这些区域中分配的块会变得可见；
    /// 之后追加的区域不可见。
    ///
    /// # Errors
    /// - `InvalidSignature` if any region header is not a heap region
    /// - Corresponding I/O errors if the file cannot be opened or mapped
    ///
    /// # Errors
    /// - 任一区域头不是堆区域时返回 `InvalidSignature`
    /// - 文件无法打开或映射时返回相应的 I/O 错误
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let regions = scan_regions(&file, false)?;

        tracing::info!(path = %path.display(), regions = regions.len(), "opened heap read-only");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            regions,
            config: HeapConfig::default(),
            writable: false,
        })
    }

    /// Close the heap, releasing the file handle and the mappings
    ///
    /// 关闭堆，释放文件句柄和映射
    ///
    /// Blocks still held by the caller keep their region mapped until dropped.
    ///
    /// 调用者仍持有的块会保持其区域映射，直到被 drop。
    pub fn close(self) -> Result<()> {
        if self.writable && self.config.flush_on_close() {
            self.sync_all()?;
        }
        tracing::info!(path = %self.path.display(), "closed heap");
        Ok(())
    }

    /// Total bytes available across all regions
    ///
    /// 所有区域可用字节总数
    pub fn available(&self) -> u64 {
        self.regions.iter().map(Region::available).sum()
    }

    /// Allocate a block of `size` bytes
    ///
    /// 分配 `size` 字节的块
    ///
    /// Regions are tried in file order. When none has room, a new region is
    /// appended, sized by doubling the base region size until the request fits,
    /// and the block is placed there.
    ///
    /// 按文件顺序尝试各区域。都没有空间时追加一个新区域，其大小为基础区域大小不断翻倍
    /// 直到能容纳请求，然后在其中分配。
    ///
    /// # Errors
    /// - `ReadOnly` if the heap was opened with [`open`](Self::open)
    /// - `BlockTooLarge` if no region size reachable by doubling can hold the request
    /// - Corresponding I/O errors if the file cannot grow or be mapped
    ///
    /// # Errors
    /// - 堆通过 [`open`](Self::open) 打开时返回 `ReadOnly`
    /// - 翻倍后仍无法容纳请求时返回 `BlockTooLarge`
    /// - 文件无法增长或映射时返回相应的 I/O 错误
    pub fn allocate(&mut self, size: NonZeroU64) -> Result<Block> {
        if !self.writable {
            tracing::warn!(path = %self.path.display(), "allocate refused on read-only heap");
            return Err(Error::ReadOnly);
        }

        for region in &self.regions {
            match region.allocate(size) {
                Ok(block) => return Ok(block),
                // An existing region sized by another configuration may never
                // hold this request; growth below sizes a region that can.
                Err(Error::OutOfMemory { .. }) | Err(Error::BlockTooLarge { .. }) => continue,
                Err(err) => return Err(err),
            }
        }

        let region_size = self.growth_size(size.get())?;
        let index = self.regions.len() as u64;
        tracing::debug!(
            region = index,
            region_size,
            requested = size.get(),
            "no region has room, growing heap"
        );

        let region = Region::create(&self.file, index, region_size)?;
        let block = region.allocate(size);
        self.regions.push(region);
        block
    }

    /// Free a block
    ///
    /// 释放块
    ///
    /// Returns `false` if the block was already freed, never existed, belongs
    /// to a region this heap does not have, or the heap is read-only. Space is
    /// only reclaimed when the block is the last one allocated in its region.
    ///
    /// 如果块已被释放、从未存在、属于本堆没有的区域，或堆为只读，返回 `false`。
    /// 只有当块是其区域中最后分配的块时才会回收空间。
    pub fn free(&mut self, block: &Block) -> bool {
        match self.region(block.id()) {
            Some(region) => region.free(block),
            None => false,
        }
    }

    /// Look up a live block by id
    ///
    /// 按 ID 查找有效块
    pub fn get_block(&self, id: BlockId) -> Option<Block> {
        self.region(id)?.get_block(id)
    }

    /// All live blocks, in region order then block-index order
    ///
    /// 所有有效块，先按区域顺序，再按块索引顺序
    pub fn list_blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.regions.iter().flat_map(|region| region.list_blocks())
    }

    /// Number of regions currently mapped
    ///
    /// 当前已映射的区域数
    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Flush all regions to disk asynchronously
    ///
    /// 异步刷新所有区域到磁盘
    pub fn flush(&self) -> Result<()> {
        self.regions.iter().try_for_each(Region::flush_async)
    }

    /// Flush all regions to disk synchronously
    ///
    /// 同步刷新所有区域到磁盘
    pub fn sync_all(&self) -> Result<()> {
        self.regions.iter().try_for_each(Region::flush)
    }

    // Internal methods

    fn region(&self, id: BlockId) -> Option<&Region> {
        let index = usize::try_from(id.region_index()).ok()?;
        self.regions.get(index)
    }

    /// Smallest `base · 2^k` whose empty capacity holds `size` bytes
    fn growth_size(&self, size: u64) -> Result<u64> {
        let mut region_size = self.config.region_size();
        while empty_capacity(region_size) < size {
            region_size = region_size.checked_mul(2).ok_or(Error::BlockTooLarge {
                requested: size,
                capacity: empty_capacity(region_size),
            })?;
        }
        Ok(region_size)
    }
}

/// Map every region from offset 0 to end of file
///
/// 从偏移 0 到文件末尾映射所有区域
fn scan_regions(file: &File, writable: bool) -> Result<Vec<Region>> {
    let file_len = file.metadata()?.len();
    let mut regions = Vec::new();
    let mut offset = 0;

    while offset < file_len {
        let region = Region::reopen(file, writable, offset)?;
        let expected = regions.len() as u64;
        if region.index() != expected {
            return Err(Error::RegionIndexMismatch {
                offset: region.file_offset(),
                expected,
                found: region.index(),
            });
        }
        offset += region.size();
        regions.push(region);
    }

    Ok(regions)
}
