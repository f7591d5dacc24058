//! Shared memory mapping of one region
//!
//! 单个区域的共享内存映射

use super::error::{Error, Result};
use super::layout::{FREE_POINTER_OFFSET, next_id_offset};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};

/// Owner of the mapped memory; kept only to unmap on drop
///
/// 映射内存的所有者；仅用于在 drop 时解除映射
enum Mapping {
    ReadOnly(#[allow(dead_code)] Mmap),
    ReadWrite(MmapMut),
}

/// Raw view of one region's shared mapping
///
/// 单个区域共享映射的原始视图
///
/// All access goes through a raw pointer captured at map time, in the same way
/// a shared mapping is seen by every other process that maps the file: the
/// region bookkeeping decides who may touch which bytes, not the borrow checker.
///
/// 所有访问都通过映射时获取的原始指针进行，与其他映射该文件的进程看到的方式相同：
/// 由区域的记账信息决定谁可以访问哪些字节，而不是借用检查器。
///
/// # Safety Notes
///
/// - Block data ranges handed out by the region never overlap each other nor the
///   header or block list
/// - The free pointer and the next-id counter are only accessed atomically
/// - Block-list entries are written before the counter publishes them
///
/// # 安全性说明
///
/// - 区域分配的块数据范围互不重叠，也不与头部或块列表重叠
/// - 空闲指针和下一个 ID 计数器只通过原子操作访问
/// - 块列表条目在计数器发布之前写入
pub(crate) struct RegionMap {
    mapping: Mapping,
    ptr: *mut u8,
    len: u64,
}

impl RegionMap {
    /// Map `len` bytes of `file` starting at `offset`
    ///
    /// 从 `offset` 开始映射 `file` 的 `len` 字节
    ///
    /// `offset` need not be page aligned; memmap2 adjusts internally.
    pub(crate) fn map(file: &File, offset: u64, len: u64, writable: bool) -> Result<Self> {
        let map_len = usize::try_from(len).map_err(|_| Error::InvalidRegionSize { offset, size: len })?;
        let mut options = MmapOptions::new();
        options.offset(offset).len(map_len);

        let (mapping, ptr) = if writable {
            let mut mmap = unsafe { options.map_mut(file)? };
            let ptr = mmap.as_mut_ptr();
            (Mapping::ReadWrite(mmap), ptr)
        } else {
            let mmap = unsafe { options.map(file)? };
            let ptr = mmap.as_ptr() as *mut u8;
            (Mapping::ReadOnly(mmap), ptr)
        };

        Ok(Self { mapping, ptr, len })
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub(crate) fn is_writable(&self) -> bool {
        matches!(self.mapping, Mapping::ReadWrite(_))
    }

    /// Borrow `len` bytes at `offset`
    ///
    /// 借用 `offset` 处的 `len` 字节
    ///
    /// # Safety
    ///
    /// `offset + len` must lie within the mapping, and no writer may be
    /// modifying these bytes while the slice is alive.
    ///
    /// # Safety
    ///
    /// `offset + len` 必须位于映射范围内，且切片存活期间不能有写入者修改这些字节。
    #[inline]
    pub(crate) unsafe fn slice(&self, offset: u64, len: u64) -> &[u8] {
        debug_assert!(offset + len <= self.len);
        unsafe { std::slice::from_raw_parts(self.ptr.add(offset as usize), len as usize) }
    }

    /// Mutably borrow `len` bytes at `offset`
    ///
    /// 可变借用 `offset` 处的 `len` 字节
    ///
    /// # Safety
    ///
    /// Same as [`slice`](Self::slice), plus: the mapping must be writable and no
    /// other reference to these bytes may exist.
    ///
    /// # Safety
    ///
    /// 与 [`slice`](Self::slice) 相同，另外映射必须可写，且这些字节不能存在其他引用。
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub(crate) unsafe fn slice_mut(&self, offset: u64, len: u64) -> &mut [u8] {
        debug_assert!(self.is_writable());
        debug_assert!(offset + len <= self.len);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset as usize), len as usize) }
    }

    /// Copy `data` into the mapping at `offset`
    ///
    /// 将 `data` 复制到映射的 `offset` 处
    ///
    /// # Safety
    ///
    /// The mapping must be writable, the range must be in bounds and owned by
    /// the caller.
    ///
    /// # Safety
    ///
    /// 映射必须可写，范围必须在界内且归调用者所有。
    #[inline]
    pub(crate) unsafe fn write_bytes(&self, offset: u64, data: &[u8]) {
        debug_assert!(self.is_writable());
        debug_assert!(offset + data.len() as u64 <= self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.add(offset as usize), data.len());
        }
    }

    /// Copy bytes at `offset` into `buf`
    ///
    /// 将 `offset` 处的字节复制到 `buf`
    ///
    /// # Safety
    ///
    /// `offset + buf.len()` must lie within the mapping.
    ///
    /// # Safety
    ///
    /// `offset + buf.len()` 必须位于映射范围内。
    #[inline]
    pub(crate) unsafe fn read_bytes(&self, offset: u64, buf: &mut [u8]) {
        debug_assert!(offset + buf.len() as u64 <= self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.add(offset as usize), buf.as_mut_ptr(), buf.len());
        }
    }

    /// Atomic view of the 8-byte field at `offset`
    ///
    /// `offset` 处 8 字节字段的原子视图
    #[inline]
    fn atomic(&self, offset: u64) -> &AtomicU64 {
        assert!(offset + 8 <= self.len);
        let field = unsafe { self.ptr.add(offset as usize) };
        assert_eq!(field as usize % align_of::<AtomicU64>(), 0, "misaligned region field");
        // Safety: in bounds, aligned, and the mapping outlives `&self`
        unsafe { AtomicU64::from_ptr(field as *mut u64) }
    }

    /// Load the free pointer (Acquire)
    ///
    /// 加载空闲指针（Acquire）
    #[inline]
    pub(crate) fn free_pointer(&self) -> u64 {
        u64::from_le(self.atomic(FREE_POINTER_OFFSET).load(Ordering::Acquire))
    }

    /// Store the free pointer (Release)
    ///
    /// 存储空闲指针（Release）
    #[inline]
    pub(crate) fn set_free_pointer(&self, value: u64) {
        debug_assert!(self.is_writable());
        self.atomic(FREE_POINTER_OFFSET).store(value.to_le(), Ordering::Release);
    }

    /// Load the next-free-block-id counter (Acquire)
    ///
    /// Entries below the returned value are fully written.
    ///
    /// 加载下一个空闲块 ID 计数器（Acquire）。低于返回值的条目均已完整写入。
    #[inline]
    pub(crate) fn next_block_id(&self) -> u64 {
        u64::from_le(self.atomic(next_id_offset(self.len)).load(Ordering::Acquire))
    }

    /// Store the next-free-block-id counter (Release)
    ///
    /// 存储下一个空闲块 ID 计数器（Release）
    #[inline]
    pub(crate) fn set_next_block_id(&self, value: u64) {
        debug_assert!(self.is_writable());
        self.atomic(next_id_offset(self.len)).store(value.to_le(), Ordering::Release);
    }

    /// Flush the mapping to disk synchronously
    ///
    /// 同步刷新映射到磁盘
    pub(crate) fn flush(&self) -> Result<()> {
        match &self.mapping {
            Mapping::ReadWrite(mmap) => Ok(mmap.flush()?),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }

    /// Flush the mapping to disk asynchronously
    ///
    /// 异步刷新映射到磁盘
    pub(crate) fn flush_async(&self) -> Result<()> {
        match &self.mapping {
            Mapping::ReadWrite(mmap) => Ok(mmap.flush_async()?),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }

    /// Flush `len` bytes at `offset` asynchronously
    ///
    /// 异步刷新 `offset` 处的 `len` 字节
    pub(crate) fn flush_range(&self, offset: u64, len: u64) -> Result<()> {
        match &self.mapping {
            Mapping::ReadWrite(mmap) => Ok(mmap.flush_async_range(offset as usize, len as usize)?),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for RegionMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionMap")
            .field("len", &self.len)
            .field("writable", &self.is_writable())
            .finish()
    }
}

// Implement Send and Sync
// Safety: the pointer stays valid for the lifetime of `mapping`; shared bytes
// are partitioned by the region bookkeeping and the hot fields are atomics
//
// 实现 Send 和 Sync
// Safety: 指针在 `mapping` 生命周期内有效；共享字节由区域记账划分，热点字段为原子
unsafe impl Send for RegionMap {}
unsafe impl Sync for RegionMap {}
