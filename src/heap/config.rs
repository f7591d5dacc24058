//! Heap configuration
//!
//! 堆配置

use super::layout::MIN_REGION_SIZE;
use std::num::NonZeroU64;

/// One mebibyte
///
/// 一兆字节（MiB）
pub const MIB: u64 = 1024 * 1024;

/// Default base region size: 16 MiB
///
/// 默认基础区域大小：16 MiB
pub const DEFAULT_REGION_SIZE: u64 = 16 * MIB;

/// Configuration for opening a heap for update
///
/// 以可写方式打开堆时的配置
///
/// The region size only affects regions appended by this process; regions
/// already in the file keep the size stored in their header.
///
/// 区域大小只影响本进程追加的区域；文件中已有的区域保留其头部记录的大小。
///
/// # Examples
///
/// ```
/// use vheap::HeapConfig;
/// use std::num::NonZeroU64;
///
/// let config = HeapConfig::default()
///     .with_region_size_mb(NonZeroU64::new(4).unwrap())
///     .with_flush_on_close(true);
/// assert_eq!(config.region_size(), 4 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Base size in bytes of each appended region
    ///
    /// 每个追加区域的基础大小（字节）
    region_size: NonZeroU64,

    /// Whether `close()` synchronously flushes every writable region
    ///
    /// `close()` 是否同步刷新所有可写区域
    flush_on_close: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            region_size: NonZeroU64::new(DEFAULT_REGION_SIZE).unwrap_or(NonZeroU64::MIN),
            flush_on_close: false,
        }
    }
}

impl HeapConfig {
    /// Set the base region size in mebibytes
    ///
    /// 以 MiB 为单位设置基础区域大小
    ///
    /// Shares the normalisation of [`with_region_size`](Self::with_region_size).
    pub fn with_region_size_mb(self, megabytes: NonZeroU64) -> Self {
        self.with_region_size(megabytes.saturating_mul(NonZeroU64::new(MIB).unwrap_or(NonZeroU64::MIN)))
    }

    /// Set the base region size in bytes
    ///
    /// 以字节为单位设置基础区域大小
    ///
    /// The size is raised to the smallest region that can hold a block and
    /// rounded up to a multiple of 8 (down, near `u64::MAX`), keeping the two
    /// atomic bookkeeping fields of every region naturally aligned.
    ///
    /// 大小不小于能容纳一个块的最小区域，并向上取整为 8 的倍数（接近 `u64::MAX` 时向下取整），
    /// 使每个区域的两个原子记账字段自然对齐。
    pub fn with_region_size(mut self, bytes: NonZeroU64) -> Self {
        let size = bytes.get().max(MIN_REGION_SIZE);
        let aligned = match size.checked_add(7) {
            Some(rounded) => rounded & !7,
            None => size & !7,
        };
        self.region_size = NonZeroU64::new(aligned).unwrap_or(bytes);
        self
    }

    /// Flush all regions to disk when the heap is closed
    ///
    /// 关闭堆时将所有区域刷新到磁盘
    pub fn with_flush_on_close(mut self, flush: bool) -> Self {
        self.flush_on_close = flush;
        self
    }

    #[inline]
    pub fn region_size(&self) -> u64 {
        self.region_size.get()
    }

    #[inline]
    pub fn flush_on_close(&self) -> bool {
        self.flush_on_close
    }
}
