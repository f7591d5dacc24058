//! Persistent heap implementation based on memmap2
//!
//! 基于 memmap2 的持久化堆实现
//!
//! Provides:
//! - [`Heap`]: Owns the backing file and its ordered regions, grows on demand
//! - [`Block`]: View of an allocated byte range, addressed by a [`BlockId`]
//! - [`BlockId`]: Packed `(region, block)` identifier, stable across restarts
//!
//! 提供：
//! - [`Heap`]: 拥有底层文件及其有序区域，按需增长
//! - [`Block`]: 已分配字节范围的视图，通过 [`BlockId`] 寻址
//! - [`BlockId`]: 打包的 `(region, block)` 标识符，重启后保持稳定
//!
//! # Crash Consistency
//!
//! Allocation writes the block-list entry, then the free pointer, then the
//! block counter. Only the counter publishes a block, so a writer dying midway
//! leaks the reserved bytes and never exposes a half-written block.
//!
//! # 崩溃一致性
//!
//! 分配依次写入块列表条目、空闲指针、块计数器。只有计数器会发布块，
//! 因此写入者中途终止只会泄漏预留字节，而不会暴露写了一半的块。
//!
//! # Usage
//!
//! # 用法
//!
//! ```
//! # use vheap::{Heap, Result};
//! # use tempfile::tempdir;
//! # fn main() -> Result<()> {
//! # let dir = tempdir()?;
//! # let path = dir.path().join("data.heap");
//! # use std::num::NonZeroU64;
//! let mut heap = Heap::open_for_update(&path, NonZeroU64::new(1).unwrap())?;
//!
//! let a = heap.allocate(NonZeroU64::new(100).unwrap())?;
//! let b = heap.allocate(NonZeroU64::new(200).unwrap())?;
//! assert_eq!(a.id().block_index(), 0);
//! assert_eq!(b.id().block_index(), 1);
//!
//! // Freeing the last block gives its space back
//! // 释放最后一个块会归还其空间
//! let before = heap.available();
//! assert!(heap.free(&b));
//! assert_eq!(heap.available(), before + 200 + 16);
//! assert!(!heap.free(&b));
//! # Ok(())
//! # }
//! ```

mod block;
mod block_id;
mod config;
mod error;
mod layout;
mod mapping;
mod mmap_heap;
mod region;


// Re-export public API
// 重新导出公共 API
pub use block::Block;
pub use block_id::{BlockId, MAX_BLOCK_INDEX, MAX_REGION_INDEX};
pub use config::{DEFAULT_REGION_SIZE, HeapConfig, MIB};
pub use error::{Error, Result};
pub use layout::{HEADER_SIZE, MAX_BLOCKS_PER_REGION, SIGNATURE};
pub use mmap_heap::Heap;
