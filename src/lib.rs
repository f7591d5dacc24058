//! Persistent memory-mapped block heap
//!
//! 持久化内存映射块堆
//!
//! A single growable file holds fixed-size regions of raw bytes. Each allocated
//! block is addressed by a compact [`BlockId`] that survives process restarts,
//! which makes the heap a low-level substrate for on-disk index structures where
//! allocation overhead and access latency must be minimal and layout is chosen
//! by the caller.
//!
//! 单个可增长文件保存若干固定大小的原始字节区域。每个已分配的块通过紧凑的
//! [`BlockId`] 寻址，该标识符在进程重启后依然有效。因此本堆适合作为磁盘索引结构的
//! 底层存储：分配开销和访问延迟极低，布局由调用者决定。
//!
//! # Features
//!
//! - **Direct access**: Writes land straight in mapped memory; reads copy out, or borrow via `unsafe`
//! - **Lock-free**: Allocation relies on write ordering, not mutual exclusion
//! - **Crash consistent**: An interrupted allocation leaks space but never tears a block
//! - **Stable identifiers**: `(region << 16) | block`, dense per region
//! - **Concurrent readers**: Any number of processes may map the file read-only
//!
//! # 特性
//!
//! - **直接访问**：写入直接落在映射内存中；读取时复制，或通过 `unsafe` 借用
//! - **无锁**：分配依赖写入顺序，而非互斥
//! - **崩溃一致**：中断的分配只会泄漏空间，不会产生撕裂的块
//! - **稳定标识符**：`(region << 16) | block`，每个区域内连续
//! - **并发读取**：任意数量的进程可以只读映射该文件
//!
//! # Quick Start
//!
//! # 快速开始
//!
//! ```
//! use vheap::{Heap, Result};
//! # use tempfile::tempdir;
//! # fn main() -> Result<()> {
//! # let dir = tempdir()?;
//! # let path = dir.path().join("quick.heap");
//! use std::num::NonZeroU64;
//!
//! // Create a heap with 1 MiB regions
//! // 创建区域大小为 1 MiB 的堆
//! let mut heap = Heap::open_for_update(&path, NonZeroU64::new(1).unwrap())?;
//!
//! let block = heap.allocate(NonZeroU64::new(4).unwrap())?;
//! block.write_at(0, b"node")?;
//! let id = block.id().as_u64();
//! heap.close()?;
//!
//! // Later, possibly from another process
//! // 之后，可能在另一个进程中
//! let heap = Heap::open(&path)?;
//! let block = heap.get_block(vheap::BlockId::from_raw(id)).unwrap();
//! assert_eq!(block.to_vec()?, b"node");
//! # Ok(())
//! # }
//! ```
//!
//! # Main Types
//!
//! - [`Heap`]: The heap file and its regions
//! - [`Block`]: View of one allocated byte range
//! - [`BlockId`]: Stable block identifier
//! - [`HeapConfig`]: Region size and close behavior
//!
//! # 主要类型
//!
//! - [`Heap`][]: 堆文件及其区域
//! - [`Block`][]: 单个已分配字节范围的视图
//! - [`BlockId`][]: 稳定的块标识符
//! - [`HeapConfig`][]: 区域大小与关闭行为

mod heap;

pub use heap::{
    Block, BlockId, DEFAULT_REGION_SIZE, Error, HEADER_SIZE, Heap, HeapConfig, MAX_BLOCK_INDEX,
    MAX_BLOCKS_PER_REGION, MAX_REGION_INDEX, MIB, Result, SIGNATURE,
};
