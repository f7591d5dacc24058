use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::io::Write;
use std::num::NonZeroU64;
use tempfile::tempdir;
use vheap::{BlockId, Heap};

/// 测试参数
const REGION_SIZE_MB: u64 = 16;
const NUM_BLOCKS: u64 = 50_000;
const BLOCK_SIZE: u64 = 128;

/// 使用 std::fs::File 追加写入作为基准
fn bench_file_append() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("append_test.bin");

    let mut file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
    let mut offsets = Vec::with_capacity(NUM_BLOCKS as usize);
    let mut offset = 0u64;

    for i in 0..NUM_BLOCKS {
        let data = [i as u8; BLOCK_SIZE as usize];
        file.write_all(&data).unwrap();
        // 需要自行维护偏移表
        offsets.push(offset);
        offset += BLOCK_SIZE;
    }

    file.flush().unwrap();
}

/// 使用 Heap 分配并写入
fn bench_heap_allocate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("heap_test.heap");

    let mut heap = Heap::open_for_update(&path, NonZeroU64::new(REGION_SIZE_MB).unwrap()).unwrap();
    let size = NonZeroU64::new(BLOCK_SIZE).unwrap();

    for i in 0..NUM_BLOCKS {
        let block = heap.allocate(size).unwrap();
        block.write_at(0, &[i as u8; BLOCK_SIZE as usize]).unwrap();
    }

    heap.close().unwrap();
}

/// 使用 Heap 分配后按 LIFO 顺序释放
fn bench_heap_allocate_free() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("heap_free_test.heap");

    let mut heap = Heap::open_for_update(&path, NonZeroU64::new(REGION_SIZE_MB).unwrap()).unwrap();
    let size = NonZeroU64::new(BLOCK_SIZE).unwrap();

    let blocks: Vec<_> = (0..NUM_BLOCKS).map(|_| heap.allocate(size).unwrap()).collect();
    for block in blocks.iter().rev() {
        assert!(heap.free(block));
    }
}

fn allocate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");
    group.sample_size(10);

    let label = format!("{}x{}B_{}MB_regions", NUM_BLOCKS, BLOCK_SIZE, REGION_SIZE_MB);

    group.bench_function(BenchmarkId::new("file_append", &label), |b| {
        b.iter(bench_file_append);
    });

    group.bench_function(BenchmarkId::new("heap_allocate", &label), |b| {
        b.iter(bench_heap_allocate);
    });

    group.bench_function(BenchmarkId::new("heap_allocate_free", &label), |b| {
        b.iter(bench_heap_allocate_free);
    });

    group.finish();
}

fn lookup_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lookup_test.heap");

    // 预先填充堆，然后以只读方式打开
    let mut heap = Heap::open_for_update(&path, NonZeroU64::new(REGION_SIZE_MB).unwrap()).unwrap();
    let size = NonZeroU64::new(BLOCK_SIZE).unwrap();
    let ids: Vec<BlockId> = (0..NUM_BLOCKS).map(|_| heap.allocate(size).unwrap().id()).collect();
    heap.close().unwrap();

    let heap = Heap::open(&path).unwrap();

    let mut group = c.benchmark_group("lookup");

    group.bench_function(BenchmarkId::new("get_block", NUM_BLOCKS), |b| {
        b.iter(|| {
            let mut total = 0u64;
            let mut first = [0u8; 1];
            for &id in &ids {
                heap.get_block(id).unwrap().read_at(0, &mut first).unwrap();
                total += first[0] as u64;
            }
            total
        });
    });

    group.bench_function(BenchmarkId::new("list_blocks", NUM_BLOCKS), |b| {
        b.iter(|| heap.list_blocks().map(|block| block.size()).sum::<u64>());
    });

    group.finish();
}

criterion_group!(benches, allocate_benchmark, lookup_benchmark);
criterion_main!(benches);
