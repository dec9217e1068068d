use blockwise::{
    BlockData, BlockId, BlockStore, InsertPosition, MovePosition,
    navigation::FocusState,
    render::{RenderView, render_blocks},
    theme::Theme,
};
use std::time::{Duration, Instant};

/// Performance benchmark suite for block store operations
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Block insertion at both ends and in the middle
/// - Reordering (every move renormalizes the order keys)
/// - Removal and undo-style restore
/// - Rendering the whole document
const SMALL_DOC_BLOCKS: usize = 10;
const MEDIUM_DOC_BLOCKS: usize = 100;
const LARGE_DOC_BLOCKS: usize = 1000;
const HUGE_DOC_BLOCKS: usize = 10000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: &[&str] = &[
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
];

/// Create a store holding `num_blocks` text blocks, every fifth one a banner.
fn create_test_store(num_blocks: usize, words_per_block: usize) -> (BlockStore, Vec<BlockId>) {
    let mut store = BlockStore::new();
    let mut ids = Vec::with_capacity(num_blocks);

    for i in 0..num_blocks {
        let mut text = String::new();
        for j in 0..words_per_block {
            if j > 0 {
                text.push(' ');
            }
            text.push_str(SAMPLE_WORDS[(i + j) % SAMPLE_WORDS.len()]);
        }
        let data = if i % 5 == 0 {
            BlockData::banner(text)
        } else {
            BlockData::text(format!("<p>{text}</p>"))
        };
        ids.push(store.insert_block(data, InsertPosition::End).id);
    }

    (store, ids)
}

fn sizes() -> Vec<(&'static str, usize)> {
    vec![
        ("Small (10 blocks)", SMALL_DOC_BLOCKS),
        ("Medium (100 blocks)", MEDIUM_DOC_BLOCKS),
        ("Large (1000 blocks)", LARGE_DOC_BLOCKS),
        ("Huge (10000 blocks)", HUGE_DOC_BLOCKS),
    ]
}

fn iterations_for(name: &str) -> usize {
    if name.contains("Huge") { 10 } else { ITERATIONS }
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..3 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

#[test]
fn bench_insertion() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           BLOCK INSERTION BENCHMARKS                           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, size) in sizes() {
        let (mut store, ids) = create_test_store(size, 8);
        let middle = ids[size / 2];

        let result = benchmark(
            &format!("insert_block at end - {name}"),
            iterations_for(name),
            || {
                let block = store.insert_block(BlockData::text("tail"), InsertPosition::End);
                store.remove_block(block.id);
            },
        );
        result.print();

        let result = benchmark(
            &format!("insert_block after middle - {name}"),
            iterations_for(name),
            || {
                let block =
                    store.insert_block(BlockData::text("middle"), InsertPosition::AfterBlock(middle));
                store.remove_block(block.id);
            },
        );
        result.print();
    }
}

#[test]
fn bench_reordering() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           REORDERING BENCHMARKS                                ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, size) in sizes() {
        let (mut store, ids) = create_test_store(size, 8);
        let first = ids[0];
        let last = ids[size - 1];

        let result = benchmark(
            &format!("move_block first <-> last - {name}"),
            iterations_for(name),
            || {
                store.move_block(first, last, MovePosition::After);
                store.move_block(first, ids[1], MovePosition::Before);
            },
        );
        result.print();

        let result = benchmark(
            &format!("move_block_down/up - {name}"),
            iterations_for(name),
            || {
                store.move_block_down(first);
                store.move_block_up(first);
            },
        );
        result.print();

        println!("\n💡 NOTE: Every move rewrites the order keys to 1..N.");
    }
}

#[test]
fn bench_remove_and_restore() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           REMOVE / RESTORE BENCHMARKS                          ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, size) in sizes() {
        let (mut store, ids) = create_test_store(size, 8);
        let victim = ids[size / 2];

        let result = benchmark(
            &format!("remove_block + restore_block - {name}"),
            iterations_for(name),
            || {
                if let Some(block) = store.remove_block(victim) {
                    let order = block.order;
                    store.restore_block(block, InsertPosition::At(order));
                }
            },
        );
        result.print();
    }
}

#[test]
fn bench_rendering() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING BENCHMARKS                                 ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let theme = Theme::default();
    for (name, size) in sizes() {
        let (store, ids) = create_test_store(size, 20);
        let view = RenderView {
            focus: FocusState::Focused(ids[size / 2]),
            ..RenderView::default()
        };

        let result = benchmark(
            &format!("render_blocks - {name}"),
            iterations_for(name),
            || {
                let _ = render_blocks(store.blocks(), &view, &theme, 80);
            },
        );
        result.print();
    }
}

#[test]
fn bench_json_round_trip() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           JSON EXPORT / IMPORT BENCHMARKS                      ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, size) in sizes() {
        let (store, _) = create_test_store(size, 8);
        let json = store.to_json().unwrap();

        let result = benchmark(
            &format!("to_json + from_json - {name}"),
            iterations_for(name),
            || {
                let mut copy = BlockStore::new();
                copy.from_json(&json).unwrap();
                let _ = copy.to_json().unwrap();
            },
        );
        result.print();
    }
}
