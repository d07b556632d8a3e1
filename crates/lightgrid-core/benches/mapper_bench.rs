//! Criterion benchmarks for [`LayoutMapper`] and board layout hot paths.
//!
//! Mapping runs once per remap, but color writes and frame reads run on every
//! animation tick, so both are measured.
//!
//! Run with:
//! ```bash
//! cargo bench --package lightgrid-core --bench mapper_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lightgrid_core::{
    BoardLayout, Color, ColorChannelMode, DeviceId, LayoutKind, LayoutMapper, Position,
    RawCoordinate, SourceLayout, TargetLayout,
};

// ── Fixture builders ──────────────────────────────────────────────────────────

/// Builds `devices` serpentine-wired panels, each `side × side`, placed next
/// to each other along x.
fn build_sources(devices: usize, side: i32) -> Vec<SourceLayout> {
    (0..devices)
        .map(|d| {
            let offset = d as i32 * side;
            let coords = (0..side).flat_map(move |x| {
                (0..side).map(move |i| {
                    let y = if x % 2 == 0 { i } else { side - 1 - i };
                    RawCoordinate::new(offset + x, y, 0)
                })
            });
            SourceLayout::new(
                DeviceId::new(format!("panel-{d}")),
                format!("uuid-{d}"),
                LayoutKind::TwoD,
                coords,
            )
        })
        .collect()
}

fn build_board(devices: usize, side: i32) -> BoardLayout {
    let target = TargetLayout::grid(devices as u32 * side as u32, side as u32)
        .expect("grid dimensions are positive");
    LayoutMapper::map_layouts(build_sources(devices, side), &target)
        .expect("fixture layouts are 2d")
}

// ── Benchmarks: mapping ───────────────────────────────────────────────────────

fn bench_map_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_layouts");

    for &devices in &[1usize, 4, 16] {
        let sources = build_sources(devices, 16);
        let target = TargetLayout::grid(devices as u32 * 16, 16).expect("positive grid");

        group.bench_with_input(BenchmarkId::new("devices", devices), &sources, |b, sources| {
            b.iter(|| LayoutMapper::map_layouts(black_box(sources.clone()), &target))
        });
    }

    group.finish();
}

// ── Benchmarks: per-tick operations ───────────────────────────────────────────

fn bench_set_color(c: &mut Criterion) {
    let mut board = build_board(4, 16);

    c.bench_function("set_color_by_position", |b| {
        b.iter(|| board.set_color(black_box(Position::new(37, 9)), black_box(Color::RED)).is_ok())
    });
}

fn bench_frame_encode(c: &mut Criterion) {
    let board = build_board(4, 16);
    let device = DeviceId::new("panel-2");

    c.bench_function("frame_encode_rgb", |b| {
        b.iter(|| {
            board
                .frame(black_box(&device))
                .map(|f| f.encode(ColorChannelMode::Rgb))
        })
    });
}

criterion_group!(benches, bench_map_scaling, bench_set_color, bench_frame_encode);
criterion_main!(benches);
