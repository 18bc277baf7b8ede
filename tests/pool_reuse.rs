
mod common;

use marlin::*;
use common::*;

fn star() -> Path {
    let mut path = Path::new();
    let pts: Vec<(f64, f64)> = (0 .. 7).map(|k| {
        let a = (k as f64 * 3.0 * 360.0 / 7.0).to_radians();
        (60.0 + 50.5 * a.cos(), 60.0 + 50.5 * a.sin())
    }).collect();
    path.polygon(&pts);
    path
}

fn blob() -> Path {
    let mut path = Path::new();
    path.move_to(5.0, 5.0);
    path.cubic_to(200.0, 0.0, -50.0, 150.0, 110.0, 115.0);
    path.quad_to(10.0, 120.0, 5.0, 5.0);
    path.close_polygon();
    path
}

#[test]
fn reused_context_gives_identical_results() {
    try_init_logger_for_default_harness();
    let pool = RendererContextPool::new(RendererConfig::new().max_contexts(Some(1)));
    let first = render_mask(&pool, &star(), FillingRule::NonZero, 128, 128);
    let _ = render_mask(&pool, &blob(), FillingRule::EvenOdd, 128, 128);
    // Abandoned pass in between
    {
        let mut gen = pool.rasterize(&blob(), FillingRule::NonZero, clip(128, 128)).unwrap();
        gen.tile_width();
        gen.next_tile();
    }
    let again = render_mask(&pool, &star(), FillingRule::NonZero, 128, 128);
    assert_eq!(pool.live_contexts(), 1);
    assert_eq!(first, again);
}

#[test]
fn small_storage_grows_and_matches() {
    try_init_logger_for_default_harness();
    let big = RendererContextPool::default();
    let small = RendererContextPool::new(
        RendererConfig::new().initial_edges(2).initial_width(4).high_water(8, 8));
    for _ in 0 .. 2 {
        assert_eq!(render_mask(&big, &blob(), FillingRule::NonZero, 128, 128),
                   render_mask(&small, &blob(), FillingRule::NonZero, 128, 128));
    }
}

#[test]
fn rle_and_raw_rows_agree() {
    try_init_logger_for_default_harness();
    let raw = RendererContextPool::new(RendererConfig::new().rle_min_width(100_000));
    let rle = RendererContextPool::new(RendererConfig::new().rle_min_width(0).do_stats(true));
    let mut path = star();
    path.rect(0.0, 120.0, 128.0, 128.0);
    assert_eq!(render_mask(&raw, &path, FillingRule::EvenOdd, 128, 128),
               render_mask(&rle, &path, FillingRule::EvenOdd, 128, 128));
    let report = rle.stats_report();
    assert!(report.cache_rle_ratio.max() > 0.0);
}

#[test]
fn concurrent_passes_share_a_pool() {
    try_init_logger_for_default_harness();
    let pool = RendererContextPool::new(RendererConfig::new().do_stats(true));
    let expected = vec![
        render_mask(&pool, &star(), FillingRule::NonZero, 128, 128),
        render_mask(&pool, &blob(), FillingRule::EvenOdd, 128, 128),
    ];
    std::thread::scope(|s| {
        for t in 0 .. 4 {
            let pool = &pool;
            let expected = &expected;
            s.spawn(move || {
                for i in 0 .. 8 {
                    let got = if (t + i) % 2 == 0 {
                        render_mask(pool, &star(), FillingRule::NonZero, 128, 128)
                    } else {
                        render_mask(pool, &blob(), FillingRule::EvenOdd, 128, 128)
                    };
                    assert_eq!(got, expected[(t + i) % 2]);
                }
            });
        }
    });
    assert!(pool.live_contexts() <= 4 + 1);
    let report = pool.stats_report();
    assert_eq!(report.pass_time.stat.count(), 2 + 4 * 8);
    assert_eq!(report.rdr_edges.count(), 2 + 4 * 8);
}
