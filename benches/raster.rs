use criterion::{criterion_group, criterion_main, Criterion};

use marlin::*;

fn star(n: usize, r: f64) -> Path {
    let mut path = Path::new();
    let pts: Vec<(f64, f64)> = (0 .. n).map(|k| {
        let a = (k as f64 * (n / 2) as f64 * 360.0 / n as f64).to_radians();
        (512.0 + r * a.cos(), 512.0 + r * a.sin())
    }).collect();
    path.polygon(&pts);
    path
}

fn run_pass(pool: &RendererContextPool, path: &Path) -> u64 {
    let mut gen = pool.rasterize(path, FillingRule::NonZero, Rectangle::new(0, 0, 1024, 1024)).unwrap();
    let tw = gen.tile_width();
    let mut buf = vec![0u8; tw * gen.tile_height()];
    let mut sum = 0u64;
    while gen.tile_bounds().is_some() {
        if gen.typical_alpha() == TYPICAL_ALPHA_PARTIAL {
            gen.get_alpha(&mut buf, 0, tw);
            sum += buf.iter().map(|&a| u64::from(a)).sum::<u64>();
        } else {
            gen.next_tile();
        }
    }
    gen.dispose();
    sum
}

fn bench_rasterize(c: &mut Criterion) {
    let pool = RendererContextPool::default();
    let small = star(5, 40.0);
    let large = star(101, 500.0);
    c.bench_function("star 5 r40", |b| b.iter(|| run_pass(&pool, &small)));
    c.bench_function("star 101 r500", |b| b.iter(|| run_pass(&pool, &large)));
}

criterion_group!(benches, bench_rasterize);
criterion_main!(benches);
