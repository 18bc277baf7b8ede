
mod common;

use marlin::*;
use common::*;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn polygon(pts: &[(u16, u16)]) -> Path {
    let pts: Vec<(f64, f64)> = pts.iter()
        .map(|&(x, y)| (f64::from(x) / 256.0 - 20.0, f64::from(y) / 300.0 - 10.0))
        .collect();
    let mut path = Path::new();
    path.polygon(&pts);
    path
}

#[quickcheck]
fn typical_alpha_matches_tile_content(pts: Vec<(u16, u16)>, even_odd: bool) -> TestResult {
    if pts.len() < 3 || pts.len() > 24 {
        return TestResult::discard();
    }
    try_init_logger_for_default_harness();
    let pool = RendererContextPool::default();
    let rule = if even_odd { FillingRule::EvenOdd } else { FillingRule::NonZero };
    let mut gen = pool.rasterize(&polygon(&pts), rule, clip(200, 200)).unwrap();
    check_tiles(&mut gen);
    gen.dispose();
    TestResult::passed()
}

#[quickcheck]
fn even_odd_never_exceeds_non_zero(pts: Vec<(u16, u16)>) -> TestResult {
    if pts.len() < 3 || pts.len() > 24 {
        return TestResult::discard();
    }
    let pool = RendererContextPool::default();
    let path = polygon(&pts);
    let nz = render_mask(&pool, &path, FillingRule::NonZero, 200, 200);
    let eo = render_mask(&pool, &path, FillingRule::EvenOdd, 200, 200);
    TestResult::from_bool(nz.data.iter().zip(eo.data.iter()).all(|(a, b)| a >= b))
}

#[quickcheck]
fn coverage_stays_inside_bbox(pts: Vec<(u16, u16)>) -> TestResult {
    if pts.len() < 3 || pts.len() > 24 {
        return TestResult::discard();
    }
    let pool = RendererContextPool::default();
    let path = polygon(&pts);
    let gen = pool.rasterize(&path, FillingRule::NonZero, clip(200, 200)).unwrap();
    let [x0, y0, x1, y1] = gen.bbox();
    gen.dispose();
    let mask = render_mask(&pool, &path, FillingRule::NonZero, 200, 200);
    for y in 0 .. 200 {
        for x in 0 .. 200 {
            let (xi, yi) = (x as i32, y as i32);
            if (xi < x0 || xi >= x1 || yi < y0 || yi >= y1) && mask.get(x, y) != 0 {
                return TestResult::failed();
            }
        }
    }
    TestResult::passed()
}
