#![allow(dead_code)]

use marlin::*;

pub fn try_init_logger_for_default_harness() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn clip(w: i32, h: i32) -> Rectangle<i32> {
    Rectangle::new(0, 0, w, h)
}

/// Run a full pass over `path` into a `w` x `h` mask
pub fn render_mask(pool: &RendererContextPool, path: &Path, rule: FillingRule,
                   w: usize, h: usize) -> AlphaMask {
    let mut gen = pool.rasterize(path, rule, clip(w as i32, h as i32)).unwrap();
    let mask = AlphaMask::from_generator(&mut gen, w, h);
    gen.dispose();
    mask
}

/// Visit every tile with `get_alpha`, checking it against its typical alpha
pub fn check_tiles(gen: &mut TileGenerator) -> usize {
    let tw = gen.tile_width();
    let mut buf = vec![0u8; tw * gen.tile_height()];
    let mut n = 0;
    while let Some([x0, y0, x1, y1]) = gen.tile_bounds() {
        let (w, h) = ((x1 - x0) as usize, (y1 - y0) as usize);
        let class = gen.typical_alpha();
        gen.get_alpha(&mut buf, 0, tw);
        let px = (0 .. h).flat_map(|r| buf[r * tw .. r * tw + w].to_vec());
        match class {
            TYPICAL_ALPHA_EMPTY => assert!(px.into_iter().all(|a| a == 0), "tile {:?}", [x0, y0]),
            TYPICAL_ALPHA_FULL => assert!(px.into_iter().all(|a| a == 255), "tile {:?}", [x0, y0]),
            TYPICAL_ALPHA_PARTIAL => {
                let v: Vec<u8> = px.collect();
                assert!(v.iter().any(|&a| a != 0) && v.iter().any(|&a| a != 255),
                        "tile {:?}", [x0, y0]);
            },
            other => panic!("unexpected typical alpha {:#x}", other),
        }
        n += 1;
    }
    n
}
