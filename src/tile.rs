//! Tile Generator
//!
//! Hands the coverage of a path to a compositor one tile at a time, in row
//! major order over the path bounding box. A pass goes:
//!
//! ```text
//! tile_width()                  start of the pass
//! while tile_bounds() is Some:
//!     typical_alpha()           0x00, 0xFF or 0x80
//!     get_alpha(..) or next_tile()
//! dispose()                     context goes back to the pool
//! ```
//!
//! Bands of [`TILE_SIZE`] rows are rendered into the cache when the first
//! tile of a band is reached.

use crate::pool::{PoolError, PooledContext};
use crate::TILE_SIZE;

/// Tile with no coverage
pub const TYPICAL_ALPHA_EMPTY   : u8 = 0x00;
/// Tile covered everywhere
pub const TYPICAL_ALPHA_FULL    : u8 = 0xFF;
/// Tile needing per pixel alpha
pub const TYPICAL_ALPHA_PARTIAL : u8 = 0x80;

/// Tile iterator over one rendering pass
#[derive(Debug)]
pub struct TileGenerator<'p> {
    ctx: Option<PooledContext<'p>>,
    bbox: [i32; 4],
    /// Top left corner of the current tile
    x: i32,
    y: i32,
    started: bool,
    done: bool,
    /// Empty, full and partial tiles seen
    tiles: [i64; 3],
}

impl<'p> TileGenerator<'p> {
    /// Finish the path held by `ctx` and render its first band
    ///
    /// `ctx` is returned to its pool on failure.
    pub fn new(mut ctx: PooledContext<'p>) -> Result<Self, PoolError> {
        ctx.renderer.path_done()?;
        let bbox = ctx.renderer.bbox();
        let [x0, y0, x1, y1] = bbox;
        ctx.cache.init(x0, y0, x1, y1)?;
        let edges = ctx.renderer.edge_count() as i64;
        if let Some(s) = ctx.stats_mut() {
            s.rdr_edges.add(edges);
        }
        let done = x0 >= x1 || y0 >= y1;
        let mut gen = Self {
            ctx: Some(ctx), bbox, x: x0, y: y0,
            started: false, done, tiles: [0; 3],
        };
        if !done {
            gen.render_band();
        }
        Ok(gen)
    }
    fn ctx(&self) -> &PooledContext<'p> {
        match self.ctx {
            Some(ref ctx) => ctx,
            None => panic!("tile generator already disposed"),
        }
    }
    fn render_band(&mut self) {
        let y = self.y;
        if let Some(ctx) = self.ctx.as_mut() {
            let ctx = &mut **ctx;
            let stats = if ctx.config().do_stats { Some(&mut ctx.stats) } else { None };
            ctx.renderer.render_band(&mut ctx.cache, y, stats);
        }
    }
    /// Bounding box of the pass as [x0, y0, x1, y1], end exclusive
    pub fn bbox(&self) -> [i32; 4] {
        self.bbox
    }
    /// Width of a tile, also marks the start of the pass
    pub fn tile_width(&mut self) -> usize {
        if !self.started {
            self.started = true;
            let ctx = self.ctx.as_mut().map(|c| &mut **c);
            if let Some(s) = ctx.and_then(|c| c.stats_mut()) {
                s.pass_time.start();
            }
        }
        TILE_SIZE
    }
    pub fn tile_height(&self) -> usize {
        TILE_SIZE
    }
    /// Bounds of the current tile, None once every tile was visited
    pub fn tile_bounds(&self) -> Option<[i32; 4]> {
        if self.done {
            return None;
        }
        let [_, _, x1, y1] = self.bbox;
        let t = TILE_SIZE as i32;
        Some([self.x, self.y, (self.x + t).min(x1), (self.y + t).min(y1)])
    }
    fn current(&self) -> [i32; 4] {
        assert!(self.started, "tile_width() must be called before the first tile");
        match self.tile_bounds() {
            Some(b) => b,
            None => panic!("no tiles left"),
        }
    }
    fn classify(&self) -> u8 {
        let [x0, y0, x1, y1] = self.current();
        let sum = self.ctx().cache.alpha_sum_in_tile(x0);
        let area = ((x1 - x0) * (y1 - y0)) as u32;
        if sum == 0 {
            TYPICAL_ALPHA_EMPTY
        } else if sum == 255 * area {
            TYPICAL_ALPHA_FULL
        } else {
            TYPICAL_ALPHA_PARTIAL
        }
    }
    /// Coverage class of the current tile
    pub fn typical_alpha(&self) -> u8 {
        self.classify()
    }
    /// Copy the alpha of the current tile into `buf` and move on
    ///
    /// Row `r` of the tile is written at `buf[offset + r * stride ..]`,
    /// `stride` must be at least the tile width.
    pub fn get_alpha(&mut self, buf: &mut [u8], offset: usize, stride: usize) {
        let [x0, y0, x1, y1] = self.current();
        let (w, h) = ((x1 - x0) as usize, (y1 - y0) as usize);
        assert!(stride >= w, "stride {} smaller than tile width {}", stride, w);
        assert!(buf.len() >= offset + (h - 1) * stride + w,
                "buffer of {} bytes too small for tile", buf.len());
        self.ctx().cache.fill_tile(x0, buf, offset, stride, w, h);
        self.advance();
    }
    /// Skip the current tile
    pub fn next_tile(&mut self) {
        self.current();
        self.advance();
    }
    fn advance(&mut self) {
        let class = self.classify();
        self.tiles[match class {
            TYPICAL_ALPHA_EMPTY => 0,
            TYPICAL_ALPHA_FULL => 1,
            _ => 2,
        }] += 1;
        if class == TYPICAL_ALPHA_PARTIAL {
            let [x0, y0, x1, y1] = self.current();
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            let mean = self.ctx().cache.alpha_sum_in_tile(x0) / area;
            if let Some(s) = self.ctx.as_mut().and_then(|c| c.stats_mut()) {
                s.tile_alpha.add(i64::from(mean));
            }
        }
        let [x0, _, x1, y1] = self.bbox;
        let t = TILE_SIZE as i32;
        self.x += t;
        if self.x >= x1 {
            self.x = x0;
            self.y += t;
            if self.y >= y1 {
                self.done = true;
            } else {
                self.render_band();
            }
        }
    }
    /// End the pass and return the context to its pool
    pub fn dispose(mut self) {
        self.finish();
    }
    fn finish(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            let [e, f, p] = self.tiles;
            if let Some(s) = ctx.stats_mut() {
                s.tiles_empty.add(e);
                s.tiles_full.add(f);
                s.tiles_partial.add(p);
                s.pass_time.stop();
            }
            log::trace!("pass done: {} empty, {} full, {} partial tiles", e, f, p);
        }
    }
}

impl Drop for TileGenerator<'_> {
    fn drop(&mut self) {
        if self.ctx.is_some() && !self.done {
            log::warn!("Tile generator dropped before its last tile");
        }
        self.finish();
    }
}
