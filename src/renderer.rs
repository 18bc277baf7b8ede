//! Scanline Renderer
//!
//! Turns a path into coverage rows. Every pixel row is sampled on
//! [`SUBPIXEL_POSITIONS_Y`] sample rows; on each sample row the crossings of
//! the active edges are walked with the filling rule, and each covered span
//! adds one unit per sample column to a delta encoded row. Once all sample
//! rows of a pixel row are done the delta row is summed into alpha values
//! and written to the [`CoverageCache`].
//!
//! There are [`SUBPIXEL_POSITIONS_X`] sample columns per pixel and the grid
//! holds [`MAX_AA_ALPHA`] samples, so a sample count is the alpha value
//! itself.

use std::collections::TryReserveError;

use crate::cache::{CoverageCache, RowStorage};
use crate::clip::{Clip, Rectangle};
use crate::edge::{ActiveEdgeList, EdgeList};
use crate::path::{flatten_cubic, flatten_quad, PathCommand, VertexSource};
use crate::stats::RendererStats;
use crate::{MAX_AA_ALPHA, MAX_COORD, SUBPIXEL_POSITIONS_X, SUBPIXEL_POSITIONS_Y, TILE_SIZE};

/// Rule deciding which regions of a path are inside
#[derive(Debug,PartialEq,Copy,Clone)]
pub enum FillingRule {
    /// Inside where the winding number is not zero
    NonZero,
    /// Inside where an odd number of edges lie to the left
    EvenOdd,
}
impl Default for FillingRule {
    fn default() -> FillingRule {
        FillingRule::NonZero
    }
}

/// Coverage output
#[derive(Debug,PartialEq,Copy,Clone)]
pub enum RenderMode {
    /// Fractional coverage
    AntiAliased,
    /// Coverage of at least one half becomes 255, anything less 0
    Aliased,
}
impl Default for RenderMode {
    fn default() -> RenderMode {
        RenderMode::AntiAliased
    }
}

#[derive(Debug,PartialEq,Copy,Clone)]
enum PathStatus {
    Initial,
    MoveTo,
    LineTo,
    Closed,
}

const SX : f64 = SUBPIXEL_POSITIONS_X as f64;
const SY : f64 = SUBPIXEL_POSITIONS_Y as f64;

fn identity_map() -> Vec<u8> {
    (0 ..= MAX_AA_ALPHA).map(|i| i as u8).collect()
}

/// Clamp every side of `clip` into `[-MAX_COORD, MAX_COORD]`
fn limit_clip(clip: Rectangle<i32>) -> Rectangle<i32> {
    let lim = |v: i32| v.max(-MAX_COORD).min(MAX_COORD);
    Rectangle::new(lim(clip.x1), lim(clip.y1), lim(clip.x2), lim(clip.y2))
}

/// Scanline renderer
#[derive(Debug)]
pub struct Renderer {
    clipper: Clip,
    edges: EdgeList,
    ael: ActiveEdgeList,
    filling_rule: FillingRule,
    mode: RenderMode,
    /// Sample count to alpha
    alpha_map: Vec<u8>,
    status: PathStatus,
    /// Start of the current sub-path, pixels
    start: (f64, f64),
    /// Current point, pixels
    cur: (f64, f64),
    clip: Rectangle<i32>,
    bbox: [i32; 4],
    curve_tolerance: f64,
    /// Coverage deltas of the pixel row being sampled
    alpha_delta: Vec<i32>,
    alpha_row: Vec<u8>,
}

impl Renderer {
    /// Create a renderer with storage for `edges` edges and rows of `width` pixels
    pub fn new(edges: usize, width: usize) -> Self {
        let mut r = Self {
            clipper: Clip::new(),
            edges: EdgeList::with_capacity(edges),
            ael: ActiveEdgeList::with_capacity(edges.min(1024)),
            filling_rule: FillingRule::NonZero,
            mode: RenderMode::AntiAliased,
            alpha_map: identity_map(),
            status: PathStatus::Initial,
            start: (0.0, 0.0),
            cur: (0.0, 0.0),
            clip: Rectangle::default(),
            bbox: [0; 4],
            curve_tolerance: 0.25,
            alpha_delta: Vec::with_capacity(width + 2),
            alpha_row: Vec::with_capacity(width),
        };
        r.set_clip(Rectangle::default());
        r
    }
    fn set_clip(&mut self, clip: Rectangle<i32>) {
        let c = limit_clip(clip);
        self.clip = c;
        self.clipper.clip_box(f64::from(c.x1) * SX, f64::from(c.y1) * SY,
                              f64::from(c.x2) * SX, f64::from(c.y2) * SY);
    }
    /// Start a new path clipped to the pixel rectangle `clip`
    ///
    /// The clip is limited to [`MAX_COORD`] on every side.
    pub fn init(&mut self, clip: Rectangle<i32>, filling_rule: FillingRule) {
        self.dispose();
        self.set_clip(clip);
        self.filling_rule = filling_rule;
        log::trace!("init clip {:?} {:?}", self.clip, filling_rule);
    }
    /// Clip in effect, in pixels
    pub fn clip(&self) -> Rectangle<i32> {
        self.clip
    }
    pub fn filling_rule(&self) -> FillingRule {
        self.filling_rule
    }
    pub fn set_filling_rule(&mut self, rule: FillingRule) {
        self.filling_rule = rule;
    }
    pub fn set_curve_tolerance(&mut self, tol: f64) {
        self.curve_tolerance = tol;
    }
    /// Select anti-aliased or aliased output
    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
        if mode == RenderMode::Aliased {
            self.alpha_map = (0 ..= MAX_AA_ALPHA)
                .map(|i| if 2 * i > MAX_AA_ALPHA { 255 } else { 0 })
                .collect();
        } else {
            self.alpha_map = identity_map();
        }
    }
    pub fn mode(&self) -> RenderMode {
        self.mode
    }
    /// Apply a gamma function to anti-aliased coverage
    ///
    /// `gfunc` maps coverage in [0,1] to alpha in [0,1].
    pub fn gamma<F>(&mut self, gfunc: F)
        where F: Fn(f64) -> f64
    {
        let mask = f64::from(MAX_AA_ALPHA);
        self.mode = RenderMode::AntiAliased;
        self.alpha_map = (0 ..= MAX_AA_ALPHA)
            .map(|i| gfunc(f64::from(i) / mask))
            .map(|v| (v * 255.0).round().max(0.0).min(255.0) as u8)
            .collect();
    }

    fn to_sub(x: f64, y: f64) -> (f64, f64) {
        (x * SX, y * SY)
    }
    /// Start a new sub-path, closing the previous one
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.close_path();
        self.start = (x, y);
        self.cur = (x, y);
        let (sx, sy) = Self::to_sub(x, y);
        self.clipper.move_to(sx, sy);
        self.status = PathStatus::MoveTo;
    }
    pub fn line_to(&mut self, x: f64, y: f64) {
        if self.status == PathStatus::Initial || self.status == PathStatus::Closed {
            // Implicit move to the last point
            let (cx, cy) = self.cur;
            self.move_to(cx, cy);
        }
        let (sx, sy) = Self::to_sub(x, y);
        self.clipper.line_to(&mut self.edges, sx, sy);
        self.cur = (x, y);
        self.status = PathStatus::LineTo;
    }
    /// Quadratic Bezier through control point (cx,cy)
    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        let p0 = self.cur;
        let tol = self.curve_tolerance;
        let mut pts = Vec::new();
        flatten_quad(p0, (cx, cy), (x, y), tol, |x, y| pts.push((x, y)));
        for (x, y) in pts {
            self.line_to(x, y);
        }
    }
    /// Cubic Bezier through control points (cx1,cy1) and (cx2,cy2)
    pub fn curve_to(&mut self, cx1: f64, cy1: f64, cx2: f64, cy2: f64, x: f64, y: f64) {
        let p0 = self.cur;
        let tol = self.curve_tolerance;
        let mut pts = Vec::new();
        flatten_cubic(p0, (cx1, cy1), (cx2, cy2), (x, y), tol, |x, y| pts.push((x, y)));
        for (x, y) in pts {
            self.line_to(x, y);
        }
    }
    /// Close the current sub-path back to its start
    pub fn close_path(&mut self) {
        if self.status == PathStatus::LineTo {
            let (x, y) = self.start;
            let (sx, sy) = Self::to_sub(x, y);
            self.clipper.line_to(&mut self.edges, sx, sy);
            self.cur = self.start;
        }
        if self.status != PathStatus::Initial {
            self.status = PathStatus::Closed;
        }
    }
    /// Add a single edge in pixel coordinates, independent of the current path
    pub fn add_edge(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        let (sx0, sy0) = Self::to_sub(x0, y0);
        let (sx1, sy1) = Self::to_sub(x1, y1);
        self.clipper.move_to(sx0, sy0);
        self.clipper.line_to(&mut self.edges, sx1, sy1);
        let (cx, cy) = Self::to_sub(self.cur.0, self.cur.1);
        self.clipper.move_to(cx, cy);
    }
    /// Add every sub-path of `path`
    pub fn add_path<VS: VertexSource>(&mut self, path: &VS) {
        let v = path.vertices();
        let mut i = 0;
        while i < v.len() {
            let p = v[i];
            match p.cmd {
                PathCommand::MoveTo => self.move_to(p.x, p.y),
                PathCommand::LineTo => self.line_to(p.x, p.y),
                PathCommand::Close  => self.close_path(),
                PathCommand::Curve3 => {
                    if i + 1 < v.len() {
                        let e = v[i+1];
                        self.quad_to(p.x, p.y, e.x, e.y);
                        i += 1;
                    } else {
                        self.line_to(p.x, p.y);
                    }
                },
                PathCommand::Curve4 => {
                    if i + 2 < v.len() {
                        let (c2, e) = (v[i+1], v[i+2]);
                        self.curve_to(p.x, p.y, c2.x, c2.y, e.x, e.y);
                        i += 2;
                    } else {
                        self.line_to(p.x, p.y);
                    }
                },
            }
            i += 1;
        }
    }
    /// Finish the path and compute its bounding box
    ///
    /// Storage for the sweep is reserved here, failures are reported
    /// instead of aborting.
    pub fn path_done(&mut self) -> Result<(), TryReserveError> {
        self.close_path();
        if let Some(err) = self.edges.take_alloc_error() {
            return Err(err);
        }
        self.edges.sort();
        self.bbox = match self.edges.extent() {
            None => [0; 4],
            Some((min_x, min_row, max_x, end_row)) => {
                let c = self.clip;
                let x0 = clamp_i32((min_x / SX).floor()).max(c.x1);
                let x1 = clamp_i32((max_x / SX).ceil()).min(c.x2);
                let y0 = min_row.div_euclid(SUBPIXEL_POSITIONS_Y).max(c.y1);
                let y1 = (end_row + SUBPIXEL_POSITIONS_Y - 1)
                    .div_euclid(SUBPIXEL_POSITIONS_Y).min(c.y2);
                if x0 < x1 && y0 < y1 { [x0, y0, x1, y1] } else { [0; 4] }
            },
        };
        let width = (self.bbox[2] - self.bbox[0]) as usize;
        reserve_len(&mut self.alpha_delta, width + 2)?;
        reserve_len(&mut self.alpha_row, width)?;
        self.alpha_delta.clear();
        self.alpha_delta.resize(width + 2, 0);
        self.alpha_row.clear();
        self.alpha_row.resize(width, 0);
        self.ael.reserve(self.edges.len())?;
        log::debug!("path done: {} edges, bbox {:?}", self.edges.len(), self.bbox);
        Ok(())
    }
    /// Bounding box of the covered pixels as [x0, y0, x1, y1], end exclusive
    pub fn bbox(&self) -> [i32; 4] {
        self.bbox
    }
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
    /// Edges the storage holds without growing
    pub fn edge_capacity(&self) -> usize {
        self.edges.capacity()
    }
    /// Render the band of pixel rows starting at `y` into `cache`
    ///
    /// Bands must be requested top to bottom, each starting where the
    /// previous one ended.
    pub fn render_band(&mut self, cache: &mut CoverageCache, y: i32,
                       mut stats: Option<&mut RendererStats>) {
        let [bx0, _, bx1, by1] = self.bbox;
        let band_end = (y + TILE_SIZE as i32).min(by1);
        cache.reset_band(y);
        log::trace!("render band {} .. {}", y, band_end);

        let sx0 = bx0 * SUBPIXEL_POSITIONS_X;
        let sx1 = bx1 * SUBPIXEL_POSITIONS_X;
        let width = (bx1 - bx0) as usize;
        let mut rle_rows = 0;
        let mut rows = 0;

        for py in y .. band_end {
            let mut lo = usize::MAX;
            let mut hi = 0;
            let mut crossings = 0;
            for sub in 0 .. SUBPIXEL_POSITIONS_Y {
                let row = py * SUBPIXEL_POSITIONS_Y + sub;
                self.ael.update(self.edges.edges_mut(), row);
                crossings += self.ael.len();
                if let Some(s) = stats.as_mut() {
                    s.rdr_active_edges.add(self.ael.len() as i64);
                }
                let rule = self.filling_rule;
                let delta = &mut self.alpha_delta;
                let mut winding = 0;
                let mut span_start = 0;
                for (x, dir) in self.ael.crossings(self.edges.edges()) {
                    let was_inside = winding != 0;
                    winding = match rule {
                        FillingRule::NonZero => winding + dir,
                        FillingRule::EvenOdd => winding ^ 1,
                    };
                    let inside = winding != 0;
                    if !was_inside && inside {
                        span_start = x;
                    } else if was_inside && !inside {
                        let a = span_start.max(sx0);
                        let b = x.min(sx1);
                        if a < b {
                            let (pa, pb) = add_span(delta, a - sx0, b - sx0);
                            lo = lo.min(pa);
                            hi = hi.max(pb);
                        }
                    }
                }
                self.ael.step(self.edges.edges_mut());
            }
            if let Some(s) = stats.as_mut() {
                s.rdr_crossings.add(crossings as i64);
            }
            if lo == usize::MAX {
                continue;
            }
            // Sum deltas into alpha
            let end = (hi + 1).min(width);
            let mut acc = 0i32;
            for p in lo .. end {
                acc += self.alpha_delta[p];
                let cov = acc.max(0).min(MAX_AA_ALPHA);
                self.alpha_row[p] = self.alpha_map[cov as usize];
            }
            for d in &mut self.alpha_delta[lo ..= hi + 1] {
                *d = 0;
            }
            let storage = cache.copy_row(py, bx0 + lo as i32, &self.alpha_row[lo .. end]);
            rows += 1;
            if storage == RowStorage::Rle {
                rle_rows += 1;
            }
            if let Some(s) = stats.as_mut() {
                s.cache_row_width.add((end - lo) as i64);
            }
        }
        if let Some(s) = stats {
            if rows > 0 {
                s.cache_rle_ratio.add(f64::from(rle_rows) / f64::from(rows));
            }
        }
    }
    /// Release storage above the high-water marks
    pub fn shrink(&mut self, edges: usize, edges_high_water: usize,
                  width: usize, width_high_water: usize) -> bool {
        let mut shrunk = self.edges.shrink(edges, edges_high_water);
        self.ael.shrink(edges.min(1024), edges_high_water);
        if self.alpha_delta.capacity() > width_high_water + 2 {
            self.alpha_delta = Vec::with_capacity(width + 2);
            self.alpha_row = Vec::with_capacity(width);
            shrunk = true;
        }
        shrunk
    }
    /// Reset all per-path state, keeping storage
    pub fn dispose(&mut self) {
        self.edges.reset();
        self.ael.reset();
        self.filling_rule = FillingRule::NonZero;
        if self.mode != RenderMode::AntiAliased || self.alpha_map[128] != 128 {
            self.set_mode(RenderMode::AntiAliased);
        }
        self.status = PathStatus::Initial;
        self.start = (0.0, 0.0);
        self.cur = (0.0, 0.0);
        self.set_clip(Rectangle::default());
        self.bbox = [0; 4];
        self.alpha_delta.clear();
        self.alpha_row.clear();
    }
}

/// Add the samples `[a, b)` of one sample row to the delta row
///
/// Returns the first and last pixel touched.
#[inline]
fn add_span(delta: &mut [i32], a: i32, b: i32) -> (usize, usize) {
    let (pa, fa) = ((a / SUBPIXEL_POSITIONS_X) as usize, a % SUBPIXEL_POSITIONS_X);
    let (pb, fb) = ((b / SUBPIXEL_POSITIONS_X) as usize, b % SUBPIXEL_POSITIONS_X);
    delta[pa]     += SUBPIXEL_POSITIONS_X - fa;
    delta[pa + 1] += fa;
    delta[pb]     -= SUBPIXEL_POSITIONS_X - fb;
    delta[pb + 1] -= fb;
    (pa, pb)
}

fn clamp_i32(v: f64) -> i32 {
    v.max(f64::from(std::i32::MIN)).min(f64::from(std::i32::MAX)) as i32
}

fn reserve_len<T>(v: &mut Vec<T>, len: usize) -> Result<(), TryReserveError> {
    if len > v.capacity() {
        let cur = v.len();
        v.try_reserve(len - cur)?;
    }
    Ok(())
}
