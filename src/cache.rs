//! Coverage Cache
//!
//! Holds one band (a row of tiles) of coverage over the path bounding box.
//! Each row keeps the range of pixels it touched, stored either as raw alpha
//! bytes or as runs. Alpha sums are kept per tile so a whole tile can be
//! classified without reading its pixels.
//!
//! Anything outside the bounding box, the band, or a row's touched range
//! reads as zero.

use std::collections::TryReserveError;

use crate::{TILE_SIZE, TILE_SIZE_LG};

/// Storage used for one row of the band
#[derive(Debug,Copy,Clone,PartialEq)]
pub enum RowStorage {
    /// Nothing covered
    Empty,
    /// One alpha byte per pixel
    Raw,
    /// Runs of equal alpha
    Rle,
}

#[derive(Debug,Copy,Clone)]
struct Row {
    storage: RowStorage,
    /// First touched pixel
    x0: i32,
    /// Pixel after the last touched one
    x1: i32,
    /// Start in `raw` or `rle`
    offset: usize,
    /// Entries in `raw` or `rle`
    len: usize,
}

const EMPTY_ROW : Row = Row { storage: RowStorage::Empty, x0: 0, x1: 0, offset: 0, len: 0 };

/// Pack a run ending at `end` (relative to the bbox) with `alpha`
#[inline]
fn pack_run(end: i32, alpha: u8) -> u32 {
    ((end as u32) << 8) | u32::from(alpha)
}
#[inline]
fn unpack_run(run: u32) -> (i32, u8) {
    ((run >> 8) as i32, (run & 0xFF) as u8)
}

/// Band of coverage rows over a bounding box
#[derive(Debug)]
pub struct CoverageCache {
    bbox_x0: i32,
    bbox_y0: i32,
    bbox_x1: i32,
    bbox_y1: i32,
    band_y0: i32,
    band_y1: i32,
    rows: Vec<Row>,
    raw: Vec<u8>,
    rle: Vec<u32>,
    tile_sums: Vec<u32>,
    scratch: Vec<u8>,
    rle_min_width: usize,
}

impl CoverageCache {
    /// Create a cache with storage for rows `width` pixels wide
    pub fn new(width: usize, rle_min_width: usize) -> Self {
        let tiles = (width + TILE_SIZE - 1) >> TILE_SIZE_LG;
        Self {
            bbox_x0: 0, bbox_y0: 0, bbox_x1: 0, bbox_y1: 0,
            band_y0: 0, band_y1: 0,
            rows: vec![EMPTY_ROW; TILE_SIZE],
            raw: Vec::with_capacity(width * TILE_SIZE),
            rle: Vec::with_capacity(width * TILE_SIZE / 4),
            tile_sums: Vec::with_capacity(tiles),
            scratch: Vec::with_capacity(width),
            rle_min_width,
        }
    }
    /// Prepare the cache for a bounding box `[x0,x1) x [y0,y1)`
    ///
    /// All storage needed for the pass is reserved here.
    pub fn init(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), TryReserveError> {
        let (x1, y1) = (x1.max(x0), y1.max(y0));
        self.bbox_x0 = x0;
        self.bbox_y0 = y0;
        self.bbox_x1 = x1;
        self.bbox_y1 = y1;
        let width = (x1 - x0) as usize;
        let tiles = (width + TILE_SIZE - 1) >> TILE_SIZE_LG;
        reserve_total(&mut self.raw, width * TILE_SIZE)?;
        reserve_total(&mut self.rle, (width / 4 + 1) * TILE_SIZE)?;
        reserve_total(&mut self.scratch, width)?;
        reserve_total(&mut self.tile_sums, tiles)?;
        self.tile_sums.clear();
        self.tile_sums.resize(tiles, 0);
        self.band_y0 = y0;
        self.band_y1 = y0;
        Ok(())
    }
    /// Bounding box as [x0, y0, x1, y1], end exclusive
    pub fn bbox(&self) -> [i32; 4] {
        [self.bbox_x0, self.bbox_y0, self.bbox_x1, self.bbox_y1]
    }
    /// Rows `[y0, y1)` currently held
    pub fn band(&self) -> (i32, i32) {
        (self.band_y0, self.band_y1)
    }
    pub fn set_rle_min_width(&mut self, n: usize) {
        self.rle_min_width = n;
    }
    /// Start a new band at row `y`, clearing everything held
    pub fn reset_band(&mut self, y: i32) {
        debug_assert!(y >= self.bbox_y0);
        self.band_y0 = y;
        self.band_y1 = (y + TILE_SIZE as i32).min(self.bbox_y1);
        for r in self.rows.iter_mut() {
            *r = EMPTY_ROW;
        }
        self.raw.clear();
        self.rle.clear();
        self.tile_sums.iter_mut().for_each(|s| *s = 0);
    }
    fn row_index(&self, y: i32) -> usize {
        assert!(y >= self.band_y0 && y < self.band_y1,
                "row {} outside band [{}, {})", y, self.band_y0, self.band_y1);
        (y - self.band_y0) as usize
    }
    #[inline]
    fn tile_index(&self, x: i32) -> usize {
        ((x - self.bbox_x0) as usize) >> TILE_SIZE_LG
    }
    /// Write the alpha of a row starting at pixel `x0`
    ///
    /// Replaces whatever the row held. Values outside the bounding box are
    /// dropped.
    pub fn copy_row(&mut self, y: i32, x0: i32, alphas: &[u8]) -> RowStorage {
        let ri = self.row_index(y);
        self.remove_row_sums(ri);
        self.rows[ri] = EMPTY_ROW;

        // Clip to bbox
        let skip = (self.bbox_x0 - x0).max(0) as usize;
        let end = ((self.bbox_x1 - x0).max(0) as usize).min(alphas.len());
        if skip >= end {
            return RowStorage::Empty;
        }
        let alphas = &alphas[skip .. end];
        let x0 = x0 + skip as i32;

        // Trim zeros on both ends
        let first = match alphas.iter().position(|&a| a != 0) {
            Some(i) => i,
            None => return RowStorage::Empty,
        };
        let last = alphas.iter().rposition(|&a| a != 0).unwrap_or(first);
        let alphas = &alphas[first ..= last];
        let x0 = x0 + first as i32;
        let x1 = x0 + alphas.len() as i32;

        // Per tile sums
        for (i, &a) in alphas.iter().enumerate() {
            let t = self.tile_index(x0 + i as i32);
            self.tile_sums[t] += u32::from(a);
        }

        let width = alphas.len();
        let runs = if width >= self.rle_min_width {
            1 + alphas.windows(2).filter(|w| w[0] != w[1]).count()
        } else {
            usize::MAX
        };
        let row = if runs <= width / 4 {
            let offset = self.rle.len();
            let mut x = x0;
            let mut start = 0;
            for i in 1 ..= width {
                if i == width || alphas[i] != alphas[start] {
                    x += (i - start) as i32;
                    self.rle.push(pack_run(x - self.bbox_x0, alphas[start]));
                    start = i;
                }
            }
            Row { storage: RowStorage::Rle, x0, x1, offset, len: self.rle.len() - offset }
        } else {
            let offset = self.raw.len();
            self.raw.extend_from_slice(alphas);
            Row { storage: RowStorage::Raw, x0, x1, offset, len: width }
        };
        self.rows[ri] = row;
        row.storage
    }
    /// Subtract a row's alpha from the tile sums
    fn remove_row_sums(&mut self, ri: usize) {
        let row = self.rows[ri];
        match row.storage {
            RowStorage::Empty => {},
            RowStorage::Raw => {
                for i in 0 .. row.len {
                    let t = self.tile_index(row.x0 + i as i32);
                    self.tile_sums[t] -= u32::from(self.raw[row.offset + i]);
                }
            },
            RowStorage::Rle => {
                let mut x = row.x0;
                for i in 0 .. row.len {
                    let (end, a) = unpack_run(self.rle[row.offset + i]);
                    let end = end + self.bbox_x0;
                    while x < end {
                        let t = self.tile_index(x);
                        self.tile_sums[t] -= u32::from(a);
                        x += 1;
                    }
                }
            },
        }
    }
    /// Set the alpha of a single pixel
    ///
    /// Pixels outside the bounding box are ignored.
    pub fn set(&mut self, x: i32, y: i32, alpha: u8) {
        let ri = self.row_index(y);
        if x < self.bbox_x0 || x >= self.bbox_x1 {
            return;
        }
        let row = self.rows[ri];
        let (x0, x1) = if row.storage == RowStorage::Empty {
            (x, x + 1)
        } else {
            (row.x0.min(x), row.x1.max(x + 1))
        };
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.resize((x1 - x0) as usize, 0);
        self.read_row(ri, x0, &mut scratch);
        scratch[(x - x0) as usize] = alpha;
        self.copy_row(y, x0, &scratch);
        self.scratch = scratch;
    }
    /// Alpha at pixel (x,y), zero outside what is held
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if y < self.band_y0 || y >= self.band_y1 {
            return 0;
        }
        let row = &self.rows[(y - self.band_y0) as usize];
        if x < row.x0 || x >= row.x1 {
            return 0;
        }
        match row.storage {
            RowStorage::Empty => 0,
            RowStorage::Raw => self.raw[row.offset + (x - row.x0) as usize],
            RowStorage::Rle => {
                let runs = &self.rle[row.offset .. row.offset + row.len];
                let rel = x - self.bbox_x0;
                let i = runs.partition_point(|&r| unpack_run(r).0 <= rel);
                unpack_run(runs[i]).1
            },
        }
    }
    /// Copy the row into `dst`, which starts at pixel `x`
    ///
    /// `dst` must be zeroed by the caller, only touched pixels are written.
    fn read_row(&self, ri: usize, x: i32, dst: &mut [u8]) {
        let row = self.rows[ri];
        let dx1 = x + dst.len() as i32;
        let (lo, hi) = (row.x0.max(x), row.x1.min(dx1));
        if lo >= hi {
            return;
        }
        match row.storage {
            RowStorage::Empty => {},
            RowStorage::Raw => {
                let src = &self.raw[row.offset + (lo - row.x0) as usize ..
                                    row.offset + (hi - row.x0) as usize];
                dst[(lo - x) as usize .. (hi - x) as usize].copy_from_slice(src);
            },
            RowStorage::Rle => {
                let mut start = row.x0;
                for &run in &self.rle[row.offset .. row.offset + row.len] {
                    let (end, a) = unpack_run(run);
                    let end = end + self.bbox_x0;
                    let (s, e) = (start.max(lo), end.min(hi));
                    if s < e && a != 0 {
                        dst[(s - x) as usize .. (e - x) as usize]
                            .iter_mut().for_each(|v| *v = a);
                    }
                    if end >= hi {
                        break;
                    }
                    start = end;
                }
            },
        }
    }
    /// Sum of alpha in the tile starting at pixel column `x`
    pub fn alpha_sum_in_tile(&self, x: i32) -> u32 {
        self.tile_sums[self.tile_index(x)]
    }
    /// Copy the `w` x `h` block at column `x` of the band into `buf`
    ///
    /// Row `r` of the block lands at `buf[offset + r * stride ..][..w]`.
    pub fn fill_tile(&self, x: i32, buf: &mut [u8], offset: usize, stride: usize, w: usize, h: usize) {
        assert!(h <= (self.band_y1 - self.band_y0) as usize,
                "tile height {} exceeds band", h);
        for r in 0 .. h {
            let start = offset + r * stride;
            let dst = &mut buf[start .. start + w];
            dst.iter_mut().for_each(|v| *v = 0);
            self.read_row(r, x, dst);
        }
    }
    /// Row width the storage holds without growing
    pub fn width_capacity(&self) -> usize {
        self.scratch.capacity()
    }
    /// Release storage above `high_water` pixels of width
    pub fn shrink(&mut self, initial: usize, high_water: usize) -> bool {
        if self.scratch.capacity() <= high_water {
            return false;
        }
        let tiles = (initial + TILE_SIZE - 1) >> TILE_SIZE_LG;
        self.raw = Vec::with_capacity(initial * TILE_SIZE);
        self.rle = Vec::with_capacity(initial * TILE_SIZE / 4);
        self.scratch = Vec::with_capacity(initial);
        self.tile_sums = Vec::with_capacity(tiles);
        true
    }
    /// Forget the pass, keeping storage
    pub fn dispose(&mut self) {
        self.bbox_x0 = 0;
        self.bbox_y0 = 0;
        self.bbox_x1 = 0;
        self.bbox_y1 = 0;
        self.band_y0 = 0;
        self.band_y1 = 0;
        for r in self.rows.iter_mut() {
            *r = EMPTY_ROW;
        }
        self.raw.clear();
        self.rle.clear();
        self.tile_sums.clear();
    }
}

fn reserve_total<T>(v: &mut Vec<T>, total: usize) -> Result<(), TryReserveError> {
    if total > v.capacity() {
        let len = v.len();
        v.try_reserve(total - len)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(w: i32, h: i32) -> CoverageCache {
        let mut c = CoverageCache::new(16, 8);
        c.init(10, 20, 10 + w, 20 + h).unwrap();
        c.reset_band(20);
        c
    }

    #[test]
    fn lazy_zero() {
        let c = cache(100, 40);
        assert_eq!(c.get(50, 25), 0);
        assert_eq!(c.get(0, 0), 0);
        assert_eq!(c.get(50, 60), 0);
        assert_eq!(c.alpha_sum_in_tile(10), 0);
    }

    #[test]
    fn raw_row_round_trip() {
        let mut c = cache(100, 40);
        let row = [0, 0, 10, 20, 30, 0];
        assert_eq!(c.copy_row(21, 40, &row), RowStorage::Raw);
        assert_eq!(c.get(41, 21), 0);
        assert_eq!(c.get(42, 21), 10);
        assert_eq!(c.get(44, 21), 30);
        assert_eq!(c.get(45, 21), 0);
        // Columns 42 .. 44 belong to the second tile
        assert_eq!(c.alpha_sum_in_tile(10), 0);
        assert_eq!(c.alpha_sum_in_tile(42), 60);
    }

    #[test]
    fn wide_uniform_rows_use_runs() {
        let mut c = cache(100, 40);
        let mut row = vec![255u8; 64];
        row[0] = 128;
        row[63] = 7;
        assert_eq!(c.copy_row(20, 10, &row), RowStorage::Rle);
        assert_eq!(c.get(10, 20), 128);
        assert_eq!(c.get(11, 20), 255);
        assert_eq!(c.get(72, 20), 255);
        assert_eq!(c.get(73, 20), 7);
        assert_eq!(c.get(74, 20), 0);
        // First tile covers columns 10..42
        assert_eq!(c.alpha_sum_in_tile(10), 128 + 31 * 255);
        assert_eq!(c.alpha_sum_in_tile(42), 31 * 255 + 7);
    }

    #[test]
    fn fill_tile_matches_get() {
        let mut c = cache(70, 40);
        let row: Vec<u8> = (0 .. 70).map(|i| if i % 3 == 0 { 0 } else { 255 }).collect();
        c.copy_row(22, 10, &row);
        c.copy_row(23, 10, &vec![200u8; 70]);
        let stride = 40;
        let mut buf = vec![9u8; stride * 32];
        c.fill_tile(42, &mut buf, 0, stride, 32, 20);
        for r in 0 .. 20 {
            for i in 0 .. 32 {
                assert_eq!(buf[r * stride + i], c.get(42 + i as i32, 20 + r as i32));
            }
            // Outside the requested width is untouched
            assert_eq!(buf[r * stride + 32], 9);
        }
    }

    #[test]
    fn set_updates_sums() {
        let mut c = cache(100, 40);
        c.set(15, 25, 100);
        c.set(15, 25, 50);
        c.set(12, 25, 10);
        assert_eq!(c.get(15, 25), 50);
        assert_eq!(c.get(12, 25), 10);
        assert_eq!(c.get(13, 25), 0);
        assert_eq!(c.alpha_sum_in_tile(10), 60);
        // Outside the bbox is dropped
        c.set(5, 25, 255);
        assert_eq!(c.get(5, 25), 0);
    }

    #[test]
    fn rows_outside_bbox_are_clipped() {
        let mut c = cache(10, 40);
        c.copy_row(20, 5, &[255; 20]);
        assert_eq!(c.get(9, 20), 0);
        assert_eq!(c.get(10, 20), 255);
        assert_eq!(c.get(19, 20), 255);
        assert_eq!(c.get(20, 20), 0);
        assert_eq!(c.alpha_sum_in_tile(10), 10 * 255);
    }

    #[test]
    fn shrink_only_above_high_water() {
        let mut c = CoverageCache::new(16, 8);
        c.init(0, 0, 300, 10).unwrap();
        let grown = c.width_capacity();
        assert!(grown >= 300);
        c.dispose();
        assert!(!c.shrink(16, grown));
        assert_eq!(c.width_capacity(), grown);
        assert!(c.shrink(16, grown - 1));
        assert!(c.width_capacity() < grown);
        c.init(0, 0, 40, 10).unwrap();
        c.reset_band(0);
        c.copy_row(3, 0, &[255; 40]);
        assert_eq!(c.get(39, 3), 255);
    }

    #[test]
    #[should_panic]
    fn write_outside_band_panics() {
        let mut c = cache(10, 40);
        c.copy_row(20 + TILE_SIZE as i32, 10, &[1]);
    }
}
