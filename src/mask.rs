//! Alpha Mask
//!
//! A minimal compositor: drives a [`TileGenerator`] through its pass and
//! accumulates the tiles into an 8 bit coverage image, which can be
//! written to and read from grayscale PNG files.

use std::path::Path;

use crate::tile::{TileGenerator, TYPICAL_ALPHA_EMPTY, TYPICAL_ALPHA_FULL};

/// Multiply two u8 values using fixed point math
pub fn multiply_u8(a: u8, b: u8) -> u8 {
    let base_shift = 8;
    let base_msb = 1 << (base_shift - 1);
    let (a,b) = (u32::from(a), u32::from(b));
    let t : u32  = a * b + base_msb;
    let tt : u32 = ((t >> base_shift) + t) >> base_shift;
    tt as u8
}

/// Coverage image
#[derive(Debug,Clone,PartialEq)]
pub struct AlphaMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl AlphaMask {
    /// Transparent mask
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height] }
    }
    /// Mask holding the coverage of a full pass
    pub fn from_generator(gen: &mut TileGenerator, width: usize, height: usize) -> Self {
        let mut mask = Self::new(width, height);
        mask.composite(gen);
        mask
    }
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
    /// Union of the current coverage with `alpha` at (x,y)
    fn blend(&mut self, x: i32, y: i32, alpha: u8) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let d = &mut self.data[y as usize * self.width + x as usize];
        *d = alpha.saturating_add(multiply_u8(*d, 255 - alpha));
    }
    /// Run the pass of `gen` and add its coverage
    ///
    /// Empty tiles are skipped and full tiles are filled without asking
    /// for their alpha.
    pub fn composite(&mut self, gen: &mut TileGenerator) {
        let tw = gen.tile_width();
        let th = gen.tile_height();
        let mut tile = vec![0u8; tw * th];
        while let Some([x0, y0, x1, y1]) = gen.tile_bounds() {
            match gen.typical_alpha() {
                TYPICAL_ALPHA_EMPTY => gen.next_tile(),
                TYPICAL_ALPHA_FULL => {
                    for y in y0 .. y1 {
                        for x in x0 .. x1 {
                            self.blend(x, y, 255);
                        }
                    }
                    gen.next_tile();
                },
                _ => {
                    gen.get_alpha(&mut tile, 0, tw);
                    for y in y0 .. y1 {
                        let row = (y - y0) as usize * tw;
                        for x in x0 .. x1 {
                            self.blend(x, y, tile[row + (x - x0) as usize]);
                        }
                    }
                },
            }
        }
    }
    /// Write the mask as a grayscale PNG
    pub fn to_file<P: AsRef<Path>>(&self, filename: P) -> Result<(), std::io::Error> {
        image::save_buffer(filename, &self.data, self.width as u32, self.height as u32, image::Gray(8))
    }
    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<Self, image::ImageError> {
        let img = image::open(filename)?.to_luma();
        let (w, h) = img.dimensions();
        Ok(Self { width: w as usize, height: h as usize, data: img.into_raw() })
    }
}

/// Compare two mask images, logging every differing pixel
pub fn img_diff<P: AsRef<Path>>(f1: P, f2: P) -> Result<bool,image::ImageError> {
    let m1 = AlphaMask::read_file(f1)?;
    let m2 = AlphaMask::read_file(f2)?;
    if m1.width != m2.width || m1.height != m2.height {
        log::warn!("mask sizes differ: {}x{} {}x{}", m1.width, m1.height, m2.width, m2.height);
        return Ok(false);
    }
    let mut flag = true;
    for (i,(v1,v2)) in m1.data.iter().zip(m2.data.iter()).enumerate() {
        if v1 != v2 {
            log::warn!("{} [{},{}]: {} {}", i, i % m1.width, i / m1.width, v1, v2);
            flag = false;
        }
    }
    Ok(flag)
}
