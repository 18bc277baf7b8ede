//! Tile based anti-aliasing rasterizer
//!
//! Paths are converted into 8 bit coverage handed out in 32 x 32 tiles,
//! for a compositor to blend with.
//!
//! # Example
//!
//! ```
//! use marlin::*;
//!
//! let pool = RendererContextPool::new(RendererConfig::from_env());
//! let mut path = Path::new();
//! path.polygon(&[(10.0, 10.0), (70.0, 10.0), (40.0, 60.0)]);
//!
//! let clip = Rectangle::new(0, 0, 100, 100);
//! let mut gen = pool.rasterize(&path, FillingRule::NonZero, clip).unwrap();
//! let mask = AlphaMask::from_generator(&mut gen, 100, 100);
//! gen.dispose();
//!
//! assert_eq!(mask.get(40, 20), 255);
//! assert_eq!(mask.get(5, 5), 0);
//! ```

// How does this work
//    pool = RendererContextPool(config)
//    ctx  = pool.acquire()                 -- Renderer + CoverageCache
//  Path Operations
//    move_to, line_to, quad_to, curve_to, close_path, add_path
//     curves flattened to lines
//     clip.line_to()                       -- sub-pixel space, 17 x 15 per pixel
//       Edge::new()                        -- 32.32 fixed point x, half open rows
//     Output: EdgeList, bounding box
//  Tiles
//   TileGenerator::new(ctx)
//     path_done()
//       sort edges by first row
//     render_band()                        -- 32 pixel rows at a time
//       ActiveEdgeList::update()
//       walk crossings with the filling rule, spans into a delta row
//       sum deltas into alpha, CoverageCache::copy_row() -- raw or runs
//   tile_width(), typical_alpha(), get_alpha() / next_tile()
//   dispose()                              -- context back to the pool

pub mod config;
pub mod path;
pub mod clip;
pub mod edge;
pub mod cache;
pub mod renderer;
pub mod stats;
pub mod pool;
pub mod tile;
pub mod mask;

pub use config::*;
pub use path::*;
pub use clip::*;
pub use edge::*;
pub use cache::*;
pub use renderer::*;
pub use stats::*;
pub use pool::*;
pub use tile::*;
pub use mask::*;

/// Tile size, log 2
pub const TILE_SIZE_LG : usize = 5;
/// Tile width and height in pixels
pub const TILE_SIZE : usize = 1 << TILE_SIZE_LG;
/// Sample columns per pixel
pub const SUBPIXEL_POSITIONS_X : i32 = 17;
/// Sample rows per pixel
pub const SUBPIXEL_POSITIONS_Y : i32 = 15;
/// Alpha of a fully covered pixel, one unit per sample
pub const MAX_AA_ALPHA : i32 = SUBPIXEL_POSITIONS_X * SUBPIXEL_POSITIONS_Y;

const _: () = assert!(MAX_AA_ALPHA == 255);

/// Largest pixel coordinate reachable in a pass, either sign
///
/// Clip boxes are clamped to it. Sub-pixel rows and columns then fit an
/// `i32`, and a row of the widest bbox fits the 24 bit run lengths of the
/// cache.
pub const MAX_COORD : i32 = (1 << 23) - 1;

const _: () = assert!(2 * MAX_COORD < 1 << 24);
const _: () = assert!((MAX_COORD as i64 + 1) * (SUBPIXEL_POSITIONS_X as i64) < i32::MAX as i64);
