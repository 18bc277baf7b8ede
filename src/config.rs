//! Renderer Configuration
//!
//! Tunables shared by every context of a [`RendererContextPool`].
//! Defaults can be overridden from the environment with
//! [`RendererConfig::from_env`], using the `MARLIN_*` variables:
//!
//! | Variable                   | Field              |
//! |----------------------------|--------------------|
//! | `MARLIN_DO_STATS`          | `do_stats`         |
//! | `MARLIN_INITIAL_EDGES`     | `initial_edges`    |
//! | `MARLIN_INITIAL_WIDTH`     | `initial_width`    |
//! | `MARLIN_EDGES_HIGH_WATER`  | `edges_high_water` |
//! | `MARLIN_WIDTH_HIGH_WATER`  | `width_high_water` |
//! | `MARLIN_RLE_MIN_WIDTH`     | `rle_min_width`    |
//! | `MARLIN_MAX_CONTEXTS`      | `max_contexts`     |
//! | `MARLIN_CURVE_TOLERANCE`   | `curve_tolerance`  |
//!
//! [`RendererContextPool`]: crate::pool::RendererContextPool

use std::env;
use std::str::FromStr;

/// Configuration for renderers and the context pool
#[derive(Debug,Clone,PartialEq)]
pub struct RendererConfig {
    /// Collect renderer statistics
    pub do_stats: bool,
    /// Initial capacity of the edge array
    pub initial_edges: usize,
    /// Initial width, in pixels, of the scratch rows
    pub initial_width: usize,
    /// Edge capacity above which a released context is shrunk
    pub edges_high_water: usize,
    /// Row width above which a released context is shrunk
    pub width_high_water: usize,
    /// Minimum touched row width before run-length encoding is tried
    pub rle_min_width: usize,
    /// Maximum number of contexts alive at once, unbounded if None
    pub max_contexts: Option<usize>,
    /// Maximum distance, in pixels, between a curve and its flattening
    pub curve_tolerance: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            do_stats: false,
            initial_edges: 4096,
            initial_width: 2048,
            edges_high_water: 65536,
            width_high_water: 16384,
            rle_min_width: 64,
            max_contexts: None,
            curve_tolerance: 0.25,
        }
    }
}

impl RendererConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }
    /// Default configuration with `MARLIN_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }
    /// Apply overrides looked up through `var`
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn from_vars<F>(var: F) -> Self
        where F: Fn(&str) -> Option<String>
    {
        let mut cfg = Self::default();
        if let Some(v) = var("MARLIN_DO_STATS") {
            match parse_bool(&v) {
                Some(b) => cfg.do_stats = b,
                None => log::warn!("Invalid value for MARLIN_DO_STATS: {:?}", v),
            }
        }
        override_with(&var, "MARLIN_INITIAL_EDGES", &mut cfg.initial_edges);
        override_with(&var, "MARLIN_INITIAL_WIDTH", &mut cfg.initial_width);
        override_with(&var, "MARLIN_EDGES_HIGH_WATER", &mut cfg.edges_high_water);
        override_with(&var, "MARLIN_WIDTH_HIGH_WATER", &mut cfg.width_high_water);
        override_with(&var, "MARLIN_RLE_MIN_WIDTH", &mut cfg.rle_min_width);
        override_with(&var, "MARLIN_CURVE_TOLERANCE", &mut cfg.curve_tolerance);
        let mut max = 0usize;
        if override_with(&var, "MARLIN_MAX_CONTEXTS", &mut max) {
            cfg.max_contexts = if max == 0 { None } else { Some(max) };
        }
        if !(cfg.curve_tolerance > 0.0) {
            log::warn!("Invalid curve tolerance {}, using default", cfg.curve_tolerance);
            cfg.curve_tolerance = Self::default().curve_tolerance;
        }
        cfg
    }
    /// Enable or disable statistics
    pub fn do_stats(mut self, on: bool) -> Self {
        self.do_stats = on;
        self
    }
    /// Set the initial edge capacity
    pub fn initial_edges(mut self, n: usize) -> Self {
        self.initial_edges = n;
        self
    }
    /// Set the initial scratch row width
    pub fn initial_width(mut self, n: usize) -> Self {
        self.initial_width = n;
        self
    }
    /// Set the shrink thresholds for edges and row width
    pub fn high_water(mut self, edges: usize, width: usize) -> Self {
        self.edges_high_water = edges;
        self.width_high_water = width;
        self
    }
    /// Set the minimum row width for run-length encoding
    pub fn rle_min_width(mut self, n: usize) -> Self {
        self.rle_min_width = n;
        self
    }
    /// Bound the number of live contexts
    pub fn max_contexts(mut self, n: Option<usize>) -> Self {
        self.max_contexts = n;
        self
    }
    /// Set the curve flattening tolerance in pixels
    pub fn curve_tolerance(mut self, tol: f64) -> Self {
        assert!(tol > 0.0, "curve tolerance must be positive: {}", tol);
        self.curve_tolerance = tol;
        self
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn override_with<F, T>(var: &F, key: &str, slot: &mut T) -> bool
    where F: Fn(&str) -> Option<String>,
          T: FromStr + std::fmt::Debug,
{
    let v = match var(key) {
        Some(v) => v,
        None => return false,
    };
    match v.trim().parse::<T>() {
        Ok(x) => {
            log::debug!("{} = {:?}", key, x);
            *slot = x;
            true
        }
        Err(_) => {
            log::warn!("Invalid value for {}: {:?}, keeping {:?}", key, v, slot);
            false
        }
    }
}
