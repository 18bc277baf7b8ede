//! Renderer Context Pool
//!
//! A rendering pass needs a [`Renderer`], a [`CoverageCache`] and their
//! storage. Contexts are kept in a pool so storage is reused between
//! passes. A context is handed out as a [`PooledContext`] and goes back to
//! the pool when the handle is dropped, however the pass ended.
//!
//! The pool may be shared between threads; each context is used by one
//! thread at a time.

use std::collections::TryReserveError;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use quick_error::quick_error;

use crate::cache::CoverageCache;
use crate::clip::Rectangle;
use crate::config::RendererConfig;
use crate::path::VertexSource;
use crate::renderer::{FillingRule, Renderer};
use crate::stats::RendererStats;
use crate::tile::TileGenerator;

quick_error! {
    #[derive(Debug)]
    pub enum PoolError {
        /// Every context allowed by `max_contexts` is in use
        Exhausted(max: usize) {
            display("all {} renderer contexts are in use", max)
        }
        /// Storage for a pass could not be reserved
        Alloc(err: TryReserveError) {
            from()
            display("renderer storage allocation failed: {}", err)
            cause(err)
        }
    }
}

/// Everything one rendering pass needs
#[derive(Debug)]
pub struct RendererContext {
    pub renderer: Renderer,
    pub cache: CoverageCache,
    /// Statistics, only updated when `do_stats` is set
    pub stats: RendererStats,
    config: RendererConfig,
}

impl RendererContext {
    pub fn new(config: &RendererConfig) -> Self {
        let mut renderer = Renderer::new(config.initial_edges, config.initial_width);
        renderer.set_curve_tolerance(config.curve_tolerance);
        Self {
            renderer,
            cache: CoverageCache::new(config.initial_width, config.rle_min_width),
            stats: RendererStats::new(),
            config: config.clone(),
        }
    }
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
    /// Statistics to update, None when they are disabled
    pub fn stats_mut(&mut self) -> Option<&mut RendererStats> {
        if self.config.do_stats {
            Some(&mut self.stats)
        } else {
            None
        }
    }
    /// Forget the pass and drop storage grown above the high-water marks
    fn recycle(&mut self) {
        let c = &self.config;
        self.renderer.dispose();
        self.cache.dispose();
        let r = self.renderer.shrink(c.initial_edges, c.edges_high_water,
                                     c.initial_width, c.width_high_water);
        let s = self.cache.shrink(c.initial_width, c.width_high_water);
        if r || s {
            log::debug!("Shrunk renderer context storage");
        }
    }
}

#[derive(Debug,Default)]
struct PoolState {
    free: Vec<Box<RendererContext>>,
    /// Contexts created, idle or in use
    live: usize,
}

/// Pool of reusable renderer contexts
#[derive(Debug)]
pub struct RendererContextPool {
    config: RendererConfig,
    state: Mutex<PoolState>,
}

impl Default for RendererContextPool {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl RendererContextPool {
    pub fn new(config: RendererConfig) -> Self {
        log::info!("Renderer context pool: {:?}", config);
        Self { config, state: Mutex::new(PoolState::default()) }
    }
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // The state is a plain list, a panic elsewhere cannot break it
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
    /// Contexts created so far, idle or in use
    pub fn live_contexts(&self) -> usize {
        self.lock().live
    }
    /// Contexts waiting in the pool
    pub fn idle_contexts(&self) -> usize {
        self.lock().free.len()
    }
    /// Take an idle context, or create one
    pub fn acquire(&self) -> Result<PooledContext<'_>, PoolError> {
        let mut state = self.lock();
        let ctx = match state.free.pop() {
            Some(ctx) => ctx,
            None => {
                if let Some(max) = self.config.max_contexts {
                    if state.live >= max {
                        log::warn!("Renderer context pool exhausted ({} contexts)", max);
                        return Err(PoolError::Exhausted(max));
                    }
                }
                state.live += 1;
                log::debug!("Creating renderer context #{}", state.live);
                Box::new(RendererContext::new(&self.config))
            },
        };
        Ok(PooledContext { pool: self, ctx: Some(ctx) })
    }
    fn release(&self, mut ctx: Box<RendererContext>) {
        ctx.recycle();
        self.lock().free.push(ctx);
    }
    /// Start a pass over `path`, clipped to `clip`, returning its tiles
    pub fn rasterize<VS>(&self, path: &VS, rule: FillingRule, clip: Rectangle<i32>)
                         -> Result<TileGenerator<'_>, PoolError>
        where VS: VertexSource
    {
        let mut ctx = self.acquire()?;
        ctx.renderer.init(clip, rule);
        ctx.renderer.add_path(path);
        TileGenerator::new(ctx)
    }
    /// Merged statistics of every idle context
    ///
    /// Contexts in use are counted once they are returned. Statistics
    /// with samples added since the previous report are logged.
    pub fn stats_report(&self) -> RendererStats {
        let mut state = self.lock();
        let mut total = merged(&state.free);
        if self.config.do_stats {
            let n = total.dump();
            log::debug!("Statistics report: {} of {} idle contexts, {} stats logged",
                        state.free.len(), state.live, n);
            for ctx in state.free.iter_mut() {
                ctx.stats.mark_logged();
            }
        }
        total
    }
}

fn merged(contexts: &[Box<RendererContext>]) -> RendererStats {
    let mut total = RendererStats::new();
    for ctx in contexts {
        total.merge(&ctx.stats);
    }
    total
}

/// Renderer context on loan from a [`RendererContextPool`]
#[derive(Debug)]
pub struct PooledContext<'p> {
    pool: &'p RendererContextPool,
    ctx: Option<Box<RendererContext>>,
}

impl Deref for PooledContext<'_> {
    type Target = RendererContext;
    fn deref(&self) -> &RendererContext {
        match self.ctx {
            Some(ref ctx) => ctx,
            None => unreachable!("context already returned"),
        }
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut RendererContext {
        match self.ctx {
            Some(ref mut ctx) => ctx,
            None => unreachable!("context already returned"),
        }
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    #[test]
    fn contexts_are_reused() {
        let pool = RendererContextPool::default();
        {
            let _a = pool.acquire().unwrap();
            let _b = pool.acquire().unwrap();
            assert_eq!(pool.live_contexts(), 2);
            assert_eq!(pool.idle_contexts(), 0);
        }
        assert_eq!(pool.idle_contexts(), 2);
        let _c = pool.acquire().unwrap();
        assert_eq!(pool.live_contexts(), 2);
    }

    #[test]
    fn max_contexts_is_enforced() {
        let pool = RendererContextPool::new(RendererConfig::new().max_contexts(Some(1)));
        let a = pool.acquire().unwrap();
        match pool.acquire() {
            Err(PoolError::Exhausted(1)) => {},
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
        drop(a);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn error_messages() {
        assert_eq!(PoolError::Exhausted(4).to_string(),
                   "all 4 renderer contexts are in use");
    }

    fn zigzag(ctx: &mut RendererContext, n: usize) {
        ctx.renderer.init(Rectangle::new(0, 0, 100, 100), FillingRule::NonZero);
        ctx.renderer.move_to(0.0, 0.0);
        for i in 0 .. n {
            ctx.renderer.line_to((i % 2) as f64 * 50.0 + 10.0, i as f64 * 0.4);
        }
        ctx.renderer.path_done().unwrap();
    }

    #[test]
    fn storage_above_high_water_is_released() {
        let config = RendererConfig::new().initial_edges(8).high_water(64, 64);
        let pool = RendererContextPool::new(config);
        {
            let mut ctx = pool.acquire().unwrap();
            zigzag(&mut ctx, 200);
            assert!(ctx.renderer.edge_count() > 64);
            assert!(ctx.renderer.edge_capacity() > 64);
        }
        let ctx = pool.acquire().unwrap();
        assert_eq!(ctx.renderer.edge_count(), 0);
        assert_eq!(ctx.renderer.bbox(), [0; 4]);
        assert!(ctx.renderer.edge_capacity() <= 64,
                "capacity {} kept above the high-water mark", ctx.renderer.edge_capacity());
    }

    #[test]
    fn storage_below_high_water_is_kept() {
        let config = RendererConfig::new().initial_edges(8).high_water(4096, 4096);
        let pool = RendererContextPool::new(config);
        let grown = {
            let mut ctx = pool.acquire().unwrap();
            zigzag(&mut ctx, 200);
            ctx.renderer.edge_capacity()
        };
        assert!(grown > 64);
        let ctx = pool.acquire().unwrap();
        assert_eq!(ctx.renderer.edge_count(), 0);
        assert_eq!(ctx.renderer.edge_capacity(), grown);
    }

    #[test]
    fn stats_are_collected_when_enabled() {
        let pool = RendererContextPool::new(RendererConfig::new().do_stats(true));
        let mut path = Path::new();
        path.rect(1.0, 1.0, 40.0, 40.0);
        let mut gen = pool.rasterize(&path, FillingRule::NonZero, Rectangle::new(0, 0, 64, 64)).unwrap();
        gen.tile_width();
        while gen.tile_bounds().is_some() {
            gen.next_tile();
        }
        gen.dispose();
        let report = pool.stats_report();
        assert_eq!(report.rdr_edges.count(), 1);
        assert_eq!(report.tiles_empty.count(), 1);
        assert_eq!(report.pass_time.stat.count(), 1);
    }

    fn full_pass(pool: &RendererContextPool, path: &Path) {
        let mut gen = pool.rasterize(path, FillingRule::NonZero, Rectangle::new(0, 0, 64, 64)).unwrap();
        gen.tile_width();
        while gen.tile_bounds().is_some() {
            gen.next_tile();
        }
        gen.dispose();
    }

    #[test]
    fn report_logs_only_new_samples() {
        let pool = RendererContextPool::new(RendererConfig::new().do_stats(true));
        let mut path = Path::new();
        path.rect(1.0, 1.0, 40.0, 40.0);
        full_pass(&pool, &path);
        assert!(merged(&pool.lock().free).dump() > 0);

        full_pass(&pool, &path);
        let first = pool.stats_report();
        assert_eq!(first.rdr_edges.count(), 2);
        // Nothing new since the report
        assert_eq!(merged(&pool.lock().free).dump(), 0);
        let second = pool.stats_report();
        assert_eq!(second.rdr_edges.count(), 2);
        assert!(!second.rdr_edges.should_log());

        full_pass(&pool, &path);
        let mut after = merged(&pool.lock().free);
        assert!(after.rdr_edges.should_log());
        assert!(after.dump() > 0);
    }
}
