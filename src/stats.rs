//! Renderer Statistics
//!
//! Running statistics observed while rendering. Nothing here changes the
//! coverage produced, only what gets reported.
//!
//! Each [`RendererContext`](crate::pool::RendererContext) owns a
//! [`RendererStats`]; sets are merged when a report is requested.

use std::fmt;
use std::time::Instant;

/// Smoothing factor of the exponential moving average
pub const EMA_ALPHA : f64 = 0.25;

/// Round to 3 digits after the decimal point
pub fn trim_to_3_digits(v: f64) -> f64 {
    (1000.0 * v).round() / 1000.0
}

/// Running statistics of f64 samples
///
/// Mean and variance use Welford's single pass update:
///
/// ```text
/// delta = value - mean
/// mean += delta / count
/// squared_error += delta * (value - mean)
/// ```
#[derive(Debug,Clone,PartialEq)]
pub struct StatDouble {
    pub name: String,
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    ema: f64,
    squared_error: f64,
    last_log_count: u64,
}

impl StatDouble {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let mut s = Self {
            name: name.into(),
            count: 0, min: 0.0, max: 0.0, mean: 0.0, ema: 0.0,
            squared_error: 0.0, last_log_count: 0,
        };
        s.reset();
        s
    }
    pub fn reset(&mut self) {
        self.count = 0;
        self.min = std::f64::INFINITY;
        self.max = std::f64::NEG_INFINITY;
        self.mean = 0.0;
        self.ema = 0.0;
        self.squared_error = 0.0;
        self.last_log_count = 0;
    }
    /// Fold in one sample
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.ema = EMA_ALPHA * value + (1.0 - EMA_ALPHA) * self.ema;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.squared_error += delta * (value - self.mean);
    }
    pub fn count(&self) -> u64 {
        self.count
    }
    pub fn min(&self) -> f64 {
        if self.count == 0 { std::f64::NAN } else { self.min }
    }
    pub fn max(&self) -> f64 {
        if self.count == 0 { std::f64::NAN } else { self.max }
    }
    pub fn mean(&self) -> f64 {
        if self.count == 0 { std::f64::NAN } else { self.mean }
    }
    /// Sum of all samples
    pub fn total(&self) -> f64 {
        self.mean() * self.count as f64
    }
    /// Sample variance, NaN with fewer than two samples
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return std::f64::NAN;
        }
        self.squared_error / (self.count - 1) as f64
    }
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
    pub fn ema(&self) -> f64 {
        self.ema
    }
    /// New samples since the last [`update_last_log_count`](Self::update_last_log_count)
    pub fn should_log(&self) -> bool {
        self.count > self.last_log_count
    }
    pub fn update_last_log_count(&mut self) {
        self.last_log_count = self.count;
    }
    /// Combine with statistics gathered elsewhere
    ///
    /// Mean and squared error follow Chan et al.'s pairwise update; the
    /// moving averages are weighted by sample count. Logged counts add up,
    /// so a merged set only logs when one of its parts has new samples.
    pub fn merge(&mut self, other: &StatDouble) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            let (name, last) = (std::mem::take(&mut self.name), self.last_log_count);
            *self = other.clone();
            self.name = name;
            self.last_log_count += last;
            return;
        }
        let (n1, n2) = (self.count as f64, other.count as f64);
        let n = n1 + n2;
        let delta = other.mean - self.mean;
        self.mean += delta * n2 / n;
        self.squared_error += other.squared_error + delta * delta * n1 * n2 / n;
        self.ema = (self.ema * n1 + other.ema * n2) / n;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
        self.last_log_count += other.last_log_count;
    }
}

impl fmt::Display for StatDouble {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}] sum: {:?} avg: {:?} stddev: {:?} ema: {:?} [{:?} - {:?}]",
               self.name, self.count,
               trim_to_3_digits(self.total()),
               trim_to_3_digits(self.mean()),
               trim_to_3_digits(self.stddev()),
               trim_to_3_digits(self.ema()),
               trim_to_3_digits(self.min()),
               trim_to_3_digits(self.max()))
    }
}

/// Running statistics of integer samples
#[derive(Debug,Clone,PartialEq)]
pub struct StatLong {
    pub name: String,
    count: u64,
    sum: i64,
    min: i64,
    max: i64,
    last_log_count: u64,
}

impl StatLong {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), count: 0, sum: 0,
               min: std::i64::MAX, max: std::i64::MIN, last_log_count: 0 }
    }
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum = 0;
        self.min = std::i64::MAX;
        self.max = std::i64::MIN;
        self.last_log_count = 0;
    }
    pub fn add(&mut self, value: i64) {
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
    pub fn count(&self) -> u64 {
        self.count
    }
    pub fn sum(&self) -> i64 {
        self.sum
    }
    pub fn min(&self) -> Option<i64> {
        if self.count == 0 { None } else { Some(self.min) }
    }
    pub fn max(&self) -> Option<i64> {
        if self.count == 0 { None } else { Some(self.max) }
    }
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            std::f64::NAN
        } else {
            self.sum as f64 / self.count as f64
        }
    }
    pub fn should_log(&self) -> bool {
        self.count > self.last_log_count
    }
    pub fn update_last_log_count(&mut self) {
        self.last_log_count = self.count;
    }
    pub fn merge(&mut self, other: &StatLong) {
        self.count += other.count;
        self.sum = self.sum.saturating_add(other.sum);
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.last_log_count += other.last_log_count;
    }
}

impl fmt::Display for StatLong {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}] sum: {} avg: {:?}", self.name, self.count, self.sum,
               trim_to_3_digits(self.mean()))?;
        if let (Some(lo), Some(hi)) = (self.min(), self.max()) {
            write!(f, " [{} - {}]", lo, hi)?;
        }
        Ok(())
    }
}

/// Number of histogram buckets
pub const BUCKETS : usize = 16;

/// Integer statistics with power of two buckets
///
/// Bucket 0 counts values below 1, bucket `i` counts `[2^(i-1), 2^i)`,
/// the last bucket takes everything larger.
#[derive(Debug,Clone,PartialEq)]
pub struct Histogram {
    pub stat: StatLong,
    buckets: [u64; BUCKETS],
}

impl Histogram {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { stat: StatLong::new(name), buckets: [0; BUCKETS] }
    }
    pub fn reset(&mut self) {
        self.stat.reset();
        self.buckets = [0; BUCKETS];
    }
    pub fn bucket_of(value: i64) -> usize {
        if value < 1 {
            0
        } else {
            let b = 64 - value.leading_zeros() as usize;
            b.min(BUCKETS - 1)
        }
    }
    pub fn add(&mut self, value: i64) {
        self.stat.add(value);
        self.buckets[Self::bucket_of(value)] += 1;
    }
    pub fn buckets(&self) -> &[u64; BUCKETS] {
        &self.buckets
    }
    pub fn merge(&mut self, other: &Histogram) {
        self.stat.merge(&other.stat);
        for (a, b) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *a += b;
        }
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {{", self.stat)?;
        let mut first = true;
        for (i, &n) in self.buckets.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let lo = if i == 0 { 0 } else { 1u64 << (i - 1) };
            write!(f, "{} {}: {}", if first { "" } else { "," }, lo, n)?;
            first = false;
        }
        write!(f, " }}")
    }
}

/// Timer feeding elapsed microseconds into a [`StatDouble`]
#[derive(Debug,Clone)]
pub struct Monitor {
    pub stat: StatDouble,
    start: Option<Instant>,
}

impl Monitor {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { stat: StatDouble::new(name), start: None }
    }
    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }
    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }
    /// Record the time since [`start`](Self::start), if running
    pub fn stop(&mut self) {
        if let Some(t) = self.start.take() {
            self.stat.add(t.elapsed().as_secs_f64() * 1e6);
        }
    }
}

/// Statistics of one renderer context
#[derive(Debug,Clone)]
pub struct RendererStats {
    /// Edges per pass
    pub rdr_edges: StatLong,
    /// Active edges per sample row
    pub rdr_active_edges: Histogram,
    /// Crossings per pixel row
    pub rdr_crossings: Histogram,
    /// Share of run-length encoded rows per band
    pub cache_rle_ratio: StatDouble,
    /// Touched pixels per row
    pub cache_row_width: Histogram,
    /// Empty tiles per pass
    pub tiles_empty: StatLong,
    /// Fully covered tiles per pass
    pub tiles_full: StatLong,
    /// Partially covered tiles per pass
    pub tiles_partial: StatLong,
    /// Mean coverage of partial tiles
    pub tile_alpha: Histogram,
    /// Time from the first tile request to dispose
    pub pass_time: Monitor,
}

impl Default for RendererStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererStats {
    pub fn new() -> Self {
        Self {
            rdr_edges: StatLong::new("renderer.edges"),
            rdr_active_edges: Histogram::new("renderer.active_edges"),
            rdr_crossings: Histogram::new("renderer.crossings"),
            cache_rle_ratio: StatDouble::new("cache.rle_ratio"),
            cache_row_width: Histogram::new("cache.row_width"),
            tiles_empty: StatLong::new("tile_generator.tiles_empty"),
            tiles_full: StatLong::new("tile_generator.tiles_full"),
            tiles_partial: StatLong::new("tile_generator.tiles_partial"),
            tile_alpha: Histogram::new("tile_generator.alpha"),
            pass_time: Monitor::new("tile_generator.pass_us"),
        }
    }
    pub fn reset(&mut self) {
        *self = Self::new();
    }
    /// Fold another context's statistics into these
    pub fn merge(&mut self, other: &RendererStats) {
        self.rdr_edges.merge(&other.rdr_edges);
        self.rdr_active_edges.merge(&other.rdr_active_edges);
        self.rdr_crossings.merge(&other.rdr_crossings);
        self.cache_rle_ratio.merge(&other.cache_rle_ratio);
        self.cache_row_width.merge(&other.cache_row_width);
        self.tiles_empty.merge(&other.tiles_empty);
        self.tiles_full.merge(&other.tiles_full);
        self.tiles_partial.merge(&other.tiles_partial);
        self.tile_alpha.merge(&other.tile_alpha);
        self.pass_time.stat.merge(&other.pass_time.stat);
    }
    /// Log every statistic with new samples since the previous dump
    ///
    /// Returns the number of statistics logged.
    pub fn dump(&mut self) -> usize {
        fn long(s: &mut StatLong) -> bool {
            if !s.should_log() {
                return false;
            }
            log::info!("{}", s);
            s.update_last_log_count();
            true
        }
        fn double(s: &mut StatDouble) -> bool {
            if !s.should_log() {
                return false;
            }
            log::info!("{}", s);
            s.update_last_log_count();
            true
        }
        fn hist(h: &mut Histogram) -> bool {
            if !h.stat.should_log() {
                return false;
            }
            log::info!("{}", h);
            h.stat.update_last_log_count();
            true
        }
        [
            long(&mut self.rdr_edges),
            hist(&mut self.rdr_active_edges),
            hist(&mut self.rdr_crossings),
            double(&mut self.cache_rle_ratio),
            hist(&mut self.cache_row_width),
            long(&mut self.tiles_empty),
            long(&mut self.tiles_full),
            long(&mut self.tiles_partial),
            hist(&mut self.tile_alpha),
            double(&mut self.pass_time.stat),
        ].iter().filter(|&&logged| logged).count()
    }
    /// Mark every statistic as logged
    pub fn mark_logged(&mut self) {
        self.rdr_edges.update_last_log_count();
        self.rdr_active_edges.stat.update_last_log_count();
        self.rdr_crossings.stat.update_last_log_count();
        self.cache_rle_ratio.update_last_log_count();
        self.cache_row_width.stat.update_last_log_count();
        self.tiles_empty.update_last_log_count();
        self.tiles_full.update_last_log_count();
        self.tiles_partial.update_last_log_count();
        self.tile_alpha.stat.update_last_log_count();
        self.pass_time.stat.update_last_log_count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn known_samples() {
        let mut s = StatDouble::new("s");
        s.add(1.0);
        s.add(2.0);
        s.add(3.0);
        assert_eq!(s.count(), 3);
        assert_eq!(s.mean(), 2.0);
        assert_eq!(s.min(), 1.0);
        assert_eq!(s.max(), 3.0);
        assert_eq!(s.total(), 6.0);
        assert!(close(s.variance(), 1.0));
        assert!(close(s.stddev(), 1.0));
    }

    #[test]
    fn empty_is_nan() {
        let s = StatDouble::new("empty");
        assert!(s.mean().is_nan());
        assert!(s.min().is_nan());
        assert!(s.max().is_nan());
        assert!(s.variance().is_nan());
        assert!(s.stddev().is_nan());
        assert!(s.total().is_nan());
        assert!(!s.should_log());
    }

    #[test]
    fn single_sample_variance_is_nan() {
        let mut s = StatDouble::new("one");
        s.add(5.0);
        assert!(s.variance().is_nan());
        assert_eq!(s.mean(), 5.0);
    }

    #[test]
    fn ema_formula() {
        let mut s = StatDouble::new("ema");
        s.add(100.0);
        s.reset();
        s.add(4.0);
        assert_eq!(s.ema(), 1.0);
        s.add(8.0);
        assert_eq!(s.ema(), 2.75);
    }

    #[test]
    fn log_latch() {
        let mut s = StatDouble::new("latch");
        s.add(1.0);
        assert!(s.should_log());
        s.update_last_log_count();
        assert!(!s.should_log());
        s.add(1.0);
        assert!(s.should_log());
    }

    #[test]
    fn merge_matches_single_stream() {
        let xs = [3.0, 7.5, -2.0, 11.0, 4.25, 0.5, 9.0];
        let mut all = StatDouble::new("all");
        let mut a = StatDouble::new("a");
        let mut b = StatDouble::new("b");
        for (i, &x) in xs.iter().enumerate() {
            all.add(x);
            if i < 3 { a.add(x) } else { b.add(x) }
        }
        a.merge(&b);
        assert_eq!(a.count(), all.count());
        assert!(close(a.mean(), all.mean()));
        assert!((a.variance() - all.variance()).abs() < 1e-9);
        assert_eq!(a.min(), -2.0);
        assert_eq!(a.max(), 11.0);
        assert_eq!(a.name, "a");
    }

    #[test]
    fn merge_adds_logged_counts() {
        let mut a = StatLong::new("a");
        let mut b = StatLong::new("b");
        a.add(1);
        a.update_last_log_count();
        b.add(2);
        b.update_last_log_count();
        let mut total = StatLong::new("total");
        total.merge(&a);
        total.merge(&b);
        assert!(!total.should_log());
        b.add(3);
        let mut total = StatLong::new("total");
        total.merge(&a);
        total.merge(&b);
        assert!(total.should_log());

        let mut d = StatDouble::new("d");
        d.add(1.0);
        d.update_last_log_count();
        let mut total = StatDouble::new("total");
        total.merge(&d);
        total.merge(&d);
        assert!(!total.should_log());
    }

    #[test]
    fn dump_logs_only_new_samples() {
        let mut s = RendererStats::new();
        assert_eq!(s.dump(), 0);
        s.rdr_edges.add(4);
        s.cache_rle_ratio.add(0.5);
        assert_eq!(s.dump(), 2);
        assert_eq!(s.dump(), 0);
        s.tiles_full.add(1);
        s.mark_logged();
        assert_eq!(s.dump(), 0);
    }

    #[test]
    fn merge_into_empty_keeps_name() {
        let mut a = StatDouble::new("a");
        let mut b = StatDouble::new("b");
        b.add(2.0);
        a.merge(&b);
        assert_eq!(a.name, "a");
        assert_eq!(a.count(), 1);
        assert_eq!(a.mean(), 2.0);
    }

    #[test]
    fn display_format() {
        let mut s = StatDouble::new("renderer.edges");
        s.add(1.0);
        s.add(2.0);
        s.add(3.0);
        assert_eq!(s.to_string(),
                   "renderer.edges[3] sum: 6.0 avg: 2.0 stddev: 1.0 ema: 1.266 [1.0 - 3.0]");
        let e = StatDouble::new("e");
        assert_eq!(e.to_string(), "e[0] sum: NaN avg: NaN stddev: NaN ema: 0.0 [NaN - NaN]");
    }

    #[test]
    fn histogram_buckets() {
        assert_eq!(Histogram::bucket_of(-4), 0);
        assert_eq!(Histogram::bucket_of(0), 0);
        assert_eq!(Histogram::bucket_of(1), 1);
        assert_eq!(Histogram::bucket_of(2), 2);
        assert_eq!(Histogram::bucket_of(3), 2);
        assert_eq!(Histogram::bucket_of(4), 3);
        assert_eq!(Histogram::bucket_of(std::i64::MAX), BUCKETS - 1);
        let mut h = Histogram::new("h");
        h.add(0);
        h.add(5);
        h.add(6);
        assert_eq!(h.buckets()[0], 1);
        assert_eq!(h.buckets()[3], 2);
        assert_eq!(h.to_string(), "h[3] sum: 11 avg: 3.667 [0 - 6] { 0: 1, 4: 2 }");
    }

    #[test]
    fn monitor_records_once() {
        let mut m = Monitor::new("m");
        m.stop();
        assert_eq!(m.stat.count(), 0);
        m.start();
        assert!(m.is_running());
        m.stop();
        m.stop();
        assert_eq!(m.stat.count(), 1);
        assert!(m.stat.min() >= 0.0);
    }
}
