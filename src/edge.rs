//! Edges and the Active Edge List
//!
//! Edges live in sub-pixel space, normalized so they always point down. The
//! x position is kept in 32.32 fixed point, biased so that the integer part
//! is `ceil(x - 0.5)`, the first sub-pixel column whose center lies at or
//! right of the edge.

use std::collections::TryReserveError;

use crate::clip::LineSink;

const POWER_2_TO_32 : f64 = 4_294_967_296.0;
/// Bias turning a floor of the fixed point value into `ceil(x - 0.5)`
const CEIL_BIAS : i64 = 0x7FFF_FFFF;

/// Monotonic line segment
#[derive(Debug,Default,Copy,Clone,PartialEq)]
pub struct Edge {
    /// Fixed point x at the center of the current sample row
    pub x: i64,
    /// Fixed point x increment per sample row
    pub slope: i64,
    /// First sample row crossed
    pub y_start: i32,
    /// Sample row after the last one crossed
    pub y_end: i32,
    /// Winding direction, +1 if the path went down, -1 if it went up
    pub dir: i32,
}

impl Edge {
    /// Create an edge from sub-pixel end points
    ///
    /// Returns None for horizontal edges, edges crossing no sample row
    /// and non-finite coordinates.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Option<Edge> {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            log::debug!("Dropping non-finite edge ({},{}) -> ({},{})", x0, y0, x1, y1);
            return None;
        }
        let (x0, y0, x1, y1, dir) = if y0 < y1 {
            (x0, y0, x1, y1, 1)
        } else if y0 > y1 {
            (x1, y1, x0, y0, -1)
        } else {
            return None;
        };
        let y_start = (y0 - 0.5).ceil() as i32;
        let y_end   = (y1 - 0.5).ceil() as i32;
        if y_start >= y_end {
            return None;
        }
        let slope = (x1 - x0) / (y1 - y0);
        let x_start = x0 + (f64::from(y_start) + 0.5 - y0) * slope;
        Some(Edge {
            x: ((x_start * POWER_2_TO_32) as i64).saturating_add(CEIL_BIAS),
            slope: (slope * POWER_2_TO_32) as i64,
            y_start, y_end, dir,
        })
    }
    /// Sub-pixel column of the crossing with the current sample row
    #[inline]
    pub fn crossing(&self) -> i32 {
        (self.x >> 32) as i32
    }
}

/// Edges of the path being rendered
///
/// Storage only grows while a context is in use, see [`EdgeList::shrink`].
#[derive(Debug,Default)]
pub struct EdgeList {
    edges: Vec<Edge>,
    min_x: f64,
    max_x: f64,
    min_y: i32,
    max_y: i32,
    alloc_error: Option<TryReserveError>,
}

impl EdgeList {
    pub fn with_capacity(n: usize) -> Self {
        let mut e = Self { edges: Vec::with_capacity(n), .. Self::default() };
        e.reset();
        e
    }
    /// Remove all edges, keeping the storage
    pub fn reset(&mut self) {
        self.edges.clear();
        self.min_x = std::f64::MAX;
        self.max_x = std::f64::MIN;
        self.min_y = std::i32::MAX;
        self.max_y = std::i32::MIN;
        self.alloc_error = None;
    }
    pub fn len(&self) -> usize {
        self.edges.len()
    }
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.edges.capacity()
    }
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }
    /// Extent of all edges in sub-pixel units: (min x, first row, max x, end row)
    pub fn extent(&self) -> Option<(f64, i32, f64, i32)> {
        if self.edges.is_empty() {
            None
        } else {
            Some((self.min_x, self.min_y, self.max_x, self.max_y))
        }
    }
    /// Allocation failure seen while adding edges, cleared by the call
    pub fn take_alloc_error(&mut self) -> Option<TryReserveError> {
        self.alloc_error.take()
    }
    /// Order edges by their first sample row
    pub fn sort(&mut self) {
        self.edges.sort_unstable_by_key(|e| e.y_start);
    }
    /// Release storage above `high_water`, returning to `initial` capacity
    pub fn shrink(&mut self, initial: usize, high_water: usize) -> bool {
        if self.edges.capacity() > high_water {
            self.edges.clear();
            self.edges.shrink_to(initial);
            true
        } else {
            false
        }
    }
    fn push(&mut self, e: Edge, x0: f64, x1: f64) {
        if self.edges.len() == self.edges.capacity() {
            let grow = self.edges.capacity().max(16);
            if let Err(err) = self.edges.try_reserve(grow) {
                log::debug!("Edge storage exhausted at {} edges", self.edges.len());
                self.alloc_error = Some(err);
                return;
            }
        }
        self.min_x = self.min_x.min(x0.min(x1));
        self.max_x = self.max_x.max(x0.max(x1));
        self.min_y = self.min_y.min(e.y_start);
        self.max_y = self.max_y.max(e.y_end);
        self.edges.push(e);
    }
}

impl LineSink for EdgeList {
    fn add_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        if let Some(e) = Edge::new(x0, y0, x1, y1) {
            self.push(e, x0, x1);
        }
    }
}

/// Edges crossing the current sample row, sorted by x
#[derive(Debug,Default)]
pub struct ActiveEdgeList {
    active: Vec<u32>,
    /// Next edge, in y_start order, not yet activated
    next: usize,
}

impl ActiveEdgeList {
    pub fn with_capacity(n: usize) -> Self {
        Self { active: Vec::with_capacity(n), next: 0 }
    }
    pub fn reset(&mut self) {
        self.active.clear();
        self.next = 0;
    }
    pub fn len(&self) -> usize {
        self.active.len()
    }
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
    /// All edges have been activated and retired
    pub fn is_done(&self, edges: &[Edge]) -> bool {
        self.active.is_empty() && self.next >= edges.len()
    }
    /// Make room for `n` simultaneously active edges
    pub fn reserve(&mut self, n: usize) -> Result<(), TryReserveError> {
        if n > self.active.capacity() {
            self.active.try_reserve(n - self.active.len())?;
        }
        Ok(())
    }
    pub fn shrink(&mut self, initial: usize, high_water: usize) {
        if self.active.capacity() > high_water {
            self.active.clear();
            self.active.shrink_to(initial);
        }
    }
    /// Bring the list to sample row `y`
    ///
    /// Edges are expected sorted by `y_start`. Finished edges are removed,
    /// edges starting at or before `y` are added, and the list is resorted.
    pub fn update(&mut self, edges: &mut [Edge], y: i32) {
        self.active.retain(|&i| edges[i as usize].y_end > y);
        while self.next < edges.len() && edges[self.next].y_start <= y {
            let e = &mut edges[self.next];
            if e.y_end > y {
                if e.y_start < y {
                    // Skipped rows, e.g. rows above the clip
                    let rows = i64::from(y - e.y_start);
                    e.x = e.x.wrapping_add(e.slope.wrapping_mul(rows));
                    e.y_start = y;
                }
                self.active.push(self.next as u32);
            }
            self.next += 1;
        }
        self.sort(edges);
    }
    /// Insertion sort by current x, cheap as the order barely changes
    fn sort(&mut self, edges: &[Edge]) {
        let a = &mut self.active;
        for i in 1 .. a.len() {
            let cur = a[i];
            let x = edges[cur as usize].x;
            let mut j = i;
            while j > 0 && edges[a[j-1] as usize].x > x {
                a[j] = a[j-1];
                j -= 1;
            }
            a[j] = cur;
        }
    }
    /// Move every active edge to the next sample row
    pub fn step(&self, edges: &mut [Edge]) {
        for &i in &self.active {
            let e = &mut edges[i as usize];
            // Nearly flat edges can run off after their last row
            e.x = e.x.wrapping_add(e.slope);
        }
    }
    /// Crossings with the current row as (sub-pixel x, direction), sorted by x
    pub fn crossings<'a>(&'a self, edges: &'a [Edge]) -> impl Iterator<Item=(i32,i32)> + 'a {
        self.active.iter().map(move |&i| {
            let e = &edges[i as usize];
            (e.crossing(), e.dir)
        })
    }
}
