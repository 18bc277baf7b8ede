//! Path Storage
//!
//! Geometry handed to the renderer. Curves are kept as control points and
//! flattened into lines when the path is added to a renderer.

use crate::clip::Rectangle;

/// Source of path vertices
pub trait VertexSource {
    /// Vertices of the path, in drawing order
    fn vertices(&self) -> &[Vertex<f64>];
}

/// Path Command
///
/// `Curve3` and `Curve4` vertices are control points, the final point of a
/// curve is stored as the next vertex with the same command.
#[derive(Debug,Copy,Clone,PartialEq)]
pub enum PathCommand {
    MoveTo,
    LineTo,
    /// Quadratic Bezier: one control point then the end point
    Curve3,
    /// Cubic Bezier: two control points then the end point
    Curve4,
    Close,
}
impl Default for PathCommand {
    fn default() -> PathCommand {
        PathCommand::MoveTo
    }
}

/// Point with a drawing command
#[derive(Debug,Default,Copy,Clone,PartialEq)]
pub struct Vertex<T> {
    pub x: T,
    pub y: T,
    pub cmd: PathCommand
}

impl<T> Vertex<T> {
    pub fn new(x: T, y: T, cmd: PathCommand) -> Self {
        Self { x, y, cmd }
    }
    pub fn move_to(x: T, y: T) -> Self {
        Self::new(x, y, PathCommand::MoveTo)
    }
    pub fn line_to(x: T, y: T) -> Self {
        Self::new(x, y, PathCommand::LineTo)
    }
    pub fn close_polygon(x: T, y: T) -> Self {
        Self::new(x, y, PathCommand::Close)
    }
}

/// Path of lines and curves
#[derive(Debug,Default,Clone)]
pub struct Path {
    pub vertices: Vec<Vertex<f64>>,
}

impl VertexSource for Path {
    fn vertices(&self) -> &[Vertex<f64>] {
        &self.vertices
    }
}

impl Path {
    pub fn new() -> Self {
        Self { vertices: vec![] }
    }
    pub fn remove_all(&mut self) {
        self.vertices.clear();
    }
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.vertices.push( Vertex::move_to(x,y) );
    }
    pub fn line_to(&mut self, x: f64, y: f64) {
        self.vertices.push( Vertex::line_to(x,y) );
    }
    /// Quadratic Bezier from the current point through control (cx,cy)
    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.vertices.push( Vertex::new(cx, cy, PathCommand::Curve3) );
        self.vertices.push( Vertex::new(x, y, PathCommand::Curve3) );
    }
    /// Cubic Bezier from the current point through two control points
    pub fn cubic_to(&mut self, cx1: f64, cy1: f64, cx2: f64, cy2: f64, x: f64, y: f64) {
        self.vertices.push( Vertex::new(cx1, cy1, PathCommand::Curve4) );
        self.vertices.push( Vertex::new(cx2, cy2, PathCommand::Curve4) );
        self.vertices.push( Vertex::new(x, y, PathCommand::Curve4) );
    }
    pub fn close_polygon(&mut self) {
        let last = match self.vertices.last() {
            None => return,
            Some(v) => *v,
        };
        if last.cmd != PathCommand::Close && last.cmd != PathCommand::MoveTo {
            self.vertices.push( Vertex::close_polygon(last.x, last.y) );
        }
    }
    /// Axis aligned rectangle as a closed sub-path
    pub fn rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.move_to(x0, y0);
        self.line_to(x1, y0);
        self.line_to(x1, y1);
        self.line_to(x0, y1);
        self.close_polygon();
    }
    /// Closed polygon through the points
    pub fn polygon(&mut self, pts: &[(f64,f64)]) {
        if let Some((first, rest)) = pts.split_first() {
            self.move_to(first.0, first.1);
            for p in rest {
                self.line_to(p.0, p.1);
            }
            self.close_polygon();
        }
    }
}

/// Bounding box of all vertices, including curve control points
pub fn bounding_rect<VS: VertexSource>(path: &VS) -> Option<Rectangle<f64>> {
    let pts = path.vertices();
    let first = pts.first()?;
    let mut r = Rectangle::new(first.x, first.y, first.x, first.y);
    for p in pts {
        r.expand(p.x, p.y);
    }
    Some(r)
}

/// Maximum number of lines a single curve is split into
const MAX_CURVE_SEGMENTS: usize = 100;

fn segments_for(deviation: f64, tolerance: f64) -> usize {
    if !(deviation > tolerance) {
        return 1;
    }
    let n = (deviation / tolerance).sqrt().ceil() as usize;
    n.max(1).min(MAX_CURVE_SEGMENTS)
}

fn dist_to_chord(px: f64, py: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        ((px - x0).powi(2) + (py - y0).powi(2)).sqrt()
    } else {
        ((px - x0) * dy - (py - y0) * dx).abs() / len
    }
}

/// Flatten a quadratic Bezier, calling `line_to` for every point after the start
pub fn flatten_quad<F>(p0: (f64,f64), p1: (f64,f64), p2: (f64,f64),
                       tolerance: f64, mut line_to: F)
    where F: FnMut(f64, f64)
{
    let d = dist_to_chord(p1.0, p1.1, p0.0, p0.1, p2.0, p2.1);
    let n = segments_for(d, tolerance);
    for i in 1 ..= n {
        let t = i as f64 / n as f64;
        let mt = 1.0 - t;
        let x = mt * mt * p0.0 + 2.0 * mt * t * p1.0 + t * t * p2.0;
        let y = mt * mt * p0.1 + 2.0 * mt * t * p1.1 + t * t * p2.1;
        if i == n {
            line_to(p2.0, p2.1);
        } else {
            line_to(x, y);
        }
    }
}

/// Flatten a cubic Bezier, calling `line_to` for every point after the start
pub fn flatten_cubic<F>(p0: (f64,f64), p1: (f64,f64), p2: (f64,f64), p3: (f64,f64),
                        tolerance: f64, mut line_to: F)
    where F: FnMut(f64, f64)
{
    let d1 = dist_to_chord(p1.0, p1.1, p0.0, p0.1, p3.0, p3.1);
    let d2 = dist_to_chord(p2.0, p2.1, p0.0, p0.1, p3.0, p3.1);
    let n = segments_for(d1.max(d2), tolerance);
    for i in 1 ..= n {
        if i == n {
            line_to(p3.0, p3.1);
            break;
        }
        let t = i as f64 / n as f64;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        line_to(a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
                a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1);
    }
}
