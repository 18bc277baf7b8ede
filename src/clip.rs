//! Clipping Region

/// Receiver of clipped lines
pub trait LineSink {
    /// Add the line (x0,y0)-(x1,y1)
    fn add_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64);
}

#[cfg(test)]
impl LineSink for Vec<(f64,f64,f64,f64)> {
    fn add_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.push((x0, y0, x1, y1));
    }
}

/// Rectangle
#[derive(Debug,Default,Copy,Clone,PartialEq)]
pub struct Rectangle<T: std::cmp::PartialOrd + Copy> {
    /// Minimum x value
    pub x1: T,
    /// Minimum y value
    pub y1: T,
    /// Maximum x value
    pub x2: T,
    /// Maximum y value
    pub y2: T,
}
impl<T> Rectangle<T> where T: std::cmp::PartialOrd + Copy {
    /// Create a new Rectangle
    ///
    /// Values are sorted before storing
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        let (x1, x2) = if x1 > x2 { (x2,x1) } else { (x1,x2) };
        let (y1, y2) = if y1 > y2 { (y2,y1) } else { (y1,y2) };
        Self { x1,y1,x2,y2 }
    }
    /// Get location of point relative to rectangle
    ///
    /// Returned is an a u8 made up of the following bits:
    /// - [INSIDE](constant.INSIDE.html)
    /// - [LEFT](constant.LEFT.html)
    /// - [RIGHT](constant.RIGHT.html)
    /// - [BOTTOM](constant.BOTTOM.html)
    /// - [TOP](constant.TOP.html)
    ///
    pub fn clip_flags(&self, x: T, y: T) -> u8 {
        clip_flags(&x,&y, &self.x1, &self.y1, &self.x2, &self.y2)
    }
    /// Expand if the point (x,y) is outside
    pub fn expand(&mut self, x: T, y: T) {
        if x < self.x1 { self.x1 = x; }
        if x > self.x2 { self.x2 = x; }
        if y < self.y1 { self.y1 = y; }
        if y > self.y2 { self.y2 = y; }
    }
    /// Rectangle has no area
    pub fn is_empty(&self) -> bool {
        !(self.x1 < self.x2 && self.y1 < self.y2)
    }
}

/// Inside Region
///
/// See https://en.wikipedia.org/wiki/Liang-Barsky_algorithm
pub const INSIDE : u8 = 0b0000;
/// Left of Region
pub const LEFT   : u8 = 0b0000_0001;
/// Right of Region
pub const RIGHT  : u8 = 0b0000_0010;
/// Above Region (smaller y)
pub const TOP    : u8 = 0b0000_0100;
/// Below Region (larger y)
pub const BOTTOM : u8 = 0b0000_1000;

/// Determine the location of a point to a broken-down rectangle
fn clip_flags<T: std::cmp::PartialOrd>(x: &T, y: &T, x1: &T, y1: &T, x2: &T, y2: &T) -> u8 {
    let mut code = INSIDE;
    if x < x1 { code |= LEFT; }
    if x > x2 { code |= RIGHT; }
    if y < y1 { code |= TOP; }
    if y > y2 { code |= BOTTOM; }
    code
}

/// Clip Region
///
/// Lines are given in sub-pixel coordinates. Parts above or below the box
/// are cut away, parts left or right of the box are moved onto the box side
/// so the winding of everything inside is kept.
#[derive(Debug,Default)]
pub struct Clip {
    /// Current x Point
    x1: f64,
    /// Current y Point
    y1: f64,
    /// Rectangle to clip on
    clip_box: Option<Rectangle<f64>>,
    /// Current clip flag for point (x1,y1)
    clip_flag: u8,
}

/// x of the line (x1,y1)-(x2,y2) at y
fn x_at(x1: f64, y1: f64, x2: f64, y2: f64, y: f64) -> f64 {
    x1 + (y - y1) * (x2 - x1) / (y2 - y1)
}
/// y of the line (x1,y1)-(x2,y2) at x
fn y_at(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    y1 + (x - x1) * (y2 - y1) / (x2 - x1)
}

impl Clip {
    /// Create new Clipping region
    pub fn new() -> Self {
        Self {x1: 0.0, y1: 0.0,
              clip_box: None,
              clip_flag: INSIDE }
    }
    /// Define the clipping region
    pub fn clip_box(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.clip_box = Some( Rectangle::new(x1, y1, x2, y2) );
    }
    /// Clip a line along the top and bottom of the region
    fn line_clip_y<S: LineSink>(b: &Rectangle<f64>, edges: &mut S,
                   x1: f64, y1: f64, x2: f64, y2: f64,
                   f1: u8, f2: u8) {
        let f1 = f1 & (TOP|BOTTOM);
        let f2 = f2 & (TOP|BOTTOM);
        if f1 == INSIDE && f2 == INSIDE {
            edges.add_line(x1, y1, x2, y2);
            return;
        }
        // Both points above or below clip box
        if f1 == f2 {
            return;
        }
        let (mut tx1, mut ty1, mut tx2, mut ty2) = (x1,y1,x2,y2);
        if f1 & TOP != 0 {
            tx1 = x_at(x1, y1, x2, y2, b.y1);
            ty1 = b.y1;
        }
        if f1 & BOTTOM != 0 {
            tx1 = x_at(x1, y1, x2, y2, b.y2);
            ty1 = b.y2;
        }
        if f2 & TOP != 0 {
            tx2 = x_at(x1, y1, x2, y2, b.y1);
            ty2 = b.y1;
        }
        if f2 & BOTTOM != 0 {
            tx2 = x_at(x1, y1, x2, y2, b.y2);
            ty2 = b.y2;
        }
        edges.add_line(tx1, ty1, tx2, ty2);
    }

    /// Add a line from the current point to (x2,y2) into `edges`
    ///
    /// Final point (x2,y2) becomes the current point
    pub fn line_to<S: LineSink>(&mut self, edges: &mut S, x2: f64, y2: f64) {
        let b = match self.clip_box {
            None => {
                edges.add_line(self.x1, self.y1, x2, y2);
                self.x1 = x2;
                self.y1 = y2;
                return;
            },
            Some(b) => b,
        };
        let f2 = b.clip_flags(x2,y2);
        let fy1 = (TOP | BOTTOM) & self.clip_flag;
        let fy2 = (TOP | BOTTOM) & f2;
        if fy1 != INSIDE && fy1 == fy2 {
            // Entirely above or below, nothing can be covered
            self.x1 = x2;
            self.y1 = y2;
            self.clip_flag = f2;
            return;
        }
        let (x1,y1,f1) = (self.x1, self.y1, self.clip_flag);
        match (f1 & (LEFT|RIGHT), f2 & (LEFT|RIGHT)) {
            (INSIDE,INSIDE) => Self::line_clip_y(&b, edges, x1,y1,x2,y2,f1,f2),
            (INSIDE,RIGHT) => {
                let y3 = y_at(x1, y1, x2, y2, b.x2);
                let f3 = b.clip_flags(b.x2, y3);
                Self::line_clip_y(&b, edges, x1,   y1, b.x2, y3, f1, f3);
                Self::line_clip_y(&b, edges, b.x2, y3, b.x2, y2, f3, f2);
            },
            (RIGHT,INSIDE) => {
                let y3 = y_at(x1, y1, x2, y2, b.x2);
                let f3 = b.clip_flags(b.x2, y3);
                Self::line_clip_y(&b, edges, b.x2, y1, b.x2, y3, f1, f3);
                Self::line_clip_y(&b, edges, b.x2, y3,   x2, y2, f3, f2);
            },
            (INSIDE,LEFT) => {
                let y3 = y_at(x1, y1, x2, y2, b.x1);
                let f3 = b.clip_flags(b.x1, y3);
                Self::line_clip_y(&b, edges, x1,   y1, b.x1, y3, f1, f3);
                Self::line_clip_y(&b, edges, b.x1, y3, b.x1, y2, f3, f2);
            },
            (LEFT,INSIDE) => {
                let y3 = y_at(x1, y1, x2, y2, b.x1);
                let f3 = b.clip_flags(b.x1, y3);
                Self::line_clip_y(&b, edges, b.x1, y1, b.x1, y3, f1, f3);
                Self::line_clip_y(&b, edges, b.x1, y3,   x2, y2, f3, f2);
            },
            (RIGHT,LEFT) => {
                let y3 = y_at(x1, y1, x2, y2, b.x2);
                let y4 = y_at(x1, y1, x2, y2, b.x1);
                let f3 = b.clip_flags(b.x2, y3);
                let f4 = b.clip_flags(b.x1, y4);
                Self::line_clip_y(&b, edges, b.x2, y1, b.x2, y3, f1, f3);
                Self::line_clip_y(&b, edges, b.x2, y3, b.x1, y4, f3, f4);
                Self::line_clip_y(&b, edges, b.x1, y4, b.x1, y2, f4, f2);
            },
            (LEFT,RIGHT) => {
                let y3 = y_at(x1, y1, x2, y2, b.x1);
                let y4 = y_at(x1, y1, x2, y2, b.x2);
                let f3 = b.clip_flags(b.x1, y3);
                let f4 = b.clip_flags(b.x2, y4);
                Self::line_clip_y(&b, edges, b.x1, y1, b.x1, y3, f1, f3);
                Self::line_clip_y(&b, edges, b.x1, y3, b.x2, y4, f3, f4);
                Self::line_clip_y(&b, edges, b.x2, y4, b.x2, y2, f4, f2);
            },
            (LEFT,LEFT)   => Self::line_clip_y(&b, edges, b.x1,y1,b.x1,y2,f1,f2),
            (RIGHT,RIGHT) => Self::line_clip_y(&b, edges, b.x2,y1,b.x2,y2,f1,f2),
            (_,_) => unreachable!("f1,f2 {:?} {:?}", f1,f2),
        }
        self.x1 = x2;
        self.y1 = y2;
        self.clip_flag = f2;
    }
    /// Move to point (x2,y2)
    ///
    /// Point is saved internally as (x1,y1)
    pub fn move_to(&mut self, x2: f64, y2: f64) {
        self.x1 = x2;
        self.y1 = y2;
        if let Some(ref b) = self.clip_box {
            self.clip_flag = b.clip_flags(x2, y2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clipped(x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<(f64,f64,f64,f64)> {
        let mut edges = vec![];
        let mut clip = Clip::new();
        clip.clip_box(0.0, 0.0, 100.0, 100.0);
        clip.move_to(x1, y1);
        clip.line_to(&mut edges, x2, y2);
        edges
    }

    #[test]
    fn rectangle_sorts_corners() {
        let r = Rectangle::new(5, 7, 1, 2);
        assert_eq!((r.x1, r.y1, r.x2, r.y2), (1, 2, 5, 7));
        assert!(!r.is_empty());
        assert!(Rectangle::new(1, 1, 1, 5).is_empty());
    }

    #[test]
    fn inside_line_passes_through() {
        let e = clipped(10.0, 10.0, 90.0, 90.0);
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn line_above_box_is_dropped() {
        let e = clipped(10.0, -20.0, 90.0, -5.0);
        assert_eq!(e.len(), 0);
    }

    #[test]
    fn line_left_of_box_is_clamped() {
        // Entirely left: kept as a vertical line on the box side
        let e = clipped(-50.0, 10.0, -40.0, 90.0);
        assert_eq!(e.len(), 1);
        let (x0, _, x1, _) = *e.last().unwrap();
        assert_eq!((x0, x1), (0.0, 0.0));
    }

    #[test]
    fn line_crossing_right_is_split() {
        let e = clipped(50.0, 0.0, 150.0, 100.0);
        assert_eq!(e.len(), 2);
        let (x0, y0, x1, y1) = *e.last().unwrap();
        assert_eq!((x0, y0, x1, y1), (100.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn line_crossing_bottom_is_cut() {
        let e = clipped(50.0, 50.0, 50.0, 150.0);
        assert_eq!(e.len(), 1);
        let (_, y0, _, y1) = *e.last().unwrap();
        assert_eq!((y0, y1), (50.0, 100.0));
    }
}
