use std::fmt;

/// A point in the global, cross-display coordinate space. Displays are
/// grouped around (0,0), so coordinates may be negative. Moving a Location
/// can take it outside every display - that is not checked here (Regions do
/// check).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// New point at the given offset, may be negative.
    pub fn offset(&self, dx: i32, dy: i32) -> Location {
        Location::new(self.x + dx, self.y + dy)
    }

    pub fn left(&self, dx: i32) -> Location {
        Location::new(self.x - dx, self.y)
    }

    pub fn right(&self, dx: i32) -> Location {
        Location::new(self.x + dx, self.y)
    }

    pub fn above(&self, dy: i32) -> Location {
        Location::new(self.x, self.y - dy)
    }

    pub fn below(&self, dy: i32) -> Location {
        Location::new(self.x, self.y + dy)
    }

    /// Move this point to the given coordinates.
    pub fn move_to(&mut self, x: i32, y: i32) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Move this point by the given amounts, may be negative.
    pub fn move_for(&mut self, dx: i32, dy: i32) -> &mut Self {
        self.x += dx;
        self.y += dy;
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L({},{})", self.x, self.y)
    }
}

/// Axis-aligned rectangle in global coordinates. Width/height may end up
/// zero or negative from intersection; `is_empty` reports that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn top_left(&self) -> Location {
        Location::new(self.x, self.y)
    }

    pub fn center(&self) -> Location {
        Location::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.w as i64 * self.h as i64
        }
    }

    pub fn contains_point(&self, p: Location) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn contains(&self, other: Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of the two rectangles; may be empty.
    pub fn intersection(&self, other: Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect::new(x, y, r - x, b - y)
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let r = self.right().max(other.right());
        let b = self.bottom().max(other.bottom());
        Rect::new(x, y, r - x, b - y)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    pub fn overlaps(&self, other: Rect) -> bool {
        !self.intersection(other).is_empty()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x, self.y, self.w, self.h)
    }
}
