use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A point in map coordinates. Y grows downward (screen convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to `other`.
    pub fn distance_sq(&self, other: Point) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        dx * dx + dy * dy
    }
}

/// Axis-aligned rectangle with its origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with no interior cannot gate anything.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether `p` lies inside the rectangle. The left/top edges are
    /// inclusive, the right/bottom edges exclusive.
    pub fn contains(&self, p: Point) -> bool {
        !self.is_degenerate()
            && p.x >= self.x
            && p.y >= self.y
            && p.x < self.x + self.width
            && p.y < self.y + self.height
    }

    /// Signed offsets of `p` from the rectangle's two diagonals: the
    /// downward diagonal (top-left to bottom-right) and the upward diagonal
    /// (bottom-left to top-right). Both are cross-multiplied by the
    /// rectangle width, which preserves sign and keeps the zero test exact
    /// in integer arithmetic. Positive means below the diagonal.
    pub fn diagonal_offsets(&self, p: Point) -> (i64, i64) {
        let dx = i64::from(p.x - self.x);
        let dy = i64::from(p.y - self.y);
        let w = i64::from(self.width);
        let h = i64::from(self.height);
        let downward = dy * w - h * dx;
        let upward = dy * w - h * (w - dx);
        (downward, upward)
    }
}

/// Cardinal direction in screen coordinates (Y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector for this direction.
    pub const fn unit(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// All four directions as a set.
    pub fn all() -> HashSet<Direction> {
        Self::ALL.iter().copied().collect()
    }
}

/// Direction vector for a fresh crossing into `rect`.
///
/// Returns `None` when `cur` is outside the rectangle or `prev` already lay
/// inside it (no new entry). Otherwise the rectangle is split into four
/// triangles by its diagonals and the crossing axis follows from which
/// triangle `cur` landed in: offsets of matching sign mean a vertical
/// crossing (top or bottom triangle), differing signs a horizontal one.
/// A point exactly on one diagonal borrows the sign of the other offset
/// to disambiguate which half it is on.
pub fn entry_vector(rect: &Rect, prev: Point, cur: Point) -> Option<(i64, i64)> {
    if !rect.contains(cur) || rect.contains(prev) {
        return None;
    }
    let (downward, upward) = rect.diagonal_offsets(cur);
    let vector = if downward == 0 || upward == 0 {
        (
            if downward != 0 { downward } else { -upward },
            if upward != 0 { upward } else { downward },
        )
    } else if downward.signum() == upward.signum() {
        (0, upward)
    } else {
        (downward, 0)
    };
    Some(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: Rect = Rect::new(100, 100, 40, 20);

    #[test]
    fn contains_is_half_open() {
        assert!(RECT.contains(Point::new(100, 100)));
        assert!(RECT.contains(Point::new(139, 119)));
        assert!(!RECT.contains(Point::new(140, 110)));
        assert!(!RECT.contains(Point::new(110, 120)));
        assert!(!RECT.contains(Point::new(99, 110)));
    }

    #[test]
    fn degenerate_rect_contains_nothing() {
        let flat = Rect::new(0, 0, 10, 0);
        assert!(flat.is_degenerate());
        assert!(!flat.contains(Point::new(5, 0)));
    }

    #[test]
    fn entry_into_top_triangle_is_vertical() {
        // (120, 105): above both diagonals, offsets -200 and -200.
        let cur = Point::new(120, 105);
        assert_eq!(RECT.diagonal_offsets(cur), (-200, -200));
        let v = entry_vector(&RECT, Point::new(120, 90), cur).unwrap();
        assert_eq!(v, (0, -200));
    }

    #[test]
    fn entry_into_left_triangle_is_horizontal() {
        // (102, 110): below the downward diagonal, above the upward one.
        let cur = Point::new(102, 110);
        assert_eq!(RECT.diagonal_offsets(cur), (360, -360));
        let v = entry_vector(&RECT, Point::new(95, 110), cur).unwrap();
        assert_eq!(v, (360, 0));
    }

    #[test]
    fn point_on_downward_diagonal_borrows_the_other_sign() {
        // (110, 105) lies exactly on the top-left-to-bottom-right diagonal.
        let cur = Point::new(110, 105);
        assert_eq!(RECT.diagonal_offsets(cur), (0, -400));
        let v = entry_vector(&RECT, Point::new(0, 0), cur).unwrap();
        assert_eq!(v, (400, -400));
    }

    #[test]
    fn diagonal_intersection_yields_zero_vector() {
        // The rectangle center sits on both diagonals; no direction wins.
        let center = Point::new(120, 110);
        assert_eq!(RECT.diagonal_offsets(center), (0, 0));
        let v = entry_vector(&RECT, Point::new(0, 0), center).unwrap();
        assert_eq!(v, (0, 0));
    }

    #[test]
    fn no_entry_when_current_outside() {
        assert!(entry_vector(&RECT, Point::new(0, 0), Point::new(90, 110)).is_none());
    }

    #[test]
    fn no_entry_when_previous_already_inside() {
        assert!(entry_vector(&RECT, Point::new(120, 110), Point::new(121, 110)).is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn outside_points_never_produce_an_entry(
                x in -200i32..400,
                y in -200i32..400,
                px in -200i32..400,
                py in -200i32..400,
            ) {
                let cur = Point::new(x, y);
                let prev = Point::new(px, py);
                if !RECT.contains(cur) {
                    prop_assert!(entry_vector(&RECT, prev, cur).is_none());
                }
            }

            #[test]
            fn inside_history_never_produces_an_entry(
                x in 100i32..140,
                y in 100i32..120,
                px in 100i32..140,
                py in 100i32..120,
            ) {
                let cur = Point::new(x, y);
                let prev = Point::new(px, py);
                prop_assert!(RECT.contains(prev));
                prop_assert!(entry_vector(&RECT, prev, cur).is_none());
            }

            #[test]
            fn off_diagonal_crossings_are_axis_aligned(
                x in 100i32..140,
                y in 100i32..120,
            ) {
                let cur = Point::new(x, y);
                let v = entry_vector(&RECT, Point::new(-1, -1), cur);
                prop_assert!(v.is_some());
                let (vx, vy) = v.unwrap();
                let (down, up) = RECT.diagonal_offsets(cur);
                if down != 0 && up != 0 {
                    prop_assert!((vx == 0) != (vy == 0));
                }
            }
        }
    }
}
