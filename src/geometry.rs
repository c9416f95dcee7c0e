//! Grid coordinates and rectangles

use serde::{Deserialize, Serialize};

/// The eight neighbour offsets of a tile.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Tile position in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chessboard distance; 1 means the tiles touch, diagonals included.
    pub fn chebyshev(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn euclidean(self, other: Position) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dy)| self.offset(dx, dy))
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle of tiles
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

    /// Smallest rectangle spanning two corners, in any order.
    pub fn spanning(a: Position, b: Position) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self {
            x: left,
            y: top,
            width: a.x.max(b.x) - left + 1,
            height: a.y.max(b.y) - top + 1,
        }
    }

    pub fn origin(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.x && pos.x < self.x + self.width && pos.y >= self.y && pos.y < self.y + self.height
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        !(other.x >= self.x + self.width
            || other.y >= self.y + self.height
            || other.x + other.width <= self.x
            || other.y + other.height <= self.y)
    }

    /// Tiles of the rectangle in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| Position::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev() {
        let a = Position::new(1, 1);
        assert_eq!(a.chebyshev(Position::new(2, 2)), 1);
        assert_eq!(a.chebyshev(Position::new(1, 1)), 0);
        assert_eq!(a.chebyshev(Position::new(4, 2)), 3);
    }

    #[test]
    fn test_rect_spanning_and_contains() {
        let rect = Rect::spanning(Position::new(4, 3), Position::new(2, 1));
        assert_eq!(rect, Rect::new(2, 1, 3, 3));
        assert!(rect.contains(Position::new(4, 3)));
        assert!(!rect.contains(Position::new(5, 3)));
        assert_eq!(rect.positions().count(), 9);
        assert_eq!(rect.positions().next(), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0, 0, 2, 2);
        assert!(a.overlaps(&Rect::new(1, 1, 2, 2)));
        assert!(!a.overlaps(&Rect::new(2, 0, 2, 2)));
    }
}
