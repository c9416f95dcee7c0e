//! A* and breadth-first search over the tile grid
//!
//! Both searches move in eight directions with unit step cost and never
//! expand solid tiles. The start tile is always expanded. Returned paths
//! include both endpoints.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::geometry::Position;
use crate::grid::Grid;

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    estimate: f64,
    cost: u32,
    position: Position,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // BinaryHeap is a max-heap; the lowest estimate must pop first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| self.cost.cmp(&other.cost))
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Per-tile scratch matrix used by both searches.
struct Scratch<T> {
    width: i32,
    cells: Vec<T>,
}

impl<T: Clone> Scratch<T> {
    fn new(grid: &Grid, fill: T) -> Self {
        Self {
            width: grid.width(),
            cells: vec![fill; (grid.width() * grid.height()) as usize],
        }
    }

    fn get(&self, pos: Position) -> &T {
        &self.cells[(pos.y * self.width + pos.x) as usize]
    }

    fn set(&mut self, pos: Position, value: T) {
        self.cells[(pos.y * self.width + pos.x) as usize] = value;
    }
}

fn reconstruct(previous: &Scratch<Option<Position>>, end: Position) -> Vec<Position> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(prev) = *previous.get(current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Shortest path from `start` to `goal`. The goal may be solid, in which case
/// the path ends on it and callers stop one tile short.
pub fn find_path(grid: &Grid, start: Position, goal: Position) -> Option<Vec<Position>> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return None;
    }

    let mut cost = Scratch::new(grid, u32::MAX);
    let mut previous: Scratch<Option<Position>> = Scratch::new(grid, None);
    let mut closed = Scratch::new(grid, false);
    let mut open = BinaryHeap::new();

    cost.set(start, 0);
    open.push(OpenNode {
        estimate: start.euclidean(goal),
        cost: 0,
        position: start,
    });

    while let Some(node) = open.pop() {
        let current = node.position;
        if *closed.get(current) {
            continue;
        }
        if current == goal {
            return Some(reconstruct(&previous, current));
        }
        closed.set(current, true);

        if current != start && grid.is_solid(current) {
            continue;
        }

        let next_cost = *cost.get(current) + 1;
        for neighbor in current.neighbors() {
            if !grid.in_bounds(neighbor) || *closed.get(neighbor) {
                continue;
            }
            if next_cost >= *cost.get(neighbor) {
                continue;
            }
            cost.set(neighbor, next_cost);
            previous.set(neighbor, Some(current));
            open.push(OpenNode {
                estimate: f64::from(next_cost) + neighbor.euclidean(goal),
                cost: next_cost,
                position: neighbor,
            });
        }
    }

    None
}

/// Path to the nearest tile accepted by `matches`, found breadth-first.
/// Solid tiles are never expanded but may themselves match. The start is
/// tested first, giving a single-tile path.
pub fn find_nearest_matching<F>(grid: &Grid, start: Position, mut matches: F) -> Option<Vec<Position>>
where
    F: FnMut(Position) -> bool,
{
    if !grid.in_bounds(start) {
        return None;
    }

    let mut visited = Scratch::new(grid, false);
    let mut previous: Scratch<Option<Position>> = Scratch::new(grid, None);
    let mut fringe = VecDeque::from([start]);
    visited.set(start, true);

    while let Some(node) = fringe.pop_front() {
        if matches(node) {
            return Some(reconstruct(&previous, node));
        }
        if node != start && grid.is_solid(node) {
            continue;
        }
        for neighbor in node.neighbors() {
            if !grid.in_bounds(neighbor) || *visited.get(neighbor) {
                continue;
            }
            visited.set(neighbor, true);
            previous.set(neighbor, Some(node));
            fringe.push_back(neighbor);
        }
    }

    None
}
