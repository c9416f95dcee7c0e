//! Reachability partitions
//!
//! Every unit holds a handle to a matrix marking the tiles it can reach. Units
//! standing in the same connected region share one matrix. Matrices are
//! immutable once published: a refresh publishes new ones and frees the slots
//! no unit refers to anymore. Refreshing assumes all units move by the same
//! rules, so sharing a matrix between units is always sound.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::grid::Grid;
use crate::unit::Unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityMatrix {
    width: i32,
    height: i32,
    cells: Vec<bool>,
}

impl ReachabilityMatrix {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_reachable(&self, pos: Position) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return false;
        }
        self.cells[(pos.y * self.width + pos.x) as usize]
    }

    /// True if `pos` or any of its neighbours is marked.
    pub fn touches(&self, pos: Position) -> bool {
        self.is_reachable(pos) || pos.neighbors().any(|n| self.is_reachable(n))
    }

    pub fn reachable_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }
}

/// Flood fill the tiles reachable from `origin` moving in eight directions.
///
/// Non-solid tiles (and the origin) are expanded. Neighbours are marked when
/// discovered, so solid tiles bordering the region count as reachable.
///
/// # Panics
///
/// Panics if `origin` lies outside the grid.
pub fn compute_partition(grid: &Grid, origin: Position) -> ReachabilityMatrix {
    let width = grid.width();
    let height = grid.height();
    assert!(
        grid.in_bounds(origin),
        "partition origin ({}, {}) is outside the {width}x{height} grid",
        origin.x,
        origin.y
    );
    let mut cells = vec![false; (width * height) as usize];
    let mut frontier = VecDeque::new();
    cells[(origin.y * width + origin.x) as usize] = true;
    frontier.push_back(origin);

    while let Some(current) = frontier.pop_front() {
        if current != origin && grid.is_solid(current) {
            continue;
        }
        for next in current.neighbors() {
            if !grid.in_bounds(next) {
                continue;
            }
            let index = (next.y * width + next.x) as usize;
            if !cells[index] {
                cells[index] = true;
                frontier.push_back(next);
            }
        }
    }

    ReachabilityMatrix {
        width,
        height,
        cells,
    }
}

struct Slot {
    matrix: ReachabilityMatrix,
    holders: usize,
}

#[derive(Default)]
pub struct PartitionCache {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    computed: u64,
}

impl PartitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PartitionId) -> Option<&ReachabilityMatrix> {
        self.slots
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .map(|slot| &slot.matrix)
    }

    pub fn is_reachable(&self, unit: &Unit, pos: Position) -> bool {
        unit.partition
            .and_then(|id| self.get(id))
            .map_or(false, |matrix| matrix.is_reachable(pos))
    }

    pub fn live_matrices(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of flood fills run so far.
    pub fn computed(&self) -> u64 {
        self.computed
    }

    pub fn refresh_all(&mut self, grid: &Grid, units: &mut [Unit]) {
        let all: Vec<usize> = (0..units.len()).collect();
        self.refresh(grid, units, &all);
    }

    /// Recompute the partitions of the units at `subset`. Units outside the
    /// subset keep their handles.
    pub fn refresh(&mut self, grid: &Grid, units: &mut [Unit], subset: &[usize]) {
        for &index in subset {
            if let Some(id) = units[index].partition.take() {
                self.release(id);
            }
        }

        let mut published: Vec<PartitionId> = Vec::new();
        for &index in subset {
            let position = units[index].position;
            let reused = published
                .iter()
                .copied()
                .find(|id| self.get(*id).map_or(false, |m| m.is_reachable(position)));
            let id = match reused {
                Some(id) => id,
                None => {
                    let id = self.publish(compute_partition(grid, position));
                    published.push(id);
                    id
                }
            };
            self.acquire(id);
            units[index].partition = Some(id);
        }
    }

    /// Refresh every unit whose matrix marks `position` or one of its
    /// neighbours. Returns how many units were refreshed.
    pub fn on_tile_changed(&mut self, grid: &Grid, units: &mut [Unit], position: Position) -> usize {
        let flagged: Vec<usize> = units
            .iter()
            .enumerate()
            .filter(|(_, unit)| {
                unit.partition
                    .and_then(|id| self.get(id))
                    .map_or(true, |matrix| matrix.touches(position))
            })
            .map(|(index, _)| index)
            .collect();
        if !flagged.is_empty() {
            tracing::trace!(
                x = position.x,
                y = position.y,
                units = flagged.len(),
                "tile change invalidated partitions"
            );
            self.refresh(grid, units, &flagged);
        }
        flagged.len()
    }

    /// Give a newly added unit a handle, sharing any live matrix that
    /// already covers its tile.
    pub fn attach(&mut self, grid: &Grid, units: &mut [Unit], index: usize) {
        if let Some(id) = units[index].partition.take() {
            self.release(id);
        }
        let position = units[index].position;
        let existing = self.slots.iter().enumerate().find_map(|(slot_index, slot)| {
            slot.as_ref()
                .filter(|slot| slot.matrix.is_reachable(position))
                .map(|_| PartitionId(slot_index))
        });
        let id = existing.unwrap_or_else(|| self.publish(compute_partition(grid, position)));
        self.acquire(id);
        units[index].partition = Some(id);
    }

    /// Drop a departing unit's handle.
    pub fn detach(&mut self, unit: &mut Unit) {
        if let Some(id) = unit.partition.take() {
            self.release(id);
        }
    }

    fn publish(&mut self, matrix: ReachabilityMatrix) -> PartitionId {
        self.computed += 1;
        let slot = Slot { matrix, holders: 0 };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                PartitionId(index)
            }
            None => {
                self.slots.push(Some(slot));
                PartitionId(self.slots.len() - 1)
            }
        }
    }

    fn acquire(&mut self, id: PartitionId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.0) {
            slot.holders += 1;
        }
    }

    fn release(&mut self, id: PartitionId) {
        let emptied = match self.slots.get_mut(id.0) {
            Some(Some(slot)) => {
                slot.holders = slot.holders.saturating_sub(1);
                slot.holders == 0
            }
            _ => false,
        };
        if emptied {
            self.slots[id.0] = None;
            self.free.push(id.0);
        }
    }
}
