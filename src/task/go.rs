use std::collections::VecDeque;

use crate::geometry::Position;
use crate::grid::Grid;
use crate::pathfinding::find_path;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Outcome of one attempt to advance along a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Stride {
    Moved,
    Resting,
    /// The next tile turned solid since the path was planned.
    Obstructed,
    Exhausted,
}

/// Follows a planned path, moving one tile every `delay + 1` turns.
#[derive(Debug)]
pub(super) struct Walker {
    steps: VecDeque<Position>,
    delay: u32,
    rest: u32,
}

impl Walker {
    /// `path` starts on the unit's own tile.
    pub(super) fn new(path: Vec<Position>, delay: u32) -> Self {
        let mut walker = Self {
            steps: VecDeque::new(),
            delay,
            rest: 0,
        };
        walker.reroute(path);
        walker
    }

    pub(super) fn reroute(&mut self, path: Vec<Position>) {
        self.steps = path.into_iter().skip(1).collect();
    }

    pub(super) fn remaining(&self) -> usize {
        self.steps.len()
    }

    pub(super) fn stride(&mut self, unit: &mut Unit, grid: &Grid) -> Stride {
        let Some(&next) = self.steps.front() else {
            return Stride::Exhausted;
        };
        if self.rest > 0 {
            self.rest -= 1;
            return Stride::Resting;
        }
        if grid.is_solid(next) {
            return Stride::Obstructed;
        }
        self.steps.pop_front();
        unit.position = next;
        self.rest = self.delay;
        Stride::Moved
    }
}

/// Walk to a tile, or next to it when the tile is solid.
#[derive(Debug)]
pub struct Go {
    target: Position,
    walker: Walker,
    planned: bool,
}

impl Go {
    pub fn new(
        unit: &Unit,
        target: Position,
        delay: u32,
        ctx: &TaskContext<'_>,
    ) -> Result<Self, TaskError> {
        if !ctx.partitions.is_reachable(unit, target) {
            return Err(TaskError::Unreachable {
                unit: unit.id,
                target,
            });
        }
        let path = find_path(ctx.grid, unit.position, target);
        Ok(Self {
            target,
            planned: path.is_some(),
            walker: Walker::new(path.unwrap_or_default(), delay),
        })
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn arrived(&self, unit: &Unit, grid: &Grid) -> bool {
        unit.position == self.target
            || (grid.is_solid(self.target) && unit.position.chebyshev(self.target) <= 1)
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        if !self.planned || !ctx.partitions.is_reachable(unit, self.target) {
            return Ok(TaskStatus::Failed(TaskFailure::Blocked));
        }
        if self.arrived(unit, ctx.grid) {
            return Ok(TaskStatus::Finished);
        }
        match self.walker.stride(unit, ctx.grid) {
            Stride::Moved | Stride::Resting => Ok(TaskStatus::Running),
            Stride::Obstructed | Stride::Exhausted => {
                let Some(path) = find_path(ctx.grid, unit.position, self.target) else {
                    return Ok(TaskStatus::Failed(TaskFailure::Blocked));
                };
                self.walker.reroute(path);
                match self.walker.stride(unit, ctx.grid) {
                    Stride::Moved | Stride::Resting => Ok(TaskStatus::Running),
                    Stride::Obstructed | Stride::Exhausted => {
                        Ok(TaskStatus::Failed(TaskFailure::Blocked))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::Position;
    use crate::task::testing::Bench;
    use crate::task::{Action, Target, TaskFailure, TaskStatus};
    use crate::tiles;

    fn go(x: i32, y: i32, delay: u32) -> Action {
        Action::Go {
            target: Target::Tile(Position::new(x, y)),
            delay,
        }
    }

    #[test]
    fn test_go_walks_one_tile_per_turn() {
        let mut bench = Bench::floor(5, 5);
        let unit = bench.add_unit(0, 0);
        let mut task = bench.start(unit, go(3, 0, 0));
        for expected in 1..=3 {
            assert_eq!(bench.enact(unit, &mut task).unwrap(), TaskStatus::Running);
            assert_eq!(bench.units[unit].position, Position::new(expected, 0));
        }
        assert_eq!(bench.enact(unit, &mut task).unwrap(), TaskStatus::Finished);
    }

    #[test]
    fn test_go_respects_delay() {
        let mut bench = Bench::floor(5, 1);
        let unit = bench.add_unit(0, 0);
        let mut task = bench.start(unit, go(2, 0, 2));
        let mut positions = Vec::new();
        for _ in 0..4 {
            assert_eq!(bench.enact(unit, &mut task).unwrap(), TaskStatus::Running);
            positions.push(bench.units[unit].position.x);
        }
        assert_eq!(positions, vec![1, 1, 1, 2]);
        assert_eq!(bench.enact(unit, &mut task).unwrap(), TaskStatus::Finished);
    }

    #[test]
    fn test_go_stops_beside_solid_target() {
        let mut bench = Bench::floor(5, 5);
        bench.grid.set_tile(Position::new(2, 2), tiles::MOUNTAIN).unwrap();
        let unit = bench.add_unit(0, 0);
        let mut task = bench.start(unit, go(2, 2, 0));
        let (status, turns) = bench.run(unit, &mut task, 10);
        assert_eq!(status, TaskStatus::Finished);
        assert_eq!(turns, 2);
        assert_eq!(bench.units[unit].position, Position::new(1, 1));
    }

    #[test]
    fn test_go_reroutes_around_new_wall() {
        let mut bench = Bench::floor(5, 5);
        let unit = bench.add_unit(0, 2);
        let mut task = bench.start(unit, go(4, 2, 0));
        bench.grid.set_tile(Position::new(1, 2), tiles::WALL).unwrap();
        bench.refresh();
        let (status, _) = bench.run(unit, &mut task, 20);
        assert_eq!(status, TaskStatus::Finished);
        assert_eq!(bench.units[unit].position, Position::new(4, 2));
    }

    #[test]
    fn test_go_blocked_when_target_cut_off() {
        let mut bench = Bench::floor(5, 3);
        let unit = bench.add_unit(0, 1);
        let mut task = bench.start(unit, go(4, 1, 0));
        for y in 0..3 {
            bench.grid.set_tile(Position::new(2, y), tiles::WATER).unwrap();
        }
        bench.refresh();
        assert_eq!(
            bench.enact(unit, &mut task).unwrap(),
            TaskStatus::Failed(TaskFailure::Blocked)
        );
    }
}
