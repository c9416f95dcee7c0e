use serde::Serialize;

use crate::geometry::Position;
use crate::grid::Grid;
use crate::pathfinding::find_nearest_matching;
use crate::team::{Reservation, Team};
use crate::unit::Unit;

use super::go::{Stride, Walker};
use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Tile predicates a spot search can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotFilter {
    /// Somewhere to leave an unwanted item: open floor with nothing on it,
    /// not promised to a delivery and outside every stockpile.
    DumpSite,
}

impl SpotFilter {
    pub fn matches(&self, pos: Position, grid: &Grid, team: Option<&Team>) -> bool {
        match self {
            SpotFilter::DumpSite => {
                grid.in_bounds(pos)
                    && !grid.is_solid(pos)
                    && grid.entity_at(pos).is_none()
                    && team.map_or(true, |team| {
                        !team.ledger().is_reserved(Reservation::Location(pos))
                            && !team.in_any_stockpile(pos)
                    })
            }
        }
    }
}

/// Walk to the nearest tile matching a filter.
#[derive(Debug)]
pub struct GoToSpot {
    filter: SpotFilter,
    target: Position,
    delay: u32,
    walker: Walker,
}

impl GoToSpot {
    /// Search for a matching tile from the unit's position.
    pub fn search(unit: &Unit, filter: SpotFilter, delay: u32, ctx: &TaskContext<'_>) -> Option<Self> {
        let path = Self::plan(unit.position, filter, ctx)?;
        let target = *path.last()?;
        Some(Self {
            filter,
            target,
            delay,
            walker: Walker::new(path, delay),
        })
    }

    fn plan(from: Position, filter: SpotFilter, ctx: &TaskContext<'_>) -> Option<Vec<Position>> {
        let grid = &*ctx.grid;
        let team = ctx.team();
        find_nearest_matching(grid, from, |pos| filter.matches(pos, grid, team))
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn arrived(&self, unit: &Unit) -> bool {
        unit.position == self.target
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        let still_valid = ctx.partitions.is_reachable(unit, self.target)
            && self.filter.matches(self.target, ctx.grid, ctx.team());
        if !still_valid {
            let Some(replacement) = Self::search(unit, self.filter, self.delay, ctx) else {
                return Ok(TaskStatus::Failed(TaskFailure::Impossible));
            };
            *self = replacement;
        }
        if self.arrived(unit) {
            return Ok(TaskStatus::Finished);
        }
        match self.walker.stride(unit, ctx.grid) {
            Stride::Moved | Stride::Resting => Ok(TaskStatus::Running),
            Stride::Obstructed | Stride::Exhausted => {
                match Self::search(unit, self.filter, self.delay, ctx) {
                    Some(replacement) => {
                        *self = replacement;
                        Ok(TaskStatus::Running)
                    }
                    None => Ok(TaskStatus::Failed(TaskFailure::Impossible)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::grid::EntityKind;
    use crate::task::testing::Bench;
    use crate::task::{Action, Started};
    use crate::tiles;

    fn dump() -> Action {
        Action::GoToSpot {
            filter: SpotFilter::DumpSite,
            delay: 0,
        }
    }

    #[test]
    fn test_dump_site_leaves_stockpile() {
        let mut bench = Bench::floor(5, 1);
        let grid = Grid::filled(5, 1, tiles::FLOOR);
        bench
            .team
            .add_stockpile(&grid, Rect::new(0, 0, 3, 1), [EntityKind::Fish])
            .unwrap();
        let unit = bench.add_unit(0, 0);
        let mut task = bench.start(unit, dump());
        let (status, turns) = bench.run(unit, &mut task, 10);
        assert_eq!(status, TaskStatus::Finished);
        assert_eq!(turns, 4);
        assert_eq!(bench.units[unit].position, Position::new(3, 0));
    }

    #[test]
    fn test_free_tile_is_done_on_start() {
        let mut bench = Bench::floor(3, 3);
        let unit = bench.add_unit(1, 1);
        assert!(matches!(bench.try_start(unit, dump()).unwrap(), Started::Done));
    }

    #[test]
    fn test_no_spot_is_impossible() {
        let mut bench = Bench::floor(2, 1);
        bench.grid.spawn_entity(EntityKind::Rock, Position::new(0, 0)).unwrap();
        bench.grid.spawn_entity(EntityKind::Rock, Position::new(1, 0)).unwrap();
        let unit = bench.add_unit(0, 0);
        assert!(matches!(
            bench.try_start(unit, dump()).unwrap(),
            Started::Failed(TaskFailure::Impossible)
        ));
    }

    #[test]
    fn test_retargets_when_spot_taken() {
        let mut bench = Bench::floor(6, 1);
        bench.grid.spawn_entity(EntityKind::Rock, Position::new(0, 0)).unwrap();
        let unit = bench.add_unit(0, 0);
        let mut task = bench.start(unit, dump());
        bench.grid.spawn_entity(EntityKind::Rock, Position::new(1, 0)).unwrap();
        let (status, _) = bench.run(unit, &mut task, 10);
        assert_eq!(status, TaskStatus::Finished);
        assert_eq!(bench.units[unit].position, Position::new(2, 0));
    }
}
