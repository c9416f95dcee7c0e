use rand::Rng;

use crate::geometry::Position;
use crate::grid::EntityKind;
use crate::tiles;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskStatus};

/// Dig out a mountain tile next to the unit.
#[derive(Debug)]
pub struct Mine {
    target: Position,
    remaining: u32,
}

impl Mine {
    pub fn new(unit: &Unit, target: Position, work_ticks: u32) -> Result<Self, TaskError> {
        if unit.position.chebyshev(target) > 1 {
            return Err(TaskError::OutOfRange {
                unit: unit.id,
                target,
            });
        }
        Ok(Self {
            target,
            remaining: work_ticks.max(1),
        })
    }

    pub(super) fn enact(
        &mut self,
        _unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        self.remaining -= 1;
        if self.remaining > 0 {
            return Ok(TaskStatus::Running);
        }
        ctx.grid.set_tile(self.target, tiles::MINED_FLOOR)?;
        let chance = ctx.rules.rock_drop_chance.clamp(0.0, 1.0);
        if ctx.grid.entity_at(self.target).is_none() && ctx.rng.gen_bool(chance) {
            ctx.grid.spawn_entity(EntityKind::Rock, self.target)?;
        }
        Ok(TaskStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::Bench;
    use crate::task::Action;

    #[test]
    fn test_mining_takes_work_ticks() {
        let mut bench = Bench::floor(3, 3);
        bench.grid.set_tile(Position::new(1, 0), tiles::MOUNTAIN).unwrap();
        bench.rules.rock_drop_chance = 1.0;
        let unit = bench.add_unit(1, 1);
        let mut task = bench.start(unit, Action::Mine(Position::new(1, 0)));
        let (status, turns) = bench.run(unit, &mut task, 20);
        assert_eq!(status, TaskStatus::Finished);
        assert_eq!(turns, 10);
        assert_eq!(bench.grid.tile(Position::new(1, 0)), Some(tiles::MINED_FLOOR));
        assert_eq!(
            bench.grid.entity_at(Position::new(1, 0)).map(|e| e.kind),
            Some(EntityKind::Rock)
        );
    }

    #[test]
    fn test_mining_without_drop() {
        let mut bench = Bench::floor(3, 3);
        bench.grid.set_tile(Position::new(0, 0), tiles::MOUNTAIN).unwrap();
        bench.rules.rock_drop_chance = 0.0;
        bench.rules.work_ticks = 2;
        let unit = bench.add_unit(1, 1);
        let mut task = bench.start(unit, Action::Mine(Position::new(0, 0)));
        let (_, turns) = bench.run(unit, &mut task, 5);
        assert_eq!(turns, 2);
        assert!(bench.grid.entity_at(Position::new(0, 0)).is_none());
        assert!(!bench.grid.is_solid(Position::new(0, 0)));
    }

    #[test]
    fn test_mine_out_of_range() {
        let mut bench = Bench::floor(4, 4);
        let unit = bench.add_unit(0, 0);
        let result = bench.try_start(unit, Action::Mine(Position::new(3, 3)));
        assert!(matches!(result, Err(TaskError::OutOfRange { .. })));
    }
}
