use crate::geometry::Position;
use crate::tiles;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskStatus};

/// Raise a wall on a tile next to the unit. Work keeps counting while
/// anything stands on the site; only the wall itself waits for it to clear.
#[derive(Debug)]
pub struct Build {
    target: Position,
    remaining: u32,
}

impl Build {
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
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        self.remaining = self.remaining.saturating_sub(1);
        let obstructed = unit.position == self.target
            || ctx.occupied.contains(&self.target)
            || ctx.grid.entity_at(self.target).is_some();
        if obstructed || self.remaining > 0 {
            return Ok(TaskStatus::Running);
        }
        ctx.grid.set_tile(self.target, tiles::WALL)?;
        Ok(TaskStatus::Finished)
    }
}
