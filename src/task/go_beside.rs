use crate::geometry::Position;
use crate::pathfinding::find_path;
use crate::unit::Unit;

use super::go::{Stride, Walker};
use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Walk until standing next to a tile, never on it.
#[derive(Debug)]
pub struct GoBeside {
    target: Position,
    walker: Walker,
}

impl GoBeside {
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
        let path = find_path(ctx.grid, unit.position, target).unwrap_or_default();
        Ok(Self {
            target,
            walker: Walker::new(path, delay),
        })
    }

    pub fn arrived(&self, unit: &Unit) -> bool {
        unit.position.chebyshev(self.target) == 1
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        if !ctx.partitions.is_reachable(unit, self.target) {
            return Ok(TaskStatus::Failed(TaskFailure::Blocked));
        }
        if self.arrived(unit) {
            return Ok(TaskStatus::Finished);
        }
        if unit.position == self.target {
            let grid = &*ctx.grid;
            if let Some(free) = self
                .target
                .neighbors()
                .find(|pos| grid.in_bounds(*pos) && !grid.is_solid(*pos))
            {
                unit.position = free;
            }
            return Ok(TaskStatus::Running);
        }
        if self.walker.remaining() > 0 {
            match self.walker.stride(unit, ctx.grid) {
                Stride::Moved | Stride::Resting => return Ok(TaskStatus::Running),
                Stride::Obstructed | Stride::Exhausted => {}
            }
        }
        let Some(path) = find_path(ctx.grid, unit.position, self.target) else {
            return Ok(TaskStatus::Failed(TaskFailure::Blocked));
        };
        self.walker.reroute(path);
        match self.walker.stride(unit, ctx.grid) {
            Stride::Moved | Stride::Resting => Ok(TaskStatus::Running),
            Stride::Obstructed | Stride::Exhausted => Ok(TaskStatus::Failed(TaskFailure::Blocked)),
        }
    }
}
