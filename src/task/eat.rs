use crate::grid::EntityId;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Eat an entity lying on or next to the unit's tile.
#[derive(Debug)]
pub struct Eat {
    entity: EntityId,
    remaining: u32,
}

impl Eat {
    pub fn new(entity: EntityId, work_ticks: u32) -> Self {
        Self {
            entity,
            remaining: work_ticks.max(1),
        }
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        let Some(food) = ctx.grid.entity(self.entity) else {
            return Ok(TaskStatus::Failed(TaskFailure::Interrupted));
        };
        let in_reach = food
            .location
            .map_or(false, |pos| pos.chebyshev(unit.position) <= 1);
        if !in_reach {
            return Ok(TaskStatus::Failed(TaskFailure::Interrupted));
        }
        let kind = food.kind;

        self.remaining -= 1;
        if self.remaining > 0 {
            return Ok(TaskStatus::Running);
        }
        ctx.grid.destroy_entity(self.entity)?;
        let nourishment = unit.eats(kind).unwrap_or(0);
        unit.hunger = unit.hunger.saturating_sub(nourishment);
        tracing::debug!(unit = %unit.id, hunger = unit.hunger, "finished eating");
        Ok(TaskStatus::Finished)
    }
}
