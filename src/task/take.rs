use crate::grid::EntityId;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Pick up an entity lying on the unit's tile.
#[derive(Debug)]
pub struct Take {
    entity: EntityId,
}

impl Take {
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        let here = ctx.grid.entity(self.entity).and_then(|e| e.location);
        if here != Some(unit.position) {
            return Ok(TaskStatus::Failed(TaskFailure::NotFound));
        }
        if let Some(held) = unit.held {
            return Err(TaskError::HandsFull {
                unit: unit.id,
                held,
            });
        }
        ctx.grid.lift_entity(self.entity)?;
        unit.held = Some(self.entity);
        Ok(TaskStatus::Finished)
    }
}
