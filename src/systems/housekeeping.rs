use anyhow::{bail, Result};
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// End-of-turn upkeep: drops finished designations and checks that the
/// grid and the units agree about where every entity is.
pub struct HousekeepingSystem;

impl HousekeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HousekeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for HousekeepingSystem {
    fn name(&self) -> &str {
        "housekeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let pruned: usize = world.teams.iter_mut().map(|team| team.prune_finished()).sum();
        if pruned > 0 {
            debug!(tick = ctx.tick, pruned, "finished designations removed");
        }

        world.grid.verify_mirror()?;
        for unit in &world.units {
            let Some(held) = unit.held else {
                continue;
            };
            match world.grid.entity(held) {
                Some(entity) if entity.location.is_none() => {}
                Some(_) => bail!("{} holds {held} but it is still on the grid", unit.id),
                None => bail!("{} holds {held} which no longer exists", unit.id),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Position, Rect};
    use crate::grid::{EntityKind, Grid};
    use crate::rng::RngManager;
    use crate::tiles;
    use crate::unit::Archetype;

    fn run_once(world: &mut World) -> Result<()> {
        let mut rng = RngManager::new(3);
        let ctx = SystemContext {
            tick: world.tick(),
            scenario_name: "test",
        };
        HousekeepingSystem::new().run(&ctx, world, &mut rng.stream("housekeeping"))
    }

    #[test]
    fn test_finished_designations_are_pruned() {
        let mut grid = Grid::filled(4, 4, tiles::FLOOR);
        grid.set_tile(Position::new(3, 3), tiles::MOUNTAIN).unwrap();
        let mut world = World::new(grid);
        let team = world.add_team("colony");
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony.designate_mining(grid, Rect::new(0, 0, 4, 4));
        let id = colony.designations()[0].id;
        colony.mark_done(id);

        run_once(&mut world).unwrap();
        assert!(world.team(team).unwrap().designations().is_empty());
    }

    #[test]
    fn test_held_item_left_on_grid_is_reported() {
        let mut world = World::new(Grid::filled(3, 3, tiles::FLOOR));
        let bug = world.spawn_unit(Archetype::Bug, Position::new(0, 0), None).unwrap();
        let fish = world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(1, 1))
            .unwrap();
        world.unit_mut(bug).unwrap().held = Some(fish);
        assert!(run_once(&mut world).is_err());

        world.grid_mut().lift_entity(fish).unwrap();
        run_once(&mut world).unwrap();
    }
}
