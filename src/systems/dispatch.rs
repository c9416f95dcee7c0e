use anyhow::{Context, Result};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    engine::{System, SystemContext},
    geometry::Position,
    job::{Job, JobProgress, Recovery},
    rng::SystemRng,
    task::{TaskContext, TaskError},
    team::LedgerError,
    unit::Unit,
    world::{DispatchReport, World},
};

use super::job_search;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Gives every unit one turn: idle units look for a job and start it, then
/// the unit's current task is enacted once.
pub struct DispatchSystem;

impl DispatchSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DispatchSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DispatchSystem {
    fn name(&self) -> &str {
        "dispatch"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng<'_>) -> Result<()> {
        world.sync_partitions();
        let mut report = DispatchReport::default();
        for index in 0..world.units.len() {
            let id = world.units[index].id;
            dispatch_unit(world, index, rng, &mut report)
                .with_context(|| format!("dispatching {id} on tick {}", ctx.tick))?;
        }
        if report != DispatchReport::default() {
            debug!(
                tick = ctx.tick,
                assigned = report.assigned,
                completed = report.completed,
                failed = report.failed,
                held = report.held,
                "dispatch turn"
            );
        }
        world.last_dispatch = report;
        world.dispatch_totals.absorb(&report);
        Ok(())
    }
}

fn dispatch_unit(
    world: &mut World,
    index: usize,
    rng: &mut dyn RngCore,
    report: &mut DispatchReport,
) -> Result<(), DispatchError> {
    let occupied: Vec<Position> = world
        .units
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .map(|(_, unit)| unit.position)
        .collect();

    let World {
        grid,
        units,
        teams,
        partitions,
        rules,
        ..
    } = world;
    let unit = &mut units[index];
    let team = match unit.team {
        Some(id) => teams.get_mut(id.0 as usize),
        None => None,
    };
    let mut ctx = TaskContext {
        grid,
        team,
        partitions,
        rules,
        rng,
        occupied: &occupied,
    };

    let (mut job, progress) = match unit.job.take() {
        Some(mut job) => {
            let progress = job.turn(unit, &mut ctx)?;
            (job, progress)
        }
        None => match job_search::find_job(unit, &mut ctx)? {
            Some(mut job) => {
                report.assigned += 1;
                debug!(unit = %unit.id, job = %job.kind(), "job assigned");
                let progress = match job.begin(unit, &mut ctx)? {
                    JobProgress::Running => job.turn(unit, &mut ctx)?,
                    settled => settled,
                };
                (job, progress)
            }
            None => {
                unit.hunger = unit.hunger.saturating_add(1);
                return Ok(());
            }
        },
    };
    unit.job = settle(&mut job, progress, unit, &mut ctx, report)?.then_some(job);
    unit.hunger = unit.hunger.saturating_add(1);

    world.sync_partitions();
    Ok(())
}

/// Apply a job's progress. Returns whether the unit keeps the job; a failed
/// step may leave the unit on a fresh dump job instead.
fn settle(
    job: &mut Job,
    progress: JobProgress,
    unit: &mut Unit,
    ctx: &mut TaskContext<'_>,
    report: &mut DispatchReport,
) -> Result<bool, DispatchError> {
    match progress {
        JobProgress::Running => Ok(true),
        JobProgress::Completed => {
            job.release(ctx.team.as_deref_mut(), true)?;
            report.completed += 1;
            debug!(unit = %unit.id, job = %job.kind(), "job completed");
            Ok(false)
        }
        JobProgress::Failed { failure, recovery } => {
            job.release(ctx.team.as_deref_mut(), false)?;
            report.failed += 1;
            debug!(unit = %unit.id, job = %job.kind(), ?failure, ?recovery, "job failed");
            match (recovery, unit.held) {
                (Recovery::Dump, Some(held)) => {
                    let mut dump = job_search::dump_job(unit, held, ctx)?;
                    let progress = dump.begin(unit, ctx)?;
                    if settle(&mut dump, progress, unit, ctx, report)? {
                        *job = dump;
                        return Ok(true);
                    }
                    Ok(false)
                }
                (Recovery::Hold, Some(held)) => {
                    report.held += 1;
                    warn!(unit = %unit.id, entity = %held, "nowhere to put down held item");
                    Ok(false)
                }
                _ => Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationRules;
    use crate::geometry::Rect;
    use crate::grid::{EntityKind, Grid};
    use crate::job::JobKind;
    use crate::rng::RngManager;
    use crate::team::TeamId;
    use crate::tiles;
    use crate::unit::Archetype;

    fn row_world(row: &str) -> World {
        let tiles: Vec<_> = row
            .chars()
            .map(|c| match c {
                '#' => tiles::MOUNTAIN,
                '~' => tiles::WATER,
                _ => tiles::FLOOR,
            })
            .collect();
        let grid = Grid::from_rows(&[tiles]).unwrap();
        let rules = SimulationRules {
            rock_drop_chance: 0.0,
            ..SimulationRules::default()
        };
        World::with_rules(grid, rules)
    }

    struct Driver {
        system: DispatchSystem,
        rng: RngManager,
    }

    impl Driver {
        fn new() -> Self {
            Self {
                system: DispatchSystem::new(),
                rng: RngManager::new(11),
            }
        }

        fn turns(&mut self, world: &mut World, count: usize) {
            for _ in 0..count {
                let ctx = SystemContext {
                    tick: world.tick(),
                    scenario_name: "test",
                };
                let mut rng = self.rng.stream("dispatch");
                self.system.run(&ctx, world, &mut rng).unwrap();
                world.advance_turn();
            }
        }
    }

    fn current_job(world: &World) -> Option<JobKind> {
        world.units()[0].job.as_ref().map(|job| job.kind())
    }

    fn ledger_size(world: &World, team: TeamId) -> usize {
        world.team(team).map_or(0, |team| team.ledger().len())
    }

    #[test]
    fn test_unit_mines_designated_tile() {
        let mut grid = Grid::filled(5, 5, tiles::FLOOR);
        grid.set_tile(Position::new(2, 2), tiles::MOUNTAIN).unwrap();
        let rules = SimulationRules {
            rock_drop_chance: 0.0,
            ..SimulationRules::default()
        };
        let mut world = World::with_rules(grid, rules);
        let team = world.add_team("colony");
        world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        let (colony, grid) = world.team_with_grid(team).unwrap();
        assert_eq!(colony.designate_mining(grid, Rect::new(0, 0, 5, 5)), 1);

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert_eq!(current_job(&world), Some(JobKind::Mine));
        assert_eq!(world.units()[0].position, Position::new(1, 1));
        assert_eq!(ledger_size(&world, team), 1);

        driver.turns(&mut world, 10);
        assert!(world.grid().is_solid(Position::new(2, 2)));

        driver.turns(&mut world, 1);
        assert_eq!(world.grid().tile(Position::new(2, 2)), Some(tiles::MINED_FLOOR));
        assert_eq!(world.last_dispatch().completed, 1);
        assert_eq!(ledger_size(&world, team), 0);
        assert!(world
            .team(team)
            .map_or(false, |colony| colony.designations().iter().all(|d| d.done)));
        assert!(world.can_reach(world.units()[0].id, Position::new(4, 4)));
    }

    #[test]
    fn test_hungry_wildlife_eats() {
        let mut world = row_world("....");
        let bug = world
            .spawn_unit(Archetype::Bug, Position::new(0, 0), None)
            .unwrap();
        let fish = world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(2, 0))
            .unwrap();
        if let Some(unit) = world.unit_mut(bug) {
            unit.hunger = unit.hunger_threshold;
        }

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert_eq!(current_job(&world), Some(JobKind::Eat));
        driver.turns(&mut world, 11);
        assert!(world.grid().entity(fish).is_some());
        driver.turns(&mut world, 1);
        assert!(world.grid().entity(fish).is_none());
        // 50 + 12 turns of hunger, minus 100, clamped, plus this turn
        assert_eq!(world.unit(bug).map(|unit| unit.hunger), Some(1));
    }

    #[test]
    fn test_unreachable_stockpile_is_ignored() {
        let mut world = row_world("..~~.");
        let team = world.add_team("colony");
        world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(1, 0))
            .unwrap();
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony
            .add_stockpile(grid, Rect::new(4, 0, 1, 1), [EntityKind::Fish])
            .unwrap();

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert!(matches!(
            current_job(&world),
            Some(JobKind::Wander | JobKind::Brood) | None
        ));
        assert_eq!(ledger_size(&world, team), 0);
    }

    #[test]
    fn test_reserved_slot_is_not_assigned_twice() {
        let mut world = row_world(".....");
        let team = world.add_team("colony");
        world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(2, 0))
            .unwrap();
        let slot = Position::new(4, 0);
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony
            .add_stockpile(grid, Rect::new(4, 0, 1, 1), [EntityKind::Fish])
            .unwrap();
        colony
            .ledger_mut()
            .reserve(crate::team::Reservation::Location(slot))
            .unwrap();

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert_ne!(current_job(&world), Some(JobKind::Haul));
        assert_eq!(ledger_size(&world, team), 1);
    }

    #[test]
    fn test_failed_chain_releases_everything() {
        let mut world = row_world(".....");
        let team = world.add_team("colony");
        let penguin = world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        let fish = world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(2, 0))
            .unwrap();
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony
            .add_stockpile(grid, Rect::new(4, 0, 1, 1), [EntityKind::Fish])
            .unwrap();

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert_eq!(current_job(&world), Some(JobKind::Haul));
        assert_eq!(ledger_size(&world, team), 2);

        world.grid_mut().destroy_entity(fish).unwrap();
        for _ in 0..10 {
            driver.turns(&mut world, 1);
            if world.dispatch_totals().failed > 0 {
                break;
            }
        }
        assert_eq!(world.dispatch_totals().failed, 1);
        assert_eq!(world.dispatch_totals().completed, 0);
        assert_eq!(ledger_size(&world, team), 0);
        assert_eq!(world.unit(penguin).and_then(|unit| unit.held), None);
    }

    #[test]
    fn test_blocked_delivery_is_dumped() {
        let mut world = row_world(".....");
        let team = world.add_team("colony");
        let penguin = world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        let cargo = world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(1, 0))
            .unwrap();
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony
            .add_stockpile(grid, Rect::new(4, 0, 1, 1), [EntityKind::Fish])
            .unwrap();

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert_eq!(current_job(&world), Some(JobKind::Haul));
        world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(4, 0))
            .unwrap();

        driver.turns(&mut world, 20);
        assert!(world.dispatch_totals().failed >= 1);
        assert_eq!(world.unit(penguin).and_then(|unit| unit.held), None);
        let dropped = world.grid().entity(cargo).and_then(|entity| entity.location);
        assert!(matches!(dropped, Some(pos) if pos != Position::new(4, 0)));
        assert_eq!(ledger_size(&world, team), 0);
    }

    #[test]
    fn test_item_is_held_without_dump_site() {
        let mut world = row_world("..");
        let team = world.add_team("colony");
        let penguin = world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        let rock = world
            .grid_mut()
            .spawn_entity(EntityKind::Rock, Position::new(1, 0))
            .unwrap();
        world.grid_mut().lift_entity(rock).unwrap();
        if let Some(unit) = world.unit_mut(penguin) {
            unit.held = Some(rock);
        }
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony
            .add_stockpile(grid, Rect::new(0, 0, 2, 1), [EntityKind::Fish])
            .unwrap();

        let mut driver = Driver::new();
        driver.turns(&mut world, 1);
        assert_eq!(
            world.last_dispatch(),
            DispatchReport {
                assigned: 1,
                completed: 0,
                failed: 1,
                held: 1,
            }
        );
        assert_eq!(world.unit(penguin).and_then(|unit| unit.held), Some(rock));
        assert_eq!(ledger_size(&world, team), 0);
        assert_eq!(current_job(&world), None);
    }

    #[test]
    fn test_walled_stockpile_slot_is_not_hauled_to() {
        let mut world = row_world("......");
        let team = world.add_team("colony");
        world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .unwrap();
        let fish = world
            .grid_mut()
            .spawn_entity(EntityKind::Fish, Position::new(2, 0))
            .unwrap();
        let (colony, grid) = world.team_with_grid(team).unwrap();
        colony
            .add_stockpile(grid, Rect::new(5, 0, 1, 1), [EntityKind::Fish])
            .unwrap();
        world.set_tile(Position::new(5, 0), tiles::WALL).unwrap();

        let mut driver = Driver::new();
        // stays under the penguin's hunger threshold so the fish is not eaten
        for _ in 0..60 {
            driver.turns(&mut world, 1);
            assert_ne!(current_job(&world), Some(JobKind::Haul));
        }
        assert_eq!(world.dispatch_totals().failed, 0);
        assert_eq!(
            world.grid().entity(fish).and_then(|entity| entity.location),
            Some(Position::new(2, 0))
        );
        assert_eq!(ledger_size(&world, team), 0);
    }
}
