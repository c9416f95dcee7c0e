//! Job search: finds the highest-priority job a unit can take right now and
//! reserves what it needs. Scans are first-fit; nothing is globally optimal.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::geometry::Position;
use crate::grid::{EntityId, EntityKind};
use crate::job::{Job, JobKind, Recovery};
use crate::partition::PartitionCache;
use crate::task::{Action, SpotFilter, Target, TaskContext};
use crate::team::{DesignationKind, LedgerError, Reservation, Team};
use crate::unit::{Capability, Unit};

/// First job the unit qualifies for, by priority: stow a held item, eat,
/// mine, build, haul, clean, then idle.
pub fn find_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    if let Some(held) = unit.held {
        return dump_job(unit, held, ctx).map(Some);
    }
    if let Some(job) = eating_job(unit, ctx)? {
        return Ok(Some(job));
    }
    if ctx.team.is_some() {
        if let Some(job) = mining_job(unit, ctx)? {
            return Ok(Some(job));
        }
        if let Some(job) = building_job(unit, ctx)? {
            return Ok(Some(job));
        }
        if let Some(job) = hauling_job(unit, ctx)? {
            return Ok(Some(job));
        }
        if let Some(job) = cleaning_job(unit, ctx)? {
            return Ok(Some(job));
        }
    }
    Ok(idle_job(unit, ctx))
}

/// Carry the held entity to the nearest dump site and put it down.
pub fn dump_job(unit: &Unit, entity: EntityId, ctx: &mut TaskContext<'_>) -> Result<Job, LedgerError> {
    let job = Job::new(JobKind::Dump)
        .then(
            Action::GoToSpot {
                filter: SpotFilter::DumpSite,
                delay: unit.movement_delay,
            },
            Recovery::Hold,
        )
        .then(Action::Drop(entity), Recovery::Dump);
    match ctx.team.as_deref_mut() {
        Some(team) => job.claim(team.ledger_mut(), Reservation::Entity(entity)),
        None => Ok(job),
    }
}

fn unreserved(team: Option<&Team>, reservation: Reservation) -> bool {
    team.map_or(true, |team| !team.ledger().is_reserved(reservation))
}

fn reachable(partitions: &PartitionCache, unit: &Unit, pos: Position) -> bool {
    partitions.is_reachable(unit, pos)
}

fn walk_to(entity: EntityId, unit: &Unit) -> Action {
    Action::Go {
        target: Target::Entity(entity),
        delay: unit.movement_delay,
    }
}

fn eating_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    if !unit.can(Capability::Eating) || !unit.is_hungry() {
        return Ok(None);
    }
    let team = ctx.team.as_deref();
    let partitions = ctx.partitions;
    let found = ctx.grid.find_entity(&mut *ctx.rng, |entity, pos| {
        unit.eats(entity.kind).is_some()
            && reachable(partitions, unit, pos)
            && unreserved(team, Reservation::Entity(entity.id))
    });
    let Some((food, _)) = found else {
        return Ok(None);
    };
    let job = Job::new(JobKind::Eat)
        .then(walk_to(food, unit), Recovery::Abort)
        .then(Action::Eat(food), Recovery::Abort);
    let job = match ctx.team.as_deref_mut() {
        Some(team) => job.claim(team.ledger_mut(), Reservation::Entity(food))?,
        None => job,
    };
    Ok(Some(job))
}

fn mining_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    if !unit.can(Capability::Mining) {
        return Ok(None);
    }
    let Some(team) = ctx.team.as_deref_mut() else {
        return Ok(None);
    };
    let target = team.designations().iter().find(|d| {
        d.kind == DesignationKind::Mine
            && !d.done
            && reachable(ctx.partitions, unit, d.location)
            && !team.ledger().is_reserved(Reservation::Mine(d.id))
    });
    let Some((id, location)) = target.map(|d| (d.id, d.location)) else {
        return Ok(None);
    };
    let job = Job::new(JobKind::Mine)
        .then(
            Action::Go {
                target: Target::Tile(location),
                delay: unit.movement_delay,
            },
            Recovery::Abort,
        )
        .then(Action::Mine(location), Recovery::Abort)
        .fulfilling(id)
        .claim(team.ledger_mut(), Reservation::Mine(id))?;
    Ok(Some(job))
}

fn building_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    if !unit.can(Capability::Building) {
        return Ok(None);
    }
    if let Some(job) = supply_job(unit, ctx)? {
        return Ok(Some(job));
    }
    let Some(team) = ctx.team.as_deref_mut() else {
        return Ok(None);
    };
    let site = team.designations().iter().find(|d| {
        d.kind == DesignationKind::BuildWall
            && !d.done
            && team.supplies_done(d.id)
            && reachable(ctx.partitions, unit, d.location)
            && !team.ledger().is_reserved(Reservation::Designation(d.id))
    });
    let Some((id, location)) = site.map(|d| (d.id, d.location)) else {
        return Ok(None);
    };
    let job = Job::new(JobKind::Build)
        .then(
            Action::GoBeside {
                target: location,
                delay: unit.movement_delay,
            },
            Recovery::Abort,
        )
        .then(Action::Build(location), Recovery::Abort)
        .fulfilling(id)
        .claim(team.ledger_mut(), Reservation::Designation(id))?;
    Ok(Some(job))
}

fn supply_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    let Some(team) = ctx.team.as_deref() else {
        return Ok(None);
    };
    let open: Vec<_> = team
        .designations()
        .iter()
        .filter(|d| {
            matches!(d.kind, DesignationKind::Supply { .. })
                && !d.done
                && reachable(ctx.partitions, unit, d.location)
                && !team.ledger().is_reserved(Reservation::Designation(d.id))
        })
        .map(|d| (d.id, d.location))
        .collect();
    let Some(&(supply, site)) = open.first() else {
        return Ok(None);
    };

    let partitions = ctx.partitions;
    let rock = ctx.grid.find_entity(&mut *ctx.rng, |entity, pos| {
        entity.kind == EntityKind::Rock
            && reachable(partitions, unit, pos)
            && !team.ledger().is_reserved(Reservation::Entity(entity.id))
    });
    let Some((rock, _)) = rock else {
        return Ok(None);
    };

    let Some(team) = ctx.team.as_deref_mut() else {
        return Ok(None);
    };
    let job = Job::new(JobKind::Supply)
        .then(walk_to(rock, unit), Recovery::Abort)
        .then(Action::Take(rock), Recovery::Abort)
        .then(
            Action::GoBeside {
                target: site,
                delay: unit.movement_delay,
            },
            Recovery::Dump,
        )
        .then(
            Action::Contribute {
                entity: rock,
                supply,
            },
            Recovery::Dump,
        )
        .fulfilling(supply)
        .claim(team.ledger_mut(), Reservation::Designation(supply))?
        .claim(team.ledger_mut(), Reservation::Entity(rock))?;
    Ok(Some(job))
}

fn hauling_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    if !unit.can(Capability::Hauling) {
        return Ok(None);
    }
    let Some(team) = ctx.team.as_deref() else {
        return Ok(None);
    };
    let grid = &*ctx.grid;
    let partitions = ctx.partitions;
    let mut choice = None;
    for pile in team.stockpiles() {
        if !reachable(partitions, unit, pile.rect.origin()) || pile.is_full(grid, team.ledger()) {
            continue;
        }
        let Some(slot) = pile.open_slot(grid, team.ledger()) else {
            continue;
        };
        let cargo = grid.find_entity(&mut *ctx.rng, |entity, pos| {
            pile.accepts(entity.kind)
                && reachable(partitions, unit, pos)
                && !team.ledger().is_reserved(Reservation::Entity(entity.id))
                && !team.in_any_stockpile(pos)
        });
        if let Some((entity, _)) = cargo {
            choice = Some((pile.id, slot, entity));
            break;
        }
    }
    let Some((stockpile, slot, entity)) = choice else {
        return Ok(None);
    };

    let Some(team) = ctx.team.as_deref_mut() else {
        return Ok(None);
    };
    let job = Job::new(JobKind::Haul)
        .then(walk_to(entity, unit), Recovery::Abort)
        .then(Action::Take(entity), Recovery::Abort)
        .then(
            Action::Go {
                target: Target::Tile(slot),
                delay: unit.movement_delay,
            },
            Recovery::Dump,
        )
        .then(
            Action::Stow {
                entity,
                slot,
                stockpile,
            },
            Recovery::Dump,
        )
        .claim(team.ledger_mut(), Reservation::Location(slot))?
        .claim(team.ledger_mut(), Reservation::Entity(entity))?;
    Ok(Some(job))
}

fn cleaning_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Option<Job>, LedgerError> {
    if !unit.can(Capability::Hauling) {
        return Ok(None);
    }
    let Some(team) = ctx.team.as_deref_mut() else {
        return Ok(None);
    };
    let grid = &*ctx.grid;
    let clutter = team.stockpiles().iter().find_map(|pile| {
        pile.rect.positions().find_map(|pos| {
            let entity = grid.entity_at(pos)?;
            let removable = !pile.accepts(entity.kind)
                && reachable(ctx.partitions, unit, pos)
                && !team.ledger().is_reserved(Reservation::Entity(entity.id));
            removable.then_some(entity.id)
        })
    });
    let Some(entity) = clutter else {
        return Ok(None);
    };
    let job = Job::new(JobKind::Clean)
        .then(walk_to(entity, unit), Recovery::Abort)
        .then(Action::Take(entity), Recovery::Abort)
        .then(
            Action::GoToSpot {
                filter: SpotFilter::DumpSite,
                delay: unit.movement_delay,
            },
            Recovery::Hold,
        )
        .then(Action::Drop(entity), Recovery::Dump)
        .claim(team.ledger_mut(), Reservation::Entity(entity))?;
    Ok(Some(job))
}

fn idle_job(unit: &Unit, ctx: &mut TaskContext<'_>) -> Option<Job> {
    let options: Vec<Capability> = [Capability::Wandering, Capability::Brooding]
        .into_iter()
        .filter(|capability| unit.can(*capability))
        .collect();
    match options.choose(&mut *ctx.rng)? {
        Capability::Wandering => {
            let destination = wander_destination(unit, ctx);
            Some(Job::new(JobKind::Wander).then(
                Action::Go {
                    target: Target::Tile(destination),
                    delay: unit.movement_delay + unit.wandering_delay,
                },
                Recovery::Abort,
            ))
        }
        _ => Some(
            Job::new(JobKind::Brood).then(Action::Wait(unit.brooding_duration), Recovery::Abort),
        ),
    }
}

/// End of a bounded random walk over open tiles.
fn wander_destination(unit: &Unit, ctx: &mut TaskContext<'_>) -> Position {
    let grid = &*ctx.grid;
    let mut position = unit.position;
    for _ in 0..ctx.rules.wander_steps {
        let open: Vec<Position> = position
            .neighbors()
            .filter(|pos| grid.in_bounds(*pos) && !grid.is_solid(*pos))
            .collect();
        if open.is_empty() {
            break;
        }
        position = open[ctx.rng.gen_range(0..open.len())];
    }
    position
}
