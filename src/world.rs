use serde::Serialize;
use thiserror::Error;

use crate::config::SimulationRules;
use crate::geometry::Position;
use crate::grid::{EntityId, EntityKind, Grid, GridError};
use crate::job::JobKind;
use crate::partition::PartitionCache;
use crate::stockpile::Stockpile;
use crate::team::{Designation, Team, TeamId};
use crate::tiles::TileId;
use crate::unit::{Archetype, Profile, Unit, UnitId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("position ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(Position),
    #[error("cannot place a unit on solid tile ({}, {})", .0.x, .0.y)]
    SolidTile(Position),
    #[error("a {archetype} needs a team for its capabilities")]
    NeedsTeam { archetype: &'static str },
    #[error("unknown team {0:?}")]
    UnknownTeam(TeamId),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Per-turn dispatch counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub assigned: u32,
    pub completed: u32,
    pub failed: u32,
    /// Units left holding an item with nowhere to put it.
    pub held: u32,
}

impl DispatchReport {
    pub fn absorb(&mut self, other: &DispatchReport) {
        self.assigned += other.assigned;
        self.completed += other.completed;
        self.failed += other.failed;
        self.held += other.held;
    }
}

#[derive(Debug, Serialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub archetype: Archetype,
    pub position: Position,
    pub hunger: u32,
    pub team: Option<TeamId>,
    pub held: Option<EntityKind>,
    pub job: Option<JobKind>,
    pub task: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
}

#[derive(Debug, Serialize)]
pub struct TeamSnapshot {
    pub id: TeamId,
    pub name: String,
    pub designations: Vec<Designation>,
    pub stockpiles: Vec<Stockpile>,
    pub reservations: usize,
}

#[derive(Debug, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<Vec<TileId>>,
    pub units: Vec<UnitSnapshot>,
    pub entities: Vec<EntitySnapshot>,
    pub teams: Vec<TeamSnapshot>,
    pub live_partitions: usize,
    pub dispatch: DispatchReport,
    pub dispatch_totals: DispatchReport,
}

pub struct World {
    tick: u64,
    next_unit: u32,
    player_start: Option<Position>,
    pub(crate) grid: Grid,
    pub(crate) units: Vec<Unit>,
    pub(crate) teams: Vec<Team>,
    pub(crate) partitions: PartitionCache,
    pub(crate) rules: SimulationRules,
    pub(crate) last_dispatch: DispatchReport,
    pub(crate) dispatch_totals: DispatchReport,
}

impl World {
    pub fn new(grid: Grid) -> Self {
        Self::with_rules(grid, SimulationRules::default())
    }

    pub fn with_rules(mut grid: Grid, rules: SimulationRules) -> Self {
        grid.take_tile_changes();
        Self {
            tick: 0,
            next_unit: 0,
            player_start: None,
            grid,
            units: Vec::new(),
            teams: Vec::new(),
            partitions: PartitionCache::new(),
            rules,
            last_dispatch: DispatchReport::default(),
            dispatch_totals: DispatchReport::default(),
        }
    }

    pub fn add_team(&mut self, name: impl Into<String>) -> TeamId {
        let id = TeamId(self.teams.len() as u32);
        self.teams.push(Team::new(id, name));
        id
    }

    pub fn spawn_unit(
        &mut self,
        archetype: Archetype,
        position: Position,
        team: Option<TeamId>,
    ) -> Result<UnitId, WorldError> {
        self.spawn_with_profile(archetype, archetype.profile(), position, team)
    }

    /// Spawn a unit with explicit attributes instead of its archetype's.
    pub fn spawn_with_profile(
        &mut self,
        archetype: Archetype,
        profile: Profile,
        position: Position,
        team: Option<TeamId>,
    ) -> Result<UnitId, WorldError> {
        if !self.grid.in_bounds(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        if self.grid.is_solid(position) {
            return Err(WorldError::SolidTile(position));
        }
        match team {
            Some(id) if self.team(id).is_none() => return Err(WorldError::UnknownTeam(id)),
            None if profile.capabilities.needs_team() => {
                return Err(WorldError::NeedsTeam {
                    archetype: archetype.name(),
                })
            }
            _ => {}
        }

        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        self.units
            .push(Unit::from_profile(id, archetype, profile, position, team));
        self.sync_partitions();
        let index = self.units.len() - 1;
        self.partitions.attach(&self.grid, &mut self.units, index);
        tracing::debug!(unit = %id, archetype = archetype.name(), x = position.x, y = position.y, "unit spawned");
        Ok(id)
    }

    /// Write a tile and update the partitions it affects.
    pub fn set_tile(&mut self, position: Position, tile: TileId) -> Result<TileId, WorldError> {
        let previous = self.grid.set_tile(position, tile)?;
        self.sync_partitions();
        Ok(previous)
    }

    /// Forward pending tile writes to the partition cache.
    pub(crate) fn sync_partitions(&mut self) {
        for change in self.grid.take_tile_changes() {
            if change.previous == change.current {
                continue;
            }
            self.partitions
                .on_tile_changed(&self.grid, &mut self.units, change.position);
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Direct grid access. Tile writes made through it reach the partition
    /// cache at the next turn or [`World::set_tile`] call.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn rules(&self) -> &SimulationRules {
        &self.rules
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.id == id)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(id.0 as usize)
    }

    pub fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.get_mut(id.0 as usize)
    }

    /// Grid and team borrowed together, for the team API calls that
    /// validate against the grid.
    pub fn team_with_grid(&mut self, id: TeamId) -> Option<(&mut Team, &Grid)> {
        let team = self.teams.get_mut(id.0 as usize)?;
        Some((team, &self.grid))
    }

    pub fn partitions(&self) -> &PartitionCache {
        &self.partitions
    }

    pub fn can_reach(&self, unit: UnitId, position: Position) -> bool {
        self.unit(unit)
            .map_or(false, |unit| self.partitions.is_reachable(unit, position))
    }

    pub fn player_start(&self) -> Option<Position> {
        self.player_start
    }

    pub fn set_player_start(&mut self, position: Position) {
        self.player_start = Some(position);
    }

    pub fn last_dispatch(&self) -> DispatchReport {
        self.last_dispatch
    }

    pub fn dispatch_totals(&self) -> DispatchReport {
        self.dispatch_totals
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn advance_turn(&mut self) {
        self.tick += 1;
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let units = self
            .units
            .iter()
            .map(|unit| UnitSnapshot {
                id: unit.id,
                archetype: unit.archetype,
                position: unit.position,
                hunger: unit.hunger,
                team: unit.team,
                held: unit
                    .held
                    .and_then(|id| self.grid.entity(id))
                    .map(|entity| entity.kind),
                job: unit.job.as_ref().map(|job| job.kind()),
                task: unit.job.as_ref().and_then(|job| job.current_task()),
            })
            .collect();
        let mut entities: Vec<EntitySnapshot> = self
            .grid
            .placed_entities()
            .filter_map(|entity| {
                entity.location.map(|position| EntitySnapshot {
                    id: entity.id,
                    kind: entity.kind,
                    position,
                })
            })
            .collect();
        entities.sort_by_key(|entity| entity.id);
        let teams = self
            .teams
            .iter()
            .map(|team| TeamSnapshot {
                id: team.id,
                name: team.name.clone(),
                designations: team.designations().to_vec(),
                stockpiles: team.stockpiles().to_vec(),
                reservations: team.ledger().len(),
            })
            .collect();
        let tiles = (0..self.grid.height())
            .map(|y| {
                (0..self.grid.width())
                    .filter_map(|x| self.grid.tile(Position::new(x, y)))
                    .collect()
            })
            .collect();

        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            width: self.grid.width(),
            height: self.grid.height(),
            tiles,
            units,
            entities,
            teams,
            live_partitions: self.partitions.live_matrices(),
            dispatch: self.last_dispatch,
            dispatch_totals: self.dispatch_totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles;

    fn walled_world() -> World {
        let mut rows = vec![vec![tiles::FLOOR; 5]; 3];
        for row in rows.iter_mut() {
            row[2] = tiles::WALL;
        }
        World::new(Grid::from_rows(&rows).unwrap())
    }

    #[test]
    fn test_spawn_validation() {
        let mut world = walled_world();
        assert_eq!(
            world.spawn_unit(Archetype::Bug, Position::new(9, 0), None),
            Err(WorldError::OutOfBounds(Position::new(9, 0)))
        );
        assert_eq!(
            world.spawn_unit(Archetype::Bug, Position::new(2, 0), None),
            Err(WorldError::SolidTile(Position::new(2, 0)))
        );
        assert_eq!(
            world.spawn_unit(Archetype::Penguin, Position::new(0, 0), None),
            Err(WorldError::NeedsTeam { archetype: "penguin" })
        );
        assert_eq!(
            world.spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(TeamId(4))),
            Err(WorldError::UnknownTeam(TeamId(4)))
        );
        let team = world.add_team("player");
        assert!(world
            .spawn_unit(Archetype::Penguin, Position::new(0, 0), Some(team))
            .is_ok());
        assert!(world.spawn_unit(Archetype::Bug, Position::new(4, 0), None).is_ok());
        assert_eq!(world.units().len(), 2);
        assert_eq!(world.partitions().live_matrices(), 2);
    }

    #[test]
    fn test_set_tile_refreshes_reachability() {
        let mut world = walled_world();
        let left = world.spawn_unit(Archetype::Bug, Position::new(0, 1), None).unwrap();
        let right = world.spawn_unit(Archetype::Bug, Position::new(4, 1), None).unwrap();
        assert!(!world.can_reach(left, Position::new(4, 1)));

        world.set_tile(Position::new(2, 1), tiles::FLOOR).unwrap();
        assert!(world.can_reach(left, Position::new(4, 1)));
        assert!(world.can_reach(right, Position::new(0, 1)));
        assert_eq!(
            world.unit(left).and_then(|u| u.partition),
            world.unit(right).and_then(|u| u.partition)
        );
    }

    #[test]
    fn test_snapshot_lists_units_and_entities() {
        let mut world = walled_world();
        world.grid_mut().spawn_entity(EntityKind::Fish, Position::new(1, 1)).unwrap();
        world.spawn_unit(Archetype::Bug, Position::new(0, 0), None).unwrap();
        world.advance_turn();
        let snapshot = world.snapshot("walled");
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.units.len(), 1);
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.tiles[0][2], tiles::WALL);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["units"][0]["archetype"], "bug");
    }
}
