use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::{LoggingConfig, SimulationRules},
    geometry::{Position, Rect},
    grid::{EntityKind, Grid},
    team::TeamId,
    tiles::TileId,
    unit::Archetype,
    world::World,
};

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_wall_rocks() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub rules: SimulationRules,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Tile IDs, one string per row, separated by whitespace.
    pub rows: Vec<String>,
    #[serde(default)]
    pub player_start: Option<Position>,
    #[serde(default)]
    pub teams: Vec<ScenarioTeam>,
    #[serde(default)]
    pub units: Vec<ScenarioUnit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTeam {
    pub name: String,
    #[serde(default)]
    pub stockpiles: Vec<ScenarioStockpile>,
    /// Areas whose mountain tiles are designated for mining.
    #[serde(default)]
    pub mining: Vec<Rect>,
    #[serde(default)]
    pub walls: Vec<ScenarioWall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStockpile {
    pub rect: Rect,
    pub accepts: Vec<EntityKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioWall {
    pub at: Position,
    #[serde(default = "default_wall_rocks")]
    pub rocks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioUnit {
    pub archetype: Archetype,
    pub position: Position,
    #[serde(default)]
    pub team: Option<String>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(120)
    }

    pub fn tile_rows(&self) -> Result<Vec<Vec<TileId>>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.split_whitespace()
                    .map(|cell| {
                        cell.parse::<TileId>()
                            .with_context(|| format!("Bad tile '{cell}' in row {y}"))
                    })
                    .collect()
            })
            .collect()
    }

    pub fn build_world(&self) -> Result<World> {
        let grid = Grid::from_rows(&self.tile_rows()?)
            .with_context(|| format!("Invalid grid in scenario '{}'", self.name))?;
        let mut world = World::with_rules(grid, self.rules.clone());
        if let Some(start) = self.player_start {
            if !world.grid().in_bounds(start) {
                bail!("player start ({}, {}) is outside the grid", start.x, start.y);
            }
            world.set_player_start(start);
        }

        let mut team_ids: Vec<(&str, TeamId)> = Vec::new();
        for entry in &self.teams {
            let id = world.add_team(entry.name.clone());
            team_ids.push((entry.name.as_str(), id));
            let Some((team, grid)) = world.team_with_grid(id) else {
                bail!("team '{}' vanished while loading", entry.name);
            };
            for pile in &entry.stockpiles {
                team.add_stockpile(grid, pile.rect, pile.accepts.iter().copied())
                    .with_context(|| format!("Bad stockpile for team '{}'", entry.name))?;
            }
            for rect in &entry.mining {
                team.designate_mining(grid, *rect);
            }
            for wall in &entry.walls {
                team.designate_wall(grid, wall.at, wall.rocks)
                    .with_context(|| format!("Bad wall for team '{}'", entry.name))?;
            }
        }

        for (index, unit) in self.units.iter().enumerate() {
            let team = match &unit.team {
                Some(name) => match team_ids.iter().find(|(team, _)| *team == name.as_str()) {
                    Some((_, id)) => Some(*id),
                    None => bail!("unit {index} refers to unknown team '{name}'"),
                },
                None => None,
            };
            world
                .spawn_unit(unit.archetype, unit.position, team)
                .with_context(|| format!("Cannot place unit {index} ({})", unit.archetype.name()))?;
        }

        debug!(
            scenario = %self.name,
            width = world.grid().width(),
            height = world.grid().height(),
            units = world.units().len(),
            entities = world.grid().entity_count(),
            "world built"
        );
        Ok(world)
    }
}
