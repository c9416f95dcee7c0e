use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::world::{World, WorldSnapshot};

#[derive(Serialize)]
struct SnapshotFile {
    written_at: DateTime<Utc>,
    #[serde(flatten)]
    world: WorldSnapshot,
}

/// Writes `<dir>/<scenario>/tick_NNNNNN.json` every `interval` turns. An
/// interval of zero disables snapshots.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn maybe_write(&self, world: &World, scenario_name: &str) -> Result<Option<PathBuf>> {
        let tick = world.tick();
        if self.interval == 0 || tick % self.interval != 0 {
            return Ok(None);
        }

        let dir = self.dir.join(scenario_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        let path = dir.join(format!("tick_{tick:06}.json"));
        let file = SnapshotFile {
            written_at: Utc::now(),
            world: world.snapshot(scenario_name),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::tiles;

    #[test]
    fn test_writes_on_interval_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path(), 2);
        let mut world = World::new(Grid::filled(2, 1, tiles::FLOOR));
        world.advance_turn();
        assert!(writer.maybe_write(&world, "pair").unwrap().is_none());

        world.advance_turn();
        let path = writer.maybe_write(&world, "pair").unwrap().unwrap();
        assert!(path.ends_with("pair/tick_000002.json"));
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tick"], 2);
        assert_eq!(value["tiles"][0][1], tiles::FLOOR);
        assert!(value["written_at"].is_string());
    }

    #[test]
    fn test_zero_interval_disables() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path(), 0);
        let world = World::new(Grid::filled(1, 1, tiles::FLOOR));
        assert!(writer.maybe_write(&world, "none").unwrap().is_none());
    }
}
