//! Units, their capabilities and the archetypes they are spawned from

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::grid::{EntityId, EntityKind};
use crate::job::Job;
use crate::partition::PartitionId;
use crate::team::TeamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub(crate) u32);

impl UnitId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Eating,
    Mining,
    Hauling,
    Building,
    Wandering,
    Brooding,
}

impl Capability {
    /// Capabilities whose jobs come from a team's designations or stockpiles.
    pub fn needs_team(self) -> bool {
        matches!(self, Capability::Mining | Capability::Hauling | Capability::Building)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn needs_team(&self) -> bool {
        self.0.iter().any(|c| c.needs_team())
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Penguin,
    Bug,
    Gnoose,
}

/// Starting attributes of a freshly spawned unit.
#[derive(Debug, Clone)]
pub struct Profile {
    pub movement_delay: u32,
    pub wandering_delay: u32,
    pub brooding_duration: u32,
    pub hunger_threshold: u32,
    pub diet: BTreeMap<EntityKind, u32>,
    pub capabilities: CapabilitySet,
}

impl Archetype {
    pub fn name(self) -> &'static str {
        match self {
            Archetype::Penguin => "penguin",
            Archetype::Bug => "bug",
            Archetype::Gnoose => "gnoose",
        }
    }

    pub fn profile(self) -> Profile {
        let wildlife = CapabilitySet::new()
            .with(Capability::Eating)
            .with(Capability::Wandering)
            .with(Capability::Brooding);
        match self {
            Archetype::Penguin => Profile {
                movement_delay: 0,
                wandering_delay: 1,
                brooding_duration: 12,
                hunger_threshold: 100,
                diet: BTreeMap::from([(EntityKind::Fish, 200)]),
                capabilities: wildlife
                    .with(Capability::Mining)
                    .with(Capability::Hauling)
                    .with(Capability::Building),
            },
            Archetype::Bug => Profile {
                movement_delay: 0,
                wandering_delay: 1,
                brooding_duration: 6,
                hunger_threshold: 50,
                diet: BTreeMap::from([(EntityKind::Fish, 100)]),
                capabilities: wildlife,
            },
            Archetype::Gnoose => Profile {
                movement_delay: 2,
                wandering_delay: 1,
                brooding_duration: 12,
                hunger_threshold: 100,
                diet: BTreeMap::from([(EntityKind::Rock, 300)]),
                capabilities: wildlife,
            },
        }
    }
}

pub struct Unit {
    pub id: UnitId,
    pub archetype: Archetype,
    pub position: Position,
    pub movement_delay: u32,
    pub wandering_delay: u32,
    pub brooding_duration: u32,
    pub hunger: u32,
    pub hunger_threshold: u32,
    pub diet: BTreeMap<EntityKind, u32>,
    pub capabilities: CapabilitySet,
    pub team: Option<TeamId>,
    pub partition: Option<PartitionId>,
    pub held: Option<EntityId>,
    pub job: Option<Job>,
}

impl Unit {
    pub fn new(id: UnitId, archetype: Archetype, position: Position, team: Option<TeamId>) -> Self {
        Self::from_profile(id, archetype, archetype.profile(), position, team)
    }

    pub fn from_profile(
        id: UnitId,
        archetype: Archetype,
        profile: Profile,
        position: Position,
        team: Option<TeamId>,
    ) -> Self {
        Self {
            id,
            archetype,
            position,
            movement_delay: profile.movement_delay,
            wandering_delay: profile.wandering_delay,
            brooding_duration: profile.brooding_duration,
            hunger: 0,
            hunger_threshold: profile.hunger_threshold,
            diet: profile.diet,
            capabilities: profile.capabilities,
            team,
            partition: None,
            held: None,
            job: None,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_hungry(&self) -> bool {
        self.hunger >= self.hunger_threshold
    }

    pub fn eats(&self, kind: EntityKind) -> Option<u32> {
        self.diet.get(&kind).copied()
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("archetype", &self.archetype)
            .field("position", &self.position)
            .field("hunger", &self.hunger)
            .field("held", &self.held)
            .field("job", &self.job.as_ref().map(|job| job.kind()))
            .finish()
    }
}
