use crate::fixed::LineDist;
use crate::geometry::{MAX_BELT_SPEED_EXCLUSIVE, MIN_BELT_SPEED};
use crate::id::BeltTypeId;
use std::collections::HashMap;

/// A belt type definition in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeltDef {
    pub name: String,
    /// Distance an item travels per tick, in tiles.
    pub speed: LineDist,
}

/// Builder for constructing an immutable BeltRegistry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct BeltRegistryBuilder {
    belts: Vec<BeltDef>,
    name_to_id: HashMap<String, BeltTypeId>,
    duplicates: Vec<String>,
}

impl BeltRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a belt type. Returns its ID.
    pub fn register_belt(&mut self, name: &str, speed: LineDist) -> BeltTypeId {
        let id = BeltTypeId(self.belts.len() as u32);
        self.belts.push(BeltDef {
            name: name.to_string(),
            speed,
        });
        if self.name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicates.push(name.to_string());
        }
        id
    }

    /// Phase 2: Mutate an existing belt by name.
    pub fn mutate_belt<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut BeltDef),
    {
        let id = self
            .name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.belts[id.0 as usize]);
        Ok(())
    }

    /// Lookup belt type ID by name.
    pub fn belt_id(&self, name: &str) -> Option<BeltTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<BeltRegistry, RegistryError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(RegistryError::DuplicateName(name));
        }
        // A belt at or above one item spacing per tick could carry an item
        // through its neighbour in a single step.
        for belt in &self.belts {
            if belt.speed < MIN_BELT_SPEED || belt.speed >= MAX_BELT_SPEED_EXCLUSIVE {
                return Err(RegistryError::SpeedOutOfRange {
                    name: belt.name.clone(),
                    speed: belt.speed,
                });
            }
        }

        Ok(BeltRegistry {
            belts: self.belts,
            name_to_id: self.name_to_id,
        })
    }
}

/// Immutable belt capability table. Frozen after build(). Thread-safe to share.
#[derive(Debug, Clone, Default)]
pub struct BeltRegistry {
    belts: Vec<BeltDef>,
    name_to_id: HashMap<String, BeltTypeId>,
}

impl BeltRegistry {
    pub fn get(&self, id: BeltTypeId) -> Option<&BeltDef> {
        self.belts.get(id.0 as usize)
    }

    pub fn speed(&self, id: BeltTypeId) -> Option<LineDist> {
        self.get(id).map(|belt| belt.speed)
    }

    pub fn belt_id(&self, name: &str) -> Option<BeltTypeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn belt_count(&self) -> usize {
        self.belts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BeltTypeId, &BeltDef)> {
        self.belts
            .iter()
            .enumerate()
            .map(|(i, belt)| (BeltTypeId(i as u32), belt))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate belt name: {0}")]
    DuplicateName(String),
    #[error("belt {name}: speed {speed} must be at least 0.001 and below 0.250")]
    SpeedOutOfRange { name: String, speed: LineDist },
}
