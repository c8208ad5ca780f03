use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SAVE_VERSION;
use crate::error::PersistError;
use crate::simulation::BoidWorld;

/// Everything needed to resume a run: the world plus the next frame number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    /// Always the first field so it can be read on its own.
    pub version: u32,
    pub frame: u32,
    pub world: BoidWorld,
}

impl SaveState {
    pub fn capture(world: &BoidWorld, frame: u32) -> Self {
        Self {
            version: SAVE_VERSION,
            frame,
            world: world.clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        let version: u32 = bincode::deserialize(bytes)?;
        if version != SAVE_VERSION {
            return Err(PersistError::Version {
                found: version,
                expected: SAVE_VERSION,
            });
        }
        let state: SaveState = bincode::deserialize(bytes)?;
        state.world.scene.validate()?;
        for system in &state.world.systems {
            system.settings.validate()?;
        }
        Ok(state)
    }
}

pub fn save_to_file(world: &BoidWorld, frame: u32, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    let bytes = SaveState::capture(world, frame).to_bytes()?;
    std::fs::write(path, bytes).map_err(|e| PersistError::io(path, e))?;
    info!(path = %path.display(), frame, "world saved");
    Ok(())
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<SaveState, PersistError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PersistError::io(path, e))?;
    let state = SaveState::from_bytes(&bytes)?;
    info!(path = %path.display(), frame = state.frame, "world loaded");
    Ok(state)
}
