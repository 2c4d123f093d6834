//! Startup configuration for the reference universe.

use serde::{Deserialize, Serialize};

use crate::native::NativeUniverse;
use crate::record::Species;
use crate::UniverseError;

/// How to build a [`NativeUniverse`] at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Field width in simulation units. Default: 500.
    pub width: u32,
    /// Field height in simulation units. Default: 500.
    pub height: u32,
    /// Seed for the universe RNG.
    pub seed: u64,
    /// Initial births, applied in order.
    pub population: Vec<(Species, u32)>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            seed: 0x5eed,
            population: vec![
                (Species::Plant, 200),
                (Species::Herbivore, 100),
                (Species::Carnivore, 10),
            ],
        }
    }
}

impl UniverseConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Total number of lives the configured population will hold.
    pub fn total_population(&self) -> u64 {
        self.population.iter().map(|(_, n)| u64::from(*n)).sum()
    }

    /// The species with the most lives, the first listed on a tie.
    pub fn dominant_species(&self) -> Option<Species> {
        let mut best: Option<(Species, u32)> = None;
        for &(species, count) in &self.population {
            if best.map_or(true, |(_, most)| count > most) {
                best = Some((species, count));
            }
        }
        best.map(|(species, _)| species)
    }

    /// Build and populate a universe.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError::FieldTooLarge`] if the field exceeds
    /// [`MAX_FIELD_EXTENT`](crate::native::MAX_FIELD_EXTENT), or
    /// [`UniverseError::FieldTooSmall`] if it cannot hold a life.
    pub fn build(&self) -> Result<NativeUniverse, UniverseError> {
        let mut universe = NativeUniverse::new(self.width, self.height, self.seed);
        universe.field().check_extent()?;
        for (species, count) in &self.population {
            universe.birth(*species, *count)?;
        }
        tracing::debug!(
            width = self.width,
            height = self.height,
            lives = universe.len(),
            "universe built from config"
        );
        Ok(universe)
    }
}
