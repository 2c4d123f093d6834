//! Wire layout of one entity record in the entity buffer.
//!
//! Every live entity occupies [`LIFE_RECORD_STRIDE`] bytes. All fields are
//! little-endian and may sit at any byte alignment, so readers must go
//! through the offset constants below rather than casting the buffer:
//!
//! | offset | type | field |
//! |--------|------|-------|
//! | 0      | f32  | x     |
//! | 4      | f32  | y     |
//! | 8      | u32  | species |
//! | 12     | u32  | size (diameter) |

use serde::{Deserialize, Serialize};

/// Bytes per record.
pub const LIFE_RECORD_STRIDE: usize = 16;
/// Offset of the x coordinate (f32).
pub const X_OFFSET: usize = 0;
/// Offset of the y coordinate (f32).
pub const Y_OFFSET: usize = 4;
/// Offset of the species tag (u32).
pub const SPECIES_OFFSET: usize = 8;
/// Offset of the diameter (u32).
pub const SIZE_OFFSET: usize = 12;

/// Diameter of a newly born life, in simulation units.
pub const DEFAULT_LIFE_SIZE: u32 = 10;

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

/// The kind of a life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    /// Plants.
    Plant,
    /// Herbivores.
    Herbivore,
    /// Carnivores.
    Carnivore,
}

impl Species {
    /// All species, in tag order.
    pub const ALL: [Species; 3] = [Species::Plant, Species::Herbivore, Species::Carnivore];

    /// Numeric tag stored in the record.
    pub fn tag(self) -> u32 {
        match self {
            Species::Plant => 0,
            Species::Herbivore => 1,
            Species::Carnivore => 2,
        }
    }

    /// Inverse of [`tag`](Self::tag). Unknown tags yield `None`.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Species::Plant),
            1 => Some(Species::Herbivore),
            2 => Some(Species::Carnivore),
            _ => None,
        }
    }

    /// Display color as a CSS hex string.
    pub fn color(self) -> &'static str {
        match self {
            Species::Plant => "#02ab83",
            Species::Herbivore => "#eac435",
            Species::Carnivore => "#fb4d3d",
        }
    }
}

// ---------------------------------------------------------------------------
// LifeRecord
// ---------------------------------------------------------------------------

/// Decoded form of one entity record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeRecord {
    /// Center x in simulation units.
    pub x: f32,
    /// Center y in simulation units.
    pub y: f32,
    /// Raw species tag; see [`Species::from_tag`].
    pub species: u32,
    /// Diameter in simulation units.
    pub size: u32,
}

impl LifeRecord {
    /// A freshly born life of `species` centered at `(x, y)`.
    pub fn new(species: Species, x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            species: species.tag(),
            size: DEFAULT_LIFE_SIZE,
        }
    }

    /// Write this record into `out`, which must be at least
    /// [`LIFE_RECORD_STRIDE`] bytes long.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than one record.
    pub fn encode_into(&self, out: &mut [u8]) {
        out[X_OFFSET..X_OFFSET + 4].copy_from_slice(&self.x.to_le_bytes());
        out[Y_OFFSET..Y_OFFSET + 4].copy_from_slice(&self.y.to_le_bytes());
        out[SPECIES_OFFSET..SPECIES_OFFSET + 4].copy_from_slice(&self.species.to_le_bytes());
        out[SIZE_OFFSET..SIZE_OFFSET + 4].copy_from_slice(&self.size.to_le_bytes());
    }

    /// Decode a full record from the first [`LIFE_RECORD_STRIDE`] bytes of
    /// `bytes`. Returns `None` if fewer bytes are available.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let record = bytes.get(..LIFE_RECORD_STRIDE)?;
        Some(Self {
            x: read_f32(record, X_OFFSET)?,
            y: read_f32(record, Y_OFFSET)?,
            species: read_u32(record, SPECIES_OFFSET)?,
            size: read_u32(record, SIZE_OFFSET)?,
        })
    }

    /// The species, if the tag is known.
    pub fn species(&self) -> Option<Species> {
        Species::from_tag(self.species)
    }
}

/// Read only the `(x, y)` position of the record at the start of `bytes`.
///
/// This is the hot-path decoder used by renderers: it touches the two
/// coordinate fields and nothing else.
pub fn read_position(bytes: &[u8]) -> Option<(f32, f32)> {
    let record = bytes.get(..LIFE_RECORD_STRIDE)?;
    Some((read_f32(record, X_OFFSET)?, read_f32(record, Y_OFFSET)?))
}

fn read_f32(bytes: &[u8], offset: usize) -> Option<f32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(f32::from_le_bytes(raw))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}
