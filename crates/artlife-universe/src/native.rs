//! Reference simulation engine.
//!
//! [`NativeUniverse`] keeps its lives as packed records inside a byte arena,
//! exactly as a guest allocator would lay them out in shared memory. The
//! entity buffer is reserved with spare capacity; when a birth outgrows it,
//! the whole buffer moves to a different region of the arena. Renderers that
//! cached the old pointer would read zeroed memory, which is the point: the
//! pointer must be re-read every frame.
//!
//! Lives wander: each step a life may pick a new heading (or stop), then
//! advances one unit if it stays clear of the field edge.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::record::{LifeRecord, Species, DEFAULT_LIFE_SIZE, LIFE_RECORD_STRIDE};
use crate::{Steppable, Universe, UniverseError};

/// Bytes reserved at the start of the arena for non-entity state. Keeps the
/// entity buffer away from offset zero.
const HEADER_BYTES: usize = 64;

/// Records reserved for a new universe's entity buffer.
const INITIAL_CAPACITY: usize = 16;

/// Distance a life moves per step.
const STEP_DISTANCE: f32 = 1.0;

/// Chance per step that a life reconsiders its heading.
const TURN_PROBABILITY: f64 = 0.1;

/// Largest field width or height. Positions are `f32`, which holds every
/// integer up to 2^24 exactly; past that a unit step is lost to rounding.
pub const MAX_FIELD_EXTENT: u32 = 1 << 24;

// ---------------------------------------------------------------------------
// Field / Direction
// ---------------------------------------------------------------------------

/// The bounded rectangle lives move within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Width in simulation units.
    pub width: u32,
    /// Height in simulation units.
    pub height: u32,
}

impl Field {
    /// Check that positions on this field can move by whole units.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError::FieldTooLarge`] if either side exceeds
    /// [`MAX_FIELD_EXTENT`].
    pub fn check_extent(&self) -> Result<(), UniverseError> {
        if self.width > MAX_FIELD_EXTENT || self.height > MAX_FIELD_EXTENT {
            return Err(UniverseError::FieldTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_FIELD_EXTENT,
            });
        }
        Ok(())
    }
}

/// Heading of a moving life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards y = 0.
    North,
    /// Towards x = width.
    East,
    /// Towards y = height.
    South,
    /// Towards x = 0.
    West,
}

impl Direction {
    fn random(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..4) {
            0 => Direction::North,
            1 => Direction::East,
            2 => Direction::South,
            _ => Direction::West,
        }
    }
}

// ---------------------------------------------------------------------------
// NativeUniverse
// ---------------------------------------------------------------------------

/// In-process universe with a relocating entity buffer.
pub struct NativeUniverse {
    field: Field,
    /// The raw memory region. Holds the header and the entity buffer.
    arena: Vec<u8>,
    /// Byte offset of the entity buffer in `arena`.
    lives_offset: usize,
    /// Records reserved at `lives_offset`.
    capacity: usize,
    /// Per-life heading; index-aligned with the records.
    directions: Vec<Option<Direction>>,
    rng: Pcg32,
    relocations: u64,
}

impl NativeUniverse {
    /// Create an empty universe on a `width` x `height` field.
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        Self {
            field: Field { width, height },
            arena: vec![0; HEADER_BYTES + INITIAL_CAPACITY * LIFE_RECORD_STRIDE],
            lives_offset: HEADER_BYTES,
            capacity: INITIAL_CAPACITY,
            directions: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            relocations: 0,
        }
    }

    /// The field.
    pub fn field(&self) -> Field {
        self.field
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    /// Whether there are no lives.
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Records that fit in the current entity buffer before it relocates.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many times the entity buffer has moved.
    pub fn relocations(&self) -> u64 {
        self.relocations
    }

    /// Decode the record of life `index`.
    pub fn life(&self, index: usize) -> Option<LifeRecord> {
        if index >= self.len() {
            return None;
        }
        LifeRecord::decode(&self.arena[self.slot(index)..])
    }

    /// Decode every live record, in buffer order.
    pub fn lives(&self) -> impl Iterator<Item = LifeRecord> + '_ {
        (0..self.len()).filter_map(move |i| self.life(i))
    }

    /// Heading of life `index`, if it has one.
    pub fn direction(&self, index: usize) -> Option<Direction> {
        self.directions.get(index).copied().flatten()
    }

    /// Spawn `count` lives of `species` at uniformly random positions that
    /// keep each life fully inside the field.
    ///
    /// # Errors
    ///
    /// Returns [`UniverseError::FieldTooLarge`] if the field exceeds
    /// [`MAX_FIELD_EXTENT`], or [`UniverseError::FieldTooSmall`] if no
    /// position satisfies that constraint.
    pub fn birth(&mut self, species: Species, count: u32) -> Result<(), UniverseError> {
        self.field.check_extent()?;
        let half = half_size(DEFAULT_LIFE_SIZE);
        let Field { width, height } = self.field;
        if width <= 2 * half || height <= 2 * half {
            return Err(UniverseError::FieldTooSmall {
                width,
                height,
                size: DEFAULT_LIFE_SIZE,
            });
        }

        self.reserve(self.len() + count as usize);

        for _ in 0..count {
            let x = self.rng.gen_range(half..width - half);
            let y = self.rng.gen_range(half..height - half);
            let index = self.len();
            self.directions.push(None);
            self.write(index, &LifeRecord::new(species, x as f32, y as f32));
        }

        tracing::debug!(?species, count, lives = self.len(), "lives born");
        Ok(())
    }

    /// Advance every life by one step.
    pub fn next_step(&mut self) {
        for index in 0..self.len() {
            if self.rng.gen_bool(TURN_PROBABILITY) {
                // A change of heading may also be a decision to stand still.
                self.directions[index] = if self.rng.gen_bool(0.5) {
                    Some(Direction::random(&mut self.rng))
                } else {
                    None
                };
            }

            let Some(direction) = self.directions[index] else {
                continue;
            };
            let Some(mut record) = self.life(index) else {
                continue;
            };
            if self.advance(&mut record, direction) {
                self.write(index, &record);
            }
        }
        tracing::trace!(lives = self.len(), "universe stepped");
    }

    /// Move the entity buffer to a different region of the arena without
    /// changing its contents.
    pub fn relocate(&mut self) {
        self.relocate_to(self.capacity);
    }

    // -- internals ----------------------------------------------------------

    /// Move `record` one step towards `direction` if the life stays clear of
    /// the field edge. Returns whether it moved.
    fn advance(&self, record: &mut LifeRecord, direction: Direction) -> bool {
        let half = half_size(record.size) as f32;
        let width = self.field.width as f32;
        let height = self.field.height as f32;

        match direction {
            Direction::North if record.y - half - STEP_DISTANCE > 0.0 => {
                record.y -= STEP_DISTANCE;
            }
            Direction::East if record.x + half + STEP_DISTANCE < width => {
                record.x += STEP_DISTANCE;
            }
            Direction::South if record.y + half + STEP_DISTANCE < height => {
                record.y += STEP_DISTANCE;
            }
            Direction::West if record.x - half - STEP_DISTANCE > 0.0 => {
                record.x -= STEP_DISTANCE;
            }
            _ => return false,
        }
        true
    }

    fn slot(&self, index: usize) -> usize {
        self.lives_offset + index * LIFE_RECORD_STRIDE
    }

    fn write(&mut self, index: usize, record: &LifeRecord) {
        let start = self.slot(index);
        record.encode_into(&mut self.arena[start..start + LIFE_RECORD_STRIDE]);
    }

    fn reserve(&mut self, needed: usize) {
        if needed > self.capacity {
            self.relocate_to(needed.max(self.capacity * 2));
        }
    }

    /// Move the entity buffer to a fresh region holding `capacity` records.
    ///
    /// The new region goes right after the header when it fits below the
    /// current one, otherwise right after the current one. The old region is
    /// either truncated away or zeroed.
    fn relocate_to(&mut self, capacity: usize) {
        let old_offset = self.lives_offset;
        let old_bytes = self.capacity * LIFE_RECORD_STRIDE;
        let used = self.len() * LIFE_RECORD_STRIDE;
        let new_bytes = capacity * LIFE_RECORD_STRIDE;

        let moving_low = HEADER_BYTES + new_bytes <= old_offset;
        let new_offset = if moving_low {
            HEADER_BYTES
        } else {
            align_up(old_offset + old_bytes, LIFE_RECORD_STRIDE)
        };

        if self.arena.len() < new_offset + new_bytes {
            self.arena.resize(new_offset + new_bytes, 0);
        }
        self.arena
            .copy_within(old_offset..old_offset + used, new_offset);

        if moving_low {
            self.arena.truncate(new_offset + new_bytes);
        } else {
            self.arena[old_offset..old_offset + old_bytes].fill(0);
        }

        self.lives_offset = new_offset;
        self.capacity = capacity;
        self.relocations += 1;

        tracing::debug!(
            from = old_offset,
            to = new_offset,
            capacity,
            arena_bytes = self.arena.len(),
            "entity buffer relocated"
        );
    }
}

impl Universe for NativeUniverse {
    fn width(&mut self) -> Result<u32, UniverseError> {
        Ok(self.field.width)
    }

    fn height(&mut self) -> Result<u32, UniverseError> {
        Ok(self.field.height)
    }

    fn entity_count(&mut self) -> Result<usize, UniverseError> {
        Ok(self.len())
    }

    fn entity_buffer_ptr(&mut self) -> Result<usize, UniverseError> {
        Ok(self.lives_offset)
    }

    fn memory(&self) -> &[u8] {
        &self.arena
    }
}

impl Steppable for NativeUniverse {
    fn step(&mut self) -> Result<(), UniverseError> {
        self.next_step();
        Ok(())
    }
}

impl std::fmt::Debug for NativeUniverse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeUniverse")
            .field("field", &self.field)
            .field("lives", &self.len())
            .field("lives_offset", &self.lives_offset)
            .field("capacity", &self.capacity)
            .field("relocations", &self.relocations)
            .finish_non_exhaustive()
    }
}

fn half_size(size: u32) -> u32 {
    size.div_ceil(2)
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_bounds(universe: &NativeUniverse) -> bool {
        let Field { width, height } = universe.field();
        universe.lives().all(|life| {
            let half = half_size(life.size) as f32;
            life.x - half >= 0.0
                && life.y - half >= 0.0
                && life.x + half <= width as f32
                && life.y + half <= height as f32
        })
    }

    #[test]
    fn new_universe_is_empty() {
        let mut universe = NativeUniverse::new(100, 50, 0);
        assert!(universe.is_empty());
        assert_eq!(universe.entity_count().unwrap(), 0);
        assert_eq!(universe.entity_buffer_ptr().unwrap(), HEADER_BYTES);
        assert_eq!(universe.width().unwrap(), 100);
        assert_eq!(universe.height().unwrap(), 50);
    }

    #[test]
    fn field_past_f32_precision_is_rejected() {
        let mut universe = NativeUniverse::new(MAX_FIELD_EXTENT + 1, 100, 0);
        assert!(matches!(
            universe.birth(Species::Plant, 1),
            Err(UniverseError::FieldTooLarge { max: MAX_FIELD_EXTENT, .. })
        ));
        assert!(universe.is_empty());
    }

    #[test]
    fn lives_at_the_largest_field_still_step() {
        let mut universe = NativeUniverse::new(MAX_FIELD_EXTENT, MAX_FIELD_EXTENT, 2);
        universe.birth(Species::Carnivore, 20).unwrap();
        let before: Vec<_> = universe.lives().collect();
        for _ in 0..50 {
            universe.next_step();
        }
        let moved = universe
            .lives()
            .zip(&before)
            .any(|(after, before)| (after.x, after.y) != (before.x, before.y));
        assert!(moved, "unit steps must survive at the maximum extent");
    }

    #[test]
    fn lives_without_heading_stay_put() {
        let mut universe = NativeUniverse::new(300, 300, 17);
        universe.birth(Species::Herbivore, 40).unwrap();
        assert!((0..universe.len()).all(|i| universe.direction(i).is_none()));

        for _ in 0..100 {
            let before: Vec<_> = universe.lives().collect();
            universe.next_step();
            for (i, (after, before)) in universe.lives().zip(&before).enumerate() {
                if universe.direction(i).is_none() {
                    assert_eq!((after.x, after.y), (before.x, before.y), "life {i} moved");
                }
            }
        }
        assert!((0..universe.len()).any(|i| universe.direction(i).is_some()));
    }

    #[test]
    fn birth_places_lives_inside_field() {
        let mut universe = NativeUniverse::new(40, 30, 3);
        universe.birth(Species::Plant, 50).unwrap();
        assert_eq!(universe.len(), 50);
        assert!(in_bounds(&universe));
        assert!(universe
            .lives()
            .all(|life| life.species() == Some(Species::Plant)));
    }

    #[test]
    fn birth_beyond_capacity_relocates_buffer() {
        let mut universe = NativeUniverse::new(200, 200, 9);
        universe.birth(Species::Herbivore, 4).unwrap();
        let before_ptr = universe.entity_buffer_ptr().unwrap();
        let before: Vec<_> = universe.lives().collect();

        universe
            .birth(Species::Carnivore, INITIAL_CAPACITY as u32)
            .unwrap();

        assert_eq!(universe.relocations(), 1);
        assert_ne!(universe.entity_buffer_ptr().unwrap(), before_ptr);
        let after: Vec<_> = universe.lives().take(4).collect();
        assert_eq!(before, after, "relocation must preserve existing records");
    }

    #[test]
    fn relocated_region_is_zeroed() {
        let mut universe = NativeUniverse::new(200, 200, 9);
        universe.birth(Species::Plant, 2).unwrap();
        let old = universe.entity_buffer_ptr().unwrap();
        universe.relocate();

        let memory = universe.memory();
        assert!(
            memory[old..old + 2 * LIFE_RECORD_STRIDE]
                .iter()
                .all(|b| *b == 0),
            "stale region must not keep old records"
        );
    }

    #[test]
    fn repeated_relocation_keeps_arena_bounded() {
        let mut universe = NativeUniverse::new(200, 200, 9);
        universe.birth(Species::Plant, 8).unwrap();
        let mut offsets = Vec::new();
        for _ in 0..6 {
            universe.relocate();
            offsets.push(universe.entity_buffer_ptr().unwrap());
        }
        assert!(
            offsets.windows(2).all(|w| w[0] != w[1]),
            "every relocation moves the buffer: {offsets:?}"
        );
        assert!(
            universe.memory().len() <= HEADER_BYTES + 3 * INITIAL_CAPACITY * LIFE_RECORD_STRIDE,
            "arena grew to {}",
            universe.memory().len()
        );
        assert_eq!(universe.len(), 8);
    }

    #[test]
    fn lives_stay_inside_field_while_stepping() {
        let mut universe = NativeUniverse::new(30, 30, 11);
        universe.birth(Species::Herbivore, 40).unwrap();
        for _ in 0..500 {
            universe.step().unwrap();
        }
        assert!(in_bounds(&universe));
    }

    #[test]
    fn stepping_moves_at_most_one_unit() {
        let mut universe = NativeUniverse::new(300, 300, 5);
        universe.birth(Species::Plant, 30).unwrap();
        for _ in 0..50 {
            let before: Vec<_> = universe.lives().collect();
            universe.step().unwrap();
            for (a, b) in before.iter().zip(universe.lives()) {
                let moved = (a.x - b.x).abs() + (a.y - b.y).abs();
                assert!(moved <= STEP_DISTANCE, "moved {moved}");
            }
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let run = |seed| {
            let mut universe = NativeUniverse::new(120, 90, seed);
            universe.birth(Species::Carnivore, 12).unwrap();
            for _ in 0..100 {
                universe.next_step();
            }
            universe.lives().collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn birth_on_tiny_field_fails() {
        let mut universe = NativeUniverse::new(10, 100, 0);
        let err = universe.birth(Species::Plant, 1).unwrap_err();
        assert!(matches!(
            err,
            UniverseError::FieldTooSmall {
                width: 10,
                height: 100,
                size: DEFAULT_LIFE_SIZE
            }
        ));
        assert!(universe.is_empty());
    }
}
