//! Artlife Universe -- the simulation side of the render bridge.
//!
//! A universe owns a bounded rectangular field and a population of lives.
//! The renderer never sees lives as Rust values: it reads a flat entity
//! buffer of fixed-stride records (see [`record`]) out of the universe's raw
//! memory region, located each frame by [`Universe::entity_buffer_ptr`] and
//! [`Universe::entity_count`].
//!
//! # Contracts
//!
//! - **[`Universe`]**: read-only queries the render core depends on.
//! - **[`Steppable`]**: advancing the simulation. Only hosts call this; the
//!   render core never ticks a universe.
//!
//! # Implementations
//!
//! - [`NativeUniverse`](native::NativeUniverse): the reference engine, with
//!   seeded wandering lives stored in a relocating byte arena.
//! - `artlife-wasm-host` provides a universe backed by the linear memory of
//!   a sandboxed WASM module.
//!
//! # Example
//!
//! ```
//! use artlife_universe::prelude::*;
//!
//! let mut universe = NativeUniverse::new(100, 100, 7);
//! universe.birth(Species::Plant, 3).unwrap();
//!
//! assert_eq!(universe.entity_count().unwrap(), 3);
//! universe.step().unwrap();
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod native;
pub mod record;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by universe queries and simulation steps.
#[derive(Debug, thiserror::Error)]
pub enum UniverseError {
    /// A query against the simulation engine failed (e.g. the engine trapped).
    #[error("universe query '{query}' failed: {reason}")]
    Query {
        /// Name of the failed query (`"width"`, `"lives"`, ...).
        query: &'static str,
        /// Engine-specific failure description.
        reason: String,
    },

    /// A query returned a value that cannot describe the field or buffer
    /// (e.g. a negative pointer from a WASM export).
    #[error("universe query '{query}' returned invalid value {value}")]
    InvalidValue {
        /// Name of the query.
        query: &'static str,
        /// The raw value the engine returned.
        value: i64,
    },

    /// The field cannot hold a life of the given size.
    #[error("field {width}x{height} is too small for lives of size {size}")]
    FieldTooSmall {
        /// Field width in simulation units.
        width: u32,
        /// Field height in simulation units.
        height: u32,
        /// Life diameter in simulation units.
        size: u32,
    },

    /// The field is wider or taller than positions can track to the unit.
    #[error("field {width}x{height} exceeds the maximum extent of {max} units")]
    FieldTooLarge {
        /// Field width in simulation units.
        width: u32,
        /// Field height in simulation units.
        height: u32,
        /// Largest supported width or height.
        max: u32,
    },

    /// Advancing the simulation failed.
    #[error("simulation step failed: {0}")]
    Step(String),
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Read-only view of a simulation engine, as consumed by the render core.
///
/// Queries take `&mut self` because some engines (a WASM instance, for one)
/// need mutable access to their store to answer. None of them may change
/// the simulation state.
///
/// [`entity_buffer_ptr`](Self::entity_buffer_ptr) and
/// [`entity_count`](Self::entity_count) may change between any two steps.
/// Callers must re-read both and re-slice [`memory`](Self::memory) every
/// time they want to look at the population.
pub trait Universe {
    /// Field width in simulation units. Constant for the session.
    fn width(&mut self) -> Result<u32, UniverseError>;

    /// Field height in simulation units. Constant for the session.
    fn height(&mut self) -> Result<u32, UniverseError>;

    /// Number of valid records in the current entity buffer.
    fn entity_count(&mut self) -> Result<usize, UniverseError>;

    /// Byte offset of the current entity buffer within [`memory`](Self::memory).
    fn entity_buffer_ptr(&mut self) -> Result<usize, UniverseError>;

    /// The raw memory region holding the entity buffer.
    ///
    /// The returned slice is only meaningful until the next step; its base
    /// address may move whenever the engine reallocates.
    fn memory(&self) -> &[u8];
}

/// A simulation that can be advanced one tick at a time.
pub trait Steppable {
    /// Advance the simulation by one tick.
    fn step(&mut self) -> Result<(), UniverseError>;
}

impl<U: Universe + ?Sized> Universe for &mut U {
    fn width(&mut self) -> Result<u32, UniverseError> {
        (**self).width()
    }

    fn height(&mut self) -> Result<u32, UniverseError> {
        (**self).height()
    }

    fn entity_count(&mut self) -> Result<usize, UniverseError> {
        (**self).entity_count()
    }

    fn entity_buffer_ptr(&mut self) -> Result<usize, UniverseError> {
        (**self).entity_buffer_ptr()
    }

    fn memory(&self) -> &[u8] {
        (**self).memory()
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common universe usage.
pub mod prelude {
    pub use crate::config::UniverseConfig;
    pub use crate::native::{Direction, Field, NativeUniverse};
    pub use crate::record::{LifeRecord, Species, DEFAULT_LIFE_SIZE, LIFE_RECORD_STRIDE};
    pub use crate::{Steppable, Universe, UniverseError};
}
