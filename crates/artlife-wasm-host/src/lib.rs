//! Artlife WASM Host -- a universe running inside a Wasmtime sandbox.
//!
//! The renderer reads the population straight out of the module's linear
//! memory. The module tells it where to look: `lives()` returns the byte
//! offset of the entity buffer and `lives_size()` the record count. Records
//! follow the fixed layout in [`artlife_universe::record`].
//!
//! # Module Contract
//!
//! A universe module exports:
//!
//! | export       | signature    | meaning                          |
//! |--------------|--------------|----------------------------------|
//! | `memory`     | memory       | linear memory holding the buffer |
//! | `width`      | `() -> i32`  | field width                      |
//! | `height`     | `() -> i32`  | field height                     |
//! | `lives`      | `() -> i32`  | entity buffer byte offset        |
//! | `lives_size` | `() -> i32`  | number of records                |
//! | `tick`       | `() -> ()`   | advance one step                 |
//!
//! Modules get no imports: no WASI, no host functions. Every call runs on a
//! fresh fuel budget and memory growth is capped (see [`WasmConfig`]).
//!
//! # Example
//!
//! ```no_run
//! use artlife_universe::{Steppable, Universe};
//! use artlife_wasm_host::{WasmConfig, WasmUniverse};
//!
//! let bytes = std::fs::read("universe.wasm").unwrap();
//! let mut universe = WasmUniverse::from_bytes(&WasmConfig::default(), &bytes).unwrap();
//! let lives = universe.entity_count().unwrap();
//! universe.step().unwrap();
//! # let _ = lives;
//! ```

#![deny(unsafe_code)]

mod module;

pub use module::{WasmConfig, WasmUniverse, REQUIRED_EXPORTS};

use artlife_universe::UniverseError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by WASM universe operations.
#[derive(Debug, thiserror::Error)]
pub enum WasmError {
    /// The WASM binary could not be compiled (invalid bytecode or WAT syntax).
    #[error("WASM compilation failed: {0}")]
    CompileError(String),

    /// The module does not export something a universe must provide.
    #[error("missing required export '{name}' -- a universe module must export memory, width, height, lives, lives_size, and tick")]
    MissingExport {
        /// The name of the missing export.
        name: String,
    },

    /// The module exhausted its fuel budget during a call.
    #[error("WASM module ran out of fuel (budget: {budget} units) -- possible infinite loop or excessive computation")]
    OutOfFuel {
        /// The fuel budget that was exceeded.
        budget: u64,
    },

    /// A WASM trap occurred during execution (e.g. unreachable instruction,
    /// out-of-bounds memory access).
    #[error("WASM trap: {0}")]
    Trap(String),

    /// The module's memory is over its limit.
    #[error("WASM module exceeded memory limit of {limit_bytes} bytes")]
    MemoryLimitExceeded {
        /// The configured memory limit in bytes.
        limit_bytes: usize,
    },

    /// A general runtime error from the Wasmtime engine.
    #[error("WASM runtime error: {0}")]
    Runtime(String),
}

impl WasmError {
    /// Report this error as a failed universe query.
    pub fn into_query_error(self, query: &'static str) -> UniverseError {
        UniverseError::Query {
            query,
            reason: self.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
