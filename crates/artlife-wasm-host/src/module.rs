//! WASM universe loading, validation, and execution.
//!
//! [`WasmUniverse`] wraps a Wasmtime instance of a universe module. It
//! checks the required exports before instantiation, meters every call with
//! fuel, and caps linear memory growth.
//!
//! The universe's memory is the module's exported linear memory. It is
//! looked up through the store on every [`memory`](Universe::memory) call, so
//! after a `memory.grow` the renderer sees the grown region, not a stale
//! slice.

use artlife_universe::{Steppable, Universe, UniverseError};
use wasmtime::{
    Engine, ExternType, Instance, Linker, Memory, Module, Store, StoreLimits, StoreLimitsBuilder,
    TypedFunc, WasmParams, WasmResults,
};

use crate::WasmError;

/// Bytes per WASM page.
const WASM_PAGE_BYTES: u64 = 64 * 1024;

/// Exports every universe module must provide.
pub const REQUIRED_EXPORTS: [&str; 6] = ["memory", "width", "height", "lives", "lives_size", "tick"];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the WASM sandbox.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WasmConfig {
    /// Fuel units granted per export call. When fuel runs out, execution
    /// traps with [`WasmError::OutOfFuel`]. Default: 1,000,000.
    pub fuel_per_call: u64,

    /// Maximum linear memory the module may hold, in bytes. Growth past it
    /// makes `memory.grow` return -1. Default: 16 MiB.
    pub memory_limit_bytes: usize,
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            fuel_per_call: 1_000_000,
            memory_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

impl WasmConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// WasmUniverse
// ---------------------------------------------------------------------------

/// Store data: just the resource limits.
struct SandboxState {
    limits: StoreLimits,
}

/// Typed handles to the query exports, resolved once at load.
struct UniverseExports {
    width: TypedFunc<(), i32>,
    height: TypedFunc<(), i32>,
    lives: TypedFunc<(), i32>,
    lives_size: TypedFunc<(), i32>,
    tick: TypedFunc<(), ()>,
}

/// A universe running inside a WASM sandbox.
///
/// # Sandbox Guarantees
///
/// - No WASI and no host imports: any import fails instantiation.
/// - Every export call runs on a fresh fuel budget.
/// - Linear memory is capped at [`WasmConfig::memory_limit_bytes`].
pub struct WasmUniverse {
    store: Store<SandboxState>,
    instance: Instance,
    memory: Memory,
    exports: UniverseExports,
    config: WasmConfig,
    last_fuel_consumed: u64,
}

impl WasmUniverse {
    /// Load and instantiate a universe module from raw bytes.
    ///
    /// The bytes may be either a binary `.wasm` file or a text `.wat` file.
    ///
    /// # Errors
    ///
    /// - [`WasmError::CompileError`] if the bytes are not valid WASM/WAT.
    /// - [`WasmError::MissingExport`] if a [required export](REQUIRED_EXPORTS)
    ///   is absent.
    /// - [`WasmError::MemoryLimitExceeded`] if the module's initial memory is
    ///   already over the limit.
    /// - [`WasmError::Runtime`] if instantiation fails or an export has the
    ///   wrong signature.
    pub fn from_bytes(config: &WasmConfig, bytes: &[u8]) -> Result<Self, WasmError> {
        let mut engine_config = wasmtime::Config::new();
        engine_config.consume_fuel(true);

        let engine = Engine::new(&engine_config)
            .map_err(|e| WasmError::Runtime(format!("failed to create Wasmtime engine: {e}")))?;

        let module =
            Module::new(&engine, bytes).map_err(|e| WasmError::CompileError(format!("{e}")))?;

        // Check exports before instantiation so a missing one is reported by
        // name instead of as a generic failure.
        for name in REQUIRED_EXPORTS {
            if !module.exports().any(|export| export.name() == name) {
                return Err(WasmError::MissingExport {
                    name: name.to_owned(),
                });
            }
        }
        let initial_bytes = module
            .exports()
            .find_map(|export| match export.ty() {
                ExternType::Memory(ty) if export.name() == "memory" => {
                    Some(ty.minimum().saturating_mul(WASM_PAGE_BYTES))
                }
                _ => None,
            })
            .unwrap_or(0);
        if initial_bytes > config.memory_limit_bytes as u64 {
            return Err(WasmError::MemoryLimitExceeded {
                limit_bytes: config.memory_limit_bytes,
            });
        }

        let limits = StoreLimitsBuilder::new()
            .memory_size(config.memory_limit_bytes)
            .build();
        let mut store = Store::new(&engine, SandboxState { limits });
        store.limiter(|state| &mut state.limits);
        store
            .set_fuel(config.fuel_per_call)
            .map_err(|e| WasmError::Runtime(format!("failed to set fuel: {e}")))?;

        // Empty linker: the sandbox offers no host functions.
        let linker = Linker::new(&engine);
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| WasmError::Runtime(format!("{e}")))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| WasmError::MissingExport {
                name: "memory".to_owned(),
            })?;

        let exports = UniverseExports {
            width: typed_query(&instance, &mut store, "width")?,
            height: typed_query(&instance, &mut store, "height")?,
            lives: typed_query(&instance, &mut store, "lives")?,
            lives_size: typed_query(&instance, &mut store, "lives_size")?,
            tick: instance
                .get_typed_func::<(), ()>(&mut store, "tick")
                .map_err(|e| WasmError::Runtime(format!("failed to resolve tick(): {e}")))?,
        };

        tracing::debug!(
            fuel_per_call = config.fuel_per_call,
            memory_limit = config.memory_limit_bytes,
            memory_bytes = memory.data_size(&store),
            "WASM universe loaded and instantiated"
        );

        Ok(Self {
            store,
            instance,
            memory,
            exports,
            config: config.clone(),
            last_fuel_consumed: 0,
        })
    }

    /// Advance the universe by calling its `tick()` export.
    ///
    /// Returns the fuel consumed.
    ///
    /// # Errors
    ///
    /// - [`WasmError::OutOfFuel`] if the tick exhausts its budget.
    /// - [`WasmError::Trap`] if the tick traps.
    pub fn call_tick(&mut self) -> Result<u64, WasmError> {
        self.call("tick", self.exports.tick.clone(), ())?;
        tracing::trace!(fuel_consumed = self.last_fuel_consumed, "tick() completed");
        Ok(self.last_fuel_consumed)
    }

    /// Call any export that takes no arguments and returns an `i32`.
    ///
    /// # Errors
    ///
    /// - [`WasmError::Runtime`] if the export does not exist or has the
    ///   wrong signature.
    /// - [`WasmError::Trap`] or [`WasmError::OutOfFuel`] on execution failure.
    pub fn call_i32_export(&mut self, name: &str) -> Result<i32, WasmError> {
        let func = self
            .instance
            .get_typed_func::<(), i32>(&mut self.store, name)
            .map_err(|e| WasmError::Runtime(format!("failed to resolve export '{name}': {e}")))?;
        self.call(name, func, ())
    }

    /// Fuel consumed by the most recent export call.
    pub fn last_fuel_consumed(&self) -> u64 {
        self.last_fuel_consumed
    }

    /// Current size of the module's linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Returns the configuration used to create this universe.
    pub fn config(&self) -> &WasmConfig {
        &self.config
    }

    // -- Internal helpers ---------------------------------------------------

    /// Call `func` on a fresh fuel budget and record what it consumed.
    fn call<P, R>(&mut self, name: &str, func: TypedFunc<P, R>, params: P) -> Result<R, WasmError>
    where
        P: WasmParams,
        R: WasmResults,
    {
        self.store
            .set_fuel(self.config.fuel_per_call)
            .map_err(|e| WasmError::Runtime(format!("failed to set fuel: {e}")))?;

        let result = func.call(&mut self.store, params);

        let remaining = self.store.get_fuel().unwrap_or(0);
        self.last_fuel_consumed = self.config.fuel_per_call.saturating_sub(remaining);

        result.map_err(|e| {
            let error = self.classify_trap(e);
            tracing::debug!(export = name, error = %error, "WASM export call failed");
            error
        })
    }

    /// Query an `i32` export and convert it to an unsigned value.
    fn query<T: TryFrom<i32>>(
        &mut self,
        query: &'static str,
        func: TypedFunc<(), i32>,
    ) -> Result<T, UniverseError> {
        let raw = self
            .call(query, func, ())
            .map_err(|e| e.into_query_error(query))?;
        T::try_from(raw).map_err(|_| UniverseError::InvalidValue {
            query,
            value: i64::from(raw),
        })
    }

    /// Classify a Wasmtime error into the appropriate [`WasmError`] variant.
    fn classify_trap(&self, error: anyhow::Error) -> WasmError {
        let trap = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<wasmtime::Trap>())
            .copied();
        match trap {
            Some(wasmtime::Trap::OutOfFuel) => WasmError::OutOfFuel {
                budget: self.config.fuel_per_call,
            },
            Some(_) => WasmError::Trap(format!("{error}")),
            None => WasmError::Runtime(format!("{error}")),
        }
    }
}

fn typed_query(
    instance: &Instance,
    store: &mut Store<SandboxState>,
    name: &str,
) -> Result<TypedFunc<(), i32>, WasmError> {
    instance
        .get_typed_func::<(), i32>(store, name)
        .map_err(|e| WasmError::Runtime(format!("export '{name}' must be () -> i32: {e}")))
}

impl Universe for WasmUniverse {
    fn width(&mut self) -> Result<u32, UniverseError> {
        self.query("width", self.exports.width.clone())
    }

    fn height(&mut self) -> Result<u32, UniverseError> {
        self.query("height", self.exports.height.clone())
    }

    fn entity_count(&mut self) -> Result<usize, UniverseError> {
        self.query("lives_size", self.exports.lives_size.clone())
    }

    fn entity_buffer_ptr(&mut self) -> Result<usize, UniverseError> {
        self.query("lives", self.exports.lives.clone())
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }
}

impl Steppable for WasmUniverse {
    fn step(&mut self) -> Result<(), UniverseError> {
        self.call_tick()
            .map(|_| ())
            .map_err(|e| UniverseError::Step(e.to_string()))
    }
}

impl std::fmt::Debug for WasmUniverse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmUniverse")
            .field("config", &self.config)
            .field("memory_size", &self.memory_size())
            .field("last_fuel_consumed", &self.last_fuel_consumed)
            .finish_non_exhaustive()
    }
}
