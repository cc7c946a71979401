//! WASM runtime implementation using wasmtime.
//!
//! Uses wasmtime-wasi preview1 for the guest's runtime-support imports.

use super::buffer::BufferHandle;
use super::config::{WasiCapabilities, WasmConfig};
use crate::error::{Result, SandboxError};

use std::path::Path;
use std::time::Instant;

use wasmtime::*;

/// Host state for the WASM store, containing WASI preview1 context.
pub(crate) struct WasmHostState {
    preview1: wasmtime_wasi::preview1::WasiP1Ctx,
    limits: StoreLimits,
}

impl WasmHostState {
    /// Get the preview1 context.
    fn preview1(&mut self) -> &mut wasmtime_wasi::preview1::WasiP1Ctx {
        &mut self.preview1
    }
}

/// A WebAssembly sandbox that compiles and instantiates guest modules.
pub struct WasmSandbox {
    engine: Engine,
    config: WasmConfig,
}

/// A compiled WebAssembly module.
pub struct WasmModule {
    module: Module,
    name: String,
}

/// An instantiated WebAssembly module ready for execution.
///
/// Owns its store, instance and linear memory handle for its whole lifetime;
/// all three are dropped together.
pub struct WasmInstance {
    store: Store<WasmHostState>,
    instance: Instance,
    memory: Memory,
    name: String,
    fuel_limit: Option<u64>,
}

/// Result of a WASM function call with timing information.
#[derive(Debug, Clone)]
pub struct WasmCallResult<T> {
    /// The return value
    pub value: T,
    /// Execution time in microseconds
    pub execution_time_us: u64,
    /// Fuel consumed (if fuel metering enabled)
    pub fuel_consumed: Option<u64>,
}

impl WasmSandbox {
    /// Create a new WASM sandbox with the given configuration.
    pub fn new(config: WasmConfig) -> Result<Self> {
        let mut engine_config = Config::new();

        engine_config.cranelift_opt_level(match config.optimization_level {
            0 => OptLevel::None,
            1 | 2 => OptLevel::Speed,
            _ => OptLevel::SpeedAndSize,
        });

        engine_config.wasm_simd(config.enable_simd);

        if config.fuel_limit.is_some() {
            engine_config.consume_fuel(true);
        }

        if let Some(ref cache_path) = config.cache_path {
            if let Err(e) = engine_config.cache_config_load(cache_path) {
                tracing::warn!("Failed to load cache config: {}", e);
            }
        }

        let engine = Engine::new(&engine_config)
            .map_err(|e| SandboxError::Instantiation(format!("engine creation failed: {}", e)))?;

        Ok(Self { engine, config })
    }

    /// Load a WASM module from a file.
    pub fn load_module(&self, path: impl AsRef<Path>) -> Result<WasmModule> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let module = Module::from_file(&self.engine, path)
            .map_err(|e| SandboxError::Instantiation(format!("module load failed: {}", e)))?;

        Ok(WasmModule { module, name })
    }

    /// Load a WASM module from bytes (binary or WAT text).
    pub fn load_module_bytes(&self, name: &str, bytes: &[u8]) -> Result<WasmModule> {
        let module = Module::new(&self.engine, bytes)
            .map_err(|e| SandboxError::Instantiation(format!("module creation failed: {}", e)))?;

        Ok(WasmModule {
            module,
            name: name.to_string(),
        })
    }

    /// Instantiate a module with WASI context.
    ///
    /// If the module is a WASI reactor (exports `_initialize`), the
    /// initializer runs before the instance is handed back.
    pub fn instantiate(&self, module: &WasmModule) -> Result<WasmInstance> {
        let host_state = self.build_host_state(&self.config.capabilities);
        let mut store = Store::new(&self.engine, host_state);

        store.limiter(|state| &mut state.limits);

        // The guest does no I/O, but its runtime imports WASI for clocks and aborts
        let mut linker: Linker<WasmHostState> = Linker::new(&self.engine);
        wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, |state| state.preview1())
            .map_err(|e| SandboxError::Instantiation(format!("WASI link failed: {}", e)))?;

        let instance = linker
            .instantiate(&mut store, &module.module)
            .map_err(|e| SandboxError::Instantiation(format!("instantiation failed: {}", e)))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| SandboxError::MissingExport("memory".to_string()))?;

        let mut wasm_instance = WasmInstance {
            store,
            instance,
            memory,
            name: module.name.clone(),
            fuel_limit: self.config.fuel_limit,
        };

        if module.exports_function("_initialize") {
            wasm_instance
                .call_void("_initialize")
                .map_err(|e| SandboxError::Instantiation(format!("reactor initialization failed: {}", e)))?;
        }

        tracing::info!(
            module = %wasm_instance.name,
            memory_bytes = wasm_instance.memory_size(),
            "guest instantiated"
        );

        Ok(wasm_instance)
    }

    /// Build host state from capabilities.
    fn build_host_state(&self, caps: &WasiCapabilities) -> WasmHostState {
        let mut builder = wasmtime_wasi::WasiCtxBuilder::new();

        if caps.stdout {
            builder.inherit_stdout();
        }
        if caps.stderr {
            builder.inherit_stderr();
        }

        let preview1 = builder.build_p1();

        let limits = StoreLimitsBuilder::new()
            .memory_size(self.config.max_memory)
            .build();

        WasmHostState { preview1, limits }
    }
}

impl WasmModule {
    /// Get the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get exported function names.
    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.module.exports().filter_map(|e| {
            if matches!(e.ty(), ExternType::Func(_)) {
                Some(e.name())
            } else {
                None
            }
        })
    }

    /// Whether the module exports a function with this name.
    pub fn exports_function(&self, name: &str) -> bool {
        self.exports().any(|export| export == name)
    }
}

impl WasmInstance {
    /// Get the module name this instance was created from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call a function that takes no arguments and returns nothing.
    pub fn call_void(&mut self, name: &str) -> Result<WasmCallResult<()>> {
        self.call_typed::<()>(name)
    }

    /// Call a function that takes no arguments and returns an i32.
    pub fn call_i32(&mut self, name: &str) -> Result<WasmCallResult<i32>> {
        self.call_typed::<i32>(name)
    }

    /// Call a function that takes no arguments and returns an i64.
    pub fn call_i64(&mut self, name: &str) -> Result<WasmCallResult<i64>> {
        self.call_typed::<i64>(name)
    }

    fn call_typed<R>(&mut self, name: &str) -> Result<WasmCallResult<R>>
    where
        R: WasmResults,
    {
        let func = self.get_typed_func::<(), R>(name)?;

        // Each call gets the full budget
        if let Some(limit) = self.fuel_limit {
            self.store.set_fuel(limit).map_err(|e| SandboxError::Trap {
                function: name.to_string(),
                message: format!("fuel refill failed: {:#}", e),
            })?;
        }

        let start = Instant::now();

        let value = func.call(&mut self.store, ()).map_err(|e| SandboxError::Trap {
            function: name.to_string(),
            message: format!("{:#}", e),
        })?;

        let fuel_consumed = match self.fuel_limit {
            Some(limit) => self.store.get_fuel().ok().map(|left| limit.saturating_sub(left)),
            None => None,
        };

        Ok(WasmCallResult {
            value,
            execution_time_us: start.elapsed().as_micros() as u64,
            fuel_consumed,
        })
    }

    /// Get a typed function from the instance.
    fn get_typed_func<P, R>(&mut self, name: &str) -> Result<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        self.instance
            .get_typed_func::<P, R>(&mut self.store, name)
            .map_err(|e| SandboxError::MissingExport(format!("function '{}': {}", name, e)))
    }

    /// Current size of linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Copy the bytes a handle describes out of linear memory.
    ///
    /// The whole range is checked against the current memory size first; an
    /// out-of-range handle fails without copying anything.
    pub fn copy_out(&self, handle: BufferHandle) -> Result<Vec<u8>> {
        let data = self.memory.data(&self.store);
        let range = handle.checked_range(data.len())?;
        Ok(data[range].to_vec())
    }

    /// Fuel left over from the last call (if fuel metering enabled).
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }
}
