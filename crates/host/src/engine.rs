use std::{error::Error, sync::Arc};
use tracing::{debug, instrument};
use wasmtime::Engine;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("uncategorized engine creation error - {0}")]
    Uncategorized(Box<dyn Error + Send + Sync>),
}

/// Cranelift optimization level used when compiling the component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl From<OptLevel> for wasmtime::OptLevel {
    fn from(value: OptLevel) -> Self {
        match value {
            OptLevel::None => Self::None,
            OptLevel::Speed => Self::Speed,
            OptLevel::SpeedAndSize => Self::SpeedAndSize,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub opt_level: OptLevel,
    /// Resolve wasm backtraces to function names and offsets.
    pub backtrace_details: bool,
}

#[instrument(skip_all, fields(options = ?options), err)]
pub fn new_engine(options: EngineOptions) -> Result<Arc<Engine>, EngineError> {
    let mut wasmtime_config = wasmtime::Config::new();
    wasmtime_config.wasm_component_model(true);
    wasmtime_config.async_support(true);
    wasmtime_config.cranelift_opt_level(options.opt_level.into());
    wasmtime_config.wasm_backtrace_details(if options.backtrace_details {
        wasmtime::WasmBacktraceDetails::Enable
    } else {
        wasmtime::WasmBacktraceDetails::Disable
    });
    let engine = Engine::new(&wasmtime_config)
        .map(Arc::new)
        .map_err(|err| EngineError::Uncategorized(err.into()))?;
    debug!("Engine created");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::{EngineOptions, OptLevel, new_engine};

    #[rstest::rstest]
    fn engine_is_created_for_every_opt_level(
        #[values(OptLevel::None, OptLevel::Speed, OptLevel::SpeedAndSize)] opt_level: OptLevel,
        #[values(false, true)] backtrace_details: bool,
    ) {
        test_utils::set_up();
        new_engine(EngineOptions {
            opt_level,
            backtrace_details,
        })
        .unwrap();
    }
}
