pub mod component;
pub mod engine;
mod host_ctx;
pub mod marshal;

pub use component::{KernelComponent, KernelInstance};
pub use marshal::EntryPoint;

/// Fully qualified name of the interface exporting the entry points.
pub const KERNEL_IFC_FQN: &str = "fibench:kernel/kernel";

#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error("cannot read WASM file: {0}")]
    CannotReadComponent(wasmtime::Error),
    #[error("linking error - {context}, details: {err}")]
    LinkingError {
        context: &'static str,
        err: wasmtime::Error,
    },
    #[error("cannot instantiate the component: {0}")]
    Instantiation(wasmtime::Error),
    #[error("export not found: `{0}`")]
    ExportNotFound(String),
    #[error(transparent)]
    Params(#[from] marshal::ParamsError),
    #[error("wasm function call error: {0}")]
    Call(wasmtime::Error),
    #[error("`{entry_point}` returned an unexpected value: {value}")]
    UnexpectedReturn {
        entry_point: EntryPoint,
        value: String,
    },
}

impl HostError {
    /// `true` when the instance that produced the error must not be called again.
    ///
    /// Conservative: every [`HostError::Call`] counts, including values that
    /// wasmtime rejects during type checking before the guest is entered.
    /// Marshalling errors from [`marshal`] never poison.
    #[must_use]
    pub fn poisons_instance(&self) -> bool {
        matches!(self, Self::Call(_))
    }
}
