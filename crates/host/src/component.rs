use crate::host_ctx::HostCtx;
use crate::marshal::{self, EntryPoint};
use crate::{HostError, KERNEL_IFC_FQN};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, trace};
use wasmtime::component::{Component, ComponentExportIndex, Func, InstancePre, Linker, Val};
use wasmtime::{Engine, Store};

#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceConfig {
    /// Forward the guest's stderr to the host's stderr.
    pub forward_stderr: bool,
}

#[derive(Clone)]
struct ExportIndices {
    fib: ComponentExportIndex,
    test: ComponentExportIndex,
}

impl ExportIndices {
    fn resolve(component: &Component) -> Result<Self, HostError> {
        let ifc = component
            .get_export_index(None, KERNEL_IFC_FQN)
            .ok_or_else(|| HostError::ExportNotFound(KERNEL_IFC_FQN.to_string()))?;
        let func = |entry_point: EntryPoint| {
            component
                .get_export_index(Some(&ifc), entry_point.function_name())
                .ok_or_else(|| {
                    HostError::ExportNotFound(format!("{KERNEL_IFC_FQN}.{entry_point}"))
                })
        };
        Ok(Self {
            fib: func(EntryPoint::Fib)?,
            test: func(EntryPoint::Test)?,
        })
    }
}

/// Compiled and linked kernel component, ready to be instantiated.
#[derive(Clone)]
pub struct KernelComponent {
    engine: Arc<Engine>,
    instance_pre: InstancePre<HostCtx>,
    exports: ExportIndices,
    config: InstanceConfig,
}

impl KernelComponent {
    #[instrument(skip_all, fields(wasm_path = ?wasm_path.as_ref()), err)]
    pub fn new(
        wasm_path: impl AsRef<Path>,
        engine: Arc<Engine>,
        config: InstanceConfig,
    ) -> Result<Self, HostError> {
        let component = Component::from_file(&engine, wasm_path.as_ref())
            .map_err(HostError::CannotReadComponent)?;
        let mut linker = Linker::new(&engine);
        wasmtime_wasi::p2::add_to_linker_async(&mut linker).map_err(|err| {
            HostError::LinkingError {
                context: "linking `wasmtime_wasi`",
                err,
            }
        })?;
        // Attempt to pre-instantiate to catch missing imports
        let instance_pre = linker
            .instantiate_pre(&component)
            .map_err(|err| HostError::LinkingError {
                context: "linking the kernel component",
                err,
            })?;
        let exports = ExportIndices::resolve(&component)?;
        debug!("Resolved exports of `{KERNEL_IFC_FQN}`");
        Ok(Self {
            engine,
            instance_pre,
            exports,
            config,
        })
    }

    /// Create a new instance with its own store.
    pub async fn instantiate(&self) -> Result<KernelInstance, HostError> {
        let mut store = Store::new(&self.engine, HostCtx::new(self.config.forward_stderr));
        let instance = self
            .instance_pre
            .instantiate_async(&mut store)
            .await
            .map_err(HostError::Instantiation)?;
        let mut get_func = |index: &ComponentExportIndex| {
            instance
                .get_func(&mut store, index)
                .ok_or_else(|| HostError::ExportNotFound(KERNEL_IFC_FQN.to_string()))
        };
        let fib = get_func(&self.exports.fib)?;
        let test = get_func(&self.exports.test)?;
        trace!("Instantiated");
        Ok(KernelInstance { store, fib, test })
    }
}

/// A live instance of the kernel component.
///
/// Calls are sequential. After an error for which
/// [`HostError::poisons_instance`] is `true` the instance must be dropped.
pub struct KernelInstance {
    store: Store<HostCtx>,
    fib: Func,
    test: Func,
}

impl KernelInstance {
    pub async fn fib(&mut self, n: u32) -> Result<i64, HostError> {
        self.call(EntryPoint::Fib, &[Val::U32(n)]).await
    }

    pub async fn test(&mut self, n: u32, count: u32) -> Result<i64, HostError> {
        self.call(EntryPoint::Test, &[Val::U32(n), Val::U32(count)])
            .await
    }

    /// Marshal `params` and call `entry_point`.
    pub async fn call_json(
        &mut self,
        entry_point: EntryPoint,
        params: &[Value],
    ) -> Result<i64, HostError> {
        let params = marshal::params_from_json(entry_point, params)?;
        self.call(entry_point, &params).await
    }

    #[instrument(skip_all, fields(entry_point = %entry_point), err)]
    pub async fn call(
        &mut self,
        entry_point: EntryPoint,
        params: &[Val],
    ) -> Result<i64, HostError> {
        trace!(?params, "Calling");
        let func = match entry_point {
            EntryPoint::Fib => self.fib,
            EntryPoint::Test => self.test,
        };
        let mut results = [Val::Bool(false)];
        func.call_async(&mut self.store, params, &mut results)
            .await
            .map_err(HostError::Call)?;
        // post_return is only called if `call` succeeds, after the return value has been processed.
        func.post_return_async(&mut self.store)
            .await
            .map_err(HostError::Call)?;
        match results {
            [Val::S64(value)] => {
                trace!(value, "Finished");
                Ok(value)
            }
            [other] => Err(HostError::UnexpectedReturn {
                entry_point,
                value: format!("{other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InstanceConfig, KernelComponent};
    use crate::HostError;
    use crate::engine::{EngineOptions, new_engine};
    use crate::marshal::{EntryPoint, ParamsError};
    use assert_matches::assert_matches;
    use serde_json::json;
    use wasmtime::component::Val;

    fn kernel_component() -> KernelComponent {
        test_utils::set_up();
        let engine = new_engine(EngineOptions::default()).unwrap();
        KernelComponent::new(
            fibench_component_builder::FIBENCH_COMPONENT,
            engine,
            InstanceConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fib_export_matches_native_kernel() {
        let component = kernel_component();
        let mut instance = component.instantiate().await.unwrap();
        for n in [0, 1, 2, 3, 7, 10, 20, 50, 92, 93, 1_000] {
            assert_eq!(kernel::fib(n), instance.fib(n).await.unwrap(), "n = {n}");
        }
    }

    #[tokio::test]
    async fn test_export_returns_last_result() {
        let component = kernel_component();
        let mut instance = component.instantiate().await.unwrap();
        assert_eq!(55, instance.test(10, 1).await.unwrap());
        assert_eq!(55, instance.test(10, 1_000).await.unwrap());
        assert_eq!(0, instance.test(10, 0).await.unwrap());
        assert_eq!(0, instance.test(0, 5).await.unwrap());
    }

    #[tokio::test]
    async fn instances_are_independent() {
        let component = kernel_component();
        let mut first = component.instantiate().await.unwrap();
        let mut second = component.instantiate().await.unwrap();
        assert_eq!(6765, first.fib(20).await.unwrap());
        assert_eq!(6765, second.fib(20).await.unwrap());
        assert_eq!(6765, first.fib(20).await.unwrap());
    }

    #[tokio::test]
    async fn json_params_are_marshalled() {
        let component = kernel_component();
        let mut instance = component.instantiate().await.unwrap();
        assert_eq!(
            8,
            instance
                .call_json(EntryPoint::Test, &[json!(6), json!(3)])
                .await
                .unwrap()
        );
        let err = instance
            .call_json(EntryPoint::Fib, &[json!(-1)])
            .await
            .unwrap_err();
        assert_matches!(
            err,
            HostError::Params(ParamsError::ParameterError { idx: 0, .. })
        );
        assert!(!err.poisons_instance());
        let err = instance
            .call_json(EntryPoint::Test, &[json!(6)])
            .await
            .unwrap_err();
        assert_matches!(err, HostError::Params(ParamsError::ArityMismatch { .. }));
        // Marshalling errors never reach the guest.
        assert_eq!(13, instance.fib(7).await.unwrap());
    }

    #[tokio::test]
    async fn mistyped_values_are_rejected_by_wasmtime() {
        let component = kernel_component();
        let mut instance = component.instantiate().await.unwrap();
        let err = instance
            .call(EntryPoint::Fib, &[Val::String("10".to_string())])
            .await
            .unwrap_err();
        assert_matches!(err, HostError::Call(_));
        // Type faults are treated like traps.
        assert!(err.poisons_instance());
    }

    #[test]
    fn missing_file_cannot_be_read() {
        test_utils::set_up();
        let engine = new_engine(EngineOptions::default()).unwrap();
        let err = KernelComponent::new(
            "does-not-exist.wasm",
            engine,
            InstanceConfig::default(),
        )
        .err()
        .unwrap();
        assert_matches!(err, HostError::CannotReadComponent(_));
    }
}
