use wasmtime::component::ResourceTable;
use wasmtime_wasi::p2::{IoView, WasiCtx, WasiCtxBuilder, WasiView};

/// Store data of a kernel instance. The guest only needs the WASI imports
/// pulled in by its standard library.
pub(crate) struct HostCtx {
    table: ResourceTable,
    wasi_ctx: WasiCtx,
}

impl HostCtx {
    pub(crate) fn new(forward_stderr: bool) -> Self {
        let mut wasi_ctx = WasiCtxBuilder::new();
        if forward_stderr {
            wasi_ctx.inherit_stderr();
        }
        Self {
            table: ResourceTable::new(),
            wasi_ctx: wasi_ctx.build(),
        }
    }
}

impl IoView for HostCtx {
    fn table(&mut self) -> &mut ResourceTable {
        &mut self.table
    }
}

impl WasiView for HostCtx {
    fn ctx(&mut self) -> &mut WasiCtx {
        &mut self.wasi_ctx
    }
}
