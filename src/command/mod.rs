pub(crate) mod bench;
pub(crate) mod call;
pub(crate) mod serve;

use crate::args::{self, CommonArgs};
use crate::config::config_holder::ConfigHolder;
use crate::config::toml::ConfigToml;
use crate::init::{self, Guard};
use crate::project_dirs;
use anyhow::{Context as _, bail};
use directories::BaseDirs;
use host::KernelComponent;
use host::component::InstanceConfig;
use host::engine::new_engine;
use std::path::PathBuf;
use tracing::{debug, info};

impl args::Subcommand {
    pub(crate) async fn run(self) -> Result<(), anyhow::Error> {
        match self {
            args::Subcommand::Call(call) => call.run().await,
            args::Subcommand::Bench(bench) => bench.run().await,
            args::Subcommand::Serve(serve) => serve.run().await,
            args::Subcommand::GenerateConfig { output, overwrite } => {
                ConfigHolder::generate_default_config(output, overwrite).await
            }
        }
    }
}

/// Loaded configuration, installed logging and a compiled kernel component.
pub(crate) struct Session {
    pub(crate) config: ConfigToml,
    pub(crate) component: KernelComponent,
    _guard: Guard,
}

impl Session {
    pub(crate) async fn open(common: CommonArgs) -> Result<Self, anyhow::Error> {
        let config_holder = ConfigHolder::new(project_dirs(), BaseDirs::new(), common.config)?;
        let mut config = config_holder.load_config().await?;
        let path_prefixes = &config_holder.path_prefixes;
        let log_dir = match &config.log.file {
            Some(file) => Some(
                path_prefixes
                    .replace_path_prefix_mkdir(&file.directory)
                    .await?,
            ),
            None => None,
        };
        let guard = init::init(&mut config, log_dir.as_deref())?;
        if let Some(config_file) = config_holder.config_file() {
            info!("Using configuration file {config_file:?}");
        }

        let wasm_path: PathBuf = if let Some(wasm_path) = common.component {
            wasm_path
        } else if let Some(wasm_path) = config.component.wasm_path.as_deref() {
            path_prefixes
                .replace_file_prefix_verify_exists(wasm_path)
                .context("cannot find `component.wasm_path`")?
        } else {
            bail!("kernel component not set, use `--component` or `component.wasm_path`")
        };
        debug!("Using kernel component {wasm_path:?}");

        let engine = new_engine((&config.wasmtime).into())?;
        let component = KernelComponent::new(
            &wasm_path,
            engine,
            InstanceConfig {
                forward_stderr: config.component.forward_stderr,
            },
        )
        .with_context(|| format!("cannot load the kernel component {wasm_path:?}"))?;
        Ok(Self {
            config,
            component,
            _guard: guard,
        })
    }
}
