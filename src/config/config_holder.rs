use super::toml::ConfigToml;
use anyhow::{Context as _, bail};
use config::{ConfigBuilder, Environment, File, FileFormat, builder::AsyncState};
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt as _;
use tracing::warn;

const FIBENCH_TOML: &str = include_str!("../../fibench.toml");
const FIBENCH_TOML_FILE_NAME: &str = "fibench.toml";

// Path prefixes
const HOME_DIR_PREFIX: &str = "~/";
const DATA_DIR_PREFIX: &str = "${DATA_DIR}/";
const CACHE_DIR_PREFIX: &str = "${CACHE_DIR}/";
const CONFIG_DIR_PREFIX: &str = "${CONFIG_DIR}/";
const FIBENCH_TOML_DIR_PREFIX: &str = "${FIBENCH_TOML_DIR}/";

pub(crate) struct PathPrefixes {
    pub(crate) fibench_toml_dir: PathBuf,
    pub(crate) project_dirs: Option<ProjectDirs>,
    pub(crate) base_dirs: Option<BaseDirs>,
}

impl PathPrefixes {
    /// Expand a known prefix, leaving other paths untouched.
    pub(crate) fn replace_path_prefix(&self, input_path: &str) -> PathBuf {
        if let Some(suffix) = input_path.strip_prefix(FIBENCH_TOML_DIR_PREFIX) {
            return self.fibench_toml_dir.join(suffix);
        }
        let dir_and_suffix = if let Some(suffix) = input_path.strip_prefix(HOME_DIR_PREFIX) {
            Some((self.base_dirs.as_ref().map(BaseDirs::home_dir), suffix))
        } else if let Some(suffix) = input_path.strip_prefix(DATA_DIR_PREFIX) {
            Some((self.project_dirs.as_ref().map(ProjectDirs::data_dir), suffix))
        } else if let Some(suffix) = input_path.strip_prefix(CACHE_DIR_PREFIX) {
            Some((self.project_dirs.as_ref().map(ProjectDirs::cache_dir), suffix))
        } else if let Some(suffix) = input_path.strip_prefix(CONFIG_DIR_PREFIX) {
            Some((self.project_dirs.as_ref().map(ProjectDirs::config_dir), suffix))
        } else {
            None
        };
        match dir_and_suffix {
            Some((Some(dir), suffix)) => dir.join(suffix),
            Some((None, _)) => {
                warn!("Not expanding prefix of `{input_path}`");
                PathBuf::from(input_path)
            }
            None => PathBuf::from(input_path),
        }
    }

    pub(crate) fn replace_file_prefix_verify_exists(
        &self,
        input_path: &str,
    ) -> Result<PathBuf, anyhow::Error> {
        let path = self.replace_path_prefix(input_path);
        if path.exists() {
            Ok(path)
        } else {
            bail!("file does not exist: {path:?}")
        }
    }

    pub(crate) async fn replace_path_prefix_mkdir(
        &self,
        dir: &str,
    ) -> Result<PathBuf, anyhow::Error> {
        let path = self.replace_path_prefix(dir);
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("cannot create directory {path:?}"))?;
        Ok(path)
    }
}

pub(crate) struct ConfigHolder {
    fibench_toml: Option<PathBuf>,
    pub(crate) path_prefixes: PathPrefixes,
}

impl ConfigHolder {
    pub(crate) async fn generate_default_config(
        dst: Option<PathBuf>,
        overwrite: bool,
    ) -> Result<(), anyhow::Error> {
        let dst = dst.unwrap_or(PathBuf::from(FIBENCH_TOML_FILE_NAME));

        let mut file = OpenOptions::new()
            .write(true)
            .create(true) // Always allow creating new files.
            .truncate(true) // Truncate existing files.
            .create_new(!overwrite) // if true, `create` is ignored, and only new file creation is allowed, meaning overwriting is disabled.
            .open(&dst)
            .await
            .with_context(|| {
                format!(
                    "cannot open {dst:?} for writing{}",
                    if !overwrite {
                        ", try using `--overwrite`"
                    } else {
                        ""
                    }
                )
            })?;
        file.write_all(FIBENCH_TOML.as_bytes())
            .await
            .with_context(|| format!("cannot write to {dst:?}"))?;
        println!("Generated {dst:?}");
        Ok(())
    }

    /// Use `config` if set, otherwise `fibench.toml` in the current directory if it exists.
    pub(crate) fn new(
        project_dirs: Option<ProjectDirs>,
        base_dirs: Option<BaseDirs>,
        config: Option<PathBuf>,
    ) -> Result<Self, anyhow::Error> {
        let fibench_toml = if let Some(config) = config {
            Some(config)
        } else {
            let local = PathBuf::from(FIBENCH_TOML_FILE_NAME);
            if local.try_exists().unwrap_or_default() {
                Some(local)
            } else {
                None
            }
        };
        let fibench_toml_dir = match &fibench_toml {
            None => std::env::current_dir().context("failed to get CWD")?,
            Some(fibench_toml) => parent_dir(fibench_toml)?,
        };
        Ok(Self {
            fibench_toml,
            path_prefixes: PathPrefixes {
                fibench_toml_dir,
                project_dirs,
                base_dirs,
            },
        })
    }

    /// The configuration file in use, `None` when running on defaults.
    pub(crate) fn config_file(&self) -> Option<&Path> {
        self.fibench_toml.as_deref()
    }

    pub(crate) async fn load_config(&self) -> Result<ConfigToml, anyhow::Error> {
        let mut builder = ConfigBuilder::<AsyncState>::default();
        if let Some(fibench_toml) = self.fibench_toml.as_deref() {
            builder = builder.add_source(
                File::from(fibench_toml)
                    .required(true)
                    .format(FileFormat::Toml),
            );
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("fibench")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .await?;
        Ok(settings.try_deserialize()?)
    }
}

fn parent_dir(file: &Path) -> Result<PathBuf, anyhow::Error> {
    Ok(file
        .canonicalize()
        .with_context(|| format!("error while calling canonicalize on {file:?}"))?
        .parent()
        .with_context(|| format!("error getting parent path of {file:?}"))?
        .to_path_buf())
}
