use host::engine::{EngineOptions, OptLevel};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigToml {
    #[serde(default)]
    pub(crate) component: ComponentToml,
    #[serde(default)]
    pub(crate) wasmtime: WasmtimeToml,
    #[serde(default)]
    pub(crate) bench: BenchToml,
    #[serde(default)]
    pub(crate) log: log::LoggingConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct ComponentToml {
    /// Path to the kernel component, may start with a path prefix like `${CACHE_DIR}/`.
    #[serde(default)]
    pub(crate) wasm_path: Option<String>,
    #[serde(default)]
    pub(crate) forward_stderr: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct WasmtimeToml {
    #[serde(default)]
    pub(crate) opt_level: OptLevelToml,
    #[serde(default)]
    pub(crate) backtrace_details: bool,
}

impl From<&WasmtimeToml> for EngineOptions {
    fn from(value: &WasmtimeToml) -> Self {
        EngineOptions {
            opt_level: value.opt_level.into(),
            backtrace_details: value.backtrace_details,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OptLevelToml {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl From<OptLevelToml> for OptLevel {
    fn from(value: OptLevelToml) -> Self {
        match value {
            OptLevelToml::None => Self::None,
            OptLevelToml::Speed => Self::Speed,
            OptLevelToml::SpeedAndSize => Self::SpeedAndSize,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BenchToml {
    #[serde(default = "default_rounds")]
    pub(crate) rounds: u32,
    #[serde(default = "default_true")]
    pub(crate) warmup: bool,
}

impl Default for BenchToml {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            warmup: default_true(),
        }
    }
}

pub(crate) mod log {
    use super::{Deserialize, default_true};
    use std::str::FromStr;

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    pub(crate) struct LoggingConfig {
        #[serde(default)]
        pub(crate) file: Option<AppenderRollingFile>,
        #[serde(default)]
        pub(crate) stderr: AppenderStderr,
    }

    #[derive(Debug, Deserialize, Default, Copy, Clone, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub(crate) enum SpanConfig {
        /// spans are ignored (this is the default)
        #[default]
        None,
        /// one event when span is created
        New,
        /// one event per enter of a span
        Enter,
        /// one event per exit of a span
        Exit,
        /// one event when the span is dropped
        Close,
        /// one event per enter/exit of a span
        Active,
        /// events at all points (new, enter, exit, drop)
        Full,
    }

    impl From<SpanConfig> for tracing_subscriber::fmt::format::FmtSpan {
        fn from(value: SpanConfig) -> Self {
            match value {
                SpanConfig::None => Self::NONE,
                SpanConfig::New => Self::NEW,
                SpanConfig::Enter => Self::ENTER,
                SpanConfig::Exit => Self::EXIT,
                SpanConfig::Close => Self::CLOSE,
                SpanConfig::Active => Self::ACTIVE,
                SpanConfig::Full => Self::FULL,
            }
        }
    }

    #[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub(crate) enum LoggingStyle {
        #[default]
        Plain,
        PlainCompact,
        Json,
    }

    #[derive(Debug, serde_with::DeserializeFromStr)]
    pub(crate) struct EnvFilter(pub(crate) tracing_subscriber::EnvFilter);
    impl FromStr for EnvFilter {
        type Err = tracing_subscriber::filter::ParseError;

        fn from_str(directives: &str) -> Result<Self, Self::Err> {
            tracing_subscriber::EnvFilter::builder()
                .parse(directives)
                .map(Self)
        }
    }
    impl Default for EnvFilter {
        fn default() -> Self {
            Self::from_str("info").expect("default directive must parse")
        }
    }

    /// Console output. Always stderr, stdout carries results.
    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(crate) struct AppenderStderr {
        #[serde(default = "default_true")]
        pub(crate) enabled: bool,
        #[serde(default)]
        pub(crate) level: EnvFilter,
        #[serde(default)]
        pub(crate) span: SpanConfig,
        #[serde(default)]
        pub(crate) target: bool,
        #[serde(default)]
        pub(crate) style: LoggingStyle,
    }

    impl Default for AppenderStderr {
        fn default() -> Self {
            Self {
                enabled: true,
                level: EnvFilter::default(),
                span: SpanConfig::default(),
                target: false,
                style: LoggingStyle::default(),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(crate) struct AppenderRollingFile {
        #[serde(default)]
        pub(crate) level: EnvFilter,
        #[serde(default)]
        pub(crate) span: SpanConfig,
        #[serde(default)]
        pub(crate) target: bool,
        pub(crate) directory: String,
        pub(crate) prefix: String,
        pub(crate) rotation: Rotation,
        #[serde(default)]
        pub(crate) style: LoggingStyle,
    }

    #[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub(crate) enum Rotation {
        Minutely,
        Hourly,
        Daily,
        Never,
    }
    impl From<Rotation> for tracing_appender::rolling::Rotation {
        fn from(value: Rotation) -> Self {
            match value {
                Rotation::Minutely => Self::MINUTELY,
                Rotation::Hourly => Self::HOURLY,
                Rotation::Daily => Self::DAILY,
                Rotation::Never => Self::NEVER,
            }
        }
    }
}

const fn default_rounds() -> u32 {
    10
}

const fn default_true() -> bool {
    true
}
