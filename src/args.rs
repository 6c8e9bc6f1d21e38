use clap::Parser;
use host::EntryPoint;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "fibench")]
#[command(
    version,
    about = "fibench: Fibonacci kernel in a WebAssembly component, called and timed by a wasmtime host",
    disable_help_subcommand = true
)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) command: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Subcommand {
    /// Call an exported function once and print its result.
    Call(Call),
    /// Time repeated `test(n, count)` calls.
    Bench(Bench),
    /// Answer JSON-lines requests read from stdin until EOF or Ctrl-C.
    Serve(Serve),
    /// Write the default configuration file.
    GenerateConfig {
        /// Destination, defaults to `fibench.toml`.
        output: Option<PathBuf>,
        /// Replace an existing file.
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct CommonArgs {
    /// Path to the TOML configuration
    #[arg(long, short)]
    pub(crate) config: Option<PathBuf>,
    /// Path to the kernel component, takes precedence over `component.wasm_path`
    #[arg(long)]
    pub(crate) component: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub(crate) struct Call {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
    /// One of `fib`, `test`
    #[arg(value_name = "function")]
    pub(crate) entry_point: EntryPoint,
    /// Parameters of the function. Each one is parsed as JSON, e.g. `fib 10` or `test 20 1000`.
    #[arg(name = "parameters", allow_hyphen_values = true)]
    pub(crate) params: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub(crate) struct Bench {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
    /// Fibonacci index
    pub(crate) n: u32,
    /// Kernel invocations per round
    pub(crate) count: u32,
    /// Number of timed rounds, overrides `bench.rounds`
    #[arg(long, short)]
    pub(crate) rounds: Option<u32>,
    /// Skip the warm-up call, overrides `bench.warmup`
    #[arg(long)]
    pub(crate) no_warmup: bool,
    /// Also time the kernel compiled into this binary
    #[arg(long)]
    pub(crate) native: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, clap::Args)]
pub(crate) struct Serve {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
}

#[cfg(test)]
mod tests {
    use super::{Args, Subcommand};
    use assert_matches::assert_matches;
    use clap::{CommandFactory, Parser};
    use host::EntryPoint;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn call_accepts_negative_looking_params() {
        let args = Args::try_parse_from(["fibench", "call", "fib", "-1"]).unwrap();
        assert_matches!(args.command, Subcommand::Call(call) => {
            assert_eq!(EntryPoint::Fib, call.entry_point);
            assert_eq!(vec!["-1".to_string()], call.params);
        });
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert!(Args::try_parse_from(["fibench", "call", "fibo", "1"]).is_err());
    }

    #[test]
    fn bench_flags_are_parsed() {
        let args = Args::try_parse_from([
            "fibench",
            "bench",
            "40",
            "1000",
            "--rounds",
            "3",
            "--no-warmup",
            "--native",
            "--component",
            "kernel.wasm",
        ])
        .unwrap();
        assert_matches!(args.command, Subcommand::Bench(bench) => {
            assert_eq!((40, 1000, Some(3)), (bench.n, bench.count, bench.rounds));
            assert!(bench.no_warmup && bench.native && !bench.json);
            assert_eq!(Some("kernel.wasm".into()), bench.common.component);
        });
    }
}
