use super::Session;
use crate::args;
use anyhow::{bail, ensure};
use host::KernelInstance;
use serde::Serialize;
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

impl args::Bench {
    pub(crate) async fn run(self) -> Result<(), anyhow::Error> {
        let session = Session::open(self.common).await?;
        let rounds = self.rounds.unwrap_or(session.config.bench.rounds);
        let warmup = session.config.bench.warmup && !self.no_warmup;
        ensure!(rounds > 0, "the number of rounds must be positive");
        if self.count == 0 {
            warn!("`count` is 0, the kernel is never invoked and the result is 0");
        }
        let mut instance = session.component.instantiate().await?;
        if warmup {
            instance.test(self.n, 1).await?;
        }
        let (result, wasm) = time_wasm(&mut instance, self.n, self.count, rounds).await?;
        let wasm = Summary::new(&wasm, self.count);
        info!(n = self.n, count = self.count, result, %wasm, "Benchmarked the component");

        let native = if self.native {
            let (native_result, native) = time_native(self.n, self.count, rounds);
            if native_result != result {
                bail!("native kernel returned {native_result}, the component returned {result}");
            }
            let native = Summary::new(&native, self.count);
            info!(%native, "Benchmarked the native kernel");
            Some(native)
        } else {
            None
        };
        let report = Report {
            n: self.n,
            count: self.count,
            result,
            wasm,
            native,
        };
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{report}");
        }
        Ok(())
    }
}

#[instrument(skip(instance))]
async fn time_wasm(
    instance: &mut KernelInstance,
    n: u32,
    count: u32,
    rounds: u32,
) -> Result<(i64, Vec<Duration>), host::HostError> {
    let mut durations = Vec::new();
    let mut result = 0;
    for _ in 0..rounds {
        let started = Instant::now();
        result = instance.test(n, count).await?;
        durations.push(started.elapsed());
    }
    Ok((result, durations))
}

fn time_native(n: u32, count: u32, rounds: u32) -> (i64, Vec<Duration>) {
    let mut durations = Vec::new();
    let mut result = 0;
    for _ in 0..rounds {
        let started = Instant::now();
        result = kernel::test(n, count);
        durations.push(started.elapsed());
    }
    (result, durations)
}

#[derive(Debug, Serialize)]
struct Report {
    n: u32,
    count: u32,
    result: i64,
    wasm: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    native: Option<Summary>,
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "test({n}, {count}) = {result}, {rounds} round(s)",
            n = self.n,
            count = self.count,
            result = self.result,
            rounds = self.wasm.rounds,
        )?;
        write!(f, "wasm:   {}", self.wasm)?;
        if let Some(native) = &self.native {
            write!(f, "\nnative: {native}")?;
        }
        Ok(())
    }
}

/// Round durations in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct Summary {
    rounds: usize,
    min_ns: u64,
    mean_ns: u64,
    max_ns: u64,
    /// Mean round time divided by `count`, absent when `count` is 0.
    per_iteration_ns: Option<f64>,
}

impl Summary {
    #[expect(clippy::cast_precision_loss)]
    fn new(durations: &[Duration], count: u32) -> Self {
        let nanos = |duration: &Duration| u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let min_ns = durations.iter().map(nanos).min().unwrap_or_default();
        let max_ns = durations.iter().map(nanos).max().unwrap_or_default();
        let total: u128 = durations.iter().map(Duration::as_nanos).sum();
        let mean_ns = if durations.is_empty() {
            0
        } else {
            u64::try_from(total / durations.len() as u128).unwrap_or(u64::MAX)
        };
        let per_iteration_ns = (count > 0).then(|| mean_ns as f64 / f64::from(count));
        Self {
            rounds: durations.len(),
            min_ns,
            mean_ns,
            max_ns,
            per_iteration_ns,
        }
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min {:?}, mean {:?}, max {:?}",
            Duration::from_nanos(self.min_ns),
            Duration::from_nanos(self.mean_ns),
            Duration::from_nanos(self.max_ns),
        )?;
        if let Some(per_iteration_ns) = self.per_iteration_ns {
            write!(f, ", {per_iteration_ns:.1}ns per call")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Report, Summary, time_native};
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case::single_round(&[5], 1, (5, 5, 5), Some(5.0))]
    #[case::unordered_rounds(&[3_000, 1_000, 2_000], 100, (1_000, 2_000, 3_000), Some(20.0))]
    #[case::mean_rounds_down(&[1, 2], 2, (1, 1, 2), Some(0.5))]
    #[case::zero_count(&[10], 0, (10, 10, 10), None)]
    #[case::no_rounds(&[], 1, (0, 0, 0), Some(0.0))]
    fn summary_of_rounds(
        #[case] nanos: &[u64],
        #[case] count: u32,
        #[case] min_mean_max: (u64, u64, u64),
        #[case] per_iteration_ns: Option<f64>,
    ) {
        let durations: Vec<_> = nanos.iter().copied().map(Duration::from_nanos).collect();
        let summary = Summary::new(&durations, count);
        assert_eq!(nanos.len(), summary.rounds);
        assert_eq!(
            min_mean_max,
            (summary.min_ns, summary.mean_ns, summary.max_ns)
        );
        assert_eq!(per_iteration_ns, summary.per_iteration_ns);
        assert_eq!(
            per_iteration_ns.is_some(),
            summary.to_string().contains("per call")
        );
    }

    #[test]
    fn native_timing_returns_the_kernel_result() {
        let (result, durations) = time_native(20, 10, 4);
        assert_eq!(6765, result);
        assert_eq!(4, durations.len());
        let (result, durations) = time_native(20, 0, 1);
        assert_eq!(0, result);
        assert_eq!(1, durations.len());
    }

    #[test]
    fn report_serializes_without_native_section() {
        let report = Report {
            n: 10,
            count: 1,
            result: 55,
            wasm: Summary::new(&[Duration::from_nanos(5)], 1),
            native: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(55, json["result"]);
        assert_eq!(5, json["wasm"]["min_ns"]);
        assert!(json.get("native").is_none());
        assert!(report.to_string().starts_with("test(10, 1) = 55, 1 round(s)"));
    }
}
