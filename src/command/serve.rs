use super::Session;
use crate::args;
use anyhow::Context as _;
use host::{EntryPoint, KernelComponent, KernelInstance};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _, BufReader};
use tracing::{debug, info, warn};

impl args::Serve {
    pub(crate) async fn run(self) -> Result<(), anyhow::Error> {
        let session = Session::open(self.common).await?;
        let shutdown = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C - {err}");
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT");
        };
        let stats = serve_lines(
            &session.component,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            shutdown,
        )
        .await?;
        info!(
            requests = stats.requests,
            failed = stats.failed,
            "Shutting down"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Request {
    #[serde(default)]
    id: Value,
    function: EntryPoint,
    #[serde(default)]
    params: Vec<Value>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Response {
    #[serde(skip_serializing_if = "Value::is_null")]
    id: Value,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Ok(i64),
    Err(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ServeStats {
    pub(crate) requests: u64,
    pub(crate) failed: u64,
}

/// Answer one JSON request per line until `input` ends or `shutdown` resolves.
pub(crate) async fn serve_lines(
    component: &KernelComponent,
    input: impl AsyncBufRead + Unpin,
    mut output: impl AsyncWrite + Unpin,
    shutdown: impl Future<Output = ()>,
) -> Result<ServeStats, anyhow::Error> {
    let mut instance = Some(component.instantiate().await?);
    let mut lines = input.lines();
    let mut stats = ServeStats::default();
    tokio::pin!(shutdown);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("cannot read the next request")?,
            () = &mut shutdown => break,
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        stats.requests += 1;
        let response = handle_line(component, &mut instance, &line).await;
        if matches!(response.outcome, Outcome::Err(_)) {
            stats.failed += 1;
        }
        let mut serialized = serde_json::to_vec(&response)?;
        serialized.push(b'\n');
        output
            .write_all(&serialized)
            .await
            .context("cannot write the response")?;
        output.flush().await.context("cannot flush the response")?;
    }
    Ok(stats)
}

async fn handle_line(
    component: &KernelComponent,
    instance: &mut Option<KernelInstance>,
    line: &str,
) -> Response {
    let request = match serde_json::from_str::<Request>(line) {
        Ok(request) => request,
        Err(err) => {
            debug!("Malformed request - {err}");
            // Echo the id of a request that is valid JSON but has a bad shape.
            let id = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|mut value| value.get_mut("id").map(Value::take))
                .unwrap_or_default();
            return Response {
                id,
                outcome: Outcome::Err(format!("malformed request: {err}")),
            };
        }
    };
    let outcome = match call(component, instance, &request).await {
        Ok(value) => Outcome::Ok(value),
        Err(err) => Outcome::Err(err.to_string()),
    };
    Response {
        id: request.id,
        outcome,
    }
}

async fn call(
    component: &KernelComponent,
    instance: &mut Option<KernelInstance>,
    request: &Request,
) -> Result<i64, host::HostError> {
    with_instance(component, instance, async |current| {
        current.call_json(request.function, &request.params).await
    })
    .await
}

/// Run `call` on the instance in `slot`, instantiating it first if needed.
/// The slot is emptied when the call poisons the instance.
async fn with_instance(
    component: &KernelComponent,
    slot: &mut Option<KernelInstance>,
    call: impl AsyncFnOnce(&mut KernelInstance) -> Result<i64, host::HostError>,
) -> Result<i64, host::HostError> {
    let current = match slot.take() {
        Some(current) => current,
        None => component.instantiate().await?,
    };
    let current = slot.insert(current);
    let result = call(current).await;
    if let Err(err) = &result
        && err.poisons_instance()
    {
        warn!("Dropping the instance after a failed call - {err}");
        *slot = None;
    }
    result
}
