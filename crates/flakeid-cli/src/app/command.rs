use core::{future::Future, time::Duration};
use std::io::Write;

use anyhow::Context;
use flakeid::{
    DecodedId, Error, FlakeId, IdGeneratorAsyncTokioExt, IdService, LockGenerator, NodeConfig,
    TimeSource,
};
use futures::future::try_join_all;
use serde::Serialize;
use tokio::{task::JoinHandle, time::timeout};

use crate::app::{
    clock::Clock,
    config::{Command, OutputFormat, Settings},
};

/// IDs requested from the service per round trip. One millisecond's worth of
/// sequence.
const SERVICE_BATCH: usize = 4096;

/// Runs the selected subcommand, writing its output to `out`.
pub async fn run(settings: Settings, out: &mut impl Write) -> anyhow::Result<()> {
    match settings.command {
        Command::Generate { count, tasks } => {
            let clock = Clock::new(settings.clock);
            if tasks > 1 {
                let ids =
                    generate_concurrent(settings.node, clock, count, tasks, settings.max_wait)
                        .await?;
                write_ids(out, &ids, settings.format)
            } else {
                generate_sequential(
                    out,
                    settings.node,
                    clock,
                    count,
                    settings.max_wait,
                    settings.format,
                )
                .await
            }
        }
        Command::Decode { ids, json } => {
            write_decoded(out, &ids, settings.node.epoch(), json, settings.format)
        }
    }
}

/// Generates `count` IDs one at a time, writing each as soon as it is issued.
pub async fn generate_sequential<T>(
    out: &mut impl Write,
    node: NodeConfig,
    time: T,
    count: usize,
    max_wait: Option<Duration>,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    T: TimeSource + Send + Sync,
{
    let generator = LockGenerator::new(node, time);
    for _ in 0..count {
        let id = within(max_wait, generator.generate_async()).await?;
        writeln!(out, "{}", format_id(id, format))?;
    }
    Ok(())
}

/// Splits `count` IDs across `tasks` Tokio tasks sharing one [`IdService`].
///
/// `max_wait` bounds how long the worker waits on a stalled clock for any
/// single ID; time spent queued behind other tasks does not count.
///
/// The result is sorted, which is also generation order since every ID comes
/// from the same worker.
pub async fn generate_concurrent<T>(
    node: NodeConfig,
    time: T,
    count: usize,
    tasks: usize,
    max_wait: Option<Duration>,
) -> anyhow::Result<Vec<FlakeId>>
where
    T: TimeSource + Send + 'static,
{
    let service = IdService::spawn_default(node, time);
    let tasks = tasks.clamp(1, count.max(1));
    let per_task = count / tasks;
    let extra = count % tasks;

    tracing::debug!(count, tasks, "requesting ids from the generator service");

    let handles: Vec<JoinHandle<flakeid::Result<Vec<FlakeId>>>> = (0..tasks)
        .map(|task| {
            let service = service.clone();
            let share = per_task + usize::from(task < extra);
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(share);
                let mut remaining = share;
                while remaining > 0 {
                    let batch = remaining.min(SERVICE_BATCH);
                    let issued = match max_wait {
                        Some(max_wait) => service.generate_batch_within(batch, max_wait).await?,
                        None => service.generate_batch(batch).await?,
                    };
                    ids.extend(issued);
                    remaining -= batch;
                }
                Ok(ids)
            })
        })
        .collect();

    let results = try_join_all(handles).await;
    service.shutdown().await?;

    let mut ids = Vec::with_capacity(count);
    for batch in results? {
        ids.extend(batch?);
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Awaits `request`, failing with [`Error::ClockStalled`] once `max_wait`
/// elapses.
async fn within<R>(
    max_wait: Option<Duration>,
    request: impl Future<Output = flakeid::Result<R>>,
) -> flakeid::Result<R> {
    let Some(max_wait) = max_wait else {
        return request.await;
    };

    match timeout(max_wait, request).await {
        Ok(result) => result,
        Err(_) => {
            let waited_ms = u64::try_from(max_wait.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(waited_ms, "clock did not advance in time");
            Err(Error::ClockStalled { waited_ms })
        }
    }
}

pub fn write_ids(out: &mut impl Write, ids: &[FlakeId], format: OutputFormat) -> anyhow::Result<()> {
    for id in ids {
        writeln!(out, "{}", format_id(*id, format))?;
    }
    Ok(())
}

pub fn format_id(id: FlakeId, format: OutputFormat) -> String {
    match format {
        OutputFormat::Decimal => id.to_string(),
        OutputFormat::Padded => id.to_padded_string(),
        OutputFormat::Hex => format!("{:#018x}", id.to_raw()),
    }
}

/// Parses a decimal ID, or a hexadecimal one prefixed with `0x`.
///
/// # Errors
///
/// Fails on anything that is not a `u64`, including negative numbers.
pub fn parse_id(input: &str) -> anyhow::Result<FlakeId> {
    let trimmed = input.trim();
    let raw = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    }
    .with_context(|| format!("invalid ID `{input}`"))?;

    Ok(FlakeId::from_raw(raw))
}

#[derive(Serialize)]
struct DecodedRecord {
    id: String,
    #[serde(flatten)]
    parts: DecodedId,
}

/// Decodes every input against `epoch`. Stops at the first unparsable one.
pub fn write_decoded(
    out: &mut impl Write,
    inputs: &[String],
    epoch: Duration,
    json: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    for input in inputs {
        let id = parse_id(input)?;
        let parts = id.decode(epoch);
        let id = format_id(id, format);

        if json {
            serde_json::to_writer(&mut *out, &DecodedRecord { id, parts })?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{id} timestamp={} delta={} datacenter_id={} worker_id={} sequence={}",
                parts.timestamp(),
                parts.timestamp_delta(),
                parts.datacenter_id(),
                parts.worker_id(),
                parts.sequence(),
            )?;
        }
    }
    Ok(())
}
