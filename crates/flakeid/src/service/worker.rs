use core::time::Duration;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::{
    error::{Error, Result},
    generator::{BasicGenerator, Poll},
    id::FlakeId,
    service::request::WorkRequest,
    time::TimeSource,
};

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// The worker owns its [`BasicGenerator`] exclusively, so requests are
/// serialized by the channel instead of a lock. It processes requests one at
/// a time until a shutdown request arrives or every handle is dropped.
///
/// # Request Types
///
/// - [`WorkRequest::Next`]: a single ID.
/// - [`WorkRequest::Batch`]: `count` IDs in generation order.
/// - [`WorkRequest::Shutdown`]: signals the worker to stop and acknowledge
///   shutdown.
pub(crate) async fn worker_loop<T>(
    mut rx: mpsc::Receiver<WorkRequest>,
    mut generator: BasicGenerator<T>,
) where
    T: TimeSource,
{
    #[cfg(feature = "tracing")]
    tracing::trace!(
        datacenter_id = generator.node().datacenter_id(),
        worker_id = generator.node().worker_id(),
        "generator worker started"
    );

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Next { max_wait, response } => {
                let result = next_id(&mut generator, max_wait).await;
                if response.send(result).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("requester dropped before receiving its id");
                }
            }
            WorkRequest::Batch {
                count,
                max_wait,
                response,
            } => {
                let result = fill_batch(&mut generator, count, max_wait).await;
                if response.send(result).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(count, "requester dropped before receiving its batch");
                }
            }
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("generator worker received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("generator worker failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("generator worker stopped");
}

/// Generates one ID, awaiting the clock instead of blocking the runtime.
///
/// Only time spent pending counts against `max_wait`; time the request spent
/// queued behind others does not.
// Use `&mut` so this `Send` future doesn't require the generator to be `Sync`.
#[allow(clippy::needless_pass_by_ref_mut)]
async fn next_id<T>(
    generator: &mut BasicGenerator<T>,
    max_wait: Option<Duration>,
) -> Result<FlakeId>
where
    T: TimeSource,
{
    let mut stalled_since: Option<Instant> = None;
    loop {
        let mut yield_for = match generator.try_poll_id()? {
            Poll::Ready { id } => return Ok(id),
            Poll::Pending { yield_for } => yield_for,
        };

        if let Some(max_wait) = max_wait {
            let waited = stalled_since.get_or_insert_with(Instant::now).elapsed();
            if waited >= max_wait {
                return Err(Error::ClockStalled {
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
            let remaining = u64::try_from((max_wait - waited).as_millis()).unwrap_or(u64::MAX);
            yield_for = yield_for.min(remaining.max(1));
        }

        if yield_for <= 1 {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(Duration::from_millis(yield_for - 1)).await;
        }
    }
}

async fn fill_batch<T>(
    generator: &mut BasicGenerator<T>,
    count: usize,
    max_wait: Option<Duration>,
) -> Result<Vec<FlakeId>>
where
    T: TimeSource,
{
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        ids.push(next_id(generator, max_wait).await?);
    }
    Ok(ids)
}
