//! A generator owned by a single Tokio task.
//!
//! [`IdService`] moves a [`BasicGenerator`] into a dedicated worker task and
//! hands out cloneable handles. Every request travels over a bounded
//! [`mpsc`] channel and is answered on its own [`oneshot`] channel, so the
//! generator state is never shared and never locked. Shutdown is coordinated
//! through a [`CancellationToken`] shared by all handles.
//!
//! [`BasicGenerator`]: crate::BasicGenerator

mod request;
mod worker;

use core::time::Duration;

use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    generator::{BasicGenerator, NodeConfig},
    id::FlakeId,
    time::TimeSource,
};
use request::WorkRequest;
use worker::worker_loop;

/// Handle to a generator running on its own Tokio task.
///
/// Handles are cheap to clone and all talk to the same worker, so IDs issued
/// through any clone are unique and time-ordered with respect to each other.
///
/// # Example
///
/// ```
/// use flakeid::{IdService, MonotonicClock, NodeConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> flakeid::Result<()> {
/// let service = IdService::spawn(NodeConfig::new(1, 4)?, MonotonicClock::default(), 64);
///
/// let id = service.generate().await?;
/// assert_eq!(id.worker_id(), 4);
///
/// let batch = service.generate_batch(3).await?;
/// assert!(batch.windows(2).all(|pair| pair[0] < pair[1]));
///
/// service.shutdown().await?;
/// assert!(service.generate().await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct IdService {
    tx: mpsc::Sender<WorkRequest>,
    shutdown_token: CancellationToken,
    node: NodeConfig,
}

impl IdService {
    /// Largest batch a single [`IdService::generate_batch`] call may request.
    pub const MAX_BATCH: usize = 65_536;

    /// Channel capacity used by [`IdService::spawn_default`].
    pub const DEFAULT_BUFFER: usize = 1_024;

    /// How long [`IdService::shutdown`] waits for the worker to acknowledge.
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

    /// Spawns the worker task and returns a handle to it.
    ///
    /// `buffer` bounds the number of queued requests; callers wait for room
    /// once it is full. A zero buffer is treated as one.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn<T>(node: NodeConfig, time: T, buffer: usize) -> Self
    where
        T: TimeSource + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let generator = BasicGenerator::new(node, time);

        tokio::spawn(worker_loop(rx, generator));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            datacenter_id = node.datacenter_id(),
            worker_id = node.worker_id(),
            buffer,
            "generator service started"
        );

        Self {
            tx,
            shutdown_token: CancellationToken::new(),
            node,
        }
    }

    /// Spawns the worker task with [`IdService::DEFAULT_BUFFER`].
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn_default<T>(node: NodeConfig, time: T) -> Self
    where
        T: TimeSource + Send + 'static,
    {
        Self::spawn(node, time, Self::DEFAULT_BUFFER)
    }

    /// The node the worker issues IDs for.
    pub const fn node(&self) -> &NodeConfig {
        &self.node
    }

    /// Whether [`IdService::shutdown`] has been called on any handle.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Requests the next ID from the worker.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once the service is shut down.
    /// - [`Error::ChannelClosed`] if the worker stopped unexpectedly.
    /// - Any error the generator returns, such as
    ///   [`Error::TimestampExhausted`].
    pub async fn generate(&self) -> Result<FlakeId> {
        self.request_id(None).await
    }

    /// Requests the next ID, giving up once the worker has waited `max_wait`
    /// on a stalled clock.
    ///
    /// Time spent queued behind other requests does not count.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockStalled`] if the clock did not advance in time.
    /// - Every error [`IdService::generate`] can return.
    pub async fn generate_within(&self, max_wait: Duration) -> Result<FlakeId> {
        self.request_id(Some(max_wait)).await
    }

    /// Requests `count` IDs issued back to back by the worker.
    ///
    /// The returned IDs are strictly increasing. A count of zero returns an
    /// empty vector without contacting the worker.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBatchSize`] if `count` exceeds
    ///   [`IdService::MAX_BATCH`].
    /// - Every error [`IdService::generate`] can return.
    pub async fn generate_batch(&self, count: usize) -> Result<Vec<FlakeId>> {
        self.request_batch(count, None).await
    }

    /// Like [`IdService::generate_batch`], with `max_wait` bounding the clock
    /// stall before each ID rather than the batch as a whole.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockStalled`] if the clock did not advance in time. IDs
    ///   issued earlier in the batch are discarded.
    /// - Every error [`IdService::generate_batch`] can return.
    pub async fn generate_batch_within(
        &self,
        count: usize,
        max_wait: Duration,
    ) -> Result<Vec<FlakeId>> {
        self.request_batch(count, Some(max_wait)).await
    }

    async fn request_id(&self, max_wait: Option<Duration>) -> Result<FlakeId> {
        let (response, rx) = oneshot::channel();
        self.send(WorkRequest::Next { max_wait, response }).await?;
        self.receive(rx, "id response").await?
    }

    async fn request_batch(
        &self,
        count: usize,
        max_wait: Option<Duration>,
    ) -> Result<Vec<FlakeId>> {
        if count > Self::MAX_BATCH {
            return Err(Error::InvalidBatchSize {
                requested: count,
                max: Self::MAX_BATCH,
            });
        }
        if self.is_shutdown() {
            return Err(Error::ServiceShutdown);
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let (response, rx) = oneshot::channel();
        self.send(WorkRequest::Batch {
            count,
            max_wait,
            response,
        })
        .await?;
        self.receive(rx, "batch response").await?
    }

    /// Gracefully shuts down the worker.
    ///
    /// - Cancels the shared [`CancellationToken`] to refuse new work.
    /// - Sends a shutdown request, queued behind any requests already sent.
    /// - Waits up to [`IdService::SHUTDOWN_TIMEOUT`] for the acknowledgement.
    ///
    /// Calling it again, from any handle, is a no-op.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; a worker that fails to acknowledge is
    /// logged and abandoned.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();

        let (response, rx) = oneshot::channel();
        if let Err(_e) = self.tx.send(WorkRequest::Shutdown { response }).await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to send shutdown to generator worker: {_e}");
            return Ok(());
        }

        match timeout(Self::SHUTDOWN_TIMEOUT, rx).await {
            Ok(Ok(())) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Generator worker shutdown acknowledged");
            }
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Generator worker dropped its acknowledgement: {_e}");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Generator worker shutdown timed out");
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Generator service shutdown complete");

        Ok(())
    }

    async fn send(&self, request: WorkRequest) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        match self.tx.send(request).await {
            Ok(()) => Ok(()),
            Err(_) => Err(self.closed("generator worker channel closed")),
        }
    }

    async fn receive<R>(&self, rx: oneshot::Receiver<R>, what: &str) -> Result<R> {
        rx.await
            .map_err(|_| self.closed(&format!("{what} dropped by generator worker")))
    }

    /// A closed channel after shutdown is expected and reported as such.
    fn closed(&self, context: &str) -> Error {
        if self.shutdown_token.is_cancelled() {
            Error::ServiceShutdown
        } else {
            Error::ChannelClosed {
                context: context.to_owned(),
            }
        }
    }
}
