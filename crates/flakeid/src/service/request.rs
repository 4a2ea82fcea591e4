//! Messages sent from an [`IdService`] handle to its worker task.
//!
//! [`IdService`]: crate::IdService

use core::time::Duration;

use tokio::sync::oneshot;

use crate::{error::Result, id::FlakeId};

/// A message sent from a handle to the worker.
///
/// - [`Next`] asks for a single ID.
/// - [`Batch`] asks for `count` IDs issued back to back.
/// - [`Shutdown`] is used to gracefully terminate the worker.
///
/// [`Next`]: WorkRequest::Next
/// [`Batch`]: WorkRequest::Batch
/// [`Shutdown`]: WorkRequest::Shutdown
#[derive(Debug)]
pub(crate) enum WorkRequest {
    /// Generate one ID and send it through `response`. With `max_wait`, give
    /// up once the clock has stalled for that long.
    Next {
        max_wait: Option<Duration>,
        response: oneshot::Sender<Result<FlakeId>>,
    },

    /// Generate `count` IDs and send them through `response` in generation
    /// order. `max_wait` bounds the stall before each ID, not the batch.
    Batch {
        count: usize,
        max_wait: Option<Duration>,
        response: oneshot::Sender<Result<Vec<FlakeId>>>,
    },

    /// Initiate graceful shutdown and notify via the `response` channel.
    Shutdown { response: oneshot::Sender<()> },
}
