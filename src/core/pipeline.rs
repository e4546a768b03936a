/// Producer tasks, the single-slot relay and the task group that supervises them
///
/// A producer ticks at a fixed interval, samples its provider and hands the
/// snapshot to the controller through a relay with room for exactly one
/// snapshot. A full relay blocks the producer, so slow rendering throttles
/// sampling. Every blocking point also watches a shared cancel token.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::core::error::DashError;
use crate::core::metrics::{MetricsProvider, Sample};

/// Cooperative cancellation shared by a view's producers and its controller.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the token, so this only
        // returns once the flag flips.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Create a connected relay pair with room for one snapshot.
pub fn relay<S>() -> (RelaySender<S>, RelayReceiver<S>) {
    let (tx, rx) = mpsc::channel(1);
    (RelaySender { tx }, RelayReceiver { rx })
}

#[derive(Debug)]
pub struct RelaySender<S> {
    tx: mpsc::Sender<Sample<S>>,
}

impl<S> RelaySender<S> {
    /// Hand over a snapshot, waiting while the slot is taken.
    ///
    /// Cancellation wins over a pending send, and a dropped receiver counts
    /// as cancellation since nobody is left to render.
    pub async fn send(&self, sample: Sample<S>, cancel: &CancelToken) -> Result<(), DashError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DashError::Cancelled),
            sent = self.tx.send(sample) => sent.map_err(|_| DashError::Cancelled),
        }
    }
}

#[derive(Debug)]
pub struct RelayReceiver<S> {
    rx: mpsc::Receiver<Sample<S>>,
}

impl<S> RelayReceiver<S> {
    /// Next snapshot, or None once every producer is gone.
    pub async fn recv(&mut self) -> Option<Sample<S>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Sample<S>> {
        self.rx.try_recv().ok()
    }
}

/// Sample `provider` every `interval` and feed the relay until cancelled.
///
/// The first tick fires immediately. A provider error ends the producer and
/// is returned as-is; the task group turns it into a view-wide cancel.
pub async fn run_producer<P>(
    mut provider: P,
    interval: Duration,
    relay: RelaySender<P::Snapshot>,
    cancel: CancelToken,
) -> Result<(), DashError>
where
    P: MetricsProvider,
{
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq = 0u64;

    debug!(interval_ms = interval.as_millis() as u64, "producer started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(seq, "producer cancelled while waiting for tick");
                return Err(DashError::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        let taken_at = Instant::now();
        let data = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DashError::Cancelled),
            sampled = provider.sample() => match sampled {
                Ok(data) => data,
                Err(e) => {
                    warn!(error = %e, seq, "metrics provider failed");
                    return Err(e);
                }
            },
        };

        seq += 1;
        relay.send(Sample { seq, taken_at, data }, &cancel).await?;
    }
}

/// Supervises a view: producers run as spawned tasks, the controller runs
/// inline on the caller's task.
///
/// The first failure that is not a cancellation cancels everyone else and
/// is what `run` returns. A user quit ends the group successfully.
pub struct TaskGroup {
    cancel: CancelToken,
    tasks: JoinSet<Result<(), DashError>>,
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            cancel: CancelToken::new(),
            tasks: JoinSet::new(),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), DashError>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub async fn run<F>(mut self, controller: F) -> Result<(), DashError>
    where
        F: Future<Output = Result<(), DashError>>,
    {
        tokio::pin!(controller);
        let mut controller_done = false;
        let mut first_error: Option<DashError> = None;

        loop {
            let outcome = tokio::select! {
                result = &mut controller, if !controller_done => {
                    controller_done = true;
                    // The controller owns the screen; once it is gone the
                    // producers have nobody to feed.
                    self.cancel.cancel();
                    result
                }
                Some(joined) = self.tasks.join_next() => {
                    joined.unwrap_or_else(|e| Err(DashError::Task(e.to_string())))
                }
                else => break,
            };

            match outcome {
                Ok(()) => {}
                Err(e) if e.is_cancellation() => {
                    self.cancel.cancel();
                }
                Err(e) => {
                    self.cancel.cancel();
                    if first_error.is_none() {
                        warn!(error = %e, "view task failed, cancelling group");
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
