/// The per-view event loop
///
/// Multiplexes three sources: snapshots from the relay, terminal input and a
/// render tick. Events are handled one at a time, so all widget state has a
/// single writer.

use std::future::Future;
use std::io;
use std::time::Duration;

use crossterm::event::{Event, KeyEvent, KeyEventKind};
use futures::{Stream, StreamExt};
use ratatui::backend::Backend;
use ratatui::{Frame, Terminal};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::core::error::DashError;
use crate::core::pipeline::{CancelToken, RelayReceiver};
use crate::screens::Outcome;

/// One dashboard screen as seen by the controller.
pub trait View {
    type Snapshot: Send + 'static;

    /// Fold a snapshot into widget state.
    fn apply(&mut self, snapshot: Self::Snapshot);

    fn handle_key(&mut self, key: KeyEvent) -> impl Future<Output = Outcome>;

    /// Called on every render tick.
    fn on_tick(&mut self) {}

    /// Whether incoming snapshots should be applied right now.
    fn is_running(&self) -> bool;

    fn draw(&mut self, frame: &mut Frame);
}

pub struct Controller<V: View> {
    view: V,
    relay: RelayReceiver<V::Snapshot>,
    interval: Duration,
    cancel: CancelToken,
}

impl<V: View> Controller<V> {
    pub fn new(view: V, relay: RelayReceiver<V::Snapshot>, interval: Duration, cancel: CancelToken) -> Self {
        Self {
            view,
            relay,
            interval,
            cancel,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Run until the user quits (`CanceledByUser`), the group cancels, or the
    /// terminal fails.
    pub async fn run<B, E>(&mut self, terminal: &mut Terminal<B>, mut events: E) -> Result<(), DashError>
    where
        B: Backend,
        E: Stream<Item = io::Result<Event>> + Unpin,
    {
        let mut render = time::interval(self.interval);
        render.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut input_open = true;

        loop {
            terminal.draw(|frame| self.view.draw(frame))?;

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DashError::Cancelled),

                event = events.next(), if input_open => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match self.view.handle_key(key).await {
                            Outcome::Continue => {}
                            Outcome::Quit => return Err(DashError::CanceledByUser),
                            Outcome::Refresh(since) => self.refresh_after(since).await?,
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => terminal.clear()?,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(DashError::Terminal(e)),
                    None => {
                        debug!("input stream closed");
                        input_open = false;
                    }
                },

                sample = self.relay.recv() => match sample {
                    // Always drained so the producer never stalls on us.
                    Some(sample) => {
                        if self.view.is_running() {
                            self.view.apply(sample.data);
                        }
                    }
                    None => return Err(DashError::Cancelled),
                },

                _ = render.tick() => self.view.on_tick(),
            }
        }
    }

    /// Wait for the first snapshot sampled after `since` and apply it.
    ///
    /// Older snapshots still in flight are discarded. Gives up after two
    /// refresh intervals and lets the regular flow catch up.
    async fn refresh_after(&mut self, since: Instant) -> Result<(), DashError> {
        let deadline = time::sleep(self.interval * 2);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DashError::Cancelled),
                _ = &mut deadline => {
                    debug!("no fresh snapshot after action");
                    return Ok(());
                }
                sample = self.relay.recv() => match sample {
                    Some(sample) => {
                        if sample.taken_at >= since {
                            self.view.apply(sample.data);
                            return Ok(());
                        }
                        debug!(seq = sample.seq, "discarding stale snapshot");
                    }
                    None => return Err(DashError::Cancelled),
                },
            }
        }
    }
}
