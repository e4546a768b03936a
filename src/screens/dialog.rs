/// Two-step confirmation dialogs for container actions and process signals

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::core::actions::{
    signal_by_number, ActionExecutor, ContainerAction, SignalSender, SignalSpec, SIGTERM,
};
use crate::core::error::ActionError;
use crate::screens::{nav_for, Modal, Outcome, ViewState};
use crate::widgets::overlay::{ActionTable, SignalTable};

pub const ACTION_HELP: &[(&str, &str)] = &[
    ("Enter", "Open actions for the selected container"),
    ("Enter (in actions)", "Run the highlighted action"),
];

pub const SIGNAL_HELP: &[(&str, &str)] = &[
    ("K, F9", "Choose a signal for the selected process"),
    ("K, F9 (in signals)", "Send SIGTERM"),
    ("0-9", "Jump to signal number (1-3 start a two digit number)"),
    ("Enter (in signals)", "Send the highlighted signal"),
];

/// Container action flow: Normal -> ActionSelect -> ActionConfirm -> Normal or Error.
pub struct ActionDialog {
    table: ActionTable,
    timeout: Duration,
}

impl ActionDialog {
    pub fn new(actions: &[ContainerAction], timeout: Duration) -> Self {
        Self {
            table: ActionTable::new(actions),
            timeout,
        }
    }

    /// Stage `entity` and freeze the view on its current snapshot.
    pub fn open(&mut self, state: &mut ViewState, entity: String) {
        state.suspend();
        state.set_modal(Modal::ActionSelect { entity });
        self.table.open();
    }

    /// Keys while the action list is open.
    pub async fn handle_key<A: ActionExecutor>(
        &mut self,
        state: &mut ViewState,
        key: &KeyEvent,
        top: bool,
        executor: &A,
    ) -> Outcome {
        match key.code {
            KeyCode::Esc => state.restore(),
            KeyCode::Enter => return self.confirm(state, executor).await,
            _ if top => self.table.scrollable().scroll_top(),
            _ => {
                if let Some(nav) = nav_for(key) {
                    self.table.scrollable().scroll(nav);
                }
            }
        }
        Outcome::Continue
    }

    /// Run the highlighted action, blocking the loop until it resolves or times out.
    async fn confirm<A: ActionExecutor>(&mut self, state: &mut ViewState, executor: &A) -> Outcome {
        let entity = match state.modal() {
            Modal::ActionSelect { entity } => entity.clone(),
            _ => return Outcome::Continue,
        };
        let Some(action) = self.table.selected() else {
            return Outcome::Continue;
        };

        state.set_modal(Modal::ActionConfirm {
            action,
            entity: entity.clone(),
        });
        info!(container = %entity, %action, "action confirmed");

        let result = match time::timeout(self.timeout, executor.apply(action, &entity)).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => {
                state.restore();
                Outcome::Refresh(Instant::now())
            }
            Err(e) => {
                warn!(container = %entity, %action, error = %e, "action failed");
                state.show_error(
                    format!("{} on container {} failed: {}", action, entity, e),
                    Some(entity),
                );
                Outcome::Continue
            }
        }
    }

    pub fn draw(&mut self, state: &ViewState, frame: &mut Frame) {
        if matches!(state.modal(), Modal::ActionSelect { .. } | Modal::ActionConfirm { .. }) {
            self.table.render(frame);
        }
    }
}

/// Process signal flow: Normal -> SignalSelect -> Normal or Error.
#[derive(Default)]
pub struct SignalDialog {
    table: SignalTable,
}

pub fn is_kill_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('K') | KeyCode::F(9))
}

impl SignalDialog {
    pub fn open(&mut self, state: &mut ViewState, pid: u32) {
        state.suspend();
        state.set_modal(Modal::SignalSelect { pid });
        self.table.open();
    }

    pub fn handle_key<S: SignalSender>(
        &mut self,
        state: &mut ViewState,
        key: &KeyEvent,
        top: bool,
        sender: &S,
    ) -> Outcome {
        let pid = match state.modal() {
            Modal::SignalSelect { pid } => *pid,
            _ => return Outcome::Continue,
        };

        if let KeyCode::Char(c) = key.code {
            if let Some(digit) = c.to_digit(10) {
                self.table.digit(digit);
                return Outcome::Continue;
            }
        }
        self.table.reset_chord();

        if is_kill_key(key) {
            if let Some(spec) = signal_by_number(SIGTERM) {
                return self.send(state, sender, pid, spec);
            }
            return Outcome::Continue;
        }

        match key.code {
            KeyCode::Esc => state.restore(),
            KeyCode::Enter => {
                if let Some(spec) = self.table.selected() {
                    return self.send(state, sender, pid, spec);
                }
            }
            _ if top => self.table.scrollable().scroll_top(),
            _ => {
                if let Some(nav) = nav_for(key) {
                    self.table.scrollable().scroll(nav);
                }
            }
        }
        Outcome::Continue
    }

    fn send<S: SignalSender>(
        &mut self,
        state: &mut ViewState,
        sender: &S,
        pid: u32,
        spec: &SignalSpec,
    ) -> Outcome {
        match sender.send(pid, spec.signal) {
            Ok(()) => {
                info!(pid, signal = spec.name, "signal delivered");
                state.restore();
                Outcome::Refresh(Instant::now())
            }
            Err(e) => {
                self.table.mark_failed();
                state.show_error(
                    format!("sending {} to pid {} failed: {}", spec.name, pid, e),
                    Some(pid.to_string()),
                );
                Outcome::Continue
            }
        }
    }

    /// Drop the dialog if its target exited in the meantime.
    pub fn on_tick<S: SignalSender>(&mut self, state: &mut ViewState, sender: &S) {
        if let Modal::SignalSelect { pid } = state.modal() {
            let pid = *pid;
            if !sender.exists(pid) {
                info!(pid, "signal target exited, closing dialog");
                state.restore();
            }
        }
    }

    pub fn draw(&mut self, state: &ViewState, frame: &mut Frame) {
        if let Modal::SignalSelect { pid } = state.modal() {
            self.table.render(frame, *pid);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::actions::MockSignalSender;
    use crate::screens::tests::key;
    use crate::screens::NAV_HELP;
    use mockall::predicate::eq;
    use std::sync::{Arc, Mutex};
    use sysinfo::Signal;

    /// Records every call and answers with a fixed result.
    #[derive(Clone)]
    pub struct RecordingExecutor {
        pub calls: Arc<Mutex<Vec<(ContainerAction, String)>>>,
        pub result: Result<(), ActionError>,
        pub delay: Option<Duration>,
    }

    impl RecordingExecutor {
        pub fn answering(result: Result<(), ActionError>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                result,
                delay: None,
            }
        }

        pub fn calls(&self) -> Vec<(ContainerAction, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ActionExecutor for RecordingExecutor {
        async fn apply(&self, action: ContainerAction, entity: &str) -> Result<(), ActionError> {
            self.calls.lock().unwrap().push((action, entity.to_string()));
            if let Some(delay) = self.delay {
                time::sleep(delay).await;
            }
            self.result.clone()
        }
    }

    fn dialog() -> (ActionDialog, ViewState) {
        (
            ActionDialog::new(&ContainerAction::ALL, Duration::from_secs(5)),
            ViewState::new(NAV_HELP),
        )
    }

    #[tokio::test]
    async fn test_escape_cancels_without_executing() {
        let (mut dialog, mut state) = dialog();
        let executor = RecordingExecutor::answering(Ok(()));
        dialog.open(&mut state, "abc123".into());
        assert!(!state.is_running());

        let outcome = dialog.handle_key(&mut state, &key(KeyCode::Esc), false, &executor).await;
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(state.modal(), &Modal::Normal);
        assert!(state.is_running());
        assert!(executor.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_action_times_out_into_error_overlay() {
        let mut dialog = ActionDialog::new(&ContainerAction::ALL, Duration::from_millis(500));
        let mut state = ViewState::new(NAV_HELP);
        let mut executor = RecordingExecutor::answering(Ok(()));
        executor.delay = Some(Duration::from_secs(60));

        dialog.open(&mut state, "abc123".into());
        let outcome = dialog.handle_key(&mut state, &key(KeyCode::Enter), false, &executor).await;
        assert_eq!(outcome, Outcome::Continue);
        match state.modal() {
            Modal::Error { message, entity } => {
                assert!(message.contains("timed out"));
                assert_eq!(entity.as_deref(), Some("abc123"));
            }
            other => panic!("unexpected modal {:?}", other),
        }
    }

    #[test]
    fn test_kill_key_twice_sends_sigterm() {
        let mut signals = SignalDialog::default();
        let mut state = ViewState::new(NAV_HELP);
        let mut sender = MockSignalSender::new();
        sender
            .expect_send()
            .with(eq(42), eq(Signal::Term))
            .times(1)
            .returning(|_, _| Ok(()));

        signals.open(&mut state, 42);
        let outcome = signals.handle_key(&mut state, &key(KeyCode::Char('K')), false, &sender);
        assert!(matches!(outcome, Outcome::Refresh(_)));
        assert_eq!(state.modal(), &Modal::Normal);
    }

    #[test]
    fn test_enter_sends_chorded_signal() {
        let mut signals = SignalDialog::default();
        let mut state = ViewState::new(NAV_HELP);
        let mut sender = MockSignalSender::new();
        sender
            .expect_send()
            .with(eq(7), eq(Signal::User2))
            .times(1)
            .returning(|_, _| Ok(()));

        signals.open(&mut state, 7);
        signals.handle_key(&mut state, &key(KeyCode::Char('1')), false, &sender);
        signals.handle_key(&mut state, &key(KeyCode::Char('2')), false, &sender);
        signals.handle_key(&mut state, &key(KeyCode::Enter), false, &sender);
        assert_eq!(state.modal(), &Modal::Normal);
    }

    #[test]
    fn test_failed_signal_opens_error_and_keeps_pause() {
        let mut signals = SignalDialog::default();
        let mut state = ViewState::new(NAV_HELP);
        let mut sender = MockSignalSender::new();
        sender
            .expect_send()
            .returning(|_, _| Err(ActionError::Failed("operation not permitted".into())));

        signals.open(&mut state, 1);
        signals.handle_key(&mut state, &key(KeyCode::Enter), false, &sender);
        match state.modal() {
            Modal::Error { message, .. } => assert!(message.contains("operation not permitted")),
            other => panic!("unexpected modal {:?}", other),
        }
        assert!(!state.is_running());
        state.handle_overlay_key(&key(KeyCode::Esc), false);
        assert!(state.is_running());
    }

    #[test]
    fn test_vanished_target_closes_dialog_on_tick() {
        let mut signals = SignalDialog::default();
        let mut state = ViewState::new(NAV_HELP);
        let mut sender = MockSignalSender::new();
        let mut alive = vec![true, false].into_iter();
        sender
            .expect_exists()
            .with(eq(99))
            .times(2)
            .returning(move |_| alive.next().unwrap_or(false));

        signals.open(&mut state, 99);
        signals.on_tick(&mut state, &sender);
        assert_eq!(state.modal(), &Modal::SignalSelect { pid: 99 });
        signals.on_tick(&mut state, &sender);
        assert_eq!(state.modal(), &Modal::Normal);
        assert!(state.is_running());
    }
}
