/// Container list view with per-container actions

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::Frame;

use crate::core::actions::{ActionExecutor, ContainerAction};
use crate::core::docker::short_id;
use crate::core::metrics::{ContainerListSnapshot, ContainerRow};
use crate::screens::dialog::{ActionDialog, ACTION_HELP};
use crate::screens::{
    is_quit, nav_for, sort_request, Modal, Outcome, View, ViewState, NAV_HELP, SORT_HELP,
};
use crate::utils::{format_bytes, ContainerState};
use crate::widgets::sort::CONTAINER_COLUMNS;
use crate::widgets::table::{Scrollable, ScrollableTable};

const CONTAINER_HEADER: &[&str] = &[
    "ID", "Image", "Name", "Status", "State", "CPU", "Memory", "Net I/O", "Block I/O",
];

fn container_cells(c: &ContainerRow) -> Vec<String> {
    vec![
        short_id(&c.id),
        c.image.clone(),
        c.name.clone(),
        c.status.clone(),
        c.state.clone(),
        format!("{:.2}%", c.cpu),
        format!("{:.2}%", c.memory_percent),
        format!("{} / {}", format_bytes(c.net_rx), format_bytes(c.net_tx)),
        format!("{} / {}", format_bytes(c.block_read), format_bytes(c.block_write)),
    ]
}

pub struct ContainerListView<A: ActionExecutor> {
    state: ViewState,
    table: ScrollableTable,
    actions: ActionDialog,
    executor: A,
    total_cpu: f64,
    total_memory: f64,
    running: usize,
}

impl<A: ActionExecutor> ContainerListView<A> {
    pub fn new(executor: A, action_timeout: Duration) -> Self {
        let help: Vec<(&str, &str)> = NAV_HELP
            .iter()
            .chain(SORT_HELP)
            .chain(ACTION_HELP)
            .copied()
            .collect();
        Self {
            state: ViewState::new(&help),
            table: ScrollableTable::new(
                " Containers ",
                CONTAINER_HEADER,
                vec![
                    Constraint::Length(13),
                    Constraint::Min(12),
                    Constraint::Min(12),
                    Constraint::Length(20),
                    Constraint::Length(10),
                    Constraint::Length(8),
                    Constraint::Length(8),
                    Constraint::Length(21),
                    Constraint::Length(21),
                ],
            )
            .with_unique_column(0)
            .with_column_kinds(CONTAINER_COLUMNS)
            .with_row_color(4, |state| ContainerState::from(state).color()),
            actions: ActionDialog::new(&ContainerAction::ALL, action_timeout),
            executor,
            total_cpu: 0.0,
            total_memory: 0.0,
            running: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn table(&self) -> &ScrollableTable {
        &self.table
    }

    fn title(&self) -> String {
        format!(
            " Containers {}/{} running | CPU {:.2}% | Memory {:.2}%{} ",
            self.running,
            self.table.len(),
            self.total_cpu,
            self.total_memory,
            self.state.status_tag()
        )
    }

    async fn dispatch(&mut self, key: KeyEvent) -> Outcome {
        let top = self.state.leader(&key);
        if is_quit(&key) {
            return Outcome::Quit;
        }
        if self.state.handle_overlay_key(&key, top) {
            return Outcome::Continue;
        }
        if let Modal::ActionSelect { .. } = self.state.modal() {
            return self
                .actions
                .handle_key(&mut self.state, &key, top, &self.executor)
                .await;
        }

        if key.code == KeyCode::Enter {
            if let Some(id) = self.table.selected_row().and_then(|row| row.first()).cloned() {
                self.actions.open(&mut self.state, id);
            }
            return Outcome::Continue;
        }
        if let Some(sort) = sort_request(&key) {
            self.table.set_sort(sort.as_sort());
            return Outcome::Continue;
        }

        match key.code {
            KeyCode::Char('?') => self.state.show_help(),
            KeyCode::Char('p') => self.state.toggle_running(),
            _ if top => self.table.scroll_top(),
            _ => {
                if let Some(nav) = nav_for(&key) {
                    self.table.scroll(nav);
                }
            }
        }
        Outcome::Continue
    }
}

impl<A: ActionExecutor> View for ContainerListView<A> {
    type Snapshot = ContainerListSnapshot;

    fn apply(&mut self, snapshot: ContainerListSnapshot) {
        self.total_cpu = snapshot.total_cpu();
        self.total_memory = snapshot.total_memory();
        self.running = snapshot
            .containers
            .iter()
            .filter(|c| ContainerState::from(c.state.as_str()).is_running())
            .count();
        self.table
            .replace_rows(snapshot.containers.iter().map(container_cells).collect());
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        let outcome = self.dispatch(key).await;
        self.table.set_cursor_color(self.state.cursor_color());
        outcome
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.table.set_title(self.title());
        let area = frame.size();
        self.table.render(frame, area);
        self.actions.draw(&self.state, frame);
        self.state.draw_overlay(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ActionError;
    use crate::screens::dialog::tests::RecordingExecutor;
    use crate::screens::tests::key;
    use crate::widgets::overlay::ARMED;
    use crate::widgets::table::CURSOR;
    use ratatui::backend::TestBackend;
    use ratatui::style::Color;
    use ratatui::Terminal;

    fn container(id: &str, cpu: f64) -> ContainerRow {
        ContainerRow {
            id: id.into(),
            image: "nginx:latest".into(),
            name: format!("web-{}", id),
            status: "Up 5 minutes".into(),
            state: "running".into(),
            cpu,
            memory_percent: 2.0,
            ..Default::default()
        }
    }

    fn view(executor: &RecordingExecutor) -> ContainerListView<RecordingExecutor> {
        let mut view = ContainerListView::new(executor.clone(), Duration::from_secs(5));
        view.apply(ContainerListSnapshot {
            containers: vec![container("abc123", 1.0), container("def456", 2.0)],
        });
        view
    }

    #[tokio::test]
    async fn test_enter_twice_runs_exactly_one_action() {
        let executor = RecordingExecutor::answering(Ok(()));
        let mut view = view(&executor);

        assert_eq!(view.handle_key(key(KeyCode::Enter)).await, Outcome::Continue);
        assert_eq!(
            view.state().modal(),
            &Modal::ActionSelect { entity: "abc123".into() }
        );
        let outcome = view.handle_key(key(KeyCode::Enter)).await;

        assert!(matches!(outcome, Outcome::Refresh(_)));
        assert_eq!(executor.calls(), vec![(ContainerAction::Pause, "abc123".to_string())]);
        assert_eq!(view.state().modal(), &Modal::Normal);
        assert!(view.is_running());
    }

    #[tokio::test]
    async fn test_enter_then_escape_runs_nothing() {
        let executor = RecordingExecutor::answering(Ok(()));
        let mut view = view(&executor);

        view.handle_key(key(KeyCode::Enter)).await;
        assert!(!view.is_running());
        view.handle_key(key(KeyCode::Esc)).await;

        assert!(executor.calls().is_empty());
        assert_eq!(view.state().modal(), &Modal::Normal);
        assert!(view.is_running());
    }

    async fn kill_failing(paused_before: bool) {
        let executor =
            RecordingExecutor::answering(Err(ActionError::NotFound("abc123".into())));
        let mut view = view(&executor);
        if paused_before {
            view.handle_key(key(KeyCode::Char('p'))).await;
        }

        view.handle_key(key(KeyCode::Enter)).await;
        for _ in 0..4 {
            view.handle_key(key(KeyCode::Char('j'))).await;
        }
        let outcome = view.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(executor.calls(), vec![(ContainerAction::Kill, "abc123".to_string())]);

        match view.state().modal() {
            Modal::Error { message, entity } => {
                assert!(message.contains("no such container"));
                assert_eq!(entity.as_deref(), Some("abc123"));
            }
            other => panic!("unexpected modal {:?}", other),
        }
        assert!(!view.is_running());

        // Only Esc leaves the error overlay.
        view.handle_key(key(KeyCode::Enter)).await;
        assert!(matches!(view.state().modal(), Modal::Error { .. }));
        view.handle_key(key(KeyCode::Esc)).await;
        assert_eq!(view.state().modal(), &Modal::Normal);
        assert_eq!(view.is_running(), !paused_before);
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_kill_shows_error_until_escape() {
        kill_failing(false).await;
    }

    #[tokio::test]
    async fn test_failed_kill_keeps_user_pause() {
        kill_failing(true).await;
    }

    #[tokio::test]
    async fn test_cursor_follows_container_across_sort() {
        let executor = RecordingExecutor::answering(Ok(()));
        let mut view = view(&executor);
        view.handle_key(key(KeyCode::Char('j'))).await;
        assert_eq!(view.table().selected_row().map(|r| r[0].clone()), Some("def456".into()));

        view.handle_key(key(KeyCode::F(6))).await;
        assert_eq!(view.table().selected_index(), Some(0));
        assert_eq!(view.table().selected_row().map(|r| r[0].clone()), Some("def456".into()));
    }

    fn selected_row_background(
        view: &mut ContainerListView<RecordingExecutor>,
        terminal: &mut Terminal<TestBackend>,
    ) -> Color {
        terminal.draw(|f| view.draw(f)).unwrap();
        // Border, header, then the first data row.
        terminal.backend().buffer().get(1, 2).bg
    }

    #[tokio::test]
    async fn test_first_enter_arms_selected_row() {
        let executor = RecordingExecutor::answering(Ok(()));
        let mut view = view(&executor);
        let mut terminal = Terminal::new(TestBackend::new(120, 10)).unwrap();
        assert_eq!(selected_row_background(&mut view, &mut terminal), CURSOR);

        view.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(view.table().cursor_color(), ARMED);
        assert_eq!(selected_row_background(&mut view, &mut terminal), ARMED);

        view.handle_key(key(KeyCode::Esc)).await;
        assert_eq!(selected_row_background(&mut view, &mut terminal), CURSOR);

        view.handle_key(key(KeyCode::Enter)).await;
        view.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(view.table().cursor_color(), CURSOR);
    }

    #[test]
    fn test_title_reports_totals() {
        let executor = RecordingExecutor::answering(Ok(()));
        let mut view = view(&executor);
        let mut terminal = Terminal::new(TestBackend::new(120, 10)).unwrap();
        terminal.draw(|f| view.draw(f)).unwrap();
        assert!(view.title().contains("2/2 running"));
        assert!(view.title().contains("CPU 3.00%"));
    }
}
