/// Single container view: details, mounts, networks, per-CPU usage, ports and processes

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Color;
use ratatui::Frame;

use crate::core::actions::{ActionExecutor, ContainerAction};
use crate::core::docker::short_id;
use crate::core::metrics::ContainerDetailSnapshot;
use crate::screens::dialog::{ActionDialog, ACTION_HELP};
use crate::screens::{is_quit, nav_for, Modal, Outcome, View, ViewState, NAV_HELP};
use crate::utils::format_bytes;
use crate::widgets::chart::RollingSeries;
use crate::widgets::table::{Scrollable, ScrollableTable};

/// Removing the viewed container would leave nothing to show.
const DETAIL_ACTIONS: [ContainerAction; 5] = [
    ContainerAction::Pause,
    ContainerAction::Unpause,
    ContainerAction::Restart,
    ContainerAction::Stop,
    ContainerAction::Kill,
];

const DETAIL_HELP: &[(&str, &str)] = &[("1-6", "Focus details, mounts, networks, CPUs, ports, processes")];

const DETAILS: usize = 0;
const MOUNTS: usize = 1;
const NETWORKS: usize = 2;
const CPUS: usize = 3;
const PORTS: usize = 4;
const PROCS: usize = 5;

pub struct ContainerDetailView<A: ActionExecutor> {
    id: String,
    state: ViewState,
    tables: [ScrollableTable; 6],
    focus: usize,
    cpu: RollingSeries,
    memory: RollingSeries,
    actions: ActionDialog,
    executor: A,
}

fn two_columns(title: &str, header: &[&str]) -> ScrollableTable {
    ScrollableTable::new(
        title,
        header,
        vec![Constraint::Percentage(50), Constraint::Percentage(50)],
    )
}

impl<A: ActionExecutor> ContainerDetailView<A> {
    pub fn new(id: &str, executor: A, action_timeout: Duration) -> Self {
        let help: Vec<(&str, &str)> = NAV_HELP
            .iter()
            .chain(DETAIL_HELP)
            .chain(ACTION_HELP)
            .copied()
            .collect();
        let mut tables = [
            two_columns(" [1] Details ", &["Field", "Value"]),
            ScrollableTable::new(
                " [2] Mounts ",
                &["Source", "Destination", "Mode"],
                vec![Constraint::Percentage(45), Constraint::Percentage(45), Constraint::Min(4)],
            ),
            ScrollableTable::new(
                " [3] Networks ",
                &["Network", "IP", "Gateway"],
                vec![Constraint::Percentage(34), Constraint::Percentage(33), Constraint::Percentage(33)],
            ),
            two_columns(" [4] CPUs ", &["Core", "Usage"]),
            two_columns(" [5] Ports ", &["Host", "Container"]),
            ScrollableTable::new(
                " [6] Processes ",
                &["UID", "PID", "Command"],
                vec![Constraint::Length(10), Constraint::Length(8), Constraint::Min(10)],
            ),
        ];
        for table in tables.iter_mut().skip(1) {
            table.disable_cursor();
        }
        Self {
            id: id.to_string(),
            state: ViewState::new(&help),
            tables,
            focus: DETAILS,
            cpu: RollingSeries::default(),
            memory: RollingSeries::default(),
            actions: ActionDialog::new(&DETAIL_ACTIONS, action_timeout),
            executor,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn table(&self, index: usize) -> &ScrollableTable {
        &self.tables[index.min(PROCS)]
    }

    fn set_focus(&mut self, index: usize) {
        if index == self.focus || index > PROCS {
            return;
        }
        self.tables[self.focus].disable_cursor();
        self.focus = index;
        self.tables[index].enable_cursor();
    }
}

impl<A: ActionExecutor> View for ContainerDetailView<A> {
    type Snapshot = ContainerDetailSnapshot;

    fn apply(&mut self, snapshot: ContainerDetailSnapshot) {
        let c = &snapshot.summary;
        self.cpu.push(c.cpu);
        self.memory.push(c.memory_percent);

        self.tables[DETAILS].replace_rows(vec![
            vec!["ID".into(), short_id(&c.id)],
            vec!["Name".into(), c.name.clone()],
            vec!["Image".into(), c.image.clone()],
            vec!["Status".into(), c.status.clone()],
            vec!["State".into(), c.state.clone()],
            vec![
                "PID".into(),
                snapshot.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            ],
            vec!["CPU".into(), format!("{:.2}%", c.cpu)],
            vec!["Memory".into(), format!("{:.2}%", c.memory_percent)],
            vec!["Net I/O".into(), format!("{} / {}", format_bytes(c.net_rx), format_bytes(c.net_tx))],
            vec![
                "Block I/O".into(),
                format!("{} / {}", format_bytes(c.block_read), format_bytes(c.block_write)),
            ],
        ]);
        self.tables[MOUNTS].replace_rows(
            snapshot
                .mounts
                .iter()
                .map(|m| vec![m.source.clone(), m.destination.clone(), m.mode.clone()])
                .collect(),
        );
        self.tables[NETWORKS].replace_rows(
            snapshot
                .networks
                .iter()
                .map(|n| vec![n.name.clone(), n.ip_address.clone(), n.gateway.clone()])
                .collect(),
        );
        self.tables[CPUS].replace_rows(
            snapshot
                .per_cpu
                .iter()
                .enumerate()
                .map(|(i, usage)| {
                    let usage = usage.map(|u| format!("{:.2}%", u)).unwrap_or_else(|| "NA".into());
                    vec![format!("cpu{}", i), usage]
                })
                .collect(),
        );
        self.tables[PORTS].replace_rows(
            snapshot
                .ports
                .iter()
                .map(|p| vec![p.host.clone(), p.container.clone()])
                .collect(),
        );
        self.tables[PROCS].replace_rows(
            snapshot
                .processes
                .iter()
                .map(|p| vec![p.uid.clone(), p.pid.clone(), p.command.clone()])
                .collect(),
        );
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Outcome {
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

        match key.code {
            KeyCode::Enter => self.actions.open(&mut self.state, self.id.clone()),
            KeyCode::Char(c @ '1'..='6') => self.set_focus((c as u8 - b'1') as usize),
            KeyCode::Char('?') => self.state.show_help(),
            KeyCode::Char('p') => self.state.toggle_running(),
            _ if top => self.tables[self.focus].scroll_top(),
            _ => {
                if let Some(nav) = nav_for(&key) {
                    self.tables[self.focus].scroll(nav);
                }
            }
        }
        Outcome::Continue
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let color = self.state.cursor_color();
        for table in &mut self.tables {
            table.set_cursor_color(color);
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7),
                Constraint::Length(13),
                Constraint::Length(8),
                Constraint::Min(5),
            ])
            .split(frame.size());

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);
        let cpu_title = format!(
            " {} CPU {:.1}%{} ",
            short_id(&self.id),
            self.cpu.last().unwrap_or(0.0),
            self.state.status_tag()
        );
        let cpu_max = self.cpu.max().ceil().max(100.0) as u64;
        self.cpu.render(frame, charts[0], &cpu_title, Color::Green, Some(cpu_max));
        let mem_title = format!(" Memory {:.1}% ", self.memory.last().unwrap_or(0.0));
        self.memory.render(frame, charts[1], &mem_title, Color::Yellow, Some(100));

        let upper = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);
        self.tables[DETAILS].render(frame, upper[0]);
        self.tables[CPUS].render(frame, upper[1]);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(35),
                Constraint::Percentage(25),
            ])
            .split(rows[2]);
        self.tables[MOUNTS].render(frame, middle[0]);
        self.tables[NETWORKS].render(frame, middle[1]);
        self.tables[PORTS].render(frame, middle[2]);

        self.tables[PROCS].render(frame, rows[3]);

        self.actions.draw(&self.state, frame);
        self.state.draw_overlay(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::{ContainerProcess, ContainerRow, MountInfo};
    use crate::screens::dialog::tests::RecordingExecutor;
    use crate::screens::tests::key;
    use crate::widgets::overlay::ARMED;
    use crate::widgets::table::CURSOR;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    const ID: &str = "0123456789abcdef0123";

    fn snapshot() -> ContainerDetailSnapshot {
        ContainerDetailSnapshot {
            summary: ContainerRow {
                id: ID.into(),
                name: "db".into(),
                state: "running".into(),
                cpu: 12.0,
                ..Default::default()
            },
            pid: Some(4242),
            per_cpu: vec![Some(10.0), None],
            mounts: vec![MountInfo {
                source: "/data".into(),
                destination: "/var/lib/db".into(),
                mode: "rw".into(),
            }],
            processes: (1..=3)
                .map(|pid| ContainerProcess {
                    uid: "root".into(),
                    pid: pid.to_string(),
                    command: "postgres".into(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn view(executor: &RecordingExecutor) -> ContainerDetailView<RecordingExecutor> {
        let mut view = ContainerDetailView::new(ID, executor.clone(), Duration::from_secs(5));
        view.apply(snapshot());
        view
    }

    #[test]
    fn test_apply_marks_unknown_cpu_readings() {
        let view = view(&RecordingExecutor::answering(Ok(())));
        assert_eq!(view.table(CPUS).rows()[0][1], "10.00%");
        assert_eq!(view.table(CPUS).rows()[1][1], "NA");
        assert_eq!(view.table(DETAILS).rows()[0][1], "0123456789ab");
        assert_eq!(view.table(DETAILS).rows()[5][1], "4242");
    }

    #[tokio::test]
    async fn test_digits_move_focus_and_cursor() {
        let mut view = view(&RecordingExecutor::answering(Ok(())));
        assert!(view.table(DETAILS).cursor_enabled());
        assert!(!view.table(PROCS).cursor_enabled());

        view.handle_key(key(KeyCode::Char('6'))).await;
        assert_eq!(view.focus(), PROCS);
        assert!(view.table(PROCS).cursor_enabled());
        assert!(!view.table(DETAILS).cursor_enabled());

        view.handle_key(key(KeyCode::Char('G'))).await;
        assert_eq!(view.table(PROCS).selected_index(), Some(2));
        assert_eq!(view.table(DETAILS).selected_index(), Some(0));

        view.handle_key(key(KeyCode::Char('9'))).await;
        assert_eq!(view.focus(), PROCS);
    }

    #[tokio::test]
    async fn test_actions_target_viewed_container() {
        let executor = RecordingExecutor::answering(Ok(()));
        let mut view = view(&executor);
        view.handle_key(key(KeyCode::Char('2'))).await;

        view.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(view.state().modal(), &Modal::ActionSelect { entity: ID.into() });
        // The list stops at KILL.
        for _ in 0..10 {
            view.handle_key(key(KeyCode::Char('j'))).await;
        }
        let outcome = view.handle_key(key(KeyCode::Enter)).await;
        assert!(matches!(outcome, Outcome::Refresh(_)));
        assert_eq!(executor.calls(), vec![(ContainerAction::Kill, ID.to_string())]);
        assert_eq!(view.focus(), MOUNTS);
    }

    #[tokio::test]
    async fn test_action_list_arms_focused_table() {
        let mut view = view(&RecordingExecutor::answering(Ok(())));
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        view.handle_key(key(KeyCode::Char('6'))).await;

        view.handle_key(key(KeyCode::Enter)).await;
        terminal.draw(|f| view.draw(f)).unwrap();
        assert_eq!(view.table(PROCS).cursor_color(), ARMED);

        view.handle_key(key(KeyCode::Esc)).await;
        terminal.draw(|f| view.draw(f)).unwrap();
        assert_eq!(view.table(PROCS).cursor_color(), CURSOR);
    }

    #[test]
    fn test_draws_into_test_backend() {
        let mut view = view(&RecordingExecutor::answering(Ok(())));
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| view.draw(f)).unwrap();
    }
}
