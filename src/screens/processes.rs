/// Process list view with sorting and the signal dialog

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::Frame;

use crate::core::actions::SignalSender;
use crate::core::metrics::{ProcessListSnapshot, ProcessRow};
use crate::screens::dialog::{is_kill_key, SignalDialog, SIGNAL_HELP};
use crate::screens::{
    is_quit, nav_for, sort_request, Modal, Outcome, View, ViewState, NAV_HELP, SORT_HELP,
};
use crate::utils::format_timestamp;
use crate::widgets::sort::PROCESS_COLUMNS;
use crate::widgets::table::{Scrollable, ScrollableTable};

pub const PROCESS_HEADER: &[&str] = &[
    "PID",
    "Command",
    "CPU",
    "Memory",
    "Status",
    "Parent",
    "Start Time",
    "Run Time (s)",
];

pub fn process_widths() -> Vec<Constraint> {
    vec![
        Constraint::Length(8),
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(20),
        Constraint::Length(13),
    ]
}

pub fn process_cells(p: &ProcessRow) -> Vec<String> {
    vec![
        p.pid.to_string(),
        p.command.clone(),
        format!("{:.2}%", p.cpu),
        format!("{:.2}%", p.memory_percent),
        p.status.clone(),
        p.parent.map(|pid| pid.to_string()).unwrap_or_else(|| "-".to_string()),
        format_timestamp(p.start_time as i64),
        p.run_time.to_string(),
    ]
}

pub struct ProcessListView<S: SignalSender> {
    state: ViewState,
    table: ScrollableTable,
    signals: SignalDialog,
    sender: S,
}

impl<S: SignalSender> ProcessListView<S> {
    pub fn new(sender: S) -> Self {
        let help: Vec<(&str, &str)> = NAV_HELP
            .iter()
            .chain(SORT_HELP)
            .chain(SIGNAL_HELP)
            .copied()
            .collect();
        Self {
            state: ViewState::new(&help),
            table: ScrollableTable::new(" Processes ", PROCESS_HEADER, process_widths())
                .with_unique_column(0)
                .with_column_kinds(PROCESS_COLUMNS),
            signals: SignalDialog::default(),
            sender,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn table(&self) -> &ScrollableTable {
        &self.table
    }

    fn selected_pid(&self) -> Option<u32> {
        self.table
            .selected_row()
            .and_then(|row| row.first())
            .and_then(|pid| pid.parse().ok())
    }
}

impl<S: SignalSender> View for ProcessListView<S> {
    type Snapshot = ProcessListSnapshot;

    fn apply(&mut self, snapshot: ProcessListSnapshot) {
        self.table
            .replace_rows(snapshot.processes.iter().map(process_cells).collect());
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        let top = self.state.leader(&key);
        if is_quit(&key) {
            return Outcome::Quit;
        }
        if self.state.handle_overlay_key(&key, top) {
            return Outcome::Continue;
        }
        if let Modal::SignalSelect { .. } = self.state.modal() {
            return self.signals.handle_key(&mut self.state, &key, top, &self.sender);
        }

        if is_kill_key(&key) {
            if let Some(pid) = self.selected_pid() {
                self.signals.open(&mut self.state, pid);
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

    fn on_tick(&mut self) {
        self.signals.on_tick(&mut self.state, &self.sender);
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.table.set_cursor_color(self.state.cursor_color());
        self.table.set_title(format!(
            " Processes ({}){} ",
            self.table.len(),
            self.state.status_tag()
        ));
        let area = frame.size();
        self.table.render(frame, area);
        self.signals.draw(&self.state, frame);
        self.state.draw_overlay(frame);
    }
}
