/// Single process view: rolling CPU and memory charts, details and children

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Color;
use ratatui::Frame;

use crate::core::actions::SignalSender;
use crate::core::metrics::ProcessDetailSnapshot;
use crate::screens::dialog::{is_kill_key, SignalDialog, SIGNAL_HELP};
use crate::screens::processes::{process_cells, process_widths, PROCESS_HEADER};
use crate::screens::{
    is_quit, nav_for, sort_request, Modal, Outcome, View, ViewState, NAV_HELP, SORT_HELP,
};
use crate::utils::{format_bytes, format_timestamp, truncate_string};
use crate::widgets::chart::RollingSeries;
use crate::widgets::sort::PROCESS_COLUMNS;
use crate::widgets::table::{Scrollable, ScrollableTable};

pub struct ProcessDetailView<S: SignalSender> {
    pid: u32,
    state: ViewState,
    details: ScrollableTable,
    children: ScrollableTable,
    cpu: RollingSeries,
    memory: RollingSeries,
    signals: SignalDialog,
    sender: S,
    exited: bool,
}

impl<S: SignalSender> ProcessDetailView<S> {
    pub fn new(pid: u32, sender: S) -> Self {
        let help: Vec<(&str, &str)> = NAV_HELP
            .iter()
            .chain(SORT_HELP)
            .chain(SIGNAL_HELP)
            .copied()
            .collect();
        Self {
            pid,
            state: ViewState::new(&help),
            details: ScrollableTable::new(
                format!(" Process {} ", pid),
                &["Field", "Value"],
                vec![Constraint::Length(14), Constraint::Min(20)],
            )
            .without_cursor(),
            children: ScrollableTable::new(" Children ", PROCESS_HEADER, process_widths())
                .with_unique_column(0)
                .with_column_kinds(PROCESS_COLUMNS),
            cpu: RollingSeries::default(),
            memory: RollingSeries::default(),
            signals: SignalDialog::default(),
            sender,
            exited: false,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn details(&self) -> &ScrollableTable {
        &self.details
    }

    pub fn children(&self) -> &ScrollableTable {
        &self.children
    }

    pub fn cpu_history(&self) -> &RollingSeries {
        &self.cpu
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    fn title(&self) -> String {
        let tag = if self.exited { " [exited]" } else { self.state.status_tag() };
        format!(" Process {}{} ", self.pid, tag)
    }
}

impl<S: SignalSender> View for ProcessDetailView<S> {
    type Snapshot = ProcessDetailSnapshot;

    fn apply(&mut self, snapshot: ProcessDetailSnapshot) {
        self.exited = snapshot.exited;
        let p = &snapshot.process;
        // Charts freeze on the last live reading.
        if !snapshot.exited {
            self.cpu.push(p.cpu);
            self.memory.push(p.memory_percent);
        }

        self.details.replace_rows(vec![
            vec!["Command".into(), p.command.clone()],
            vec!["Executable".into(), snapshot.exe.clone()],
            vec!["Arguments".into(), truncate_string(&snapshot.cmdline, 200)],
            vec!["Status".into(), p.status.clone()],
            vec![
                "Parent".into(),
                p.parent.map(|pid| pid.to_string()).unwrap_or_else(|| "-".into()),
            ],
            vec!["Started".into(), format_timestamp(p.start_time as i64)],
            vec!["Run time".into(), format!("{}s", p.run_time)],
            vec!["Resident".into(), format_bytes(snapshot.memory)],
            vec!["Virtual".into(), format_bytes(snapshot.virtual_memory)],
            vec!["Disk read".into(), format_bytes(snapshot.read_bytes)],
            vec!["Disk written".into(), format_bytes(snapshot.written_bytes)],
        ]);

        self.children
            .replace_rows(snapshot.children.iter().map(process_cells).collect());
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
            if !self.exited {
                self.signals.open(&mut self.state, self.pid);
            }
            return Outcome::Continue;
        }
        if let Some(sort) = sort_request(&key) {
            self.children.set_sort(sort.as_sort());
            return Outcome::Continue;
        }

        match key.code {
            KeyCode::Char('?') => self.state.show_help(),
            KeyCode::Char('p') => self.state.toggle_running(),
            _ if top => self.children.scroll_top(),
            _ => {
                if let Some(nav) = nav_for(&key) {
                    self.children.scroll(nav);
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
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7),
                Constraint::Length(13),
                Constraint::Min(5),
            ])
            .split(frame.size());

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);
        let cpu_title = format!(" CPU {:.1}% ", self.cpu.last().unwrap_or(0.0));
        let cpu_max = self.cpu.max().ceil().max(100.0) as u64;
        self.cpu.render(frame, charts[0], &cpu_title, Color::Green, Some(cpu_max));
        let mem_title = format!(" Memory {:.1}% ", self.memory.last().unwrap_or(0.0));
        self.memory.render(frame, charts[1], &mem_title, Color::Yellow, Some(100));

        self.details.set_title(self.title());
        self.details.render(frame, rows[1]);
        self.children
            .set_title(format!(" Children ({}) ", self.children.len()));
        self.children.render(frame, rows[2]);

        self.signals.draw(&self.state, frame);
        self.state.draw_overlay(frame);
    }
}
