/// Whole-system view: CPU chart or per-core table, memory, sensors, battery, disks and networks

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::core::metrics::{BatteryStats, HostInfo, SystemSnapshot};
use crate::screens::{is_quit, nav_for, Outcome, View, ViewState, NAV_HELP};
use crate::utils::{format_bytes, format_duration};
use crate::widgets::chart::{self, RollingSeries};
use crate::widgets::table::{Scrollable, ScrollableTable};

const OVERVIEW_HELP: &[(&str, &str)] = &[
    ("h / l", "Focus previous / next table"),
    ("t", "Switch between CPU chart and per-core table"),
];

/// Machines with more cores than this start on the per-core table.
const CPU_TABLE_THRESHOLD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMode {
    Chart,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewFocus {
    Cpu,
    Temperatures,
    Disks,
    Networks,
}

pub struct OverviewView {
    state: ViewState,
    cpu: ScrollableTable,
    memory: ScrollableTable,
    temperatures: ScrollableTable,
    disks: ScrollableTable,
    networks: ScrollableTable,
    focus: OverviewFocus,
    cpu_mode: CpuMode,
    cores: Vec<RollingSeries>,
    avg_cpu: RollingSeries,
    rx: RollingSeries,
    tx: RollingSeries,
    battery: Option<BatteryStats>,
    host: HostInfo,
}

impl Default for OverviewView {
    fn default() -> Self {
        Self::new()
    }
}

impl OverviewView {
    pub fn new() -> Self {
        let help: Vec<(&str, &str)> = NAV_HELP.iter().chain(OVERVIEW_HELP).copied().collect();
        Self {
            state: ViewState::new(&help),
            cpu: ScrollableTable::new(
                " Per CPU Usage ",
                &["Core", "Usage"],
                vec![Constraint::Length(6), Constraint::Min(8)],
            )
            .without_cursor(),
            memory: ScrollableTable::new(
                " Memory ",
                &["", "Value"],
                vec![Constraint::Length(10), Constraint::Min(10)],
            )
            .without_cursor(),
            temperatures: ScrollableTable::new(
                " Temp ",
                &["Sensor", "Current", "Critical"],
                vec![Constraint::Min(12), Constraint::Length(9), Constraint::Length(9)],
            )
            .without_cursor(),
            disks: ScrollableTable::new(
                " Disks ",
                &["Device", "Mount", "FS", "Total", "Used", "Use%"],
                vec![
                    Constraint::Min(10),
                    Constraint::Min(12),
                    Constraint::Length(8),
                    Constraint::Length(10),
                    Constraint::Length(10),
                    Constraint::Length(7),
                ],
            ),
            networks: ScrollableTable::new(
                " Network ",
                &["Interface", "Rx", "Tx", "Total Rx", "Total Tx"],
                vec![
                    Constraint::Min(10),
                    Constraint::Length(10),
                    Constraint::Length(10),
                    Constraint::Length(10),
                    Constraint::Length(10),
                ],
            )
            .without_cursor(),
            focus: OverviewFocus::Disks,
            cpu_mode: CpuMode::Chart,
            cores: Vec::new(),
            avg_cpu: RollingSeries::default(),
            rx: RollingSeries::default(),
            tx: RollingSeries::default(),
            battery: None,
            host: HostInfo::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn focus(&self) -> OverviewFocus {
        self.focus
    }

    pub fn cpu_mode(&self) -> CpuMode {
        self.cpu_mode
    }

    pub fn average_cpu(&self) -> &RollingSeries {
        &self.avg_cpu
    }

    pub fn cpu_table(&self) -> &ScrollableTable {
        &self.cpu
    }

    pub fn temperature_table(&self) -> &ScrollableTable {
        &self.temperatures
    }

    fn table(&mut self, focus: OverviewFocus) -> &mut ScrollableTable {
        match focus {
            OverviewFocus::Cpu => &mut self.cpu,
            OverviewFocus::Temperatures => &mut self.temperatures,
            OverviewFocus::Disks => &mut self.disks,
            OverviewFocus::Networks => &mut self.networks,
        }
    }

    fn focused(&mut self) -> &mut dyn Scrollable {
        self.table(self.focus)
    }

    fn focus_order(&self) -> Vec<OverviewFocus> {
        let mut order = Vec::with_capacity(4);
        if self.cpu_mode == CpuMode::Table {
            order.push(OverviewFocus::Cpu);
        }
        order.push(OverviewFocus::Temperatures);
        order.push(OverviewFocus::Disks);
        order.push(OverviewFocus::Networks);
        order
    }

    fn set_focus(&mut self, focus: OverviewFocus) {
        self.table(self.focus).disable_cursor();
        self.focus = focus;
        self.table(focus).enable_cursor();
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        self.set_focus(order[next]);
    }

    /// The per-core table takes focus when it appears and hands it to the disks when it goes.
    fn toggle_cpu(&mut self) {
        match self.cpu_mode {
            CpuMode::Chart => {
                self.cpu_mode = CpuMode::Table;
                self.set_focus(OverviewFocus::Cpu);
            }
            CpuMode::Table => {
                self.cpu_mode = CpuMode::Chart;
                if self.focus == OverviewFocus::Cpu {
                    self.set_focus(OverviewFocus::Disks);
                }
            }
        }
    }

    fn info_lines(&self) -> Vec<Line<'_>> {
        let (one, five, fifteen) = self.host.load_average;
        vec![
            Line::from(format!("Host: {}   OS: {}", self.host.hostname, self.host.os)),
            Line::from(format!(
                "Kernel: {}   Uptime: {}   Load: {:.2} {:.2} {:.2}",
                self.host.kernel,
                format_duration(self.host.uptime),
                one,
                five,
                fifteen
            )),
        ]
    }

    fn draw_battery(&self, frame: &mut Frame, area: Rect) {
        let (title, percent) = match &self.battery {
            Some(battery) => (
                format!(" Battery ({}) ", battery.status),
                battery.percent.clamp(0.0, 100.0) as u16,
            ),
            None => (" Battery Not Found ".to_string(), 0),
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .gauge_style(Style::default().fg(Color::Green))
            .percent(percent);
        frame.render_widget(gauge, area);
    }

    fn draw_cpu(&mut self, frame: &mut Frame, area: Rect) {
        match self.cpu_mode {
            CpuMode::Table => self.cpu.render(frame, area),
            CpuMode::Chart => {
                let series: Vec<(String, &RollingSeries)> = self
                    .cores
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (format!("cpu{}", i), s))
                    .collect();
                chart::render_lines(frame, area, " CPU History ", &series, 100.0);
            }
        }
    }
}

impl View for OverviewView {
    type Snapshot = SystemSnapshot;

    fn apply(&mut self, snapshot: SystemSnapshot) {
        if self.cores.is_empty() && snapshot.cpu.len() > CPU_TABLE_THRESHOLD {
            self.cpu_mode = CpuMode::Table;
        }
        self.cores.resize_with(snapshot.cpu.len(), RollingSeries::default);
        for (series, usage) in self.cores.iter_mut().zip(&snapshot.cpu) {
            series.push(*usage);
        }

        self.avg_cpu.push(snapshot.average_cpu());
        self.rx.push(snapshot.networks.iter().map(|n| n.rx).sum::<u64>() as f64);
        self.tx.push(snapshot.networks.iter().map(|n| n.tx).sum::<u64>() as f64);

        self.cpu.replace_rows(
            snapshot
                .cpu
                .iter()
                .enumerate()
                .map(|(i, usage)| vec![format!("cpu{}", i), format!("{:.1}%", usage)])
                .collect(),
        );

        let m = &snapshot.memory;
        self.memory.replace_rows(vec![
            vec!["Total".into(), format_bytes(m.total)],
            vec!["Used".into(), format_bytes(m.used)],
            vec!["Available".into(), format_bytes(m.available)],
            vec!["Swap".into(), format!("{} / {}", format_bytes(m.swap_used), format_bytes(m.swap_total))],
        ]);

        self.temperatures.replace_rows(
            snapshot
                .temperatures
                .iter()
                .map(|t| {
                    vec![
                        t.label.clone(),
                        format!("{:.1}°C", t.current),
                        t.critical
                            .map(|c| format!("{:.1}°C", c))
                            .unwrap_or_else(|| "-".into()),
                    ]
                })
                .collect(),
        );

        self.disks.replace_rows(
            snapshot
                .disks
                .iter()
                .map(|d| {
                    let used = d.total.saturating_sub(d.available);
                    let pct = if d.total > 0 { used as f64 / d.total as f64 * 100.0 } else { 0.0 };
                    vec![
                        d.name.clone(),
                        d.mount_point.clone(),
                        d.file_system.clone(),
                        format_bytes(d.total),
                        format_bytes(used),
                        format!("{:.1}%", pct),
                    ]
                })
                .collect(),
        );

        self.networks.replace_rows(
            snapshot
                .networks
                .iter()
                .map(|n| {
                    vec![
                        n.interface.clone(),
                        format_bytes(n.rx),
                        format_bytes(n.tx),
                        format_bytes(n.total_rx),
                        format_bytes(n.total_tx),
                    ]
                })
                .collect(),
        );

        self.battery = snapshot.battery;
        self.host = snapshot.host;
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        let top = self.state.leader(&key);
        if is_quit(&key) {
            return Outcome::Quit;
        }
        if self.state.handle_overlay_key(&key, top) {
            return Outcome::Continue;
        }

        match key.code {
            KeyCode::Char('?') => self.state.show_help(),
            KeyCode::Char('p') => self.state.toggle_running(),
            KeyCode::Char('t') => self.toggle_cpu(),
            KeyCode::Char('h') | KeyCode::Left => self.cycle_focus(false),
            KeyCode::Char('l') | KeyCode::Right => self.cycle_focus(true),
            _ if top => self.focused().scroll_top(),
            _ => {
                if let Some(nav) = nav_for(&key) {
                    self.focused().scroll(nav);
                }
            }
        }
        Outcome::Continue
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(7),
                Constraint::Percentage(50),
                Constraint::Min(5),
            ])
            .split(frame.size());

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(30)])
            .split(rows[0]);
        let info = Paragraph::new(self.info_lines()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" System{} ", self.state.status_tag())),
        );
        frame.render_widget(info, top[0]);
        self.draw_battery(frame, top[1]);

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(rows[1]);
        let avg_title = format!(" Average CPU {:.1}% ", self.avg_cpu.last().unwrap_or(0.0));
        self.avg_cpu.render(frame, charts[0], &avg_title, Color::Green, Some(100));
        let rx_title = format!(" Rx {} ", format_bytes(self.rx.last().unwrap_or(0.0) as u64));
        self.rx.render(frame, charts[1], &rx_title, Color::Cyan, None);
        let tx_title = format!(" Tx {} ", format_bytes(self.tx.last().unwrap_or(0.0) as u64));
        self.tx.render(frame, charts[2], &tx_title, Color::Magenta, None);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[2]);
        self.draw_cpu(frame, middle[0]);
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(3)])
            .split(middle[1]);
        self.memory.render(frame, side[0]);
        self.temperatures.render(frame, side[1]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[3]);
        self.disks.render(frame, bottom[0]);
        self.networks.render(frame, bottom[1]);

        self.state.draw_overlay(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::{MemoryStats, NetworkStats, Temperature};
    use crate::screens::tests::key;
    use crate::screens::Modal;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn snapshot(cpu: Vec<f64>) -> SystemSnapshot {
        SystemSnapshot {
            cpu,
            memory: MemoryStats { total: 8 << 30, used: 2 << 30, available: 6 << 30, ..Default::default() },
            networks: vec![NetworkStats { interface: "eth0".into(), rx: 1024, tx: 2048, ..Default::default() }],
            temperatures: vec![
                Temperature { label: "coretemp Core 0".into(), current: 48.0, critical: Some(100.0) },
                Temperature { label: "nvme Composite".into(), current: 39.5, critical: None },
            ],
            ..Default::default()
        }
    }

    fn screen(view: &mut OverviewView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| view.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_apply_updates_tables_and_series() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![10.0, 20.0]));
        assert_eq!(view.cpu_table().rows()[1], vec!["cpu1".to_string(), "20.0%".to_string()]);
        assert_eq!(view.average_cpu().last(), Some(15.0));
        assert_eq!(view.temperature_table().rows()[0][1], "48.0°C");
        assert_eq!(view.temperature_table().rows()[1][2], "-");
    }

    #[test]
    fn test_many_cores_start_on_table() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![1.0; 4]));
        assert_eq!(view.cpu_mode(), CpuMode::Chart);

        let mut view = OverviewView::new();
        view.apply(snapshot(vec![1.0; 16]));
        assert_eq!(view.cpu_mode(), CpuMode::Table);
    }

    #[tokio::test]
    async fn test_focus_cycles_and_follows_cpu_toggle() {
        let mut view = OverviewView::new();
        assert_eq!(view.focus(), OverviewFocus::Disks);
        view.handle_key(key(KeyCode::Char('l'))).await;
        assert_eq!(view.focus(), OverviewFocus::Networks);
        view.handle_key(key(KeyCode::Char('l'))).await;
        assert_eq!(view.focus(), OverviewFocus::Temperatures);
        view.handle_key(key(KeyCode::Char('h'))).await;
        assert_eq!(view.focus(), OverviewFocus::Networks);

        view.handle_key(key(KeyCode::Char('t'))).await;
        assert_eq!(view.cpu_mode(), CpuMode::Table);
        assert_eq!(view.focus(), OverviewFocus::Cpu);
        assert!(view.cpu_table().cursor_enabled());
        view.handle_key(key(KeyCode::Char('l'))).await;
        assert_eq!(view.focus(), OverviewFocus::Temperatures);
        assert!(!view.cpu_table().cursor_enabled());

        view.handle_key(key(KeyCode::Char('h'))).await;
        view.handle_key(key(KeyCode::Char('t'))).await;
        assert_eq!(view.cpu_mode(), CpuMode::Chart);
        assert_eq!(view.focus(), OverviewFocus::Disks);
        for _ in 0..4 {
            view.handle_key(key(KeyCode::Char('l'))).await;
            assert_ne!(view.focus(), OverviewFocus::Cpu);
        }
    }

    #[tokio::test]
    async fn test_gg_jumps_cpu_table_to_top() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![1.0; 8]));
        view.handle_key(key(KeyCode::Char('t'))).await;
        view.handle_key(key(KeyCode::Char('G'))).await;
        assert_eq!(view.cpu_table().selected_index(), Some(7));
        view.handle_key(key(KeyCode::Char('g'))).await;
        assert_eq!(view.cpu_table().selected_index(), Some(7));
        view.handle_key(key(KeyCode::Char('g'))).await;
        assert_eq!(view.cpu_table().selected_index(), Some(0));
    }

    #[tokio::test]
    async fn test_help_overlay_swallows_navigation() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![1.0; 4]));
        view.handle_key(key(KeyCode::Char('t'))).await;
        view.handle_key(key(KeyCode::Char('?'))).await;
        assert_eq!(view.state().modal(), &Modal::Help);
        view.handle_key(key(KeyCode::Char('j'))).await;
        assert_eq!(view.cpu_table().selected_index(), Some(0));
        view.handle_key(key(KeyCode::Esc)).await;
        assert_eq!(view.state().modal(), &Modal::Normal);
        assert_eq!(view.handle_key(key(KeyCode::Char('q'))).await, Outcome::Quit);
    }

    #[test]
    fn test_renders_temperature_table_and_missing_battery() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![5.0, 6.0]));
        let text = screen(&mut view);
        assert!(text.contains(" Temp "));
        assert!(text.contains("coretemp Core 0"));
        assert!(text.contains("48.0°C"));
        assert!(text.contains("Battery Not Found"));
    }

    #[test]
    fn test_renders_battery_level() {
        let mut view = OverviewView::new();
        let mut data = snapshot(vec![5.0]);
        data.battery = Some(BatteryStats { percent: 73.0, status: "Discharging".into() });
        view.apply(data);
        let text = screen(&mut view);
        assert!(text.contains("Battery (Discharging)"));
        assert!(text.contains("73%"));
    }

    #[tokio::test]
    async fn test_toggle_swaps_cpu_chart_for_table() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![5.0, 6.0]));
        let chart = screen(&mut view);
        assert!(chart.contains("CPU History"));
        assert!(!chart.contains("Per CPU Usage"));

        view.handle_key(key(KeyCode::Char('t'))).await;
        let table = screen(&mut view);
        assert!(table.contains("Per CPU Usage"));
        assert!(!table.contains("CPU History"));
        assert!(table.contains("6.0%"));
    }

    #[test]
    fn test_draws_without_panicking_on_small_terminal() {
        let mut view = OverviewView::new();
        view.apply(snapshot(vec![5.0, 6.0]));
        let mut terminal = Terminal::new(TestBackend::new(20, 8)).unwrap();
        terminal.draw(|f| view.draw(f)).unwrap();
    }
}
