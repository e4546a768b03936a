/// Popups drawn over a view: help, error, container actions and signals

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::core::actions::{ContainerAction, SignalSpec, SIGNALS};
use crate::widgets::table::{Scrollable, ScrollableTable};

/// Cursor color while a destructive choice is staged
pub const ARMED: Color = Color::Red;

/// Centered popup area, clipped to the screen
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = area.width.min(width);
    let height = area.height.min(height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn keybinding_table(title: &str, bindings: &[(&str, &str)]) -> ScrollableTable {
    let mut table = ScrollableTable::new(
        title,
        &["Key", "Action"],
        vec![Constraint::Length(18), Constraint::Min(20)],
    );
    table.replace_rows(
        bindings
            .iter()
            .map(|(key, action)| vec![key.to_string(), action.to_string()])
            .collect(),
    );
    table
}

pub struct HelpMenu {
    table: ScrollableTable,
}

impl HelpMenu {
    pub fn new(bindings: &[(&str, &str)]) -> Self {
        Self {
            table: keybinding_table(" Help (Esc to close) ", bindings),
        }
    }

    pub fn scrollable(&mut self) -> &mut dyn Scrollable {
        &mut self.table
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = centered_rect(frame.size(), 70, 24);
        frame.render_widget(Clear, area);
        self.table.render(frame, area);
    }
}

/// Error text plus the navigation help, so the way out is always on screen.
pub struct ErrorBox {
    message: String,
    table: ScrollableTable,
}

impl ErrorBox {
    pub fn new(bindings: &[(&str, &str)]) -> Self {
        Self {
            message: String::new(),
            table: keybinding_table(" Keys ", bindings),
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.table.scroll_top();
    }

    pub fn scrollable(&mut self) -> &mut dyn Scrollable {
        &mut self.table
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = centered_rect(frame.size(), 70, 24);
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(3)])
            .split(area);

        let text = vec![
            Line::from(Span::styled(
                self.message.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press [Esc] to dismiss",
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )),
        ];
        let paragraph = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, chunks[0]);
        self.table.render(frame, chunks[1]);
    }
}

pub struct ActionTable {
    actions: Vec<ContainerAction>,
    table: ScrollableTable,
}

impl ActionTable {
    pub fn new(actions: &[ContainerAction]) -> Self {
        let mut table = ScrollableTable::new(
            " Actions (Enter to confirm) ",
            &["Action"],
            vec![Constraint::Min(10)],
        );
        table.replace_rows(actions.iter().map(|a| vec![a.label().to_string()]).collect());
        Self {
            actions: actions.to_vec(),
            table,
        }
    }

    pub fn selected(&self) -> Option<ContainerAction> {
        self.table.selected_index().and_then(|i| self.actions.get(i).copied())
    }

    /// Open on the first action with the cursor armed.
    pub fn open(&mut self) {
        self.table.scroll_top();
        self.table.enable_cursor();
        self.table.set_cursor_color(ARMED);
    }

    pub fn is_armed(&self) -> bool {
        self.table.cursor_color() == ARMED
    }

    pub fn scrollable(&mut self) -> &mut dyn Scrollable {
        &mut self.table
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let height = self.actions.len() as u16 + 3;
        let area = centered_rect(frame.size(), 30, height);
        frame.render_widget(Clear, area);
        self.table.render(frame, area);
    }
}

/// Signal chooser; digits jump to a signal number, 1-3 may start a two-digit chord.
pub struct SignalTable {
    table: ScrollableTable,
    pending_digit: Option<u32>,
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalTable {
    pub fn new() -> Self {
        let mut table = ScrollableTable::new(
            " Signals (Enter to send) ",
            &["No", "Signal", "Description"],
            vec![Constraint::Length(4), Constraint::Length(10), Constraint::Min(20)],
        );
        table.replace_rows(
            SIGNALS
                .iter()
                .map(|s| vec![s.number.to_string(), s.name.to_string(), s.description.to_string()])
                .collect(),
        );
        Self {
            table,
            pending_digit: None,
        }
    }

    pub fn open(&mut self) {
        self.pending_digit = None;
        self.table.scroll_top();
        self.table.enable_cursor();
        self.table.set_cursor_color(Color::DarkGray);
    }

    pub fn selected(&self) -> Option<&'static SignalSpec> {
        self.table.selected_index().and_then(|i| SIGNALS.get(i))
    }

    /// Jump to signal `number`; false when no such signal is listed.
    pub fn select_number(&mut self, number: u32) -> bool {
        match SIGNALS.iter().position(|s| s.number == number) {
            Some(idx) => {
                self.table.scroll_to_index(idx);
                true
            }
            None => false,
        }
    }

    /// Feed one digit key.
    pub fn digit(&mut self, digit: u32) {
        if let Some(prev) = self.pending_digit.take() {
            if self.select_number(prev * 10 + digit) {
                return;
            }
        }
        self.select_number(digit);
        if (1..=3).contains(&digit) {
            self.pending_digit = Some(digit);
        }
    }

    pub fn reset_chord(&mut self) {
        self.pending_digit = None;
    }

    /// Mark the cursor after a failed send.
    pub fn mark_failed(&mut self) {
        self.table.set_cursor_color(ARMED);
    }

    pub fn scrollable(&mut self) -> &mut dyn Scrollable {
        &mut self.table
    }

    pub fn render(&mut self, frame: &mut Frame, pid: u32) {
        let area = centered_rect(frame.size(), 60, 20);
        frame.render_widget(Clear, area);
        self.table.set_title(format!(" Send signal to pid {} (Enter to send) ", pid));
        self.table.render(frame, area);
    }
}
