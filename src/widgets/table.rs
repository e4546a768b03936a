/// Scrollable table with a cursor, a visible window and optional sorting
///
/// Rows are replaced wholesale on every snapshot. The cursor is re-clamped
/// after every mutation so that `top <= selected < top + visible` holds for
/// any row count, and follows its row by key when a unique column is set.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use crate::widgets::sort::{sort_rows, ColumnKind};

pub const UP_ARROW: &str = "▲";
pub const DOWN_ARROW: &str = "▼";
pub const CURSOR: Color = Color::DarkGray;

/// A navigation request, independent of the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    HalfPageUp,
    HalfPageDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

/// Anything list-like the controller can point its navigation keys at.
pub trait Scrollable {
    fn scroll_up(&mut self);
    fn scroll_down(&mut self);
    fn scroll_half_page_up(&mut self);
    fn scroll_half_page_down(&mut self);
    fn scroll_page_up(&mut self);
    fn scroll_page_down(&mut self);
    fn scroll_top(&mut self);
    fn scroll_bottom(&mut self);
    fn scroll_to_index(&mut self, index: usize);
    fn enable_cursor(&mut self);
    fn disable_cursor(&mut self);

    fn scroll(&mut self, nav: Nav) {
        match nav {
            Nav::Up => self.scroll_up(),
            Nav::Down => self.scroll_down(),
            Nav::HalfPageUp => self.scroll_half_page_up(),
            Nav::HalfPageDown => self.scroll_half_page_down(),
            Nav::PageUp => self.scroll_page_up(),
            Nav::PageDown => self.scroll_page_down(),
            Nav::Top => self.scroll_top(),
            Nav::Bottom => self.scroll_bottom(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollableTable {
    title: String,
    header: Vec<String>,
    widths: Vec<Constraint>,
    rows: Vec<Vec<String>>,
    selected: usize,
    top: usize,
    visible: usize,
    cursor: bool,
    cursor_color: Color,
    unique_col: Option<usize>,
    sort: Option<(usize, bool)>,
    kinds: &'static [ColumnKind],
    row_color: Option<(usize, fn(&str) -> Color)>,
}

impl ScrollableTable {
    pub fn new(title: impl Into<String>, header: &[&str], widths: Vec<Constraint>) -> Self {
        Self {
            title: title.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            widths,
            rows: Vec::new(),
            selected: 0,
            top: 0,
            visible: 1,
            cursor: true,
            cursor_color: CURSOR,
            unique_col: None,
            sort: None,
            kinds: &[],
            row_color: None,
        }
    }

    /// Keep the cursor on the same entity across row replacements.
    pub fn with_unique_column(mut self, column: usize) -> Self {
        self.unique_col = Some(column);
        self
    }

    pub fn with_column_kinds(mut self, kinds: &'static [ColumnKind]) -> Self {
        self.kinds = kinds;
        self
    }

    /// Color each row by the value of `column`.
    pub fn with_row_color(mut self, column: usize, color: fn(&str) -> Color) -> Self {
        self.row_color = Some((column, color));
        self
    }

    pub fn without_cursor(mut self) -> Self {
        self.cursor = false;
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cursor_enabled(&self) -> bool {
        self.cursor
    }

    pub fn set_cursor_color(&mut self, color: Color) {
        self.cursor_color = color;
    }

    pub fn cursor_color(&self) -> Color {
        self.cursor_color
    }

    /// Cursor position, None while the table is empty.
    pub fn selected_index(&self) -> Option<usize> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn selected_row(&self) -> Option<&[String]> {
        self.selected_index().map(|i| self.rows[i].as_slice())
    }

    pub fn top_index(&self) -> usize {
        self.top
    }

    pub fn visible_rows(&self) -> usize {
        self.visible
    }

    /// Number of data rows that fit; normally derived from the drawn area.
    pub fn set_visible_rows(&mut self, visible: usize) {
        self.visible = visible.max(1);
        self.clamp();
    }

    pub fn sort_state(&self) -> Option<(usize, bool)> {
        self.sort
    }

    /// Replace every row, re-applying the active sort and re-locating the cursor.
    pub fn replace_rows(&mut self, mut rows: Vec<Vec<String>>) {
        let key = self
            .unique_col
            .and_then(|col| self.selected_row().and_then(|row| row.get(col).cloned()));

        if let Some((column, ascending)) = self.sort {
            sort_rows(&mut rows, column, ascending, self.kinds);
        }
        self.rows = rows;

        if let (Some(col), Some(key)) = (self.unique_col, key) {
            if let Some(pos) = self.rows.iter().position(|r| r.get(col) == Some(&key)) {
                self.selected = pos;
            }
        }
        self.clamp();
    }

    /// Sort by `column`, or pass None to go back to producer order on the next replace.
    pub fn set_sort(&mut self, sort: Option<(usize, bool)>) {
        match sort {
            Some((column, _)) if column >= self.header.len() => {}
            Some((column, ascending)) => {
                self.sort = Some((column, ascending));
                let rows = std::mem::take(&mut self.rows);
                self.replace_rows(rows);
            }
            None => self.sort = None,
        }
    }

    /// Header cells with the direction marker on the sorted column.
    pub fn header_labels(&self) -> Vec<String> {
        self.header
            .iter()
            .enumerate()
            .map(|(i, h)| match self.sort {
                Some((column, true)) if column == i => format!("{} {}", h, UP_ARROW),
                Some((column, false)) if column == i => format!("{} {}", h, DOWN_ARROW),
                _ => h.clone(),
            })
            .collect()
    }

    fn clamp(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
            self.top = 0;
            return;
        }
        let last = self.rows.len() - 1;
        self.selected = self.selected.min(last);
        if self.selected < self.top {
            self.top = self.selected;
        } else if self.selected >= self.top + self.visible {
            self.top = self.selected + 1 - self.visible;
        }
        // Keep the window full when rows shrink below it.
        self.top = self.top.min(self.rows.len().saturating_sub(self.visible));
    }

    fn move_by(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta);
        self.clamp();
    }

    fn half_page(&self) -> isize {
        (self.visible / 2).max(1) as isize
    }

    fn page(&self) -> isize {
        self.visible as isize
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        // Two border lines and the header line.
        self.set_visible_rows(area.height.saturating_sub(3) as usize);

        let header = Row::new(self.header_labels().into_iter().map(|h| {
            Cell::from(Span::styled(
                h,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
        }));

        let end = (self.top + self.visible).min(self.rows.len());
        let rows: Vec<Row> = self.rows[self.top..end]
            .iter()
            .enumerate()
            .map(|(offset, cells)| {
                let mut row = Row::new(cells.iter().map(|c| Cell::from(c.as_str())));
                if let Some(color) = self
                    .row_color
                    .and_then(|(col, color)| cells.get(col).map(|cell| color(cell)))
                {
                    row = row.style(Style::default().fg(color));
                }
                if self.cursor && self.top + offset == self.selected {
                    row.style(Style::default().bg(self.cursor_color).add_modifier(Modifier::BOLD))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(rows, self.widths.clone())
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(self.title.as_str()));

        frame.render_widget(table, area);
    }
}

impl Scrollable for ScrollableTable {
    fn scroll_up(&mut self) {
        self.move_by(-1);
    }

    fn scroll_down(&mut self) {
        self.move_by(1);
    }

    fn scroll_half_page_up(&mut self) {
        self.move_by(-self.half_page());
    }

    fn scroll_half_page_down(&mut self) {
        self.move_by(self.half_page());
    }

    fn scroll_page_up(&mut self) {
        self.move_by(-self.page());
    }

    fn scroll_page_down(&mut self) {
        self.move_by(self.page());
    }

    fn scroll_top(&mut self) {
        self.selected = 0;
        self.clamp();
    }

    fn scroll_bottom(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
        self.clamp();
    }

    fn scroll_to_index(&mut self, index: usize) {
        self.selected = index;
        self.clamp();
    }

    fn enable_cursor(&mut self) {
        self.cursor = true;
    }

    fn disable_cursor(&mut self) {
        self.cursor = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::sort::PROCESS_COLUMNS;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn numbered(n: usize) -> Vec<Vec<String>> {
        (0..n).map(|i| vec![i.to_string(), format!("row{}", i)]).collect()
    }

    fn table(rows: usize, visible: usize) -> ScrollableTable {
        let mut t = ScrollableTable::new("t", &["N", "Name"], vec![Constraint::Length(4), Constraint::Min(4)]);
        t.replace_rows(numbered(rows));
        t.set_visible_rows(visible);
        t
    }

    fn assert_invariants(t: &ScrollableTable) {
        match t.selected_index() {
            None => assert!(t.is_empty()),
            Some(sel) => {
                assert!(sel < t.len());
                assert!(t.top_index() <= sel);
                assert!(sel < t.top_index() + t.visible_rows());
            }
        }
    }

    #[test]
    fn test_shrinking_rows_clamps_cursor() {
        for n in 1..12 {
            for m in 0..n {
                let mut t = table(n, 4);
                t.scroll_bottom();
                t.replace_rows(numbered(m));
                assert_invariants(&t);
                if m > 0 {
                    assert_eq!(t.selected_index(), Some(m - 1));
                }
            }
        }
    }

    #[test]
    fn test_empty_table_has_no_selection() {
        let mut t = table(3, 4);
        t.replace_rows(Vec::new());
        assert_eq!(t.selected_index(), None);
        assert!(t.selected_row().is_none());
        t.scroll_down();
        t.scroll_page_down();
        assert_eq!(t.selected_index(), None);
    }

    #[test]
    fn test_paging_stays_in_bounds() {
        let mut t = table(20, 5);
        t.scroll_page_down();
        assert_eq!(t.selected_index(), Some(5));
        assert_invariants(&t);
        t.scroll_half_page_down();
        assert_eq!(t.selected_index(), Some(7));
        t.scroll_bottom();
        assert_eq!(t.selected_index(), Some(19));
        assert_eq!(t.top_index(), 15);
        t.scroll_page_down();
        assert_eq!(t.selected_index(), Some(19));
        t.scroll_half_page_up();
        assert_eq!(t.selected_index(), Some(17));
        t.scroll_top();
        assert_eq!((t.selected_index(), t.top_index()), (Some(0), 0));
        t.scroll_up();
        assert_eq!(t.selected_index(), Some(0));
    }

    #[test]
    fn test_scroll_to_index_clamps() {
        let mut t = table(10, 3);
        t.scroll_to_index(6);
        assert_eq!(t.selected_index(), Some(6));
        assert_invariants(&t);
        t.scroll_to_index(99);
        assert_eq!(t.selected_index(), Some(9));
        assert_invariants(&t);
    }

    #[test]
    fn test_unique_column_follows_entity() {
        let mut t = ScrollableTable::new("procs", &["PID", "Command"], vec![])
            .with_unique_column(0)
            .with_column_kinds(PROCESS_COLUMNS);
        t.set_visible_rows(10);
        t.replace_rows(vec![
            vec!["10".into(), "a".into()],
            vec!["20".into(), "b".into()],
            vec!["30".into(), "c".into()],
        ]);
        t.scroll_to_index(1);
        t.replace_rows(vec![
            vec!["5".into(), "new".into()],
            vec!["10".into(), "a".into()],
            vec!["20".into(), "b".into()],
        ]);
        assert_eq!(t.selected_row().map(|r| r[0].as_str()), Some("20"));
    }

    #[test]
    fn test_sort_applies_to_replaced_rows_and_marks_header() {
        let mut t = ScrollableTable::new("procs", &["PID", "Command"], vec![])
            .with_column_kinds(PROCESS_COLUMNS);
        t.replace_rows(vec![vec!["3".into(), "c".into()], vec!["1".into(), "a".into()]]);
        t.set_sort(Some((0, true)));
        assert_eq!(t.rows()[0][0], "1");
        assert_eq!(t.header_labels()[0], format!("PID {}", UP_ARROW));

        t.replace_rows(vec![vec!["9".into(), "z".into()], vec!["2".into(), "b".into()]]);
        assert_eq!(t.rows()[0][0], "2");

        t.set_sort(Some((0, false)));
        assert_eq!(t.rows()[0][0], "9");
        assert_eq!(t.header_labels()[0], format!("PID {}", DOWN_ARROW));

        t.set_sort(None);
        assert_eq!(t.header_labels()[0], "PID");
        t.replace_rows(vec![vec!["4".into(), "d".into()], vec!["8".into(), "e".into()]]);
        assert_eq!(t.rows()[0][0], "4");
    }

    #[test]
    fn test_sort_on_missing_column_is_ignored() {
        let mut t = table(3, 3);
        t.set_sort(Some((7, true)));
        assert_eq!(t.sort_state(), None);
    }

    #[test]
    fn test_render_derives_visible_rows() {
        let mut t = table(50, 1);
        let mut terminal = Terminal::new(TestBackend::new(30, 10)).unwrap();
        terminal
            .draw(|f| {
                let area = f.size();
                t.render(f, area);
            })
            .unwrap();
        assert_eq!(t.visible_rows(), 7);
        t.scroll_page_down();
        assert_eq!(t.selected_index(), Some(7));
    }
}
