/// Rolling series backing the sparkline and line charts

use std::collections::VecDeque;

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Sparkline};
use ratatui::Frame;

/// Points kept per chart
pub const HISTORY_LEN: usize = 100;

const LINE_COLORS: &[Color] = &[
    Color::Green,
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::Red,
    Color::LightGreen,
    Color::LightCyan,
];

#[derive(Debug, Clone)]
pub struct RollingSeries {
    points: VecDeque<f64>,
    capacity: usize,
}

impl Default for RollingSeries {
    fn default() -> Self {
        Self::new(HISTORY_LEN)
    }
}

impl RollingSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.points.back().copied()
    }

    pub fn max(&self) -> f64 {
        self.points.iter().copied().fold(0.0, f64::max)
    }

    /// Most recent `width` points, scaled for a sparkline.
    pub fn tail_u64(&self, width: usize) -> Vec<u64> {
        let skip = self.points.len().saturating_sub(width);
        self.points
            .iter()
            .skip(skip)
            .map(|v| v.max(0.0).round() as u64)
            .collect()
    }

    /// (x, y) pairs with the newest point at `capacity - 1`.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let offset = self.capacity - self.points.len();
        self.points
            .iter()
            .enumerate()
            .map(|(i, v)| ((offset + i) as f64, *v))
            .collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, color: Color, max: Option<u64>) {
        let data = self.tail_u64(area.width.saturating_sub(2) as usize);
        let mut sparkline = Sparkline::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .data(&data)
            .style(Style::default().fg(color));
        if let Some(max) = max {
            sparkline = sparkline.max(max);
        }
        frame.render_widget(sparkline, area);
    }
}

/// Several named series on one braille line chart.
pub fn render_lines(frame: &mut Frame, area: Rect, title: &str, series: &[(String, &RollingSeries)], max: f64) {
    let points: Vec<Vec<(f64, f64)>> = series.iter().map(|(_, s)| s.points()).collect();
    let capacity = series.first().map(|(_, s)| s.capacity).unwrap_or(HISTORY_LEN);

    let datasets: Vec<Dataset> = series
        .iter()
        .zip(&points)
        .enumerate()
        .map(|(i, ((name, _), data))| {
            Dataset::default()
                .name(name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(LINE_COLORS[i % LINE_COLORS.len()]))
                .data(data)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(Axis::default().bounds([0.0, capacity.saturating_sub(1) as f64]))
        .y_axis(
            Axis::default()
                .bounds([0.0, max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{:.0}", max))]),
        );
    frame.render_widget(chart, area);
}
