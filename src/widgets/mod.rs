// Reusable widgets on top of ratatui primitives:
// - ScrollableTable for every list and key/value table
// - sparkline history for the rolling charts
// - centered overlays for help, errors, actions and signals

pub mod chart;
pub mod overlay;
pub mod sort;
pub mod table;

pub use table::{Scrollable, ScrollableTable};
