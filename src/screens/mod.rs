/// Dashboard views and the key handling they share
///
/// Each view owns its widgets and a `ViewState` (modal state, run/pause
/// flag, leader key). Everything here is mutated only from the controller's
/// event loop.

pub mod container_detail;
pub mod containers;
pub mod controller;
pub mod dialog;
pub mod overview;
pub mod process_detail;
pub mod processes;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::Color;
use tokio::time::Instant;

use crate::core::actions::ContainerAction;
use crate::widgets::overlay::{ErrorBox, HelpMenu, ARMED};
use crate::widgets::table::{Nav, Scrollable, CURSOR};

pub use controller::{Controller, View};

/// What the controller should do after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
    /// An action went through; show the first snapshot sampled after this instant.
    Refresh(Instant),
}

/// Exactly one is active per view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Normal,
    Help,
    ActionSelect { entity: String },
    ActionConfirm { action: ContainerAction, entity: String },
    SignalSelect { pid: u32 },
    Error { message: String, entity: Option<String> },
}

/// A key that only fires when pressed twice in a row.
#[derive(Debug, Clone)]
pub struct LeaderKey {
    leader: char,
    pending: bool,
}

impl LeaderKey {
    pub fn new(leader: char) -> Self {
        Self { leader, pending: false }
    }

    /// Feed every key; true when this key completes the chord.
    pub fn observe(&mut self, key: &KeyEvent) -> bool {
        let is_leader = key.code == KeyCode::Char(self.leader)
            && !key.modifiers.contains(KeyModifiers::CONTROL);
        if is_leader && self.pending {
            self.pending = false;
            true
        } else {
            self.pending = is_leader;
            false
        }
    }
}

pub const NAV_HELP: &[(&str, &str)] = &[
    ("q, Ctrl-c", "Quit"),
    ("?", "Show this help"),
    ("Esc", "Close overlay"),
    ("p", "Pause / resume updates"),
    ("j, Down", "Move down"),
    ("k, Up", "Move up"),
    ("Ctrl-d / Ctrl-u", "Half page down / up"),
    ("Ctrl-f, PgDn", "Page down"),
    ("Ctrl-b, PgUp", "Page up"),
    ("gg, Home", "Go to top"),
    ("G, End", "Go to bottom"),
];

pub const SORT_HELP: &[(&str, &str)] = &[
    ("1-9", "Sort ascending by column"),
    ("F1-F9", "Sort descending by column"),
    ("0", "Disable sorting"),
];

pub fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => !key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Map a key to a navigation request. The `gg` chord is resolved by the caller.
pub fn nav_for(key: &KeyEvent) -> Option<Nav> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('d') if ctrl => Some(Nav::HalfPageDown),
        KeyCode::Char('u') if ctrl => Some(Nav::HalfPageUp),
        KeyCode::Char('f') if ctrl => Some(Nav::PageDown),
        KeyCode::Char('b') if ctrl => Some(Nav::PageUp),
        _ if ctrl => None,
        KeyCode::Char('j') | KeyCode::Down => Some(Nav::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Nav::Up),
        KeyCode::PageDown => Some(Nav::PageDown),
        KeyCode::PageUp => Some(Nav::PageUp),
        KeyCode::Home => Some(Nav::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Nav::Bottom),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortRequest {
    Clear,
    Column { index: usize, ascending: bool },
}

pub fn sort_request(key: &KeyEvent) -> Option<SortRequest> {
    match key.code {
        KeyCode::Char('0') => Some(SortRequest::Clear),
        KeyCode::Char(c @ '1'..='9') => Some(SortRequest::Column {
            index: (c as u8 - b'1') as usize,
            ascending: true,
        }),
        KeyCode::F(n @ 1..=9) => Some(SortRequest::Column {
            index: (n - 1) as usize,
            ascending: false,
        }),
        _ => None,
    }
}

impl SortRequest {
    pub fn as_sort(self) -> Option<(usize, bool)> {
        match self {
            SortRequest::Clear => None,
            SortRequest::Column { index, ascending } => Some((index, ascending)),
        }
    }
}

/// Per-view interaction state shared by every view.
pub struct ViewState {
    modal: Modal,
    running: bool,
    resume: bool,
    leader: LeaderKey,
    pub help: HelpMenu,
    pub error: ErrorBox,
}

impl ViewState {
    pub fn new(help: &[(&str, &str)]) -> Self {
        Self {
            modal: Modal::Normal,
            running: true,
            resume: true,
            leader: LeaderKey::new('g'),
            help: HelpMenu::new(help),
            error: ErrorBox::new(NAV_HELP),
        }
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn set_modal(&mut self, modal: Modal) {
        self.modal = modal;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    /// True when `key` completes the `gg` chord.
    pub fn leader(&mut self, key: &KeyEvent) -> bool {
        self.leader.observe(key)
    }

    /// Freeze snapshot application while a dialog owns the view.
    pub fn suspend(&mut self) {
        self.resume = self.running;
        self.running = false;
    }

    /// Leave any dialog and put the run flag back to its pre-dialog value.
    pub fn restore(&mut self) {
        self.running = self.resume;
        self.modal = Modal::Normal;
    }

    pub fn show_help(&mut self) {
        self.modal = Modal::Help;
    }

    pub fn show_error(&mut self, message: String, entity: Option<String>) {
        self.error.set_message(message.clone());
        self.modal = Modal::Error { message, entity };
    }

    /// Keys for the help and error overlays. Returns false in any other state.
    pub fn handle_overlay_key(&mut self, key: &KeyEvent, top: bool) -> bool {
        let overlay: &mut dyn Scrollable = match self.modal {
            Modal::Help => self.help.scrollable(),
            Modal::Error { .. } => self.error.scrollable(),
            _ => return false,
        };

        if key.code == KeyCode::Esc {
            match self.modal {
                Modal::Help => self.modal = Modal::Normal,
                _ => self.restore(),
            }
        } else if top {
            overlay.scroll_top();
        } else if let Some(nav) = nav_for(key) {
            overlay.scroll(nav);
        }
        true
    }

    pub fn draw_overlay(&mut self, frame: &mut ratatui::Frame) {
        match self.modal {
            Modal::Help => self.help.render(frame),
            Modal::Error { .. } => self.error.render(frame),
            _ => {}
        }
    }

    /// Cursor color for the table the staged entity came from.
    pub fn cursor_color(&self) -> Color {
        match self.modal {
            Modal::ActionSelect { .. } | Modal::ActionConfirm { .. } | Modal::SignalSelect { .. } => ARMED,
            _ => CURSOR,
        }
    }

    /// Suffix for table titles.
    pub fn status_tag(&self) -> &'static str {
        if self.running {
            ""
        } else {
            " [paused]"
        }
    }
}
