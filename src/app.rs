/// Terminal lifecycle and the wiring of one view: provider, relay, producer and controller

use crossterm::{
    cursor::Show,
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout, Write};
use std::panic;
use std::time::Duration;
use tracing::info;

use crate::core::process::validate_pid;
use crate::core::{
    relay, run_producer, ContainerDetailProvider, ContainerListProvider, DashError, DockerManager,
    EntitySelector, MetricsProvider, ProcessDetailProvider, ProcessListProvider, ProcessSignals,
    SystemProvider, TaskGroup,
};
use crate::screens::container_detail::ContainerDetailView;
use crate::screens::containers::ContainerListView;
use crate::screens::overview::OverviewView;
use crate::screens::process_detail::ProcessDetailView;
use crate::screens::processes::ProcessListView;
use crate::screens::{Controller, View};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Resolved runtime settings for a dashboard session.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub interval: Duration,
    pub action_timeout: Duration,
}

pub struct App {
    selector: EntitySelector,
    settings: Settings,
}

impl App {
    pub fn new(selector: EntitySelector, settings: Settings) -> Self {
        Self { selector, settings }
    }

    /// Validate the selector, then run its view until the user quits or a
    /// producer fails. Invalid selectors are reported before the terminal
    /// switches screens.
    pub async fn run(self) -> Result<(), DashError> {
        let Settings { interval, action_timeout } = self.settings;
        info!(selector = %self.selector, interval_ms = interval.as_millis() as u64, "starting view");

        match self.selector {
            EntitySelector::None => run_view(SystemProvider::new(), OverviewView::new(), interval).await,
            EntitySelector::AllProcesses => {
                let view = ProcessListView::new(ProcessSignals::new());
                run_view(ProcessListProvider::new(), view, interval).await
            }
            EntitySelector::ProcessId(pid) => {
                validate_pid(pid)?;
                let view = ProcessDetailView::new(pid, ProcessSignals::new());
                run_view(ProcessDetailProvider::new(pid), view, interval).await
            }
            EntitySelector::AllContainers { all } => {
                let docker = DockerManager::new()?;
                let view = ContainerListView::new(docker.clone(), action_timeout);
                run_view(ContainerListProvider::new(docker, all), view, interval).await
            }
            EntitySelector::ContainerId(id) => {
                let docker = DockerManager::new()?;
                docker.validate_container(&id).await?;
                let view = ContainerDetailView::new(&id, docker.clone(), action_timeout);
                run_view(ContainerDetailProvider::new(docker, id), view, interval).await
            }
        }
    }
}

async fn run_view<P, V>(provider: P, view: V, interval: Duration) -> Result<(), DashError>
where
    P: MetricsProvider + Send + 'static,
    V: View<Snapshot = P::Snapshot>,
{
    let mut terminal = setup_terminal()?;

    let mut group = TaskGroup::new();
    let cancel = group.token();
    let (sender, receiver) = relay();
    group.spawn(run_producer(provider, interval, sender, cancel.clone()));

    let mut controller = Controller::new(view, receiver, interval, cancel);
    let result = group
        .run(controller.run(&mut terminal, EventStream::new()))
        .await;

    // Restore even when the view failed; its error takes precedence.
    let restored = restore_terminal(&mut terminal);
    result?;
    restored
}

fn setup_terminal() -> Result<Tui, DashError> {
    enable_raw_mode()?;
    install_panic_hook();
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = reset_terminal(&mut stdout);
        return Err(e.into());
    }
    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => Ok(terminal),
        Err(e) => {
            let _ = reset_terminal(&mut io::stdout());
            Err(e.into())
        }
    }
}

/// Leave raw mode and the alternate screen before a panic message is printed.
fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = reset_terminal(&mut io::stdout());
        previous(info);
    }));
}

fn reset_terminal<W: Write>(out: &mut W) -> Result<(), DashError> {
    disable_raw_mode()?;
    execute!(out, LeaveAlternateScreen, Show)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Tui) -> Result<(), DashError> {
    reset_terminal(terminal.backend_mut())?;
    terminal.show_cursor()?;
    Ok(())
}
