/// What a view is watching

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySelector {
    /// Whole system
    None,
    ProcessId(u32),
    ContainerId(String),
    /// Every container, or only running ones when `all` is false
    AllContainers { all: bool },
    AllProcesses,
}

impl fmt::Display for EntitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySelector::None => write!(f, "system"),
            EntitySelector::ProcessId(pid) => write!(f, "pid {}", pid),
            EntitySelector::ContainerId(id) => write!(f, "container {}", id),
            EntitySelector::AllContainers { all: true } => write!(f, "all containers"),
            EntitySelector::AllContainers { all: false } => write!(f, "running containers"),
            EntitySelector::AllProcesses => write!(f, "all processes"),
        }
    }
}
