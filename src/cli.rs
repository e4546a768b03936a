/// CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::EntitySelector;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser, Debug)]
#[command(name = "sysdash")]
#[command(author, version = VERSION_WITH_BUILD, about = "Terminal dashboard for system, process and container metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Refresh interval in milliseconds (minimum 1000)
    #[arg(long, global = true)]
    pub refresh_ms: Option<u64>,

    /// Write logs to this file; nothing is logged otherwise
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch all processes, or one process in detail
    Proc {
        /// Process id to watch
        #[arg(short, long)]
        pid: Option<u32>,

        /// Refresh interval in milliseconds
        #[arg(short, long)]
        refresh: Option<u64>,
    },

    /// Watch containers, or one container in detail
    Container {
        /// Container id or name to watch
        #[arg(short = 'c', long = "cid")]
        cid: Option<String>,

        /// Include stopped containers
        #[arg(short, long)]
        all: bool,

        /// Refresh interval in milliseconds
        #[arg(short, long)]
        refresh: Option<u64>,
    },
}

impl Cli {
    /// What to watch, derived from the subcommand and its flags.
    pub fn selector(&self) -> EntitySelector {
        match &self.command {
            None => EntitySelector::None,
            Some(Commands::Proc { pid: Some(pid), .. }) => EntitySelector::ProcessId(*pid),
            Some(Commands::Proc { pid: None, .. }) => EntitySelector::AllProcesses,
            Some(Commands::Container { cid: Some(cid), .. }) => EntitySelector::ContainerId(cid.clone()),
            Some(Commands::Container { cid: None, all, .. }) => EntitySelector::AllContainers { all: *all },
        }
    }

    /// Refresh interval given on the command line, the subcommand flag winning.
    pub fn refresh_override(&self) -> Option<u64> {
        let sub = match &self.command {
            Some(Commands::Proc { refresh, .. }) | Some(Commands::Container { refresh, .. }) => *refresh,
            None => None,
        };
        sub.or(self.refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sysdash").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_selectors() {
        assert_eq!(parse(&[]).selector(), EntitySelector::None);
        assert_eq!(parse(&["proc"]).selector(), EntitySelector::AllProcesses);
        assert_eq!(parse(&["proc", "-p", "42"]).selector(), EntitySelector::ProcessId(42));
        assert_eq!(
            parse(&["container"]).selector(),
            EntitySelector::AllContainers { all: false }
        );
        assert_eq!(
            parse(&["container", "-a"]).selector(),
            EntitySelector::AllContainers { all: true }
        );
        assert_eq!(
            parse(&["container", "-c", "abc123"]).selector(),
            EntitySelector::ContainerId("abc123".into())
        );
    }

    #[test]
    fn test_refresh_override() {
        assert_eq!(parse(&[]).refresh_override(), None);
        assert_eq!(parse(&["--refresh-ms", "2000"]).refresh_override(), Some(2000));
        assert_eq!(parse(&["proc", "-r", "3000"]).refresh_override(), Some(3000));
        assert_eq!(
            parse(&["--refresh-ms", "2000", "container", "-r", "5000"]).refresh_override(),
            Some(5000)
        );
    }

    #[test]
    fn test_rejects_non_numeric_pid() {
        assert!(Cli::try_parse_from(["sysdash", "proc", "-p", "abc"]).is_err());
    }
}
