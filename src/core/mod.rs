pub mod actions;
pub mod docker;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod process;
pub mod selector;
pub mod system;

pub use actions::{ActionExecutor, ContainerAction, ProcessSignals, SignalSender};
pub use docker::{ContainerDetailProvider, ContainerListProvider, DockerManager};
pub use error::{ActionError, DashError};
pub use metrics::{MetricsProvider, Sample};
pub use pipeline::{relay, run_producer, CancelToken, TaskGroup};
pub use process::{ProcessDetailProvider, ProcessListProvider};
pub use selector::EntitySelector;
pub use system::SystemProvider;
