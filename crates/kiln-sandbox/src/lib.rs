pub use environment::{CommandEnvironment, Directories};
pub use probe::{HostProbe, ProbeError, SystemProbe};
pub use request::ExecutionRequest;
pub use select::{SANDBOX_NOT_SUPPORTED_MESSAGE, SandboxStrategies};
pub use settings::SandboxOptions;
pub use strategy::{SandboxStrategy, StrategyKind};

mod environment;
mod probe;
mod request;
mod select;
mod settings;
mod strategy;
