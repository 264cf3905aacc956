use crate::SandboxOptions;

/// The subset of a build request that determines how actions are sandboxed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Report the full command line of failing actions.
    pub verbose_failures: bool,
    /// Do not warn when sandboxing is unavailable.
    pub ignore_unsupported_sandboxing: bool,
}

impl ExecutionRequest {
    /// Resolve the request from [`SandboxOptions`], with unset values defaulting to `false`.
    pub fn from_options(options: &SandboxOptions) -> Self {
        Self {
            verbose_failures: options.verbose_failures.unwrap_or(false),
            ignore_unsupported_sandboxing: options.ignore_unsupported_sandboxing.unwrap_or(false),
        }
    }
}
