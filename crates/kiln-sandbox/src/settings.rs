use serde::{Deserialize, Serialize};

/// The `[sandbox]` configuration.
///
/// Controls how kiln reacts when the host cannot isolate actions from the rest of the system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SandboxOptions {
    /// Do not warn when sandboxed execution is requested but the host does not support it.
    ///
    /// Actions still run, with whatever isolation the host offers.
    pub ignore_unsupported_sandboxing: Option<bool>,

    /// Include the full command line and sandbox layout in the error message of a failed
    /// sandboxed action.
    pub verbose_failures: Option<bool>,
}

impl SandboxOptions {
    /// Returns `true` if no fields are set.
    pub fn is_empty(&self) -> bool {
        self.ignore_unsupported_sandboxing.is_none() && self.verbose_failures.is_none()
    }

    /// Combine two [`SandboxOptions`], preferring the values in `self`.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            ignore_unsupported_sandboxing: self
                .ignore_unsupported_sandboxing
                .or(other.ignore_unsupported_sandboxing),
            verbose_failures: self.verbose_failures.or(other.verbose_failures),
        }
    }
}
