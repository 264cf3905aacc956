use serde::{Deserialize, Serialize};

use kiln_sandbox::{ExecutionRequest, SandboxOptions};

use crate::{EnvironmentOptions, FilesystemOptions};

/// The contents of a `kiln.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Options {
    pub sandbox: Option<SandboxOptions>,
}

/// The resolved sandbox settings for a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SandboxSettings {
    pub request: ExecutionRequest,
}

impl SandboxSettings {
    /// Resolve the [`SandboxSettings`] from the environment and the configuration file.
    ///
    /// Environment variables take precedence over `kiln.toml`.
    pub fn resolve(
        environment: &EnvironmentOptions,
        filesystem: Option<&FilesystemOptions>,
    ) -> Self {
        let from_environment = SandboxOptions {
            ignore_unsupported_sandboxing: environment.ignore_unsupported_sandboxing,
            verbose_failures: environment.verbose_failures,
        };
        let from_file = filesystem
            .and_then(|options| options.sandbox.clone())
            .unwrap_or_default();
        let options = from_environment.combine(from_file);
        Self {
            request: ExecutionRequest::from_options(&options),
        }
    }
}
