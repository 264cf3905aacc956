use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{CommandEnvironment, Directories, ExecutionRequest};

/// The `sandbox-exec` binary shipped with macOS.
pub(crate) const SANDBOX_EXEC: &str = "/usr/bin/sandbox-exec";

/// The mechanism a [`SandboxStrategy`] uses to isolate an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// User, mount and network namespaces via the `linux-sandbox` helper.
    LinuxNamespace,
    /// Argument, environment and working-directory control without filesystem isolation.
    ProcessWrapper,
    /// A `sandbox-exec` profile.
    Darwin,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LinuxNamespace => "linux-namespace",
            Self::ProcessWrapper => "process-wrapper",
            Self::Darwin => "darwin",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Flavor {
    LinuxNamespace,
    ProcessWrapper,
    Darwin {
        client_env: BTreeMap<String, String>,
        product_name: String,
    },
}

/// A sandboxed execution strategy that can be registered with the executor.
///
/// Captures everything needed to later run an action under the strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxStrategy {
    flavor: Flavor,
    request: ExecutionRequest,
    directories: Directories,
    sandbox_base: PathBuf,
    verbose_failures: bool,
}

impl SandboxStrategy {
    pub fn linux_namespace(
        request: ExecutionRequest,
        directories: Directories,
        sandbox_base: impl Into<PathBuf>,
        verbose_failures: bool,
    ) -> Self {
        Self {
            flavor: Flavor::LinuxNamespace,
            request,
            directories,
            sandbox_base: sandbox_base.into(),
            verbose_failures,
        }
    }

    pub fn process_wrapper(
        request: ExecutionRequest,
        directories: Directories,
        sandbox_base: impl Into<PathBuf>,
        verbose_failures: bool,
    ) -> Self {
        Self {
            flavor: Flavor::ProcessWrapper,
            request,
            directories,
            sandbox_base: sandbox_base.into(),
            verbose_failures,
        }
    }

    /// Create a Darwin strategy, which additionally needs the client environment to build its
    /// sandbox profile and the product name to label its temporary files.
    pub fn darwin(
        request: ExecutionRequest,
        env: &CommandEnvironment,
        sandbox_base: impl Into<PathBuf>,
        verbose_failures: bool,
    ) -> Self {
        Self {
            flavor: Flavor::Darwin {
                client_env: env.client_env().clone(),
                product_name: env.product_name().to_string(),
            },
            request,
            directories: env.directories().clone(),
            sandbox_base: sandbox_base.into(),
            verbose_failures,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self.flavor {
            Flavor::LinuxNamespace => StrategyKind::LinuxNamespace,
            Flavor::ProcessWrapper => StrategyKind::ProcessWrapper,
            Flavor::Darwin { .. } => StrategyKind::Darwin,
        }
    }

    pub fn request(&self) -> ExecutionRequest {
        self.request
    }

    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    /// The directory under which per-action sandboxes are created.
    pub fn sandbox_base(&self) -> &Path {
        &self.sandbox_base
    }

    pub fn verbose_failures(&self) -> bool {
        self.verbose_failures
    }

    /// The client environment, for strategies that need it.
    pub fn client_env(&self) -> Option<&BTreeMap<String, String>> {
        match &self.flavor {
            Flavor::Darwin { client_env, .. } => Some(client_env),
            Flavor::LinuxNamespace | Flavor::ProcessWrapper => None,
        }
    }

    /// The product name, for strategies that need it.
    pub fn product_name(&self) -> Option<&str> {
        match &self.flavor {
            Flavor::Darwin { product_name, .. } => Some(product_name),
            Flavor::LinuxNamespace | Flavor::ProcessWrapper => None,
        }
    }

    /// The helper executable that actions are launched through.
    pub fn executable(&self) -> PathBuf {
        match self.flavor {
            Flavor::LinuxNamespace => self.directories.linux_sandbox(),
            Flavor::ProcessWrapper => self.directories.process_wrapper(),
            Flavor::Darwin { .. } => PathBuf::from(SANDBOX_EXEC),
        }
    }
}

impl fmt::Display for SandboxStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.sandbox_base.display())
    }
}
