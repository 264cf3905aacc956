//! Choose the sandboxed execution strategies available on the current host.

use std::path::Path;

use tracing::debug;

use kiln_platform::HostOs;
use kiln_warnings::Reporter;

use crate::{CommandEnvironment, ExecutionRequest, HostProbe, ProbeError, SandboxStrategy};

pub const SANDBOX_NOT_SUPPORTED_MESSAGE: &str = "Sandboxed execution is not supported on your \
    system and thus hermeticity of actions cannot be guaranteed. See the sandboxing section of \
    the user manual for more information. You can turn off this warning via \
    `--ignore_unsupported_sandboxing`";

/// The sandboxed execution strategies available on the current host, in order of preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxStrategies(Vec<SandboxStrategy>);

impl SandboxStrategies {
    /// Select the strategies for the host described by `probe`.
    ///
    /// - On Linux, the namespace sandbox if the kernel and helper support it, and the process
    ///   wrapper otherwise.
    /// - On macOS, the `sandbox-exec` strategy if it works, and nothing otherwise.
    /// - On FreeBSD, the process wrapper.
    /// - Elsewhere, nothing.
    ///
    /// When Linux or macOS can't sandbox, a warning is sent to `reporter` unless the request
    /// ignores unsupported sandboxing.
    pub fn select(
        probe: &impl HostProbe,
        env: &CommandEnvironment,
        request: ExecutionRequest,
        sandbox_base: &Path,
        reporter: &impl Reporter,
    ) -> Result<Self, ProbeError> {
        let mut strategies = Vec::with_capacity(1);
        let directories = env.directories();
        let verbose_failures = request.verbose_failures;

        let os = probe.current_os();
        match os {
            HostOs::Linux => {
                if probe.supports_linux_namespace_sandbox(env)? {
                    strategies.push(SandboxStrategy::linux_namespace(
                        request,
                        directories.clone(),
                        sandbox_base,
                        verbose_failures,
                    ));
                } else {
                    warn_unsupported(request, reporter);
                    strategies.push(SandboxStrategy::process_wrapper(
                        request,
                        directories.clone(),
                        sandbox_base,
                        verbose_failures,
                    ));
                }
            }
            HostOs::Darwin => {
                if probe.supports_darwin_sandbox()? {
                    strategies.push(SandboxStrategy::darwin(
                        request,
                        env,
                        sandbox_base,
                        verbose_failures,
                    ));
                } else {
                    warn_unsupported(request, reporter);
                }
            }
            HostOs::FreeBsd => {
                strategies.push(SandboxStrategy::process_wrapper(
                    request,
                    directories.clone(),
                    sandbox_base,
                    verbose_failures,
                ));
            }
            HostOs::Other => {}
        }

        if strategies.is_empty() {
            debug!("No sandboxed execution strategies available on {os}");
        } else {
            debug!(
                "Selected sandboxed execution strategies on {os}: {}",
                strategies
                    .iter()
                    .map(|strategy| strategy.kind().as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(Self(strategies))
    }

    /// The selected strategies, most preferred first.
    pub fn strategies(&self) -> &[SandboxStrategy] {
        &self.0
    }

    pub fn into_strategies(self) -> Vec<SandboxStrategy> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for SandboxStrategies {
    type Item = SandboxStrategy;
    type IntoIter = std::vec::IntoIter<SandboxStrategy>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SandboxStrategies {
    type Item = &'a SandboxStrategy;
    type IntoIter = std::slice::Iter<'a, SandboxStrategy>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn warn_unsupported(request: ExecutionRequest, reporter: &impl Reporter) {
    if request.ignore_unsupported_sandboxing {
        debug!("Sandboxing is unsupported; not warning as requested");
    } else {
        reporter.warn(SANDBOX_NOT_SUPPORTED_MESSAGE);
    }
}
