use std::collections::BTreeMap;
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use kiln_static::EnvVars;

/// The name of the Linux namespace sandbox helper.
const LINUX_SANDBOX: &str = "linux-sandbox";

/// The name of the process wrapper helper.
const PROCESS_WRAPPER: &str = "process-wrapper";

/// The installation and output directories of a kiln server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    install_base: PathBuf,
    output_base: PathBuf,
    exec_root: PathBuf,
    embedded_tools: PathBuf,
    linux_sandbox: Option<PathBuf>,
}

impl Directories {
    /// Create a directory layout whose helper binaries live in `<install_base>/_embedded_binaries`.
    ///
    /// A non-empty `KILN_LINUX_SANDBOX` replaces the `linux-sandbox` helper; it is read once, here.
    pub fn new(
        install_base: impl Into<PathBuf>,
        output_base: impl Into<PathBuf>,
        exec_root: impl Into<PathBuf>,
    ) -> Self {
        let install_base = install_base.into();
        let embedded_tools = install_base.join("_embedded_binaries");
        Self {
            install_base,
            output_base: output_base.into(),
            exec_root: exec_root.into(),
            embedded_tools,
            linux_sandbox: std::env::var_os(EnvVars::KILN_LINUX_SANDBOX)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Use a different directory for the helper binaries.
    #[must_use]
    pub fn with_embedded_tools(mut self, embedded_tools: impl Into<PathBuf>) -> Self {
        self.embedded_tools = embedded_tools.into();
        self
    }

    pub fn install_base(&self) -> &Path {
        &self.install_base
    }

    pub fn output_base(&self) -> &Path {
        &self.output_base
    }

    pub fn exec_root(&self) -> &Path {
        &self.exec_root
    }

    pub fn embedded_tools(&self) -> &Path {
        &self.embedded_tools
    }

    /// Use a specific `linux-sandbox` helper instead of the embedded one.
    #[must_use]
    pub fn with_linux_sandbox(mut self, linux_sandbox: impl Into<PathBuf>) -> Self {
        self.linux_sandbox = Some(linux_sandbox.into());
        self
    }

    /// The `linux-sandbox` helper.
    pub fn linux_sandbox(&self) -> PathBuf {
        self.linux_sandbox
            .clone()
            .unwrap_or_else(|| self.embedded_binary(LINUX_SANDBOX))
    }

    /// The `process-wrapper` helper.
    pub fn process_wrapper(&self) -> PathBuf {
        self.embedded_binary(PROCESS_WRAPPER)
    }

    fn embedded_binary(&self, name: &str) -> PathBuf {
        self.embedded_tools.join(format!("{name}{EXE_SUFFIX}"))
    }
}

/// The environment a command was invoked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnvironment {
    client_env: BTreeMap<String, String>,
    directories: Directories,
    product_name: String,
}

impl CommandEnvironment {
    /// Create an environment with an empty client environment.
    pub fn new(directories: Directories, product_name: impl Into<String>) -> Self {
        Self {
            client_env: BTreeMap::new(),
            directories,
            product_name: product_name.into(),
        }
    }

    /// Capture the environment variables of the current process as the client environment.
    ///
    /// Variables that are not valid UTF-8 are skipped.
    pub fn from_process(directories: Directories, product_name: impl Into<String>) -> Self {
        Self::new(directories, product_name).with_client_env(std::env::vars_os().filter_map(
            |(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)),
        ))
    }

    /// Replace the client environment.
    #[must_use]
    pub fn with_client_env(
        mut self,
        client_env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.client_env = client_env
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    pub fn client_env(&self) -> &BTreeMap<String, String> {
        &self.client_env
    }

    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_binaries_live_under_install_base() {
        let directories = Directories::new("/opt/kiln/install", "/tmp/out", "/tmp/out/execroot");
        assert_eq!(
            directories.embedded_tools(),
            Path::new("/opt/kiln/install/_embedded_binaries")
        );
        assert_eq!(
            directories.process_wrapper(),
            Path::new("/opt/kiln/install/_embedded_binaries")
                .join(format!("process-wrapper{EXE_SUFFIX}"))
        );
    }

    #[test]
    fn linux_sandbox_override() {
        let embedded = Path::new("/tools").join(format!("linux-sandbox{EXE_SUFFIX}"));

        let directories = temp_env::with_var_unset(EnvVars::KILN_LINUX_SANDBOX, || {
            Directories::new("/opt/kiln", "/tmp/out", "/tmp/exec").with_embedded_tools("/tools")
        });
        assert_eq!(directories.linux_sandbox(), embedded);

        let directories = temp_env::with_var(EnvVars::KILN_LINUX_SANDBOX, Some(""), || {
            Directories::new("/opt/kiln", "/tmp/out", "/tmp/exec").with_embedded_tools("/tools")
        });
        assert_eq!(directories.linux_sandbox(), embedded);

        let directories = Directories::new("/opt/kiln", "/tmp/out", "/tmp/exec")
            .with_linux_sandbox("/usr/local/bin/linux-sandbox");
        assert_eq!(
            directories.linux_sandbox(),
            Path::new("/usr/local/bin/linux-sandbox")
        );
    }

    #[test]
    fn linux_sandbox_override_is_read_once() {
        let directories = temp_env::with_var(
            EnvVars::KILN_LINUX_SANDBOX,
            Some("/usr/local/bin/linux-sandbox"),
            || Directories::new("/opt/kiln", "/tmp/out", "/tmp/exec"),
        );

        temp_env::with_var(EnvVars::KILN_LINUX_SANDBOX, Some("/elsewhere"), || {
            assert_eq!(
                directories.linux_sandbox(),
                Path::new("/usr/local/bin/linux-sandbox")
            );
        });
        temp_env::with_var_unset(EnvVars::KILN_LINUX_SANDBOX, || {
            assert_eq!(
                directories.linux_sandbox(),
                Path::new("/usr/local/bin/linux-sandbox")
            );
        });
    }

    #[test]
    fn client_env_is_replaced() {
        let env = CommandEnvironment::new(Directories::new("/a", "/b", "/c"), "kiln")
            .with_client_env([("HOME", "/home/ferris"), ("PATH", "/usr/bin")]);
        assert_eq!(env.product_name(), "kiln");
        assert_eq!(env.client_env().len(), 2);
        assert_eq!(
            env.client_env().get("HOME").map(String::as_str),
            Some("/home/ferris")
        );
    }
}
