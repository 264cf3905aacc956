use std::ops::Deref;
use std::path::{Path, PathBuf};

use kiln_static::EnvVars;

pub use crate::settings::*;

mod settings;

/// The name of the configuration file kiln discovers in a workspace.
const CONFIG_FILE: &str = "kiln.toml";

/// The [`Options`] as loaded from a configuration file on disk.
#[derive(Debug, Clone)]
pub struct FilesystemOptions(Options);

impl FilesystemOptions {
    /// Convert the [`FilesystemOptions`] into [`Options`].
    pub fn into_options(self) -> Options {
        self.0
    }

    /// Find the [`FilesystemOptions`] for the given path.
    ///
    /// The search starts at the given path and goes up the directory tree until a `kiln.toml` file
    /// is found.
    pub fn find(path: &Path) -> Result<Option<Self>, Error> {
        for ancestor in path.ancestors() {
            if let Some(options) = Self::from_directory(ancestor)? {
                return Ok(Some(options));
            }
        }
        Ok(None)
    }

    /// Load a [`FilesystemOptions`] from the `kiln.toml` file in a directory, if there is one.
    pub fn from_directory(dir: &Path) -> Result<Option<Self>, Error> {
        let path = dir.join(CONFIG_FILE);
        match read_file(&path) {
            Ok(options) => {
                tracing::debug!("Found workspace configuration at `{}`", path.display());
                Ok(Some(Self(options)))
            }
            Err(Error::Io(err))
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Load a [`FilesystemOptions`] from a `kiln.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!("Reading configuration from: `{}`", path.display());
        Ok(Self(read_file(path)?))
    }
}

impl Deref for FilesystemOptions {
    type Target = Options;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Options> for FilesystemOptions {
    fn from(options: Options) -> Self {
        Self(options)
    }
}

/// Load [`Options`] from a `kiln.toml` file.
fn read_file(path: &Path) -> Result<Options, Error> {
    let content = fs_err::read_to_string(path)?;
    toml::from_str::<Options>(&content)
        .map_err(|err| Error::KilnToml(path.to_path_buf(), Box::new(err)))
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse: `{}`", _0.display())]
    KilnToml(PathBuf, #[source] Box<toml::de::Error>),

    #[error("Failed to parse environment variable `{name}` with invalid value `{value}`: {err}")]
    InvalidEnvironmentVariable {
        name: String,
        value: String,
        err: String,
    },
}

/// Options loaded from environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOptions {
    pub ignore_unsupported_sandboxing: Option<bool>,
    pub verbose_failures: Option<bool>,
}

impl EnvironmentOptions {
    /// Create a new [`EnvironmentOptions`] from environment variables.
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            ignore_unsupported_sandboxing: parse_boolish_environment_variable(
                EnvVars::KILN_IGNORE_UNSUPPORTED_SANDBOXING,
            )?,
            verbose_failures: parse_boolish_environment_variable(EnvVars::KILN_VERBOSE_FAILURES)?,
        })
    }
}

/// Parse a boolean environment variable.
///
/// Accepts the same values as Clap's `BoolishValueParser`.
fn parse_boolish_environment_variable(name: &'static str) -> Result<Option<bool>, Error> {
    const TRUE_LITERALS: [&str; 6] = ["y", "yes", "t", "true", "on", "1"];
    const FALSE_LITERALS: [&str; 6] = ["n", "no", "f", "false", "off", "0"];

    let Some(value) = std::env::var_os(name) else {
        return Ok(None);
    };

    let Some(value) = value.to_str() else {
        return Err(Error::InvalidEnvironmentVariable {
            name: name.to_string(),
            value: value.to_string_lossy().to_string(),
            err: "expected a valid UTF-8 string".to_string(),
        });
    };

    let lowercase = value.to_lowercase();
    if TRUE_LITERALS.contains(&lowercase.as_str()) {
        Ok(Some(true))
    } else if FALSE_LITERALS.contains(&lowercase.as_str()) {
        Ok(Some(false))
    } else {
        Err(Error::InvalidEnvironmentVariable {
            name: name.to_string(),
            value: value.to_string(),
            err: "expected a boolish value".to_string(),
        })
    }
}
