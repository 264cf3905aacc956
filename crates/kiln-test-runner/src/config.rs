use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use kiln_static::EnvVars;

use crate::Properties;

/// The property carrying the version of the runner protocol the build driver speaks.
pub const API_VERSION_PROPERTY: &str = "apiVersion";

/// The property controlling whether the runner installs its own security manager.
pub const INSTALL_SECURITY_MANAGER_PROPERTY: &str = "installSecurityManager";

/// The property whose presence means a security manager is already configured.
pub const EXTERNAL_SECURITY_MANAGER_PROPERTY: &str = "externalSecurityManagerHint";

/// The only runner protocol version this runner speaks.
pub const SUPPORTED_API_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required property `{}`", API_VERSION_PROPERTY)]
    MissingApiVersion,
    #[error("Invalid value for `{}`: `{}` is not an integer", API_VERSION_PROPERTY, _0)]
    InvalidApiVersion(String),
    #[error(
        "Unsupported value for `{}`: `{}` (only version {} is supported)",
        API_VERSION_PROPERTY,
        _0,
        SUPPORTED_API_VERSION
    )]
    UnsupportedApiVersion(String),
    #[error("Invalid value for `{key}`: expected `true` or `false`, found `{value}`")]
    InvalidBoolean { key: &'static str, value: String },
}

/// The configuration of a single test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    include_filter: Option<String>,
    exclude_filter: Option<String>,
    xml_output_path: Option<PathBuf>,
    properties: Properties,
}

impl RunnerConfig {
    pub fn new(
        include_filter: Option<String>,
        exclude_filter: Option<String>,
        xml_output_path: Option<PathBuf>,
        properties: Properties,
    ) -> Self {
        Self {
            include_filter,
            exclude_filter,
            xml_output_path,
            properties,
        }
    }

    /// Read the test filter and report path set by the test driver.
    ///
    /// Empty variables are treated as unset.
    pub fn from_env(properties: Properties) -> Self {
        let include_filter = std::env::var(EnvVars::TESTBRIDGE_TEST_ONLY)
            .ok()
            .filter(|filter| !filter.is_empty());
        let xml_output_path = std::env::var_os(EnvVars::XML_OUTPUT_FILE)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        Self::new(include_filter, None, xml_output_path, properties)
    }

    /// Only run tests matching this filter.
    pub fn include_filter(&self) -> Option<&str> {
        self.include_filter.as_deref()
    }

    /// Skip tests matching this filter.
    pub fn exclude_filter(&self) -> Option<&str> {
        self.exclude_filter.as_deref()
    }

    /// Where to write the XML test report.
    pub fn xml_output_path(&self) -> Option<&Path> {
        self.xml_output_path.as_deref()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The runner protocol version requested by the build driver.
    ///
    /// The value must be a base-10 integer equal to [`SUPPORTED_API_VERSION`].
    pub fn api_version(&self) -> Result<u32, ConfigError> {
        let Some(raw) = self.properties.get(API_VERSION_PROPERTY) else {
            return Err(ConfigError::MissingApiVersion);
        };
        let version = raw
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidApiVersion(raw.to_string()))?;
        if version != i64::from(SUPPORTED_API_VERSION) {
            return Err(ConfigError::UnsupportedApiVersion(raw.to_string()));
        }
        Ok(SUPPORTED_API_VERSION)
    }

    /// Whether the runner should install its own security manager around test code.
    ///
    /// An externally configured manager always wins, then an explicit setting, and otherwise the
    /// manager is installed.
    pub fn should_install_security_manager(&self) -> Result<bool, ConfigError> {
        if let Some(hint) = self
            .properties
            .get(EXTERNAL_SECURITY_MANAGER_PROPERTY)
            .filter(|hint| !hint.is_empty())
        {
            debug!("Not installing a security manager; `{hint}` is already configured");
            return Ok(false);
        }

        match self.properties.get(INSTALL_SECURITY_MANAGER_PROPERTY) {
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(value) => Err(ConfigError::InvalidBoolean {
                key: INSTALL_SECURITY_MANAGER_PROPERTY,
                value: value.to_string(),
            }),
            None => Ok(true),
        }
    }
}
